use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::code::InviteCode;

pub const MAX_MEMBERS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    pub code: InviteCode,
    /// Nullable in storage; a missing value is treated as a corrupted record.
    pub couple_id: Option<Uuid>,
    pub owner_name: String,
    pub owner_avatar: Option<String>,
    pub used: bool,
    pub used_by: Option<Uuid>,
    pub used_at: Option<OffsetDateTime>,
    /// Set when a newer invite of the same couple replaced this one.
    pub revoked_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl Invite {
    pub fn new(
        code: InviteCode,
        couple_id: Uuid,
        owner_name: &str,
        owner_avatar: Option<&str>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            code,
            couple_id: Some(couple_id),
            owner_name: owner_name.to_string(),
            owner_avatar: owner_avatar.map(str::to_string),
            used: false,
            used_by: None,
            used_at: None,
            revoked_at: None,
            created_at,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_active_for(&self, couple_id: Uuid) -> bool {
        !self.used && !self.is_revoked() && self.couple_id == Some(couple_id)
    }

    pub fn consume(&mut self, used_by: Uuid, at: OffsetDateTime) {
        self.used = true;
        self.used_by = Some(used_by);
        self.used_at = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Couple {
    pub id: Uuid,
    pub owner_uid: Uuid,
    pub partner_uid: Option<Uuid>,
    pub members: Vec<Uuid>,
    pub is_paired: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub pair_completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Couple {
    pub fn new(owner_uid: Uuid, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_uid,
            partner_uid: None,
            members: vec![owner_uid],
            is_paired: false,
            pair_completed_at: None,
            created_at,
        }
    }

    pub fn is_member(&self, uid: Uuid) -> bool {
        self.members.contains(&uid)
    }

    /// Whether linking `uid` keeps the couple within [`MAX_MEMBERS`].
    pub fn admits(&self, uid: Uuid) -> bool {
        self.is_member(uid) || self.members.len() < MAX_MEMBERS
    }

    /// Set-union on members; partner and completion time are written once.
    pub fn link_partner(&mut self, partner: Uuid, at: OffsetDateTime) {
        if !self.is_member(partner) {
            self.members.push(partner);
        }
        self.partner_uid.get_or_insert(partner);
        self.pair_completed_at.get_or_insert(at);
        self.is_paired = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub uid: Uuid,
    pub couple_id: Option<Uuid>,
}

/// Issuer input for a single couple.
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub couple_id: Uuid,
    pub owner_name: String,
    pub owner_avatar: Option<String>,
    pub preferred_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedInvite {
    #[schema(value_type = String, example = "X7F2Q9")]
    pub code: InviteCode,
    pub link: String,
    pub qr_payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    pub owner_name: String,
    pub owner_avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub couple_id: Uuid,
}

/// Builds the shareable join link for a code.
#[derive(Debug, Clone)]
pub struct InviteLinks {
    origin: String,
}

impl InviteLinks {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn issue(&self, code: InviteCode) -> IssuedInvite {
        let link = format!("{}/join?code={code}", self.origin);
        IssuedInvite {
            code,
            qr_payload: link.clone(),
            link,
        }
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;
    use time::macros::datetime;
    use uuid::uuid;

    const OWNER: Uuid = uuid!("910e81a9-56df-4c24-965a-13eff739f469");
    const PARTNER: Uuid = uuid!("29e40c2a-7595-42d3-98e8-9fe93ce99972");
    const STRANGER: Uuid = uuid!("32190025-7c15-4adb-82fd-9acc3dc8e7b6");

    #[test]
    fn link_partner_is_set_union() {
        let mut couple = Couple::new(OWNER, datetime!(2023-03-01 12:00 UTC));
        couple.link_partner(PARTNER, datetime!(2023-03-01 13:00 UTC));
        couple.link_partner(PARTNER, datetime!(2023-03-01 14:00 UTC));

        assert_eq!(couple.members, vec![OWNER, PARTNER]);
        assert_eq!(couple.partner_uid, Some(PARTNER));
        assert_eq!(couple.pair_completed_at, Some(datetime!(2023-03-01 13:00 UTC)));
        assert!(couple.is_paired);
    }

    #[test]
    fn full_couple_admits_only_members() {
        let mut couple = Couple::new(OWNER, datetime!(2023-03-01 12:00 UTC));
        assert!(couple.admits(STRANGER));
        couple.link_partner(PARTNER, datetime!(2023-03-01 13:00 UTC));
        assert!(couple.admits(PARTNER));
        assert!(!couple.admits(STRANGER));
    }

    #[test]
    fn revoked_invite_is_inactive() {
        let couple_id = Uuid::new_v4();
        let mut invite = Invite::new(
            InviteCode::parse("X7F2Q9").unwrap(),
            couple_id,
            "Ada",
            None,
            datetime!(2023-03-01 12:00 UTC),
        );
        assert!(invite.is_active_for(couple_id));
        assert!(!invite.is_active_for(Uuid::new_v4()));
        invite.revoked_at = Some(datetime!(2023-03-01 13:00 UTC));
        assert!(!invite.is_active_for(couple_id));
    }

    #[test]
    fn links_embed_code() {
        let links = InviteLinks::new("https://pair.example/");
        let issued = links.issue(InviteCode::parse("X7F2Q9").unwrap());
        assert_eq!(issued.link, "https://pair.example/join?code=X7F2Q9");
        assert_eq!(issued.qr_payload, issued.link);
    }
}
