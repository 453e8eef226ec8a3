use axum::async_trait;
use sqlx::{query, query_as, FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::{trace, warn};
use uuid::Uuid;

use super::code::InviteCode;
use super::models::{Couple, Invite, UserRecord};
use super::store::{PairingStore, PairingTx, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PairingStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn PairingTx>, StoreError> {
        let transaction = self.pool.begin().await?;
        Ok(Box::new(PgPairingTx { transaction }))
    }
}

pub struct PgPairingTx {
    transaction: Transaction<'static, Postgres>,
}

#[derive(FromRow)]
struct QInvite {
    code: String,
    couple_id: Option<Uuid>,
    owner_name: String,
    owner_avatar: Option<String>,
    used: bool,
    used_by: Option<Uuid>,
    used_at: Option<OffsetDateTime>,
    revoked_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl QInvite {
    fn into_invite(self) -> Result<Invite, StoreError> {
        let code = InviteCode::parse(&self.code).map_err(|e| {
            warn!("Stored invite code {:?} is malformed", self.code);
            anyhow::Error::from(e)
        })?;
        Ok(Invite {
            code,
            couple_id: self.couple_id,
            owner_name: self.owner_name,
            owner_avatar: self.owner_avatar,
            used: self.used,
            used_by: self.used_by,
            used_at: self.used_at,
            revoked_at: self.revoked_at,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct QCouple {
    id: Uuid,
    owner_uid: Uuid,
    partner_uid: Option<Uuid>,
    members: Vec<Uuid>,
    is_paired: bool,
    pair_completed_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<QCouple> for Couple {
    fn from(row: QCouple) -> Self {
        Self {
            id: row.id,
            owner_uid: row.owner_uid,
            partner_uid: row.partner_uid,
            members: row.members,
            is_paired: row.is_paired,
            pair_completed_at: row.pair_completed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct QUser {
    uid: Uuid,
    couple_id: Option<Uuid>,
}

impl From<QUser> for UserRecord {
    fn from(row: QUser) -> Self {
        Self {
            uid: row.uid,
            couple_id: row.couple_id,
        }
    }
}

#[async_trait]
impl PairingTx for PgPairingTx {
    async fn get_user(&mut self, uid: Uuid) -> Result<Option<UserRecord>, StoreError> {
        let user = query_as::<_, QUser>(
            r#"
            SELECT uid, couple_id FROM users
            WHERE uid = $1
        "#,
        )
        .bind(uid)
        .fetch_optional(&mut *self.transaction)
        .await?;

        Ok(user.map(UserRecord::from))
    }

    async fn lock_user(&mut self, uid: Uuid) -> Result<UserRecord, StoreError> {
        // A missing row cannot be locked, so make sure it exists first.
        query(
            r#"
            INSERT INTO users (uid)
            VALUES ($1)
            ON CONFLICT (uid) DO NOTHING
        "#,
        )
        .bind(uid)
        .execute(&mut *self.transaction)
        .await?;

        let user = query_as::<_, QUser>(
            r#"
            SELECT uid, couple_id FROM users
            WHERE uid = $1
            FOR UPDATE
        "#,
        )
        .bind(uid)
        .fetch_one(&mut *self.transaction)
        .await?;

        Ok(user.into())
    }

    async fn set_user_couple(&mut self, uid: Uuid, couple_id: Uuid) -> Result<(), StoreError> {
        query(
            r#"
            INSERT INTO users (uid, couple_id)
            VALUES ($1, $2)
            ON CONFLICT (uid) DO UPDATE SET couple_id = EXCLUDED.couple_id
        "#,
        )
        .bind(uid)
        .bind(couple_id)
        .execute(&mut *self.transaction)
        .await?;

        trace!("Linked user {uid} to couple {couple_id}");
        Ok(())
    }

    async fn insert_couple(&mut self, couple: &Couple) -> Result<(), StoreError> {
        query(
            r#"
            INSERT INTO couples (id, owner_uid, partner_uid, members, is_paired, pair_completed_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        )
        .bind(couple.id)
        .bind(couple.owner_uid)
        .bind(couple.partner_uid)
        .bind(&couple.members)
        .bind(couple.is_paired)
        .bind(couple.pair_completed_at)
        .bind(couple.created_at)
        .execute(&mut *self.transaction)
        .await?;

        Ok(())
    }

    async fn get_couple(&mut self, couple_id: Uuid) -> Result<Option<Couple>, StoreError> {
        let couple = query_as::<_, QCouple>(
            r#"
            SELECT id, owner_uid, partner_uid, members, is_paired, pair_completed_at, created_at
            FROM couples
            WHERE id = $1
            FOR UPDATE
        "#,
        )
        .bind(couple_id)
        .fetch_optional(&mut *self.transaction)
        .await?;

        Ok(couple.map(Couple::from))
    }

    async fn complete_pairing(
        &mut self,
        couple_id: Uuid,
        partner: Uuid,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let affected = query(
            r#"
            UPDATE couples SET
                members = CASE WHEN $2 = ANY(members) THEN members ELSE array_append(members, $2) END,
                partner_uid = COALESCE(partner_uid, $2),
                pair_completed_at = COALESCE(pair_completed_at, $3),
                is_paired = TRUE
            WHERE id = $1
        "#,
        )
        .bind(couple_id)
        .bind(partner)
        .bind(at)
        .execute(&mut *self.transaction)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(anyhow::anyhow!("couple {couple_id} vanished mid-transaction").into());
        }
        Ok(())
    }

    async fn get_invite(&mut self, code: &InviteCode) -> Result<Option<Invite>, StoreError> {
        let invite = query_as::<_, QInvite>(
            r#"
            SELECT code, couple_id, owner_name, owner_avatar, used, used_by, used_at, revoked_at, created_at
            FROM invites
            WHERE code = $1
            FOR UPDATE
        "#,
        )
        .bind(code.as_str())
        .fetch_optional(&mut *self.transaction)
        .await?;

        invite.map(QInvite::into_invite).transpose()
    }

    async fn peek_invite(&mut self, code: &InviteCode) -> Result<Option<Invite>, StoreError> {
        let invite = query_as::<_, QInvite>(
            r#"
            SELECT code, couple_id, owner_name, owner_avatar, used, used_by, used_at, revoked_at, created_at
            FROM invites
            WHERE code = $1
        "#,
        )
        .bind(code.as_str())
        .fetch_optional(&mut *self.transaction)
        .await?;

        invite.map(QInvite::into_invite).transpose()
    }

    async fn insert_invite(&mut self, invite: &Invite) -> Result<bool, StoreError> {
        let inserted = query(
            r#"
            INSERT INTO invites (code, couple_id, owner_name, owner_avatar, used, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            ON CONFLICT (code) DO NOTHING
        "#,
        )
        .bind(invite.code.as_str())
        .bind(invite.couple_id)
        .bind(&invite.owner_name)
        .bind(&invite.owner_avatar)
        .bind(invite.created_at)
        .execute(&mut *self.transaction)
        .await?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn revoke_invites(
        &mut self,
        couple_id: Uuid,
        keep: Option<&InviteCode>,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        let revoked = query(
            r#"
            UPDATE invites SET revoked_at = $3
            WHERE couple_id = $1
                AND used = FALSE
                AND revoked_at IS NULL
                AND code IS DISTINCT FROM $2
        "#,
        )
        .bind(couple_id)
        .bind(keep.map(InviteCode::as_str))
        .bind(at)
        .execute(&mut *self.transaction)
        .await?
        .rows_affected();

        if revoked > 0 {
            trace!("Revoked {revoked} invites of couple {couple_id}");
        }
        Ok(revoked)
    }

    async fn consume_invite(
        &mut self,
        code: &InviteCode,
        used_by: Uuid,
        at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let affected = query(
            r#"
            UPDATE invites SET used = TRUE, used_by = $2, used_at = $3
            WHERE code = $1 AND used = FALSE AND revoked_at IS NULL
        "#,
        )
        .bind(code.as_str())
        .bind(used_by)
        .bind(at)
        .execute(&mut *self.transaction)
        .await?
        .rows_affected();

        Ok(affected == 1)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.transaction.commit().await?;
        Ok(())
    }
}
