pub mod code;
pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use time::OffsetDateTime;
use tracing::{debug, error, trace};
use uuid::Uuid;

use self::code::{CodeGenerator, InviteCode, MAX_CODE_ATTEMPTS};
use self::errors::PairingError;
use self::models::{
    Couple, InviteLinks, InvitePreview, IssuedInvite, NewInvite, Redemption,
};
use self::store::{PairingStore, PairingTx};

/// Returns the owner's couple, creating it on first use.
pub async fn create_couple(store: &dyn PairingStore, owner: Uuid) -> Result<Couple, PairingError> {
    let mut tx = store.begin().await?;
    let couple = ensure_couple(tx.as_mut(), owner).await?;
    tx.commit().await?;
    Ok(couple)
}

async fn ensure_couple(tx: &mut dyn PairingTx, owner: Uuid) -> Result<Couple, PairingError> {
    if let Some(couple_id) = tx.lock_user(owner).await?.couple_id {
        return tx.get_couple(couple_id).await?.ok_or_else(|| {
            PairingError::FailedPrecondition(format!(
                "user {owner} points to missing couple {couple_id}"
            ))
        });
    }

    let couple = Couple::new(owner, OffsetDateTime::now_utc());
    tx.insert_couple(&couple).await?;
    tx.set_user_couple(owner, couple.id).await?;
    debug!("Created couple {} for {owner}", couple.id);
    Ok(couple)
}

/// Persists a fresh invite for the couple, or hands back the preferred one while it
/// is still active for that couple. Either way the returned code is the couple's only
/// active invite afterwards.
pub async fn create_invite(
    store: &dyn PairingStore,
    codes: &dyn CodeGenerator,
    new_invite: NewInvite,
) -> Result<InviteCode, PairingError> {
    let preferred = new_invite
        .preferred_code
        .as_deref()
        .map(InviteCode::parse)
        .transpose()?;

    let mut tx = store.begin().await?;

    let now = OffsetDateTime::now_utc();
    if let Some(preferred) = preferred {
        match tx.get_invite(&preferred).await? {
            Some(existing) if existing.is_active_for(new_invite.couple_id) => {
                trace!("Reusing active invite {preferred}");
                tx.revoke_invites(new_invite.couple_id, Some(&existing.code), now)
                    .await?;
                tx.commit().await?;
                return Ok(existing.code);
            }
            _ => trace!("Preferred invite {preferred} is not reusable"),
        }
    }

    for attempt in 0..MAX_CODE_ATTEMPTS {
        let code = codes.attempt(attempt);
        let invite = models::Invite::new(
            code.clone(),
            new_invite.couple_id,
            &new_invite.owner_name,
            new_invite.owner_avatar.as_deref(),
            now,
        );
        if tx.insert_invite(&invite).await? {
            tx.revoke_invites(new_invite.couple_id, Some(&code), now)
                .await?;
            tx.commit().await?;
            debug!("Issued invite {code} for couple {}", new_invite.couple_id);
            return Ok(code);
        }
        trace!("Invite code collision on attempt {attempt}");
    }

    Err(PairingError::GenerationExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

/// Authenticated issuer: resolves the caller's couple and shares a code for it.
pub async fn issue_invite(
    store: &dyn PairingStore,
    codes: &dyn CodeGenerator,
    links: &InviteLinks,
    caller: Option<Uuid>,
    owner_name: &str,
    owner_avatar: Option<&str>,
    preferred_code: Option<&str>,
) -> Result<IssuedInvite, PairingError> {
    let caller = caller.ok_or(PairingError::Unauthenticated)?;

    let couple = create_couple(store, caller).await?;
    if !couple.is_member(caller) {
        return Err(PairingError::PermissionDenied);
    }
    if couple.is_paired {
        return Err(PairingError::CoupleFull);
    }

    let code = create_invite(
        store,
        codes,
        NewInvite {
            couple_id: couple.id,
            owner_name: owner_name.to_string(),
            owner_avatar: owner_avatar.map(str::to_string),
            preferred_code: preferred_code.map(str::to_string),
        },
    )
    .await?;

    Ok(links.issue(code))
}

/// Exchanges an invite code for couple membership.
///
/// The invite row is locked for the whole transaction and consumed with a
/// compare-and-swap, so among concurrent callers for one code exactly one succeeds
/// and every other one gets [`PairingError::AlreadyUsed`]. The couple, the caller's
/// user record and the invite are committed together or not at all.
pub async fn redeem_invite(
    store: &dyn PairingStore,
    caller: Option<Uuid>,
    code: Option<&str>,
) -> Result<Redemption, PairingError> {
    let caller = caller.ok_or(PairingError::Unauthenticated)?;
    let code = InviteCode::parse(code.unwrap_or_default())?;

    let mut tx = store.begin().await?;

    let invite = tx.get_invite(&code).await?.ok_or(PairingError::NotFound)?;
    if invite.used {
        debug!("Invite {code} was already used by {:?}", invite.used_by);
        return Err(PairingError::AlreadyUsed);
    }
    if invite.is_revoked() {
        debug!("Invite {code} was replaced by a newer one");
        return Err(PairingError::NotFound);
    }
    let couple_id = invite.couple_id.ok_or_else(|| {
        error!("Invite {code} has no couple");
        PairingError::FailedPrecondition(format!("invite {code} has no couple"))
    })?;

    let couple = tx.get_couple(couple_id).await?.ok_or_else(|| {
        error!("Invite {code} points to missing couple {couple_id}");
        PairingError::FailedPrecondition(format!("couple {couple_id} is missing"))
    })?;
    if couple.owner_uid == caller {
        return Err(PairingError::InvalidArgument(
            "Cannot redeem your own invite".to_string(),
        ));
    }
    if !couple.admits(caller) {
        return Err(PairingError::CoupleFull);
    }

    let now = OffsetDateTime::now_utc();
    let user = tx.lock_user(caller).await?;
    if let Some(current) = user.couple_id.filter(|id| *id != couple_id) {
        leave_solo_couple(tx.as_mut(), caller, current, now).await?;
    }

    if !tx.consume_invite(&code, caller, now).await? {
        return Err(PairingError::AlreadyUsed);
    }
    tx.complete_pairing(couple_id, caller, now).await?;
    tx.set_user_couple(caller, couple_id).await?;
    tx.commit().await?;

    debug!("User {caller} joined couple {couple_id} with invite {code}");
    Ok(Redemption { couple_id })
}

/// A caller may only switch away from a couple they are alone in. That couple's
/// invites are revoked so nobody can join it afterwards.
async fn leave_solo_couple(
    tx: &mut dyn PairingTx,
    caller: Uuid,
    couple_id: Uuid,
    at: OffsetDateTime,
) -> Result<(), PairingError> {
    let current = tx.get_couple(couple_id).await?.ok_or_else(|| {
        PairingError::FailedPrecondition(format!(
            "user {caller} points to missing couple {couple_id}"
        ))
    })?;
    if current.is_paired || current.members.iter().any(|uid| *uid != caller) {
        debug!("User {caller} is already paired in couple {couple_id}");
        return Err(PairingError::AlreadyPaired);
    }

    let revoked = tx.revoke_invites(couple_id, None, at).await?;
    debug!("User {caller} leaves solo couple {couple_id}, {revoked} invites revoked");
    Ok(())
}

/// Display data the join screen shows before the code is redeemed.
pub async fn preview_invite(
    store: &dyn PairingStore,
    code: &str,
) -> Result<InvitePreview, PairingError> {
    let code = InviteCode::parse(code)?;
    let mut tx = store.begin().await?;
    let invite = tx.peek_invite(&code).await?.ok_or(PairingError::NotFound)?;
    if invite.used {
        return Err(PairingError::AlreadyUsed);
    }
    if invite.is_revoked() {
        return Err(PairingError::NotFound);
    }
    Ok(InvitePreview {
        owner_name: invite.owner_name,
        owner_avatar: invite.owner_avatar,
    })
}

pub async fn fetch_couple(store: &dyn PairingStore, caller: Uuid) -> Result<Couple, PairingError> {
    let mut tx = store.begin().await?;
    let couple_id = tx
        .get_user(caller)
        .await?
        .and_then(|u| u.couple_id)
        .ok_or(PairingError::NotFound)?;
    tx.get_couple(couple_id).await?.ok_or_else(|| {
        PairingError::FailedPrecondition(format!(
            "user {caller} points to missing couple {couple_id}"
        ))
    })
}
