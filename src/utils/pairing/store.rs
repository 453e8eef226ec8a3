//! Storage seam for the pairing workflow.
//!
//! Every operation runs inside a [`PairingTx`]. Backends must make a transaction
//! serializable with respect to the rows it reads through the locking getters, and
//! must discard all of its writes when it is dropped without [`PairingTx::commit`].

use axum::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::code::InviteCode;
use super::models::{Couple, Invite, UserRecord};

#[derive(Error, Debug)]
#[error("Storage unavailable")]
pub struct StoreError(#[source] anyhow::Error);

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self(anyhow::Error::from(e))
    }
}

#[async_trait]
pub trait PairingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn PairingTx>, StoreError>;
}

#[async_trait]
pub trait PairingTx: Send {
    async fn get_user(&mut self, uid: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Creates an empty user record when missing and locks it until the
    /// transaction ends, so concurrent callers for one user queue up here.
    async fn lock_user(&mut self, uid: Uuid) -> Result<UserRecord, StoreError>;

    /// Creates the user record when missing.
    async fn set_user_couple(&mut self, uid: Uuid, couple_id: Uuid) -> Result<(), StoreError>;

    async fn insert_couple(&mut self, couple: &Couple) -> Result<(), StoreError>;

    /// Locks the couple until the transaction ends.
    async fn get_couple(&mut self, couple_id: Uuid) -> Result<Option<Couple>, StoreError>;

    /// Adds `partner` to the members (no-op when present), sets `partner_uid` and
    /// `pair_completed_at` if still unset and marks the couple paired.
    async fn complete_pairing(
        &mut self,
        couple_id: Uuid,
        partner: Uuid,
        at: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Locks the invite until the transaction ends.
    async fn get_invite(&mut self, code: &InviteCode) -> Result<Option<Invite>, StoreError>;

    /// Reads the invite without locking it.
    async fn peek_invite(&mut self, code: &InviteCode) -> Result<Option<Invite>, StoreError>;

    /// Returns `false` when the code is already taken.
    async fn insert_invite(&mut self, invite: &Invite) -> Result<bool, StoreError>;

    /// Revokes every unused, unrevoked invite of the couple except `keep`.
    /// Returns how many were revoked.
    async fn revoke_invites(
        &mut self,
        couple_id: Uuid,
        keep: Option<&InviteCode>,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError>;

    /// Flips `used` only if it is still `false` and the invite is not revoked;
    /// returns whether this call did it.
    async fn consume_invite(
        &mut self,
        code: &InviteCode,
        used_by: Uuid,
        at: OffsetDateTime,
    ) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
