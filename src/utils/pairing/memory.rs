use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;
use uuid::Uuid;

use super::code::InviteCode;
use super::models::{Couple, Invite, UserRecord};
use super::store::{PairingStore, PairingTx, StoreError};

#[derive(Debug, Clone, Default)]
struct Tables {
    invites: HashMap<InviteCode, Invite>,
    couples: HashMap<Uuid, Couple>,
    users: HashMap<Uuid, UserRecord>,
}

#[derive(Default)]
struct Probe {
    operations: AtomicUsize,
    fail_user_writes: AtomicBool,
}

impl Probe {
    fn touch(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-process store. One transaction at a time holds the tables, so every
/// transaction is serializable; writes go to a staged copy that replaces the
/// tables on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    probe: Arc<Probe>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions begun plus record accesses made through them.
    pub fn operations(&self) -> usize {
        self.probe.operations.load(Ordering::SeqCst)
    }

    /// Makes every following user write fail, to exercise rollback.
    pub fn fail_user_writes(&self, fail: bool) {
        self.probe.fail_user_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn invite(&self, code: &InviteCode) -> Option<Invite> {
        self.tables.lock().await.invites.get(code).cloned()
    }

    pub async fn couple(&self, couple_id: Uuid) -> Option<Couple> {
        self.tables.lock().await.couples.get(&couple_id).cloned()
    }

    pub async fn user(&self, uid: Uuid) -> Option<UserRecord> {
        self.tables.lock().await.users.get(&uid).cloned()
    }

    /// Writes an invite as-is, bypassing the issuer.
    pub async fn seed_invite(&self, invite: Invite) {
        self.tables
            .lock()
            .await
            .invites
            .insert(invite.code.clone(), invite);
    }

    pub async fn seed_couple(&self, couple: Couple) {
        let mut tables = self.tables.lock().await;
        for uid in &couple.members {
            tables.users.insert(
                *uid,
                UserRecord {
                    uid: *uid,
                    couple_id: Some(couple.id),
                },
            );
        }
        tables.couples.insert(couple.id, couple);
    }
}

#[async_trait]
impl PairingStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn PairingTx>, StoreError> {
        self.probe.touch();
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            probe: self.probe.clone(),
        }))
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    probe: Arc<Probe>,
}

#[async_trait]
impl PairingTx for MemoryTx {
    async fn get_user(&mut self, uid: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.probe.touch();
        Ok(self.staged.users.get(&uid).cloned())
    }

    async fn lock_user(&mut self, uid: Uuid) -> Result<UserRecord, StoreError> {
        self.probe.touch();
        Ok(self
            .staged
            .users
            .entry(uid)
            .or_insert(UserRecord {
                uid,
                couple_id: None,
            })
            .clone())
    }

    async fn set_user_couple(&mut self, uid: Uuid, couple_id: Uuid) -> Result<(), StoreError> {
        self.probe.touch();
        if self.probe.fail_user_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("user write rejected").into());
        }
        self.staged
            .users
            .entry(uid)
            .or_insert(UserRecord {
                uid,
                couple_id: None,
            })
            .couple_id = Some(couple_id);
        Ok(())
    }

    async fn insert_couple(&mut self, couple: &Couple) -> Result<(), StoreError> {
        self.probe.touch();
        if self.staged.couples.contains_key(&couple.id) {
            return Err(anyhow!("couple {} already exists", couple.id).into());
        }
        self.staged.couples.insert(couple.id, couple.clone());
        Ok(())
    }

    async fn get_couple(&mut self, couple_id: Uuid) -> Result<Option<Couple>, StoreError> {
        self.probe.touch();
        Ok(self.staged.couples.get(&couple_id).cloned())
    }

    async fn complete_pairing(
        &mut self,
        couple_id: Uuid,
        partner: Uuid,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.probe.touch();
        let couple = self
            .staged
            .couples
            .get_mut(&couple_id)
            .ok_or_else(|| anyhow!("couple {couple_id} missing"))?;
        couple.link_partner(partner, at);
        Ok(())
    }

    async fn get_invite(&mut self, code: &InviteCode) -> Result<Option<Invite>, StoreError> {
        self.probe.touch();
        Ok(self.staged.invites.get(code).cloned())
    }

    async fn peek_invite(&mut self, code: &InviteCode) -> Result<Option<Invite>, StoreError> {
        self.probe.touch();
        Ok(self.staged.invites.get(code).cloned())
    }

    async fn insert_invite(&mut self, invite: &Invite) -> Result<bool, StoreError> {
        self.probe.touch();
        if self.staged.invites.contains_key(&invite.code) {
            return Ok(false);
        }
        self.staged
            .invites
            .insert(invite.code.clone(), invite.clone());
        Ok(true)
    }

    async fn revoke_invites(
        &mut self,
        couple_id: Uuid,
        keep: Option<&InviteCode>,
        at: OffsetDateTime,
    ) -> Result<u64, StoreError> {
        self.probe.touch();
        let mut revoked = 0;
        for invite in self.staged.invites.values_mut() {
            if invite.is_active_for(couple_id) && Some(&invite.code) != keep {
                invite.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn consume_invite(
        &mut self,
        code: &InviteCode,
        used_by: Uuid,
        at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        self.probe.touch();
        match self.staged.invites.get_mut(code) {
            Some(invite) if !invite.used && !invite.is_revoked() => {
                invite.consume(used_by, at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        trace!("Committed in-memory transaction");
        Ok(())
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;
    use time::macros::datetime;
    use uuid::uuid;

    const OWNER: Uuid = uuid!("910e81a9-56df-4c24-965a-13eff739f469");

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let couple = Couple::new(OWNER, datetime!(2023-03-01 12:00 UTC));

        let mut tx = store.begin().await.unwrap();
        tx.insert_couple(&couple).await.unwrap();
        tx.set_user_couple(OWNER, couple.id).await.unwrap();
        drop(tx);

        assert_eq!(store.couple(couple.id).await, None);
        assert_eq!(store.user(OWNER).await, None);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let couple = Couple::new(OWNER, datetime!(2023-03-01 12:00 UTC));

        let mut tx = store.begin().await.unwrap();
        tx.insert_couple(&couple).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.couple(couple.id).await, Some(couple));
        assert_eq!(store.operations(), 2);
    }

    #[tokio::test]
    async fn consume_is_compare_and_swap() {
        let store = MemoryStore::new();
        let code = InviteCode::parse("X7F2Q9").unwrap();
        store
            .seed_invite(Invite::new(
                code.clone(),
                Uuid::new_v4(),
                "Ada",
                None,
                datetime!(2023-03-01 12:00 UTC),
            ))
            .await;

        let mut tx = store.begin().await.unwrap();
        let at = datetime!(2023-03-01 13:00 UTC);
        assert!(tx.consume_invite(&code, OWNER, at).await.unwrap());
        assert!(!tx.consume_invite(&code, Uuid::new_v4(), at).await.unwrap());
        tx.commit().await.unwrap();

        let invite = store.invite(&code).await.unwrap();
        assert_eq!(invite.used_by, Some(OWNER));
    }

    #[tokio::test]
    async fn revoke_keeps_newest_and_used() {
        let store = MemoryStore::new();
        let couple_id = Uuid::new_v4();
        let created = datetime!(2023-03-01 12:00 UTC);
        for raw in ["OLD111", "OLD222", "NEW333", "USED44"] {
            let mut invite =
                Invite::new(InviteCode::parse(raw).unwrap(), couple_id, "Ada", None, created);
            if raw == "USED44" {
                invite.consume(OWNER, created);
            }
            store.seed_invite(invite).await;
        }
        let keep = InviteCode::parse("NEW333").unwrap();

        let mut tx = store.begin().await.unwrap();
        let at = datetime!(2023-03-01 13:00 UTC);
        assert_eq!(tx.revoke_invites(couple_id, Some(&keep), at).await.unwrap(), 2);
        let old = InviteCode::parse("OLD111").unwrap();
        assert!(!tx.consume_invite(&old, OWNER, at).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.invite(&old).await.unwrap().revoked_at, Some(at));
        assert!(store.invite(&keep).await.unwrap().is_active_for(couple_id));
        let used = store.invite(&InviteCode::parse("USED44").unwrap()).await.unwrap();
        assert_eq!(used.revoked_at, None);
    }

    #[tokio::test]
    async fn dropped_lock_user_leaves_no_record() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.lock_user(OWNER).await.unwrap();
        assert_eq!(user.couple_id, None);
        drop(tx);

        assert_eq!(store.user(OWNER).await, None);
    }
}
