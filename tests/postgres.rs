
use couple_link::utils::pairing::code::RandomCodes;
use couple_link::utils::pairing::errors::PairingError;
use couple_link::utils::pairing::models::InviteLinks;
use couple_link::utils::pairing::postgres::PgStore;
use couple_link::utils::pairing::{
    create_couple, fetch_couple, issue_invite, preview_invite, redeem_invite,
};
use sqlx::PgPool;
use couple_link::utils::pairing::store::{PairingStore, PairingTx};
use std::sync::Arc;
use std::time::Duration;
use tools::{OWNER_ID, PARTNER_ID, STRANGER_ID};
use uuid::{uuid, Uuid};

const COUPLE_ID: Uuid = uuid!("6f1c8d2e-3b4a-4c5d-9e8f-0a1b2c3d4e5f");

#[sqlx::test(fixtures("couples"))]
#[ignore = "requires DATABASE_URL"]
async fn redeem_links_partner(pool: PgPool) {
    let store = PgStore::new(pool.clone());

    let redemption = redeem_invite(&store, Some(PARTNER_ID), Some("x7f2q9"))
        .await
        .unwrap();
    assert_eq!(redemption.couple_id, COUPLE_ID);

    let couple = fetch_couple(&store, PARTNER_ID).await.unwrap();
    assert_eq!(couple.members, vec![OWNER_ID, PARTNER_ID]);
    assert_eq!(couple.partner_uid, Some(PARTNER_ID));
    assert!(couple.is_paired);
    assert!(couple.pair_completed_at.is_some());

    let (used, used_by): (bool, Option<Uuid>) =
        sqlx::query_as("SELECT used, used_by FROM invites WHERE code = 'X7F2Q9'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(used);
    assert_eq!(used_by, Some(PARTNER_ID));

    let res = redeem_invite(&store, Some(STRANGER_ID), Some("X7F2Q9")).await;
    assert!(matches!(res, Err(PairingError::AlreadyUsed)));
}

#[sqlx::test(fixtures("couples"))]
#[ignore = "requires DATABASE_URL"]
async fn invite_without_couple_is_failed_precondition(pool: PgPool) {
    let store = PgStore::new(pool.clone());

    let res = redeem_invite(&store, Some(PARTNER_ID), Some("BROKEN")).await;

    assert!(matches!(res, Err(PairingError::FailedPrecondition(_))));
    let (used,): (bool,) = sqlx::query_as("SELECT used FROM invites WHERE code = 'BROKEN'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!used);
}

#[sqlx::test(fixtures("couples"))]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_redemptions_have_one_winner(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool.clone()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                redeem_invite(store.as_ref(), Some(Uuid::new_v4()), Some("X7F2Q9")).await
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => winners += 1,
            Err(PairingError::AlreadyUsed) => (),
            Err(e) => panic!("Unexpected error {e:?}"),
        }
    }
    assert_eq!(winners, 1);

    let (members,): (Vec<Uuid>,) =
        sqlx::query_as("SELECT members FROM couples WHERE id = $1")
            .bind(COUPLE_ID)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(members.len(), 2);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn issued_invite_round_trips(pool: PgPool) {
    let store = PgStore::new(pool);
    let links = InviteLinks::new(tools::ORIGIN);

    let issued = issue_invite(
        &store,
        &RandomCodes,
        &links,
        Some(OWNER_ID),
        "Ada",
        None,
        None,
    )
    .await
    .unwrap();
    let again = issue_invite(
        &store,
        &RandomCodes,
        &links,
        Some(OWNER_ID),
        "Ada",
        None,
        Some(issued.code.as_str()),
    )
    .await
    .unwrap();
    assert_eq!(issued.code, again.code);

    let preview = preview_invite(&store, issued.code.as_str()).await.unwrap();
    assert_eq!(preview.owner_name, "Ada");

    redeem_invite(&store, Some(PARTNER_ID), Some(issued.code.as_str()))
        .await
        .unwrap();
    assert_eq!(
        fetch_couple(&store, OWNER_ID).await.unwrap(),
        fetch_couple(&store, PARTNER_ID).await.unwrap()
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_onboarding_creates_one_couple(pool: PgPool) {
    let store = Arc::new(PgStore::new(pool.clone()));
    let newcomer = Uuid::new_v4();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { create_couple(store.as_ref(), newcomer).await })
        })
        .collect();

    let mut ids = vec![];
    for task in tasks {
        ids.push(task.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let (owned,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM couples WHERE owner_uid = $1")
        .bind(newcomer)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(owned, 1);
}

#[sqlx::test(fixtures("couples"))]
#[ignore = "requires DATABASE_URL"]
async fn paired_user_cannot_join_second_couple(pool: PgPool) {
    let store = PgStore::new(pool.clone());
    let links = InviteLinks::new(tools::ORIGIN);
    redeem_invite(&store, Some(PARTNER_ID), Some("X7F2Q9"))
        .await
        .unwrap();
    let foreign = issue_invite(
        &store,
        &RandomCodes,
        &links,
        Some(STRANGER_ID),
        "Grace",
        None,
        None,
    )
    .await
    .unwrap();

    let res = redeem_invite(&store, Some(PARTNER_ID), Some(foreign.code.as_str())).await;

    assert!(matches!(res, Err(PairingError::AlreadyPaired)));
    assert_eq!(fetch_couple(&store, PARTNER_ID).await.unwrap().id, COUPLE_ID);
    assert_eq!(
        fetch_couple(&store, STRANGER_ID).await.unwrap().members,
        vec![STRANGER_ID]
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn regenerating_revokes_earlier_invite(pool: PgPool) {
    let store = PgStore::new(pool);
    let links = InviteLinks::new(tools::ORIGIN);

    let first = issue_invite(&store, &RandomCodes, &links, Some(OWNER_ID), "Ada", None, None)
        .await
        .unwrap();
    let second = issue_invite(&store, &RandomCodes, &links, Some(OWNER_ID), "Ada", None, None)
        .await
        .unwrap();

    assert_ne!(first.code, second.code);
    assert!(matches!(
        preview_invite(&store, first.code.as_str()).await,
        Err(PairingError::NotFound)
    ));
    assert!(matches!(
        redeem_invite(&store, Some(PARTNER_ID), Some(first.code.as_str())).await,
        Err(PairingError::NotFound)
    ));
    redeem_invite(&store, Some(PARTNER_ID), Some(second.code.as_str()))
        .await
        .unwrap();
}

#[sqlx::test(fixtures("couples"))]
#[ignore = "requires DATABASE_URL"]
async fn preview_does_not_wait_for_redeem_lock(pool: PgPool) {
    let store = PgStore::new(pool);
    let mut redeeming = store.begin().await.unwrap();
    let locked = redeeming
        .get_invite(&tools::code("X7F2Q9"))
        .await
        .unwrap();
    assert!(locked.is_some());

    let preview = tokio::time::timeout(Duration::from_secs(2), preview_invite(&store, "X7F2Q9"))
        .await
        .expect("preview blocked on the invite row lock")
        .unwrap();

    assert_eq!(preview.owner_name, "Ada");
    drop(redeeming);
}
