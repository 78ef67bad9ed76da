//! Integration tests for batch reconciliation.

mod common;

use std::collections::BTreeMap;

use ballot::{BallotError, EntityRef, SummaryRead};
use ballot_shared::types::{
    BatchBallot, EntityHandle, EntityKey, Scope, VotableSet, VoteQuery,
};
use common::{fixture, fixture_with_locator, post, user};

fn posts(ids: &[i64]) -> VotableSet {
    VotableSet::Entities(ids.iter().map(|id| EntityHandle::new("Post", *id)).collect())
}

#[tokio::test]
async fn test_overlapping_sets_fail_without_writes() {
    let f = fixture();
    let batch = BatchBallot {
        up: posts(&[10]),
        down: VotableSet::ByType(BTreeMap::from([("Post".to_string(), vec![10])])),
        ..Default::default()
    };

    let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("Post#10"));
    assert_eq!(outcome.up, None);
    assert!(f.store.votes().await.is_empty());
}

#[tokio::test]
async fn test_overlap_is_detected_after_canonicalization() {
    let f = fixture();
    let batch = BatchBallot {
        up: VotableSet::Pairs(vec![BTreeMap::from([("Article".to_string(), 12)])]),
        remove: posts(&[12]),
        ..Default::default()
    };

    let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();
    assert!(!outcome.success);
    assert!(f.store.votes().await.is_empty());
}

#[tokio::test]
async fn test_batch_applies_remove_down_up() {
    let f = fixture();
    let ledger = f.ballot.ledger();
    ledger.cast_up(&user(1), &post(10), Scope::unscoped()).await.unwrap();
    ledger.cast_up(&user(1), &post(11), Scope::unscoped()).await.unwrap();

    let batch = BatchBallot {
        up: VotableSet::Pairs(vec![
            BTreeMap::from([("Article".to_string(), 12)]),
            BTreeMap::from([("Comment".to_string(), 20)]),
        ]),
        down: posts(&[11]),
        remove: posts(&[10]),
        ..Default::default()
    };
    let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.remove, Some(1));
    assert_eq!(outcome.down, Some(1));
    assert_eq!(outcome.up, Some(2));

    let votes = ledger.votes_by_voter(&user(1), &VoteQuery::default()).await.unwrap();
    let summary: Vec<(EntityKey, bool)> = votes.into_iter().map(|v| (v.votable, v.flag)).collect();
    assert_eq!(
        summary,
        vec![
            (EntityKey::new("Post", 11), false),
            (EntityKey::new("Post", 12), true),
            (EntityKey::new("Comment", 20), true),
        ]
    );

    let post_10 = f.ballot.summary(&post(10), &Scope::unscoped(), SummaryRead::Cached).await.unwrap();
    let post_11 = f.ballot.summary(&post(11), &Scope::unscoped(), SummaryRead::Cached).await.unwrap();
    let post_12 = f.ballot.summary(&post(12), &Scope::unscoped(), SummaryRead::Cached).await.unwrap();
    assert_eq!(post_10.total, 0);
    assert_eq!((post_11.down, post_11.score), (1, -1));
    assert_eq!(post_12.up, 1);
}

#[tokio::test]
async fn test_repeated_batch_counts_only_changes() {
    let f = fixture();
    let batch = BatchBallot {
        up: posts(&[10, 11, 10]),
        weight: 2,
        ..Default::default()
    };

    let first = f.ballot.reconcile(&user(1), &batch).await.unwrap();
    let second = f.ballot.reconcile(&user(1), &batch).await.unwrap();

    assert_eq!(first.up, Some(2));
    assert_eq!(second.up, Some(0));
    assert_eq!(second.remove, Some(0));
    assert_eq!(f.store.votes().await.len(), 2);
    assert!(f.store.votes().await.iter().all(|vote| vote.weight == 2));

    // Removing something that holds no vote succeeds and counts nothing.
    let remove = BatchBallot {
        remove: posts(&[12]),
        ..Default::default()
    };
    let outcome = f.ballot.reconcile(&user(1), &remove).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.remove, Some(0));
}

#[tokio::test]
async fn test_batch_from_json() {
    let f = fixture();
    let batch: BatchBallot = serde_json::from_value(serde_json::json!({
        "up": {"Post": [10, 11]},
        "down": [{"Comment": 20}],
        "scope": "rank",
        "weight": 3
    }))
    .unwrap();

    let outcome = f.ballot.reconcile(&user(2), &batch).await.unwrap();
    assert_eq!((outcome.up, outcome.down, outcome.remove), (Some(2), Some(1), Some(0)));

    let ranked = f.ballot.summary(&post(10), &Scope::named("rank"), SummaryRead::Cached).await.unwrap();
    assert_eq!(ranked.weighted_total, 3);
    let unscoped = f.ballot.summary(&post(10), &Scope::unscoped(), SummaryRead::Cached).await.unwrap();
    assert_eq!(unscoped.total, 0);
}

#[tokio::test]
async fn test_invalid_batches_fail_without_writes() {
    let f = fixture();

    let zero_weight = BatchBallot {
        up: posts(&[10]),
        weight: 0,
        ..Default::default()
    };
    let two_keys = BatchBallot {
        up: VotableSet::Pairs(vec![BTreeMap::from([
            ("Post".to_string(), 10),
            ("Comment".to_string(), 20),
        ])]),
        ..Default::default()
    };
    let unresolvable = BatchBallot {
        up: posts(&[10]),
        down: VotableSet::ByType(BTreeMap::from([("Post".to_string(), vec![404])])),
        ..Default::default()
    };
    let not_votable = BatchBallot {
        up: VotableSet::Pairs(vec![BTreeMap::from([("Draft".to_string(), 30)])]),
        ..Default::default()
    };

    for batch in [zero_weight, two_keys, unresolvable, not_votable] {
        let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();
        assert!(!outcome.success, "{batch:?} should fail");
        assert!(outcome.error.is_some());
    }
    assert!(f.store.votes().await.is_empty());

    let outcome = f
        .ballot
        .reconcile(&post(10), &BatchBallot { up: posts(&[11]), ..Default::default() })
        .await
        .unwrap();
    assert!(!outcome.success);
}

#[tokio::test]
async fn test_by_type_entry_without_ids_fails_without_writes() {
    let f = fixture_with_locator();
    let batch: BatchBallot = serde_json::from_value(serde_json::json!({
        "up": {"Post": [11], "gid://app/Post/10": []}
    }))
    .unwrap();
    assert!(matches!(batch.up, VotableSet::ByType(_)));

    let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("gid://app/Post/10"));
    assert!(f.store.votes().await.is_empty());
}

#[tokio::test]
async fn test_batch_writes_votables_in_key_order() {
    let f = fixture();
    let batch = BatchBallot {
        up: VotableSet::Pairs(vec![
            BTreeMap::from([("Comment".to_string(), 20)]),
            BTreeMap::from([("Post".to_string(), 11)]),
            BTreeMap::from([("Post".to_string(), 10)]),
        ]),
        ..Default::default()
    };

    let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();
    assert_eq!(outcome.up, Some(3));

    let written: Vec<EntityKey> = f.store.votes().await.into_iter().map(|v| v.votable).collect();
    assert_eq!(
        written,
        vec![
            EntityKey::new("Post", 10),
            EntityKey::new("Post", 11),
            EntityKey::new("Comment", 20),
        ]
    );
}

#[tokio::test]
async fn test_failed_write_rolls_back_whole_batch() {
    let f = fixture();
    f.store.reject_writes_for(EntityKey::new("Post", 11)).await;

    let batch = BatchBallot {
        up: posts(&[10, 11]),
        ..Default::default()
    };
    let outcome = f.ballot.reconcile(&user(1), &batch).await.unwrap();

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("rejected"));
    assert!(f.store.votes().await.is_empty());
    let cached = f.ballot.summaries().cached_summary(&post(10)).await.unwrap().unwrap();
    assert!(cached.is_empty());
}

#[tokio::test]
async fn test_located_references() {
    let f = fixture();
    let batch = BatchBallot {
        up: VotableSet::Located(BTreeMap::from([(
            "gid://app/Post/10".to_string(),
            BTreeMap::new(),
        )])),
        ..Default::default()
    };
    let result = f.ballot.reconcile(&user(1), &batch).await;
    assert!(matches!(result, Err(BallotError::LocatorNotConfigured)));

    let f = fixture_with_locator();
    let outcome = f
        .ballot
        .reconcile(&EntityRef::located("gid://app/User/3"), &batch)
        .await
        .unwrap();
    assert_eq!(outcome.up, Some(1));
    assert!(
        f.ballot
            .ledger()
            .has_up_vote(&user(3), &post(10), &Scope::unscoped())
            .await
            .unwrap()
    );
}
