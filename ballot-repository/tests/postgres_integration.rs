//! Integration tests for the PostgreSQL vote store.
//!
//! These tests require a real PostgreSQL database and use SQLx test macros
//! to ensure proper test isolation and cleanup.
//!
//! Run with: `cargo test --test postgres_integration`

use ballot_repository::{PostgresVoteStore, VoteStore, VoteStoreError};
use ballot_shared::types::{
    EntityKey, NewVote, Scope, ScopeSummary, SummaryLocation, VoteFilter, VoteOrder, VoteSummary,
    VoteTally, Weight,
};
use sqlx::Row;

fn make_vote(votable_id: i64, voter_id: i64, flag: bool, scope: Scope) -> NewVote {
    NewVote {
        votable: EntityKey::new("Post", votable_id),
        voter: EntityKey::new("User", voter_id),
        flag,
        weight: Weight::DEFAULT,
        scope,
    }
}

/// Creates a host table carrying a summary column, as an application would.
async fn create_posts_table(pool: &sqlx::PgPool) {
    sqlx::query(
        r#"
        CREATE TABLE posts (
            id BIGINT PRIMARY KEY,
            cached_ballot_summary JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO posts (id) VALUES (10), (11)")
        .execute(pool)
        .await
        .unwrap();
}

// ============================================================================
// Vote Tests
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_schema_is_created(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool).await.unwrap();
    assert!(store.check_schema().await.unwrap());
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_insert_and_find_votes(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool.clone()).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let first = tx
        .insert_vote(&make_vote(10, 1, true, Scope::unscoped()))
        .await
        .unwrap();
    tx.insert_vote(&make_vote(10, 1, false, Scope::named("rank")))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(first.id > 0);
    assert_eq!(first.weight, 1);

    let unscoped = store
        .find_votes(
            &VoteFilter::new()
                .voter(&EntityKey::new("User", 1))
                .scope(Scope::unscoped()),
            VoteOrder::Insertion,
        )
        .await
        .unwrap();
    assert_eq!(unscoped.len(), 1);
    assert!(unscoped[0].flag);

    let rows = sqlx::query("SELECT scope FROM ballot_votes ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows[0].get::<Option<String>, _>("scope"), None);
    assert_eq!(
        rows[1].get::<Option<String>, _>("scope"),
        Some("rank".to_string())
    );
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_rollback_discards_votes(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_vote(&make_vote(10, 1, true, Scope::unscoped()))
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(!store.vote_exists(&VoteFilter::new()).await.unwrap());
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_update_delete_and_tally(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let vote = tx
        .insert_vote(&make_vote(10, 1, true, Scope::unscoped()))
        .await
        .unwrap();
    tx.insert_vote(&make_vote(10, 2, true, Scope::unscoped()))
        .await
        .unwrap();
    tx.insert_vote(&make_vote(11, 2, true, Scope::unscoped()))
        .await
        .unwrap();
    let updated = tx
        .update_vote(vote.id, false, Weight::new(3).unwrap())
        .await
        .unwrap();
    assert!(!updated.flag);
    assert_eq!(updated.weight, 3);

    let missing = tx.update_vote(vote.id + 1000, true, Weight::DEFAULT).await;
    assert!(matches!(missing, Err(VoteStoreError::VoteNotFound(_))));
    tx.commit().await.unwrap();

    let filter = VoteFilter::new().votable(&EntityKey::new("Post", 10));
    let tally = store.tally(&filter).await.unwrap();
    assert_eq!(
        tally,
        VoteTally {
            up: 1,
            down: 1,
            up_weight: 1,
            down_weight: 3
        }
    );

    let batch = VoteFilter::new().votables(vec![
        EntityKey::new("Post", 10),
        EntityKey::new("Post", 11),
    ]);
    let mut tx = store.begin().await.unwrap();
    let deleted = tx
        .delete_votes(&batch.clone().voter(&EntityKey::new("User", 2)))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(store.tally(&batch).await.unwrap().down, 1);
}

/// Records a vote and refreshes the votable's summary the way the engine does:
/// write, lock the host row, tally, merge, write back.
async fn cast_and_recompute(
    store: &PostgresVoteStore,
    location: &SummaryLocation,
    vote: NewVote,
) -> Result<(), VoteStoreError> {
    let mut tx = store.begin().await?;
    tx.insert_vote(&vote).await?;
    let mut summary = tx
        .lock_summary(location, vote.votable.id)
        .await?
        .unwrap_or_default();
    let filter = VoteFilter::new()
        .votable(&vote.votable)
        .scope(vote.scope.clone());
    let tally = tx.tally(&filter).await?;
    summary.merge(&vote.scope, ScopeSummary::from(tally));
    tx.write_summary(location, vote.votable.id, &summary).await?;
    tx.commit().await
}

// ============================================================================
// Summary Tests
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_summary_round_trip(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool).await.unwrap();
    create_posts_table(store.pool()).await;
    let location = SummaryLocation::new("posts");

    assert_eq!(
        store.read_summary(&location, 10).await.unwrap(),
        Some(VoteSummary::new())
    );
    assert_eq!(store.read_summary(&location, 99).await.unwrap(), None);

    let mut summary = VoteSummary::new();
    summary.merge(
        &Scope::unscoped(),
        ScopeSummary {
            total: 2,
            up: 1,
            down: 1,
            score: 0,
            weighted_total: 5,
            weighted_score: 3,
        },
    );

    let mut tx = store.begin().await.unwrap();
    assert!(tx.lock_summary(&location, 10).await.unwrap().is_some());
    tx.write_summary(&location, 10, &summary).await.unwrap();
    tx.commit().await.unwrap();

    let stored = store.read_summary(&location, 10).await.unwrap().unwrap();
    assert_eq!(stored.get(&Scope::unscoped()).weighted_total, 5);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_summary_rejects_unsafe_identifiers(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool).await.unwrap();
    let location = SummaryLocation::new("posts; DROP TABLE ballot_votes");

    let result = store.read_summary(&location, 1).await;
    assert!(matches!(result, Err(VoteStoreError::InvalidIdentifier(_))));
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_summary_honours_custom_columns(pool: sqlx::PgPool) {
    sqlx::query(
        r#"
        CREATE TABLE articles (
            article_id BIGINT PRIMARY KEY,
            ballot_summary JSONB NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO articles (article_id) VALUES (7)")
        .execute(&pool)
        .await
        .unwrap();

    let store = PostgresVoteStore::new(pool).await.unwrap();
    let location = SummaryLocation::new("articles")
        .with_key_column("article_id")
        .with_column("ballot_summary");
    cast_and_recompute(&store, &location, make_vote(7, 1, false, Scope::named("rank")))
        .await
        .unwrap();

    let stored = store.read_summary(&location, 7).await.unwrap().unwrap();
    assert_eq!(stored.get(&Scope::named("rank")).down, 1);
    assert!(!stored.contains(&Scope::unscoped()));
}

#[sqlx::test(migrations = "src/postgres/migrations")]
async fn test_concurrent_recomputes_serialize_on_row_lock(pool: sqlx::PgPool) {
    let store = PostgresVoteStore::new(pool).await.unwrap();
    create_posts_table(store.pool()).await;
    let location = SummaryLocation::new("posts");

    let (first, second) = tokio::join!(
        cast_and_recompute(&store, &location, make_vote(10, 1, true, Scope::unscoped())),
        cast_and_recompute(&store, &location, make_vote(10, 2, false, Scope::unscoped())),
    );
    first.unwrap();
    second.unwrap();

    let stored = store.read_summary(&location, 10).await.unwrap().unwrap();
    let summary = stored.get(&Scope::unscoped());
    assert_eq!((summary.total, summary.up, summary.down), (2, 1, 1));

    let live = store
        .tally(&VoteFilter::new().votable(&EntityKey::new("Post", 10)))
        .await
        .unwrap();
    assert_eq!(summary, ScopeSummary::from(live));
}
