use async_trait::async_trait;
use ballot_shared::types::{
    EntityId, EntityKey, NewVote, Scope, ScopeFilter, SummaryLocation, Vote, VoteFilter, VoteId,
    VoteOrder, VoteSummary, VoteTally, Weight,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::types::Json;
use sqlx::{Executor, QueryBuilder};

use crate::{VoteStore, VoteStoreError, VoteTransaction};

const VOTE_COLUMNS: &str =
    "id, votable_id, votable_type, voter_id, voter_type, vote, weight, scope, created_at, updated_at";

/// A row of `ballot_votes`.
#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    id: i64,
    votable_id: i64,
    votable_type: String,
    voter_id: i64,
    voter_type: String,
    vote: bool,
    weight: i64,
    scope: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VoteRow> for Vote {
    fn from(row: VoteRow) -> Self {
        Vote {
            id: row.id,
            votable: EntityKey::new(row.votable_type, row.votable_id),
            voter: EntityKey::new(row.voter_type, row.voter_id),
            flag: row.vote,
            weight: row.weight,
            scope: Scope::from(row.scope),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TallyRow {
    up: i64,
    down: i64,
    up_weight: i64,
    down_weight: i64,
}

impl From<TallyRow> for VoteTally {
    fn from(row: TallyRow) -> Self {
        VoteTally {
            up: row.up,
            down: row.down,
            up_weight: row.up_weight,
            down_weight: row.down_weight,
        }
    }
}

/// Appends the `WHERE` clause for `filter` to `query`.
fn push_conditions(query: &mut QueryBuilder<'_, Postgres>, filter: &VoteFilter) {
    query.push(" WHERE TRUE");

    if let Some(voter) = &filter.voter {
        query.push(" AND voter_id = ").push_bind(voter.id);
        query
            .push(" AND voter_type = ")
            .push_bind(voter.type_name.clone());
    }
    if let Some(voter_type) = &filter.voter_type {
        query.push(" AND voter_type = ").push_bind(voter_type.clone());
    }
    if let Some(votable) = &filter.votable {
        query.push(" AND votable_id = ").push_bind(votable.id);
        query
            .push(" AND votable_type = ")
            .push_bind(votable.type_name.clone());
    }
    if let Some(votable_type) = &filter.votable_type {
        query
            .push(" AND votable_type = ")
            .push_bind(votable_type.clone());
    }
    if let Some(votables) = &filter.votables {
        if votables.is_empty() {
            query.push(" AND FALSE");
        } else {
            let ids: Vec<i64> = votables.iter().map(|k| k.id).collect();
            let types: Vec<String> = votables.iter().map(|k| k.type_name.clone()).collect();
            query
                .push(" AND (votable_id, votable_type) IN (SELECT * FROM UNNEST(")
                .push_bind(ids)
                .push("::bigint[], ")
                .push_bind(types)
                .push("::text[]))");
        }
    }
    if let ScopeFilter::Only(scope) = &filter.scope {
        match scope.as_deref() {
            Some(name) => {
                query.push(" AND scope = ").push_bind(name.to_owned());
            }
            None => {
                query.push(" AND scope IS NULL");
            }
        }
    }
    if let Some(flag) = filter.flag {
        query.push(" AND vote = ").push_bind(flag);
    }
}

fn select_votes(filter: &VoteFilter, order: VoteOrder) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {VOTE_COLUMNS} FROM ballot_votes"));
    push_conditions(&mut query, filter);
    query.push(match order {
        VoteOrder::Insertion => " ORDER BY id ASC",
        VoteOrder::Latest => " ORDER BY updated_at DESC, created_at DESC, id DESC",
    });
    if let Some(limit) = filter.limit {
        query.push(" LIMIT ").push_bind(limit as i64);
    }
    query
}

fn select_tally(filter: &VoteFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE vote) AS up,
            COUNT(*) FILTER (WHERE NOT vote) AS down,
            COALESCE(SUM(weight) FILTER (WHERE vote), 0)::BIGINT AS up_weight,
            COALESCE(SUM(weight) FILTER (WHERE NOT vote), 0)::BIGINT AS down_weight
        FROM ballot_votes"#,
    );
    push_conditions(&mut query, filter);
    query
}

async fn fetch_votes<'e, E>(
    executor: E,
    filter: &VoteFilter,
    order: VoteOrder,
) -> Result<Vec<Vote>, VoteStoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut query = select_votes(filter, order);
    let rows = query.build_query_as::<VoteRow>().fetch_all(executor).await?;
    Ok(rows.into_iter().map(Vote::from).collect())
}

async fn fetch_tally<'e, E>(executor: E, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut query = select_tally(filter);
    let row = query.build_query_as::<TallyRow>().fetch_one(executor).await?;
    Ok(row.into())
}

/// Validates a host identifier and returns it double-quoted.
///
/// Summary locations come from registration, but they are still spliced into
/// SQL text, so anything other than a plain identifier is refused.
fn quote_identifier(name: &str) -> Result<String, VoteStoreError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(VoteStoreError::InvalidIdentifier(name.to_owned()))
    }
}

fn summary_select_sql(location: &SummaryLocation, lock: bool) -> Result<String, VoteStoreError> {
    Ok(format!(
        "SELECT {} FROM {} WHERE {} = $1{}",
        quote_identifier(&location.column)?,
        quote_identifier(&location.table)?,
        quote_identifier(&location.key_column)?,
        if lock { " FOR UPDATE" } else { "" },
    ))
}

async fn fetch_summary<'e, E>(
    executor: E,
    location: &SummaryLocation,
    id: EntityId,
    lock: bool,
) -> Result<Option<VoteSummary>, VoteStoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = summary_select_sql(location, lock)?;
    let row: Option<(Option<Json<VoteSummary>>,)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|(summary,)| summary.map(|json| json.0).unwrap_or_default()))
}

/// PostgreSQL implementation of the vote store.
///
/// Holds a connection pool; each transaction checks out one connection for
/// its lifetime.
pub struct PostgresVoteStore {
    pool: sqlx::PgPool,
}

impl PostgresVoteStore {
    /// Creates a new PostgreSQL store instance.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresVoteStore)` - Ready-to-use store (run [`migrate`](Self::migrate) first on a fresh database)
    /// * `Err(VoteStoreError)` - Future validation errors (currently always succeeds)
    pub async fn new(pool: sqlx::PgPool) -> Result<Self, VoteStoreError> {
        Ok(Self { pool })
    }

    /// Connects a new pool to `database_url` and wraps it in a store.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, VoteStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Self::new(pool).await
    }

    /// Applies the embedded `ballot_votes` migrations.
    pub async fn migrate(&self) -> Result<(), VoteStoreError> {
        sqlx::migrate!("src/postgres/migrations")
            .run(&self.pool)
            .await?;
        tracing::info!("ballot_votes migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait]
impl VoteStore for PostgresVoteStore {
    async fn begin(&self) -> Result<Box<dyn VoteTransaction>, VoteStoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresVoteTransaction { tx }))
    }

    async fn find_votes(
        &self,
        filter: &VoteFilter,
        order: VoteOrder,
    ) -> Result<Vec<Vote>, VoteStoreError> {
        fetch_votes(&self.pool, filter, order).await
    }

    async fn vote_exists(&self, filter: &VoteFilter) -> Result<bool, VoteStoreError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT EXISTS(SELECT 1 FROM ballot_votes");
        push_conditions(&mut query, filter);
        query.push(")");
        let exists = query
            .build_query_scalar::<bool>()
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn tally(&self, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError> {
        fetch_tally(&self.pool, filter).await
    }

    async fn read_summary(
        &self,
        location: &SummaryLocation,
        id: EntityId,
    ) -> Result<Option<VoteSummary>, VoteStoreError> {
        fetch_summary(&self.pool, location, id, false).await
    }

    /// Checks whether the `ballot_votes` table exists.
    async fn check_schema(&self) -> Result<bool, VoteStoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_name = $1)
            "#,
        )
        .bind("ballot_votes")
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

/// A PostgreSQL transaction over `ballot_votes` and the registered summary
/// columns. Dropping it without [`commit`](VoteTransaction::commit) rolls back.
pub struct PostgresVoteTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl VoteTransaction for PostgresVoteTransaction {
    async fn find_votes(
        &mut self,
        filter: &VoteFilter,
        order: VoteOrder,
    ) -> Result<Vec<Vote>, VoteStoreError> {
        fetch_votes(&mut *self.tx, filter, order).await
    }

    async fn insert_vote(&mut self, vote: &NewVote) -> Result<Vote, VoteStoreError> {
        let sql = format!(
            r#"
            INSERT INTO ballot_votes (votable_id, votable_type, voter_id, voter_type, vote, weight, scope)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VOTE_COLUMNS}
            "#
        );
        let row: VoteRow = sqlx::query_as(&sql)
            .bind(vote.votable.id)
            .bind(&vote.votable.type_name)
            .bind(vote.voter.id)
            .bind(&vote.voter.type_name)
            .bind(vote.flag)
            .bind(vote.weight.get())
            .bind(vote.scope.as_deref())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row.into())
    }

    async fn update_vote(
        &mut self,
        id: VoteId,
        flag: bool,
        weight: Weight,
    ) -> Result<Vote, VoteStoreError> {
        let sql = format!(
            r#"
            UPDATE ballot_votes
            SET vote = $2, weight = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {VOTE_COLUMNS}
            "#
        );
        let row: Option<VoteRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(flag)
            .bind(weight.get())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Vote::from).ok_or(VoteStoreError::VoteNotFound(id))
    }

    async fn delete_votes(&mut self, filter: &VoteFilter) -> Result<u64, VoteStoreError> {
        let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ballot_votes");
        push_conditions(&mut query, filter);
        let result = query.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn tally(&mut self, filter: &VoteFilter) -> Result<VoteTally, VoteStoreError> {
        fetch_tally(&mut *self.tx, filter).await
    }

    async fn lock_summary(
        &mut self,
        location: &SummaryLocation,
        id: EntityId,
    ) -> Result<Option<VoteSummary>, VoteStoreError> {
        fetch_summary(&mut *self.tx, location, id, true).await
    }

    async fn write_summary(
        &mut self,
        location: &SummaryLocation,
        id: EntityId,
        summary: &VoteSummary,
    ) -> Result<(), VoteStoreError> {
        let sql = format!(
            "UPDATE {} SET {} = $1 WHERE {} = $2",
            quote_identifier(&location.table)?,
            quote_identifier(&location.column)?,
            quote_identifier(&location.key_column)?,
        );
        sqlx::query(&sql)
            .bind(Json(summary))
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), VoteStoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), VoteStoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
