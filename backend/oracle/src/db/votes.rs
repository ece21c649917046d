//! Vote rows.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::errors::Result;
use crate::models::{Vote, VoteType};

const COLUMNS: &str =
    "vote_id, contract_address, vote_time, user_id, project_id, vote_type, confirmed, parameters";

/// Insert a vote and return its store-assigned id. `vote.vote_id` is ignored.
pub async fn insert_vote(pool: &SqlitePool, vote: &Vote) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO votes
            (contract_address, vote_time, user_id, project_id, vote_type, confirmed, parameters)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&vote.contract_address)
    .bind(vote.vote_time)
    .bind(vote.user_id)
    .bind(vote.project_id)
    .bind(vote.vote_type)
    .bind(vote.confirmed)
    .bind(Json(&vote.parameters))
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn votes_for_project(
    pool: &SqlitePool,
    project_id: i64,
    vote_type: VoteType,
) -> Result<Vec<Vote>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM votes WHERE project_id = ?1 AND vote_type = ?2 ORDER BY vote_id ASC"
    );
    let rows = sqlx::query_as::<_, Vote>(&sql)
        .bind(project_id)
        .bind(vote_type)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Number of distinct voters, optionally only those confirmed on-chain.
pub async fn count_votes(
    pool: &SqlitePool,
    project_id: i64,
    vote_type: VoteType,
    confirmed_only: bool,
) -> Result<i64> {
    let mut sql = String::from(
        "SELECT COUNT(DISTINCT user_id) FROM votes WHERE project_id = ?1 AND vote_type = ?2",
    );
    if confirmed_only {
        sql.push_str(" AND confirmed = 1");
    }
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(project_id)
        .bind(vote_type)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Mark the newest unconfirmed vote of `user_id` as confirmed on-chain.
/// Returns `false` when there was no such row.
pub async fn confirm_vote(
    pool: &SqlitePool,
    project_id: i64,
    user_id: i64,
    vote_type: VoteType,
    contract_address: &str,
) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        UPDATE votes
        SET    confirmed = 1, contract_address = ?1
        WHERE  vote_id = (
            SELECT vote_id FROM votes
            WHERE  project_id = ?2 AND user_id = ?3 AND vote_type = ?4 AND confirmed = 0
            ORDER  BY vote_id DESC
            LIMIT  1
        )
        "#,
    )
    .bind(contract_address)
    .bind(project_id)
    .bind(user_id)
    .bind(vote_type)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}
