//! Activity rows for both owner kinds.
//!
//! Project and CampShare activities live in sibling tables with the same
//! shape; the owner column is exposed as `owner_id` on read.

use sqlx::SqlitePool;

use crate::errors::{OracleError, Result};
use crate::models::{Activity, ActivityStatus, ActivityType, OwnerKind};

fn table(kind: OwnerKind) -> (&'static str, &'static str) {
    match kind {
        OwnerKind::Project => ("project_activities", "project_id"),
        OwnerKind::CampShare => ("campshare_activities", "cs_id"),
    }
}

fn columns(owner_col: &str) -> String {
    format!(
        "id, {owner_col} AS owner_id, created_at, modified_at, transaction_hash, status, \
         activity_type"
    )
}

pub async fn insert_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    owner_id: i64,
    activity_type: ActivityType,
    now: i64,
) -> Result<Activity> {
    let (table, owner_col) = table(kind);
    let sql = format!(
        "INSERT INTO {table} ({owner_col}, created_at, modified_at, status, activity_type) \
         VALUES (?1, ?2, ?2, ?3, ?4) RETURNING {}",
        columns(owner_col)
    );
    let row = sqlx::query_as::<_, Activity>(&sql)
        .bind(owner_id)
        .bind(now)
        .bind(ActivityStatus::Pending)
        .bind(activity_type)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn find_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    id: i64,
) -> Result<Option<Activity>> {
    let (table, owner_col) = table(kind);
    let sql = format!("SELECT {} FROM {table} WHERE id = ?1", columns(owner_col));
    let row = sqlx::query_as::<_, Activity>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Record the transaction hash as soon as a callback names it.
pub async fn stamp_hash(
    pool: &SqlitePool,
    kind: OwnerKind,
    id: i64,
    hash: &str,
    now: i64,
) -> Result<()> {
    let (table, _) = table(kind);
    let sql = format!("UPDATE {table} SET transaction_hash = ?1, modified_at = ?2 WHERE id = ?3");
    sqlx::query(&sql)
        .bind(hash)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Move a Pending activity to its terminal `status`.
///
/// Only Pending rows match, so an activity resolves at most once; anything
/// else is `NotFound`.
pub async fn resolve_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    id: i64,
    hash: Option<&str>,
    status: ActivityStatus,
    now: i64,
) -> Result<Activity> {
    let (table, owner_col) = table(kind);
    let sql = format!(
        "UPDATE {table} \
         SET status = ?1, transaction_hash = COALESCE(?2, transaction_hash), modified_at = ?3 \
         WHERE id = ?4 AND status = ?5 \
         RETURNING {}",
        columns(owner_col)
    );
    sqlx::query_as::<_, Activity>(&sql)
        .bind(status)
        .bind(hash)
        .bind(now)
        .bind(id)
        .bind(ActivityStatus::Pending)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| OracleError::NotFound(format!("pending {} activity {id}", kind.as_str())))
}

pub async fn activities_for_owner(
    pool: &SqlitePool,
    kind: OwnerKind,
    owner_id: i64,
) -> Result<Vec<Activity>> {
    let (table, owner_col) = table(kind);
    let sql = format!(
        "SELECT {} FROM {table} WHERE {owner_col} = ?1 ORDER BY id ASC",
        columns(owner_col)
    );
    let rows = sqlx::query_as::<_, Activity>(&sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Whether the owner has an activity of this type, optionally only Pending ones.
pub async fn has_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    owner_id: i64,
    activity_type: ActivityType,
    pending_only: bool,
) -> Result<bool> {
    let (table, owner_col) = table(kind);
    let mut sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE {owner_col} = ?1 AND activity_type = ?2"
    );
    if pending_only {
        sql.push_str(&format!(" AND status = {}", ActivityStatus::Pending as i32));
    }
    sql.push(')');
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(owner_id)
        .bind(activity_type)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Whether an activity of this type is still in flight or already
/// succeeded. Failed attempts do not count.
pub async fn has_live_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    owner_id: i64,
    activity_type: ActivityType,
) -> Result<bool> {
    let (table, owner_col) = table(kind);
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE {owner_col} = ?1 AND activity_type = ?2 \
         AND status IN ({}, {}))",
        ActivityStatus::Pending as i32,
        ActivityStatus::Success as i32,
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(owner_id)
        .bind(activity_type)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Pending activities created before `created_before` (Unix seconds).
pub async fn stalled_activities(
    pool: &SqlitePool,
    kind: OwnerKind,
    created_before: i64,
) -> Result<Vec<Activity>> {
    let (table, owner_col) = table(kind);
    let sql = format!(
        "SELECT {} FROM {table} WHERE status = ?1 AND created_at < ?2 ORDER BY created_at ASC",
        columns(owner_col)
    );
    let rows = sqlx::query_as::<_, Activity>(&sql)
        .bind(ActivityStatus::Pending)
        .bind(created_before)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
