//! Activity ledger: one row per dispatched unit of work.
//!
//! An activity is created Pending by [`begin_activity`] and resolved exactly
//! once by [`resolve_activity`]. Nothing is ever re-dispatched from here.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{activities, campshares, projects};
use crate::errors::{OracleError, Result};
use crate::models::{unix_now, Activity, ActivityStatus, ActivityType, OwnerKind};

/// Insert a Pending activity for an owner that must already exist.
pub async fn begin_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    owner_id: i64,
    activity_type: ActivityType,
) -> Result<Activity> {
    let exists = match kind {
        OwnerKind::Project => projects::find_project(pool, owner_id).await?.is_some(),
        OwnerKind::CampShare => match campshares::get_campshare(pool, owner_id).await {
            Ok(_) => true,
            Err(OracleError::NotFound(_)) => false,
            Err(e) => return Err(e),
        },
    };
    if !exists {
        warn!(
            owner = kind.as_str(),
            owner_id,
            activity_type = %activity_type,
            "Cannot begin activity for unknown owner"
        );
        return Err(OracleError::Persistence(sqlx::Error::RowNotFound));
    }

    let activity =
        activities::insert_activity(pool, kind, owner_id, activity_type, unix_now()).await?;
    info!(
        owner = kind.as_str(),
        owner_id,
        activity_id = activity.id,
        activity_type = %activity_type,
        "Activity started"
    );
    Ok(activity)
}

/// Stamp the hash and terminal status on a Pending activity.
pub async fn resolve_activity(
    pool: &SqlitePool,
    kind: OwnerKind,
    activity_id: i64,
    hash: Option<&str>,
    status: ActivityStatus,
) -> Result<Activity> {
    let activity =
        activities::resolve_activity(pool, kind, activity_id, hash, status, unix_now()).await?;
    info!(
        owner = kind.as_str(),
        owner_id = activity.owner_id,
        activity_id,
        activity_type = %activity.activity_type,
        status = ?status,
        "Activity resolved"
    );
    Ok(activity)
}

pub async fn stamp_hash(
    pool: &SqlitePool,
    kind: OwnerKind,
    activity_id: i64,
    hash: &str,
) -> Result<()> {
    activities::stamp_hash(pool, kind, activity_id, hash, unix_now()).await
}
