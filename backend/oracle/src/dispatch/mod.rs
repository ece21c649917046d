//! Workflow step dispatch.
//!
//! Each action checks its preconditions, applies its local effect, opens a
//! Pending activity and hands the transaction to the Relayer. The caller
//! gets [`Accepted`] as soon as the Relayer took the request; the outcome
//! arrives later through a callback. A request the Relayer refuses resolves
//! the activity as `InitialError` right away.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::Result;
use crate::ledger;
use crate::models::{lenient, ActivityStatus, ActivityType, OwnerKind};
use crate::oracle::Oracle;
use crate::relayer::RelayerRequest;
use crate::saga::Continuation;

mod campshare;
mod project;
mod votes;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accepted {
    pub msg: String,
    pub activity_id: i64,
}

/// A single dispatch target.
pub(crate) struct Step {
    pub kind: OwnerKind,
    /// Owner of the activity row (project id or cs_id).
    pub owner_id: i64,
    /// Id used in the callback URL (project id or user id).
    pub callback_id: i64,
    pub activity_type: ActivityType,
    pub path: String,
    pub fields: Map<String, Value>,
}

impl Oracle {
    pub(crate) async fn dispatch_step(&self, step: Step) -> Result<Accepted> {
        let activity =
            ledger::begin_activity(&self.pool, step.kind, step.owner_id, step.activity_type).await?;

        let request = RelayerRequest {
            path: step.path,
            transaction_type: step.activity_type,
            activity_id: activity.id,
            url_callback: self.callback_url(step.kind, step.callback_id, step.activity_type),
            fields: step.fields,
        };
        if let Err(e) = self.relayer.dispatch(&request).await {
            warn!(
                activity_id = activity.id,
                activity_type = %step.activity_type,
                "Dispatch failed: {e}"
            );
            // Nothing reached the chain, so the step may be tried again.
            ledger::resolve_activity(
                &self.pool,
                step.kind,
                activity.id,
                None,
                ActivityStatus::InitialError,
            )
            .await?;
            return Err(e);
        }

        Ok(Accepted {
            msg: format!("{} accepted", step.activity_type),
            activity_id: activity.id,
        })
    }

    /// Run a follow-up requested by a completion handler.
    pub async fn run_continuation(&self, continuation: &Continuation) -> Result<Accepted> {
        match *continuation {
            Continuation::SetBackers { project_id } => {
                self.set_backers_from_stored(project_id).await
            }
            Continuation::CommitModerationVotes { project_id } => {
                self.commit_moderation_votes(project_id).await
            }
            Continuation::CancelProject { project_id } => self.cancel_project(project_id).await,
            Continuation::ReleaseFunds {
                project_id,
                activity_type,
                user_id,
            } => self.release_funds(project_id, activity_type, user_id).await,
        }
    }
}

/// Build a JSON object from `(key, value)` pairs.
pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// ─────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default, alias = "ms", deserialize_with = "lenient::i64_vec")]
    pub milestones: Vec<i64>,
    #[serde(default, deserialize_with = "lenient::i64_vec")]
    pub release_percents: Vec<i64>,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub creator: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetProjectInfoRequest {
    #[serde(default, deserialize_with = "lenient::i64")]
    pub listing_fee: i64,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub total_raised: i64,
    #[serde(default, alias = "backers", deserialize_with = "lenient::i64_vec")]
    pub beneficiaries: Vec<i64>,
    #[serde(default, deserialize_with = "lenient::i64_vec")]
    pub amounts: Vec<i64>,
    #[serde(default)]
    pub funding_complete: bool,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub total_amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetBackersRequest {
    #[serde(default, alias = "backers", deserialize_with = "lenient::i64_vec")]
    pub beneficiaries: Vec<i64>,
    #[serde(default, deserialize_with = "lenient::i64_vec")]
    pub amounts: Vec<i64>,
    #[serde(default)]
    pub funding_complete: bool,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub total_amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetModeratorsRequest {
    #[serde(default, deserialize_with = "lenient::i64_vec")]
    pub moderators: Vec<i64>,
    #[serde(default, deserialize_with = "lenient::i64")]
    pub moderation_end_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    #[serde(deserialize_with = "lenient::i64")]
    pub user_id: i64,
    pub vote: bool,
    #[serde(default)]
    pub decryption_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRequest {
    #[serde(deserialize_with = "lenient::i64")]
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountRequest {
    #[serde(deserialize_with = "lenient::i64")]
    pub amount: i64,
}
