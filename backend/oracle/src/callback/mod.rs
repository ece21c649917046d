//! Callback interpreter.
//!
//! ## Flow
//!
//! 1. Resolve the activity named by `transaction_parent_id` and check it
//!    belongs to the owner in the URL.
//! 2. Take the owner lock. An activity that is no longer Pending has been
//!    handled already and is acknowledged as a duplicate.
//! 3. Stamp the transaction hash.
//! 4. Failure codes resolve the activity and forward one failure event.
//!    Success decodes the event payload and runs the completion handler,
//!    which saves state and resolves the activity last.
//! 5. With the lock released, run the requested continuations, then send
//!    the Backend events. Their failures are reported, not raised.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{activities, campshares};
use crate::errors::{OracleError, Result};
use crate::events::BackendEvent;
use crate::ledger;
use crate::models::{Activity, ActivityType, OwnerKind};
use crate::oracle::Oracle;
use crate::saga::Outcome;

mod campshare;
mod payload;
mod project;

pub use payload::{CallbackStatus, EventPayload, RelayerCallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Completed,
    Failed,
    InProgress,
    Duplicate,
}

/// What a callback did, returned to the Relayer.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackReport {
    pub activity_id: i64,
    pub disposition: Disposition,
    pub events_sent: usize,
    /// Follow-up dispatches started by this callback.
    pub dispatched: Vec<i64>,
    /// Follow-up or notification failures worth retrying by hand.
    pub faults: Vec<String>,
}

impl CallbackReport {
    fn new(activity_id: i64, disposition: Disposition) -> Self {
        Self {
            activity_id,
            disposition,
            events_sent: 0,
            dispatched: Vec::new(),
            faults: Vec::new(),
        }
    }
}

impl Oracle {
    pub async fn handle_callback(
        &self,
        kind: OwnerKind,
        path_id: i64,
        path_type: &str,
        cb: RelayerCallback,
    ) -> Result<CallbackReport> {
        let status = CallbackStatus::from_code(cb.transaction_status)?;
        let activity_id = cb.transaction_parent_id;

        let activity = activities::find_activity(&self.pool, kind, activity_id)
            .await?
            .ok_or_else(|| {
                OracleError::NotFound(format!("{} activity {activity_id}", kind.as_str()))
            })?;
        let path_type: ActivityType = path_type.parse()?;
        if path_type.owner_kind() != kind || path_type != activity.activity_type {
            return Err(OracleError::CallbackDecode(format!(
                "activity {activity_id} is {}, callback is for {path_type}",
                activity.activity_type
            )));
        }
        self.check_owner(kind, path_id, &activity).await?;

        let guard = self.locks.lock(kind, activity.owner_id).await;

        let activity = activities::find_activity(&self.pool, kind, activity_id)
            .await?
            .ok_or_else(|| {
                OracleError::NotFound(format!("{} activity {activity_id}", kind.as_str()))
            })?;
        if activity.status.is_terminal() {
            info!(activity_id, status = ?activity.status, "Duplicate callback ignored");
            return Ok(CallbackReport::new(activity_id, Disposition::Duplicate));
        }

        if let Some(hash) = cb.hash() {
            ledger::stamp_hash(&self.pool, kind, activity_id, hash).await?;
        }

        match status {
            CallbackStatus::InProgress => {
                info!(activity_id, code = cb.transaction_status, "Transaction still in progress");
                Ok(CallbackReport::new(activity_id, Disposition::InProgress))
            }
            CallbackStatus::Failed(failure) => {
                let resolved =
                    ledger::resolve_activity(&self.pool, kind, activity_id, cb.hash(), failure)
                        .await?;
                drop(guard);
                warn!(
                    activity_id,
                    activity_type = %resolved.activity_type,
                    status = ?failure,
                    "Transaction failed"
                );
                let event = BackendEvent::activity_outcome(
                    kind,
                    path_id,
                    resolved.activity_type,
                    failure,
                    cb.hash(),
                );
                let mut report = CallbackReport::new(activity_id, Disposition::Failed);
                self.deliver(Outcome::default().event(event), &mut report).await;
                Ok(report)
            }
            CallbackStatus::Complete => {
                let payload = EventPayload::decode(activity.activity_type, &cb.transaction_events)?;
                let outcome = match kind {
                    OwnerKind::Project => {
                        self.complete_project_step(&activity, payload, &cb).await?
                    }
                    OwnerKind::CampShare => {
                        self.complete_campshare_step(&activity, payload, &cb, path_id).await?
                    }
                };
                drop(guard);

                let mut report = CallbackReport::new(activity_id, Disposition::Completed);
                self.deliver(outcome, &mut report).await;
                Ok(report)
            }
        }
    }

    /// Project callbacks are addressed by project id, CampShare callbacks
    /// by the user owning the ledger row.
    async fn check_owner(&self, kind: OwnerKind, path_id: i64, activity: &Activity) -> Result<()> {
        let matches = match kind {
            OwnerKind::Project => activity.owner_id == path_id,
            OwnerKind::CampShare => {
                campshares::get_campshare(&self.pool, activity.owner_id).await?.user_id == path_id
            }
        };
        if matches {
            Ok(())
        } else {
            Err(OracleError::NotFound(format!(
                "activity {} does not belong to {} {path_id}",
                activity.id,
                kind.as_str()
            )))
        }
    }

    async fn deliver(&self, outcome: Outcome, report: &mut CallbackReport) {
        for continuation in &outcome.continuations {
            match self.run_continuation(continuation).await {
                Ok(accepted) => report.dispatched.push(accepted.activity_id),
                Err(e) => {
                    warn!(?continuation, "Follow-up dispatch failed: {e}");
                    report.faults.push(format!("{continuation:?}: {e}"));
                }
            }
        }
        for event in &outcome.events {
            match self.notify(event).await {
                Ok(()) => report.events_sent += 1,
                Err(e) => report.faults.push(format!("{}: {e}", event.path)),
            }
        }
    }
}
