//! Periodic background work: milestone checks, dormant-fund recovery and
//! the stalled-activity sweep.
//!
//! Each task runs once at startup and then on its own interval until the
//! shutdown token is cancelled. A tick never waits on a callback; it only
//! dispatches, so the next tick sees the Pending activity and skips the
//! project. A dispatch the Relayer refused leaves no Pending row behind,
//! and the next tick tries again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db::{activities, projects};
use crate::errors::Result;
use crate::models::{
    unix_now, Activity, ActivityType, OwnerKind, ProjectStatus, UNSET_ACTIVITY_DATE,
};
use crate::oracle::Oracle;

/// Receives Pending activities that outlived the configured timeout.
pub trait StalledActivityHook: Send + Sync {
    fn stalled(&self, kind: OwnerKind, activity: &Activity);
}

/// Default hook: a structured warning per stalled activity.
pub struct LogStalledHook;

impl StalledActivityHook for LogStalledHook {
    fn stalled(&self, kind: OwnerKind, activity: &Activity) {
        warn!(
            owner = kind.as_str(),
            owner_id = activity.owner_id,
            activity_id = activity.id,
            activity_type = %activity.activity_type,
            created_at = activity.created_at,
            "Activity stalled without a callback"
        );
    }
}

/// Spawn the three scheduler loops.
pub fn run(
    oracle: Arc<Oracle>,
    hook: Arc<dyn StalledActivityHook>,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let config = oracle.config.clone();
    info!(
        milestone_secs = config.milestone_check_interval_secs,
        recovery_secs = config.fund_recovery_interval_secs,
        sweep_secs = config.pending_sweep_interval_secs,
        "Scheduler starting"
    );

    let milestones = {
        let oracle = oracle.clone();
        every("milestone", config.milestone_check_interval(), cancel.clone(), move || {
            let oracle = oracle.clone();
            async move { milestone_tick(&oracle, unix_now()).await }
        })
    };
    let recovery = {
        let oracle = oracle.clone();
        every("fund-recovery", config.fund_recovery_interval(), cancel.clone(), move || {
            let oracle = oracle.clone();
            async move { fund_recovery_tick(&oracle, unix_now()).await }
        })
    };
    let sweep = every("stalled-sweep", config.pending_sweep_interval(), cancel, move || {
        let oracle = oracle.clone();
        let hook = hook.clone();
        async move { sweep_stalled(&oracle, hook.as_ref(), unix_now()).await }
    });

    vec![
        tokio::spawn(milestones),
        tokio::spawn(recovery),
        tokio::spawn(sweep),
    ]
}

async fn every<F, Fut>(name: &'static str, period: Duration, cancel: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize>>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(task = name, "Scheduler task stopping");
                return;
            }
            _ = interval.tick() => {
                match tick().await {
                    Ok(0) => {}
                    Ok(count) => info!(task = name, count, "Scheduler tick"),
                    Err(e) => error!(task = name, "Scheduler tick failed: {e}"),
                }
            }
        }
    }
}

/// Dispatch `CheckMilestone` for every project in its milestone phase whose
/// next milestone has passed. Returns how many were dispatched.
pub async fn milestone_tick(oracle: &Oracle, now: i64) -> Result<usize> {
    let mut dispatched = 0;
    for project in projects::active_projects(&oracle.pool).await? {
        if project.status != ProjectStatus::MilestonePhase {
            continue;
        }
        let mut due = project.next_activity_date;
        if due == UNSET_ACTIVITY_DATE {
            due = initialize_next_milestone(oracle, project.id).await?;
            if due == UNSET_ACTIVITY_DATE {
                continue;
            }
        }
        if now < due {
            continue;
        }
        if activities::has_activity(
            &oracle.pool,
            OwnerKind::Project,
            project.id,
            ActivityType::CheckMilestone,
            true,
        )
        .await?
        {
            continue;
        }

        match oracle.check_milestone(project.id).await {
            Ok(accepted) => {
                info!(
                    project_id = project.id,
                    activity_id = accepted.activity_id,
                    due,
                    "Milestone due"
                );
                dispatched += 1;
            }
            Err(e) => warn!(project_id = project.id, "Milestone check dispatch failed: {e}"),
        }
    }
    Ok(dispatched)
}

/// Set `next_activity_date` from the first milestone. Returns the new value.
async fn initialize_next_milestone(oracle: &Oracle, project_id: i64) -> Result<i64> {
    let _guard = oracle.locks.lock(OwnerKind::Project, project_id).await;
    let mut project = projects::get_project(&oracle.pool, project_id).await?;
    if project.next_activity_date != UNSET_ACTIVITY_DATE {
        return Ok(project.next_activity_date);
    }
    let Some(first) = project.parameters.milestone_secs().first().copied() else {
        return Ok(UNSET_ACTIVITY_DATE);
    };
    project.next_activity_date = first;
    projects::update_project(&oracle.pool, &mut project).await?;
    info!(project_id, next_activity_date = first, "Milestone schedule initialized");
    Ok(first)
}

/// Dispatch `FailedFundRecovery` for Ended projects dormant longer than
/// the configured number of days.
pub async fn fund_recovery_tick(oracle: &Oracle, now: i64) -> Result<usize> {
    let dormancy = oracle.config.fund_recovery_dormancy().num_seconds();
    let mut dispatched = 0;
    for project in projects::projects_with_status(&oracle.pool, ProjectStatus::Ended).await? {
        if now - project.completed_at <= dormancy {
            continue;
        }
        if activities::has_activity(
            &oracle.pool,
            OwnerKind::Project,
            project.id,
            ActivityType::FailedFundRecovery,
            true,
        )
        .await?
        {
            continue;
        }

        match oracle.failed_fund_recovery(project.id).await {
            Ok(accepted) => {
                info!(
                    project_id = project.id,
                    activity_id = accepted.activity_id,
                    "Recovering dormant funds"
                );
                dispatched += 1;
            }
            Err(e) => warn!(project_id = project.id, "Fund recovery dispatch failed: {e}"),
        }
    }
    Ok(dispatched)
}

/// Hand every stalled activity to `hook`. Nothing is re-dispatched.
pub async fn sweep_stalled(
    oracle: &Oracle,
    hook: &dyn StalledActivityHook,
    now: i64,
) -> Result<usize> {
    let cutoff = now - oracle.config.pending_activity_timeout_secs;
    let mut count = 0;
    for kind in [OwnerKind::Project, OwnerKind::CampShare] {
        for activity in activities::stalled_activities(&oracle.pool, kind, cutoff).await? {
            hook.stalled(kind, &activity);
            count += 1;
        }
    }
    Ok(count)
}
