//! Read-side operations: stored state plus the on-chain numbers only the
//! Relayer knows.

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::db::{activities, campshares, projects};
use crate::errors::Result;
use crate::events::BackendEvent;
use crate::models::{unix_now, Activity, CampShare, EventType, OwnerKind, Project};
use crate::oracle::Oracle;

#[derive(Debug, Serialize)]
pub struct ProjectState {
    #[serde(flatten)]
    pub project: Project,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
pub struct CampShareState {
    pub user_id: i64,
    /// Sum of confirmed balance movements.
    pub balance: i64,
    pub unrealized_gains: i64,
    pub campshares: Vec<CampShare>,
    pub activities: Vec<Activity>,
}

/// Pending activities older than the configured timeout, for both owner kinds.
#[derive(Debug, Serialize)]
pub struct StalledActivities {
    pub projects: Vec<Activity>,
    pub campshares: Vec<Activity>,
}

impl Oracle {
    pub async fn project_state(&self, project_id: i64) -> Result<ProjectState> {
        let project = projects::get_project(&self.pool, project_id).await?;
        let activities =
            activities::activities_for_owner(&self.pool, OwnerKind::Project, project_id).await?;
        Ok(ProjectState {
            project,
            activities,
        })
    }

    pub async fn campshare_state(&self, user_id: i64) -> Result<CampShareState> {
        let rows = campshares::campshares_for_user(&self.pool, user_id).await?;
        let balance = campshares::user_balance(&self.pool, user_id).await?;
        let unrealized_gains = self.relayer.query(&gains_path(user_id)).await?;

        let mut cs_activities = Vec::new();
        for row in &rows {
            let found =
                activities::activities_for_owner(&self.pool, OwnerKind::CampShare, row.cs_id)
                    .await?;
            cs_activities.extend(found);
        }
        Ok(CampShareState {
            user_id,
            balance,
            unrealized_gains,
            campshares: rows,
            activities: cs_activities,
        })
    }

    /// Ask the Relayer for a user's unrealized CampShare gains and pass the
    /// answer on to the Backend.
    pub async fn get_gains(&self, user_id: i64) -> Result<i64> {
        let gains = self.relayer.query(&gains_path(user_id)).await?;
        info!(user_id, gains, "CampShare gains fetched");
        self.notify(&BackendEvent::campshare(
            EventType::GetGains,
            user_id,
            true,
            json!({ "gains": gains }),
        ))
        .await?;
        Ok(gains)
    }

    /// Same as [`Oracle::get_gains`] for the user's token balance.
    pub async fn get_balance(&self, user_id: i64) -> Result<i64> {
        let balance = self
            .relayer
            .query(&format!("/manager/users/{user_id}/GET_BALANCE"))
            .await?;
        info!(user_id, balance, "User balance fetched");
        self.notify(&BackendEvent::user(
            EventType::GetBalance,
            user_id,
            json!({ "balance": balance }),
        ))
        .await?;
        Ok(balance)
    }

    pub async fn stalled_activities(&self) -> Result<StalledActivities> {
        let cutoff = unix_now() - self.config.pending_activity_timeout_secs;
        Ok(StalledActivities {
            projects: activities::stalled_activities(&self.pool, OwnerKind::Project, cutoff).await?,
            campshares: activities::stalled_activities(&self.pool, OwnerKind::CampShare, cutoff)
                .await?,
        })
    }
}

fn gains_path(user_id: i64) -> String {
    format!("/manager/cs/{user_id}/GET_GAINS")
}
