use serde_json::json;
use tracing::info;

use super::{EventPayload, RelayerCallback};
use crate::db::campshares;
use crate::errors::{OracleError, Result};
use crate::events::BackendEvent;
use crate::ledger;
use crate::models::{Activity, ActivityStatus, ActivityType, OwnerKind};
use crate::oracle::Oracle;
use crate::saga::Outcome;

/// Signed effect of a confirmed amount on the staked balance.
fn balance_movement(activity_type: ActivityType, amount: i64) -> i64 {
    match activity_type {
        ActivityType::StakePlg | ActivityType::ReinvestPlg => amount,
        ActivityType::UnstakePlg => -amount,
        _ => 0,
    }
}

impl Oracle {
    /// Fill in the confirmed amount on the provisional ledger row.
    pub(super) async fn complete_campshare_step(
        &self,
        activity: &Activity,
        payload: EventPayload,
        cb: &RelayerCallback,
        user_id: i64,
    ) -> Result<Outcome> {
        let activity_type = activity.activity_type;
        let amount = payload.amount().ok_or_else(|| {
            OracleError::CallbackDecode(format!("{activity_type} completed without an amount"))
        })?;
        let movement = balance_movement(activity_type, amount);

        campshares::confirm_amount(
            &self.pool,
            activity.owner_id,
            amount,
            movement,
            cb.contract_address(),
        )
        .await?;
        ledger::resolve_activity(
            &self.pool,
            OwnerKind::CampShare,
            activity.id,
            cb.hash(),
            ActivityStatus::Success,
        )
        .await?;
        info!(cs_id = activity.owner_id, user_id, amount, movement, "CampShare amount confirmed");

        let Some(event) = activity_type.event_type() else {
            return Ok(Outcome::default());
        };
        let key = match activity_type {
            ActivityType::PostInterest => "interest_amount",
            _ => "amount",
        };
        Ok(Outcome::default().event(BackendEvent::campshare(
            event,
            user_id,
            true,
            json!({ key: amount }),
        )))
    }
}
