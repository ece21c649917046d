//! CampShare staking actions.
//!
//! Every action appends a provisional ledger row with `balance_movement = 0`;
//! the callback fills in the confirmed amount.

use serde_json::json;

use super::{fields, Accepted, Step};
use crate::db::campshares;
use crate::errors::{OracleError, Result};
use crate::models::{unix_now, ActivityType, CsType, NewCampShare, OwnerKind};
use crate::oracle::Oracle;

/// `POST_INTEREST` is not tied to a user; its rows belong to user 0.
pub const POST_INTEREST_USER: i64 = 0;

impl Oracle {
    pub async fn stake_plg(&self, user_id: i64, amount: i64) -> Result<Accepted> {
        if amount <= 0 {
            return Err(OracleError::InvalidRequest(format!(
                "stake amount must be positive, got {amount}"
            )));
        }
        self.campshare_step(user_id, ActivityType::StakePlg, CsType::Stake, amount)
            .await
    }

    pub async fn unstake_plg(&self, user_id: i64) -> Result<Accepted> {
        self.campshare_step(user_id, ActivityType::UnstakePlg, CsType::Unstake, 0)
            .await
    }

    pub async fn withdraw_interest(&self, user_id: i64) -> Result<Accepted> {
        self.campshare_step(user_id, ActivityType::WithdrawInterest, CsType::Withdraw, 0)
            .await
    }

    pub async fn reinvest_plg(&self, user_id: i64) -> Result<Accepted> {
        self.campshare_step(user_id, ActivityType::ReinvestPlg, CsType::Interest, 0)
            .await
    }

    pub async fn post_interest(&self, amount: i64) -> Result<Accepted> {
        if amount <= 0 {
            return Err(OracleError::InvalidRequest(format!(
                "interest amount must be positive, got {amount}"
            )));
        }
        self.campshare_step(
            POST_INTEREST_USER,
            ActivityType::PostInterest,
            CsType::PostInterest,
            amount,
        )
        .await
    }

    async fn campshare_step(
        &self,
        user_id: i64,
        activity_type: ActivityType,
        cs_type: CsType,
        amount: i64,
    ) -> Result<Accepted> {
        let now = unix_now();
        let unstake_complete_date = match cs_type {
            CsType::Unstake => now + self.config.cs_unstake_period_secs,
            _ => 0,
        };
        let row = campshares::insert_campshare(
            &self.pool,
            &NewCampShare {
                cs_type,
                user_id,
                amount,
                unstake_complete_date,
                cs_time: now,
            },
        )
        .await?;

        let path = match activity_type {
            ActivityType::PostInterest => format!("/cs/{activity_type}"),
            _ => format!("/manager/cs/{user_id}/{activity_type}"),
        };
        let mut body = fields([("cs_id", json!(row.cs_id)), ("user_id", json!(user_id))]);
        if amount > 0 {
            body.insert("amount".into(), json!(amount));
        }

        self.dispatch_step(Step {
            kind: OwnerKind::CampShare,
            owner_id: row.cs_id,
            callback_id: user_id,
            activity_type,
            path,
            fields: body,
        })
        .await
    }
}
