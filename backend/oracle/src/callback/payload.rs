//! Relayer callback body and typed decoding of its `transaction_events`.
//!
//! The Relayer reports contract events as nested JSON arrays whose shape
//! depends on the transaction type. [`EventPayload::decode`] accepts exactly
//! one shape per type and rejects everything else.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{OracleError, Result};
use crate::models::{lenient, ActivityStatus, ActivityType};

/// Body the Relayer posts to a callback URL.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayerCallback {
    #[serde(default, alias = "uuid")]
    pub transaction_uuid: Option<String>,
    /// Activity id handed to the Relayer at dispatch time.
    #[serde(alias = "parent_id", deserialize_with = "lenient::i64")]
    pub transaction_parent_id: i64,
    #[serde(default, alias = "type")]
    pub transaction_type: Option<String>,
    #[serde(default, alias = "callback_url")]
    pub transaction_callback: Option<String>,
    #[serde(default, alias = "hash")]
    pub transaction_hash: Option<String>,
    #[serde(default, alias = "serialized")]
    pub transaction_serialized: Option<String>,
    #[serde(default, alias = "index")]
    pub transaction_index: Option<Value>,
    #[serde(alias = "status")]
    pub transaction_status: i32,
    #[serde(default, alias = "to")]
    pub transaction_to: Option<String>,
    #[serde(default, alias = "from")]
    pub transaction_from: Option<String>,
    #[serde(default, alias = "contract_address")]
    pub transaction_contract_address: Option<String>,
    #[serde(default, alias = "block_number")]
    pub transaction_block_number: Option<Value>,
    #[serde(default, alias = "gas_used")]
    pub transaction_gas_used: Option<Value>,
    #[serde(default, alias = "retry_attempts")]
    pub transaction_retry_attempts: Option<Value>,
    #[serde(default, alias = "events")]
    pub transaction_events: Value,
}

impl RelayerCallback {
    pub fn hash(&self) -> Option<&str> {
        self.transaction_hash.as_deref().filter(|h| !h.is_empty())
    }

    pub fn contract_address(&self) -> Option<&str> {
        self.transaction_contract_address
            .as_deref()
            .filter(|a| !a.is_empty())
    }
}

/// What a Relayer status code means for the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    /// 0 (initial) or 1 (pending): nothing to do yet.
    InProgress,
    /// 2: mined and confirmed.
    Complete,
    /// 3..=7: one of the terminal failure kinds.
    Failed(ActivityStatus),
}

impl CallbackStatus {
    pub fn from_code(code: i32) -> Result<Self> {
        let status = match code {
            0 | 1 => Self::InProgress,
            2 => Self::Complete,
            3 => Self::Failed(ActivityStatus::Timeout),
            4 => Self::Failed(ActivityStatus::GasError),
            5 => Self::Failed(ActivityStatus::InitialError),
            6 => Self::Failed(ActivityStatus::ReceiptError),
            7 => Self::Failed(ActivityStatus::PendingError),
            other => {
                return Err(OracleError::CallbackDecode(format!(
                    "unknown transaction status {other}"
                )))
            }
        };
        Ok(status)
    }
}

/// Decoded `transaction_events`, one variant per shape.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// `["..", "0xcontract"]`: the last string is the deployed address.
    Deployed { contract_address: String },
    /// `[_, cancelled]`
    Cancelled { cancelled: bool },
    /// `[[voter_id, vote], ..]`: the last entry counts.
    MilestoneVote { voter_id: i64, vote: bool },
    /// `[[_, voter_id, commitment], ..]`: the last entry counts.
    ModerationVote { voter_id: i64, commitment: String },
    /// `[[milestone_index, passed], ..]`
    MilestoneChecked { outcomes: Vec<bool> },
    /// Withdraw `["amount", ..]`, refund and recovery `[["amount", ..], ..]`,
    /// CampShare `[[_, "amount"], ..]`.
    Amount(i64),
    /// Types whose outcome carries no data.
    Empty,
}

impl EventPayload {
    pub fn decode(activity_type: ActivityType, events: &Value) -> Result<Self> {
        use ActivityType::*;
        let payload = match activity_type {
            ProjectDeploy => {
                let address = items(events)?
                    .last()
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| bad(activity_type, "expected the contract address last"))?;
                Self::Deployed {
                    contract_address: address.to_string(),
                }
            }
            CancelProject => {
                let flag = items(events)?
                    .get(1)
                    .and_then(as_bool)
                    .ok_or_else(|| bad(activity_type, "expected [_, cancelled]"))?;
                Self::Cancelled { cancelled: flag }
            }
            MilestoneVote => {
                let entry = last_entry(activity_type, events)?;
                let voter_id = entry
                    .first()
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [voter_id, vote]"))?;
                let vote = entry
                    .get(1)
                    .and_then(as_bool)
                    .ok_or_else(|| bad(activity_type, "expected [voter_id, vote]"))?;
                Self::MilestoneVote { voter_id, vote }
            }
            ModerationVote => {
                let entry = last_entry(activity_type, events)?;
                let voter_id = entry
                    .get(1)
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [_, voter_id, commitment]"))?;
                let commitment = entry
                    .get(2)
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad(activity_type, "expected [_, voter_id, commitment]"))?;
                Self::ModerationVote {
                    voter_id,
                    commitment: commitment.to_string(),
                }
            }
            CheckMilestone => {
                let outcomes = items(events)?
                    .iter()
                    .map(|entry| entry.as_array().and_then(|e| e.get(1)).and_then(as_bool))
                    .collect::<Option<Vec<bool>>>()
                    .filter(|o| !o.is_empty())
                    .ok_or_else(|| bad(activity_type, "expected [[index, passed], ..]"))?;
                Self::MilestoneChecked { outcomes }
            }
            WithdrawFunds => Self::Amount(
                items(events)?
                    .last()
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [amount]"))?,
            ),
            RequestRefund | FailedFundRecovery => Self::Amount(
                last_entry(activity_type, events)?
                    .first()
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [[amount, ..]]"))?,
            ),
            StakePlg | UnstakePlg | WithdrawInterest => Self::Amount(
                last_entry(activity_type, events)?
                    .get(1)
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [[_, amount]]"))?,
            ),
            ReinvestPlg => Self::Amount(
                items(events)?
                    .first()
                    .and_then(Value::as_array)
                    .and_then(|e| e.get(1))
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [[_, amount], ..]"))?,
            ),
            PostInterest => Self::Amount(
                items(events)?
                    .last()
                    .and_then(lenient::value_to_i64)
                    .ok_or_else(|| bad(activity_type, "expected [.., amount]"))?,
            ),
            SetBackers | SetProjectInfo | SetModerators | CommitFinalVotes | InitiateMilestone
            | GetGains | GetBalance => Self::Empty,
        };
        Ok(payload)
    }

    pub fn amount(&self) -> Option<i64> {
        match self {
            Self::Amount(amount) => Some(*amount),
            _ => None,
        }
    }
}

fn bad(activity_type: ActivityType, expected: &str) -> OracleError {
    OracleError::CallbackDecode(format!("{activity_type} events: {expected}"))
}

fn items(events: &Value) -> Result<&Vec<Value>> {
    events
        .as_array()
        .ok_or_else(|| {
            OracleError::CallbackDecode(format!("events must be an array, got {events}"))
        })
}

fn last_entry<'a>(activity_type: ActivityType, events: &'a Value) -> Result<&'a Vec<Value>> {
    items(events)?
        .last()
        .and_then(Value::as_array)
        .ok_or_else(|| bad(activity_type, "expected a list of entries"))
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_codes_map_one_to_one() {
        assert_eq!(CallbackStatus::from_code(0).unwrap(), CallbackStatus::InProgress);
        assert_eq!(CallbackStatus::from_code(1).unwrap(), CallbackStatus::InProgress);
        assert_eq!(CallbackStatus::from_code(2).unwrap(), CallbackStatus::Complete);
        let failures: Vec<_> = (3..=7)
            .map(|c| CallbackStatus::from_code(c).unwrap())
            .collect();
        assert_eq!(
            failures,
            vec![
                CallbackStatus::Failed(ActivityStatus::Timeout),
                CallbackStatus::Failed(ActivityStatus::GasError),
                CallbackStatus::Failed(ActivityStatus::InitialError),
                CallbackStatus::Failed(ActivityStatus::ReceiptError),
                CallbackStatus::Failed(ActivityStatus::PendingError),
            ]
        );
        assert!(CallbackStatus::from_code(8).is_err());
        assert!(CallbackStatus::from_code(-1).is_err());
    }

    #[test]
    fn callback_accepts_short_field_names() {
        let cb: RelayerCallback = serde_json::from_value(json!({
            "parent_id": "12",
            "status": 2,
            "hash": "0xabc",
            "contract_address": "0xdef",
            "events": ["0xdef"]
        }))
        .unwrap();
        assert_eq!(cb.transaction_parent_id, 12);
        assert_eq!(cb.hash(), Some("0xabc"));
        assert_eq!(cb.contract_address(), Some("0xdef"));
    }

    #[test]
    fn deploy_takes_last_address() {
        let p =
            EventPayload::decode(ActivityType::ProjectDeploy, &json!(["0xold", "0xABC"])).unwrap();
        assert_eq!(
            p,
            EventPayload::Deployed {
                contract_address: "0xABC".into()
            }
        );
        assert!(EventPayload::decode(ActivityType::ProjectDeploy, &json!([])).is_err());
        assert!(EventPayload::decode(ActivityType::ProjectDeploy, &json!({"a": 1})).is_err());
    }

    #[test]
    fn votes_and_cancel() {
        assert_eq!(
            EventPayload::decode(ActivityType::MilestoneVote, &json!([["9", false], ["42", true]]))
                .unwrap(),
            EventPayload::MilestoneVote {
                voter_id: 42,
                vote: true
            }
        );
        assert_eq!(
            EventPayload::decode(ActivityType::ModerationVote, &json!([["0x1", "42", "0xc0ffee"]]))
                .unwrap(),
            EventPayload::ModerationVote {
                voter_id: 42,
                commitment: "0xc0ffee".into()
            }
        );
        assert_eq!(
            EventPayload::decode(ActivityType::CancelProject, &json!(["0x1", true])).unwrap(),
            EventPayload::Cancelled { cancelled: true }
        );
        assert!(EventPayload::decode(ActivityType::CancelProject, &json!(["0x1"])).is_err());
    }

    #[test]
    fn milestone_outcomes() {
        assert_eq!(
            EventPayload::decode(ActivityType::CheckMilestone, &json!([[0, true], [1, "false"]]))
                .unwrap(),
            EventPayload::MilestoneChecked {
                outcomes: vec![true, false]
            }
        );
        assert!(EventPayload::decode(ActivityType::CheckMilestone, &json!([])).is_err());
        assert!(EventPayload::decode(ActivityType::CheckMilestone, &json!([[0, 1]])).is_err());
    }

    #[test]
    fn amount_shapes() {
        let cases = [
            (ActivityType::WithdrawFunds, json!(["250"])),
            (ActivityType::RequestRefund, json!([["250", "0xbacker"]])),
            (ActivityType::FailedFundRecovery, json!([["250"]])),
            (ActivityType::StakePlg, json!([["0xuser", "250"]])),
            (ActivityType::UnstakePlg, json!([["0xuser", 250]])),
            (ActivityType::WithdrawInterest, json!([["0xuser", "250"]])),
            (ActivityType::ReinvestPlg, json!([["0xuser", "250"], ["0xuser", "1"]])),
            (ActivityType::PostInterest, json!(["1", "250"])),
        ];
        for (t, events) in cases {
            assert_eq!(
                EventPayload::decode(t, &events).unwrap().amount(),
                Some(250),
                "{t}"
            );
        }
        let lots = json!([["0xuser", "lots"]]);
        assert!(EventPayload::decode(ActivityType::StakePlg, &lots).is_err());
    }

    #[test]
    fn data_free_types_ignore_events() {
        assert_eq!(
            EventPayload::decode(ActivityType::SetBackers, &Value::Null).unwrap(),
            EventPayload::Empty
        );
    }
}
