//! Persisted entities and the closed sets of tags and states they carry.
//!
//! ## Project lifecycle
//!
//! [`ProjectStatus`] only moves along the edges accepted by
//! [`ProjectStatus::can_transition_to`]:
//!
//! ```text
//! Inactive ──► Deployed ──► MilestonePhase ──► MilestoneSuccess ──► Ended ──► FundsRecovered
//!                 │             │   ▲    └───► MilestoneFailed ──► Failed
//!                 │             ▼   │
//!                 └──────► ModerationPhase ──► ReadyToCancel ──► Cancelled
//! ```
//!
//! `ReadyToCancel ──► MilestonePhase` is the only edge that returns to an
//! earlier phase (moderation decided not to cancel).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::OracleError;

/// Minimum number of moderation votes before they can be committed on-chain.
pub const MODERATION_QUORUM: i64 = 7;

/// `next_activity_date` value meaning "not initialised yet".
pub const UNSET_ACTIVITY_DATE: i64 = 0;

/// `next_activity_date` written once leftover funds were recovered
/// (0001-01-01T00:00:00Z). Excluded from every scheduler query.
pub const CLEARED_ACTIVITY_DATE: i64 = -62_135_596_800;

/// Current wall-clock time as Unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// Tags
// ─────────────────────────────────────────────────────────

/// Which kind of entity owns an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Project,
    CampShare,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::CampShare => "campshare",
        }
    }
}

/// Closed set of dispatchable units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    ProjectDeploy,
    SetBackers,
    SetProjectInfo,
    #[serde(rename = "START_MODERATION")]
    #[sqlx(rename = "START_MODERATION")]
    SetModerators,
    MilestoneVote,
    ModerationVote,
    #[serde(rename = "COMMIT_MODERATION_VOTES")]
    #[sqlx(rename = "COMMIT_MODERATION_VOTES")]
    CommitFinalVotes,
    CancelProject,
    CheckMilestone,
    InitiateMilestone,
    WithdrawFunds,
    RequestRefund,
    FailedFundRecovery,
    StakePlg,
    UnstakePlg,
    WithdrawInterest,
    ReinvestPlg,
    PostInterest,
    GetGains,
    GetBalance,
}

impl ActivityType {
    pub const ALL: [ActivityType; 20] = [
        Self::ProjectDeploy,
        Self::SetBackers,
        Self::SetProjectInfo,
        Self::SetModerators,
        Self::MilestoneVote,
        Self::ModerationVote,
        Self::CommitFinalVotes,
        Self::CancelProject,
        Self::CheckMilestone,
        Self::InitiateMilestone,
        Self::WithdrawFunds,
        Self::RequestRefund,
        Self::FailedFundRecovery,
        Self::StakePlg,
        Self::UnstakePlg,
        Self::WithdrawInterest,
        Self::ReinvestPlg,
        Self::PostInterest,
        Self::GetGains,
        Self::GetBalance,
    ];

    /// Wire tag used in URLs, Relayer requests and the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectDeploy => "PROJECT_DEPLOY",
            Self::SetBackers => "SET_BACKERS",
            Self::SetProjectInfo => "SET_PROJECT_INFO",
            Self::SetModerators => "START_MODERATION",
            Self::MilestoneVote => "MILESTONE_VOTE",
            Self::ModerationVote => "MODERATION_VOTE",
            Self::CommitFinalVotes => "COMMIT_MODERATION_VOTES",
            Self::CancelProject => "CANCEL_PROJECT",
            Self::CheckMilestone => "CHECK_MILESTONE",
            Self::InitiateMilestone => "INITIATE_MILESTONE",
            Self::WithdrawFunds => "WITHDRAW_FUNDS",
            Self::RequestRefund => "REQUEST_REFUND",
            Self::FailedFundRecovery => "FAILED_FUND_RECOVERY",
            Self::StakePlg => "STAKE_PLG",
            Self::UnstakePlg => "UNSTAKE_PLG",
            Self::WithdrawInterest => "WITHDRAW_INTEREST",
            Self::ReinvestPlg => "REINVEST_PLG",
            Self::PostInterest => "POST_INTEREST",
            Self::GetGains => "GET_GAINS",
            Self::GetBalance => "GET_BALANCE",
        }
    }

    /// Backend event reported when this activity completes or fails.
    pub fn event_type(&self) -> Option<EventType> {
        let event = match self {
            Self::ProjectDeploy | Self::SetProjectInfo => EventType::ProjectCreate,
            Self::SetBackers => EventType::ProjectComplete,
            Self::SetModerators => EventType::StartModeration,
            Self::CommitFinalVotes | Self::CancelProject => EventType::EndModeration,
            Self::MilestoneVote => EventType::MilestoneVote,
            Self::ModerationVote => EventType::ModerationVote,
            Self::CheckMilestone => EventType::MilestoneRelease,
            Self::WithdrawFunds | Self::RequestRefund => EventType::FundWithdrawal,
            Self::FailedFundRecovery => EventType::FailedFundRecovery,
            Self::StakePlg => EventType::StakePlg,
            Self::UnstakePlg => EventType::UnstakePlg,
            Self::WithdrawInterest => EventType::WithdrawInterest,
            Self::ReinvestPlg => EventType::ReinvestPlg,
            Self::PostInterest => EventType::PostInterest,
            Self::GetGains => EventType::GetGains,
            Self::GetBalance => EventType::GetBalance,
            Self::InitiateMilestone => return None,
        };
        Some(event)
    }

    /// The entity kind that owns activities of this type.
    pub fn owner_kind(&self) -> OwnerKind {
        match self {
            Self::StakePlg
            | Self::UnstakePlg
            | Self::WithdrawInterest
            | Self::ReinvestPlg
            | Self::PostInterest
            | Self::GetGains => OwnerKind::CampShare,
            _ => OwnerKind::Project,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OracleError::CallbackDecode(format!("unknown activity type {s:?}")))
    }
}

/// Backend event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[serde(rename = "PROJECT_CREATE")]
    ProjectCreate,
    #[serde(rename = "PROJECT_COMPLETE")]
    ProjectComplete,
    #[serde(rename = "PROJECT_CHECK_MILESTONE")]
    MilestoneRelease,
    #[serde(rename = "PROJECT_FUND_WITHDRAWAL")]
    FundWithdrawal,
    #[serde(rename = "PROJECT_START_MODERATION")]
    StartModeration,
    #[serde(rename = "PROJECT_END_MODERATION")]
    EndModeration,
    #[serde(rename = "PROJECT_FAILED_FUND_RECOVERY")]
    FailedFundRecovery,
    #[serde(rename = "PROJECT_MILESTONE_VOTE")]
    MilestoneVote,
    #[serde(rename = "PROJECT_MODERATION_VOTE")]
    ModerationVote,
    #[serde(rename = "PROJECT_GET_USER_BALANCE")]
    GetBalance,
    #[serde(rename = "CS_STAKE_PLG")]
    StakePlg,
    #[serde(rename = "CS_UNSTAKE_PLG")]
    UnstakePlg,
    #[serde(rename = "CS_WITHDRAW_INTEREST")]
    WithdrawInterest,
    #[serde(rename = "CS_REINVEST_PLG")]
    ReinvestPlg,
    #[serde(rename = "CS_POST_INTEREST")]
    PostInterest,
    #[serde(rename = "CS_GET_GAINS")]
    GetGains,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreate => "PROJECT_CREATE",
            Self::ProjectComplete => "PROJECT_COMPLETE",
            Self::MilestoneRelease => "PROJECT_CHECK_MILESTONE",
            Self::FundWithdrawal => "PROJECT_FUND_WITHDRAWAL",
            Self::StartModeration => "PROJECT_START_MODERATION",
            Self::EndModeration => "PROJECT_END_MODERATION",
            Self::FailedFundRecovery => "PROJECT_FAILED_FUND_RECOVERY",
            Self::MilestoneVote => "PROJECT_MILESTONE_VOTE",
            Self::ModerationVote => "PROJECT_MODERATION_VOTE",
            Self::GetBalance => "PROJECT_GET_USER_BALANCE",
            Self::StakePlg => "CS_STAKE_PLG",
            Self::UnstakePlg => "CS_UNSTAKE_PLG",
            Self::WithdrawInterest => "CS_WITHDRAW_INTEREST",
            Self::ReinvestPlg => "CS_REINVEST_PLG",
            Self::PostInterest => "CS_POST_INTEREST",
            Self::GetGains => "CS_GET_GAINS",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────
// States
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, sqlx::Type)]
#[repr(i32)]
pub enum ProjectStatus {
    Inactive = 0,
    Cancelled = 1,
    MilestoneFailed = 2,
    Ended = 3,
    Error = 4,
    Deployed = 5,
    MilestonePhase = 6,
    ModerationPhase = 7,
    ReadyToCancel = 8,
    FundsRecovered = 9,
    MilestoneSuccess = 10,
    Failed = 11,
}

impl ProjectStatus {
    /// Whether a project may move from `self` to `next`. Staying put is
    /// always allowed.
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;
        self == next
            || matches!(
                (self, next),
                (Inactive, Deployed)
                    | (Deployed, MilestonePhase)
                    | (Deployed, ModerationPhase)
                    | (MilestonePhase, ModerationPhase)
                    | (MilestonePhase, MilestoneSuccess)
                    | (MilestonePhase, MilestoneFailed)
                    | (ModerationPhase, ReadyToCancel)
                    | (ReadyToCancel, Cancelled)
                    | (ReadyToCancel, MilestonePhase)
                    | (MilestoneSuccess, Ended)
                    | (MilestoneFailed, Failed)
                    | (Ended, FundsRecovered)
            )
    }
}

/// Lifecycle of one dispatched unit of work. Only `Pending` is non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[repr(i32)]
pub enum ActivityStatus {
    Pending = 0,
    Success = 1,
    Timeout = 2,
    GasError = 3,
    InitialError = 4,
    ReceiptError = 5,
    PendingError = 6,
}

impl ActivityStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum VoteType {
    Milestone = 0,
    Moderation = 1,
}

impl TryFrom<i32> for VoteType {
    type Error = OracleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Milestone),
            1 => Ok(Self::Moderation),
            other => Err(OracleError::InvalidRequest(format!(
                "vote_type must be 0 (milestone) or 1 (moderation), got {other}"
            ))),
        }
    }
}

impl VoteType {
    pub fn activity_type(&self) -> ActivityType {
        match self {
            Self::Milestone => ActivityType::MilestoneVote,
            Self::Moderation => ActivityType::ModerationVote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[repr(i32)]
pub enum CsType {
    Stake = 0,
    Unstake = 1,
    Interest = 2,
    Withdraw = 3,
    PostInterest = 4,
}

// ─────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────

/// Semi-structured campaign parameters. Numeric fields tolerate being sent
/// as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectParameters {
    #[serde(deserialize_with = "lenient::i64_vec")]
    pub milestones: Vec<i64>,
    #[serde(deserialize_with = "lenient::i64_vec")]
    pub release_percents: Vec<i64>,
    #[serde(deserialize_with = "lenient::i64_vec")]
    pub backers: Vec<i64>,
    #[serde(deserialize_with = "lenient::i64_vec")]
    pub amounts: Vec<i64>,
    pub funding_complete: bool,
    #[serde(deserialize_with = "lenient::i64_vec")]
    pub moderators: Vec<i64>,
    #[serde(deserialize_with = "lenient::i64")]
    pub listing_fee: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub total_raised: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub total_amount: i64,
    #[serde(deserialize_with = "lenient::i64")]
    pub creator: i64,
}

impl ProjectParameters {
    /// Milestones as Unix seconds, ascending. The Backend sends
    /// milliseconds; anything beyond year 5000 in seconds is treated as such.
    pub fn milestone_secs(&self) -> Vec<i64> {
        let mut secs: Vec<i64> = self
            .milestones
            .iter()
            .map(|&m| if m > 100_000_000_000 { m / 1000 } else { m })
            .collect();
        secs.sort_unstable();
        secs
    }

    /// First milestone strictly after `now`.
    pub fn next_milestone_after(&self, now: i64) -> Option<i64> {
        self.milestone_secs().into_iter().find(|&m| m > now)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,
    pub contract_address: String,
    pub created_at: i64,
    pub completed_at: i64,
    pub status: ProjectStatus,
    pub next_activity_date: i64,
    #[sqlx(json)]
    pub activities_completed: Vec<ActivityType>,
    #[sqlx(json)]
    pub parameters: ProjectParameters,
    #[serde(skip)]
    pub version: i64,
}

impl Project {
    /// A new, not yet deployed project.
    pub fn new(id: i64, parameters: ProjectParameters, now: i64) -> Self {
        let next_activity_date = parameters
            .milestone_secs()
            .first()
            .copied()
            .unwrap_or(UNSET_ACTIVITY_DATE);
        Self {
            id,
            contract_address: String::new(),
            created_at: now,
            completed_at: 0,
            status: ProjectStatus::Inactive,
            next_activity_date,
            activities_completed: Vec::new(),
            parameters,
            version: 0,
        }
    }

    /// Move to `next` if the lifecycle allows it. Returns whether the
    /// status changed.
    pub fn advance(&mut self, next: ProjectStatus) -> bool {
        if self.status == next {
            return false;
        }
        if !self.status.can_transition_to(next) {
            tracing::warn!(
                project_id = self.id,
                from = ?self.status,
                to = ?next,
                "Refusing project status transition"
            );
            return false;
        }
        self.status = next;
        true
    }

    pub fn mark_completed(&mut self, tag: ActivityType) {
        self.activities_completed.push(tag);
    }
}

/// One dispatched unit of work, for either owner kind. `owner_id` is the
/// project id or the CampShare id.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Activity {
    pub id: i64,
    pub owner_id: i64,
    pub created_at: i64,
    pub modified_at: i64,
    pub transaction_hash: Option<String>,
    pub status: ActivityStatus,
    pub activity_type: ActivityType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteParameters {
    pub vote: bool,
    pub encrypted_vote: String,
    pub decryption_key: String,
    pub vote_type: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vote {
    pub vote_id: i64,
    pub contract_address: String,
    pub vote_time: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub vote_type: VoteType,
    pub confirmed: bool,
    #[sqlx(json)]
    pub parameters: VoteParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampShareParameters {
    pub is_moderator: bool,
    pub project_id: Option<i64>,
}

/// One CampShare ledger row. A user's balance is the sum of their
/// `balance_movement` values.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CampShare {
    pub cs_id: i64,
    pub contract_address: String,
    pub cs_time: i64,
    pub cs_type: CsType,
    pub user_id: i64,
    pub amount: i64,
    pub balance_movement: i64,
    pub unstake_complete_date: i64,
    #[sqlx(json)]
    pub parameters: CampShareParameters,
}

/// Fields of a CampShare row before the store assigns its `cs_id`.
#[derive(Debug, Clone)]
pub struct NewCampShare {
    pub cs_type: CsType,
    pub user_id: i64,
    pub amount: i64,
    pub unstake_complete_date: i64,
    pub cs_time: i64,
}

// ─────────────────────────────────────────────────────────
// Lenient numeric decoding
// ─────────────────────────────────────────────────────────

pub mod lenient {
    //! Numbers that may arrive as JSON numbers or numeric strings.

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Int(i64),
        Float(f64),
        Text(String),
    }

    impl Numeric {
        fn into_i64(self) -> Result<i64, String> {
            match self {
                Self::Int(n) => Ok(n),
                Self::Float(f) if f.fract() == 0.0 => Ok(f as i64),
                Self::Float(f) => Err(format!("expected an integer, got {f}")),
                Self::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("expected a numeric string, got {s:?}")),
            }
        }
    }

    pub fn i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Option::<Numeric>::deserialize(d)? {
            Some(n) => n.into_i64().map_err(D::Error::custom),
            None => Ok(0),
        }
    }

    pub fn i64_vec<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
        Option::<Vec<Numeric>>::deserialize(d)?
            .unwrap_or_default()
            .into_iter()
            .map(|n| n.into_i64().map_err(D::Error::custom))
            .collect()
    }

    /// Same normalisation for an already-parsed JSON value.
    pub fn value_to_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn activity_type_tags_round_trip_through_from_str() {
        for t in ActivityType::ALL {
            assert_eq!(t.as_str().parse::<ActivityType>().unwrap(), t);
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
        assert!("NOT_A_TAG".parse::<ActivityType>().is_err());
    }

    #[test]
    fn event_type_serde_matches_as_str() {
        for t in ActivityType::ALL.iter().filter_map(|t| t.event_type()) {
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
    }

    #[test]
    fn parameters_accept_strings_and_numbers() {
        let params: ProjectParameters = serde_json::from_value(json!({
            "milestones": ["1700000000000", 1800000000000i64],
            "release_percents": [50, "50"],
            "backers": [1.0, "2"],
            "creator": "99",
            "total_amount": 1000.0
        }))
        .unwrap();
        assert_eq!(params.milestones, vec![1_700_000_000_000, 1_800_000_000_000]);
        assert_eq!(params.release_percents, vec![50, 50]);
        assert_eq!(params.backers, vec![1, 2]);
        assert_eq!(params.creator, 99);
        assert_eq!(params.total_amount, 1000);
        assert!(params.amounts.is_empty());
        assert!(!params.funding_complete);
    }

    #[test]
    fn parameters_reject_non_numeric_strings() {
        let err = serde_json::from_value::<ProjectParameters>(json!({ "creator": "abc" }));
        assert!(err.is_err());
    }

    #[test]
    fn milestones_are_normalised_to_seconds() {
        let params = ProjectParameters {
            milestones: vec![1_800_000_000_000, 1_700_000_000],
            ..Default::default()
        };
        assert_eq!(params.milestone_secs(), vec![1_700_000_000, 1_800_000_000]);
        assert_eq!(params.next_milestone_after(1_750_000_000), Some(1_800_000_000));
        assert_eq!(params.next_milestone_after(1_900_000_000), None);
    }

    #[test]
    fn new_project_starts_inactive_at_first_milestone() {
        let params = ProjectParameters {
            milestones: vec![2_000_000_000_000, 1_900_000_000_000],
            ..Default::default()
        };
        let p = Project::new(1, params, 100);
        assert_eq!(p.status, ProjectStatus::Inactive);
        assert_eq!(p.next_activity_date, 1_900_000_000);
        assert!(p.contract_address.is_empty());
    }

    #[test]
    fn status_only_moves_forward_except_the_moderation_fork() {
        use ProjectStatus::*;
        let all = [
            Inactive,
            Cancelled,
            MilestoneFailed,
            Ended,
            Error,
            Deployed,
            MilestonePhase,
            ModerationPhase,
            ReadyToCancel,
            FundsRecovered,
            MilestoneSuccess,
            Failed,
        ];
        // Terminal states have no way out.
        for terminal in [Cancelled, Failed, FundsRecovered, Error] {
            for next in all {
                if next != terminal {
                    assert!(!terminal.can_transition_to(next), "{terminal:?} -> {next:?}");
                }
            }
        }
        assert!(ReadyToCancel.can_transition_to(MilestonePhase));
        assert!(ReadyToCancel.can_transition_to(Cancelled));
        assert!(!MilestonePhase.can_transition_to(Deployed));
        assert!(!Deployed.can_transition_to(Inactive));
        assert!(!MilestoneFailed.can_transition_to(MilestonePhase));
    }

    #[test]
    fn advance_refuses_disallowed_edges() {
        let mut p = Project::new(1, ProjectParameters::default(), 0);
        assert!(!p.advance(ProjectStatus::Ended));
        assert_eq!(p.status, ProjectStatus::Inactive);
        assert!(p.advance(ProjectStatus::Deployed));
        assert_eq!(p.status, ProjectStatus::Deployed);
    }

    #[test]
    fn vote_type_from_integer() {
        assert_eq!(VoteType::try_from(0).unwrap(), VoteType::Milestone);
        assert_eq!(VoteType::try_from(1).unwrap(), VoteType::Moderation);
        assert!(VoteType::try_from(2).is_err());
    }

    #[test]
    fn lenient_value_to_i64() {
        assert_eq!(lenient::value_to_i64(&json!("42")), Some(42));
        assert_eq!(lenient::value_to_i64(&json!(42)), Some(42));
        assert_eq!(lenient::value_to_i64(&json!(true)), None);
    }
}
