//! Axum REST API: action triggers, Relayer callbacks and state queries.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::callback::{CallbackReport, RelayerCallback};
use crate::config::Config;
use crate::dispatch::{
    Accepted, AmountRequest, CreateProjectRequest, SetBackersRequest, SetModeratorsRequest,
    SetProjectInfoRequest, UserRequest, VoteRequest,
};
use crate::errors::{ErrorResponse, OracleError, Result};
use crate::models::{ActivityType, OwnerKind, VoteType};
use crate::oracle::Oracle;
use crate::queries::{CampShareState, ProjectState, StalledActivities};

type ApiState = Arc<Oracle>;
type Dispatched = Result<(StatusCode, Json<Accepted>)>;

pub fn router(oracle: ApiState) -> Result<Router> {
    let cors = cors_layer(&oracle.config)?;
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/activities/stalled", get(stalled))
        // Projects
        .route("/projects/:id", get(project_state).post(create_project))
        .route("/projects/:id/SET_BACKERS", post(set_backers))
        .route("/projects/:id/SET_PROJECT_INFO", post(set_project_info))
        .route("/projects/:id/START_MODERATION", post(set_moderators))
        .route("/projects/:id/MILESTONE_VOTE", post(milestone_vote))
        .route("/projects/:id/MODERATION_VOTE", post(moderation_vote))
        .route("/projects/:id/COMMIT_MODERATION_VOTES", post(commit_moderation_votes))
        .route("/projects/:id/CANCEL_PROJECT", post(cancel_project))
        .route("/projects/:id/CHECK_MILESTONE", post(check_milestone))
        .route("/projects/:id/WITHDRAW_FUNDS", post(withdraw_funds))
        .route("/projects/:id/REQUEST_REFUND", post(request_refund))
        .route("/projects/:id/FAILED_FUND_RECOVERY", post(failed_fund_recovery))
        .route("/projects/:id/callback/:transaction_type", post(project_callback))
        // CampShares
        .route("/cs/:id", get(campshare_state))
        .route("/cs/:id/GET_GAINS", get(gains))
        .route("/cs/:id/STAKE_PLG", post(stake_plg))
        .route("/cs/:id/UNSTAKE_PLG", post(unstake_plg))
        .route("/cs/:id/WITHDRAW_INTEREST", post(withdraw_interest))
        .route("/cs/:id/REINVEST_PLG", post(reinvest_plg))
        .route("/cs/:id/POST_INTEREST", post(post_interest))
        .route("/cs/:id/callback/:transaction_type", post(campshare_callback))
        .route("/users/:id/GET_BALANCE", get(balance))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(oracle);
    Ok(router)
}

fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let origins = config.cors_allowed_origins.trim();
    if origins == "*" {
        return Ok(CorsLayer::permissive());
    }
    let origin = HeaderValue::from_str(origins)
        .map_err(|_| OracleError::Config(format!("Invalid CORS origin: {origins}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

// ─────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────

/// Present on handlers that change state. Rejects requests without the
/// configured bearer token.
pub struct Authorized;

#[async_trait]
impl FromRequestParts<ApiState> for Authorized {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let expected = state.config.app_auth_token.as_str();
        match bearer_token(&parts.headers) {
            Some(token) if !expected.is_empty() && token == expected => Ok(Self),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "missing or invalid bearer token".to_string(),
                    retryable: false,
                }),
            )),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get("Authorization")?.to_str().ok()?;
    raw.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

fn accepted(accepted: Accepted) -> (StatusCode, Json<Accepted>) {
    (StatusCode::ACCEPTED, Json(accepted))
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(json!({ "msg": "Pledgecamp oracle" }))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /activities/stalled`
///
/// Pending activities that never got a callback within the timeout.
pub async fn stalled(
    _: Authorized,
    State(oracle): State<ApiState>,
) -> Result<Json<StalledActivities>> {
    Ok(Json(oracle.stalled_activities().await?))
}

/// `GET /projects/:id`
pub async fn project_state(
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<ProjectState>> {
    Ok(Json(oracle.project_state(id).await?))
}

/// `POST /projects/:id`
///
/// Registers the project and requests its contract deployment.
pub async fn create_project(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<CreateProjectRequest>,
) -> Dispatched {
    Ok(accepted(oracle.create_project(id, &req).await?))
}

pub async fn set_backers(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<SetBackersRequest>,
) -> Dispatched {
    Ok(accepted(oracle.set_backers(id, &req).await?))
}

pub async fn set_project_info(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<SetProjectInfoRequest>,
) -> Dispatched {
    Ok(accepted(oracle.set_project_info(id, &req).await?))
}

pub async fn set_moderators(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<SetModeratorsRequest>,
) -> Dispatched {
    Ok(accepted(oracle.set_moderators(id, &req).await?))
}

pub async fn milestone_vote(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> Dispatched {
    Ok(accepted(oracle.submit_vote(id, VoteType::Milestone, &req).await?))
}

pub async fn moderation_vote(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> Dispatched {
    Ok(accepted(oracle.submit_vote(id, VoteType::Moderation, &req).await?))
}

pub async fn commit_moderation_votes(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.commit_moderation_votes(id).await?))
}

pub async fn cancel_project(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.cancel_project(id).await?))
}

pub async fn check_milestone(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.check_milestone(id).await?))
}

pub async fn withdraw_funds(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<UserRequest>,
) -> Dispatched {
    Ok(accepted(
        oracle.release_funds(id, ActivityType::WithdrawFunds, req.user_id).await?,
    ))
}

pub async fn request_refund(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
    Json(req): Json<UserRequest>,
) -> Dispatched {
    Ok(accepted(
        oracle.release_funds(id, ActivityType::RequestRefund, req.user_id).await?,
    ))
}

pub async fn failed_fund_recovery(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.failed_fund_recovery(id).await?))
}

/// `POST /projects/:id/callback/:transaction_type`
pub async fn project_callback(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path((id, transaction_type)): Path<(i64, String)>,
    Json(cb): Json<RelayerCallback>,
) -> Result<Json<CallbackReport>> {
    let report = oracle
        .handle_callback(OwnerKind::Project, id, &transaction_type, cb)
        .await?;
    Ok(Json(report))
}

/// `GET /cs/:id`
///
/// CampShare ledger, confirmed balance and unrealized gains of one user.
pub async fn campshare_state(
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<Json<CampShareState>> {
    Ok(Json(oracle.campshare_state(user_id).await?))
}

/// `GET /cs/:id/GET_GAINS`
pub async fn gains(
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>> {
    let gains = oracle.get_gains(user_id).await?;
    Ok(Json(json!({ "msg": gains })))
}

/// `GET /users/:id/GET_BALANCE`
pub async fn balance(
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>> {
    let balance = oracle.get_balance(user_id).await?;
    Ok(Json(json!({ "msg": balance })))
}

pub async fn stake_plg(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
    Json(req): Json<AmountRequest>,
) -> Dispatched {
    Ok(accepted(oracle.stake_plg(user_id, req.amount).await?))
}

pub async fn unstake_plg(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.unstake_plg(user_id).await?))
}

pub async fn withdraw_interest(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.withdraw_interest(user_id).await?))
}

pub async fn reinvest_plg(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Dispatched {
    Ok(accepted(oracle.reinvest_plg(user_id).await?))
}

/// `POST /cs/:id/POST_INTEREST`
///
/// Interest is posted for everyone; the path id is not used.
pub async fn post_interest(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path(_id): Path<i64>,
    Json(req): Json<AmountRequest>,
) -> Dispatched {
    Ok(accepted(oracle.post_interest(req.amount).await?))
}

/// `POST /cs/:id/callback/:transaction_type`
pub async fn campshare_callback(
    _: Authorized,
    State(oracle): State<ApiState>,
    Path((user_id, transaction_type)): Path<(i64, String)>,
    Json(cb): Json<RelayerCallback>,
) -> Result<Json<CallbackReport>> {
    let report = oracle
        .handle_callback(OwnerKind::CampShare, user_id, &transaction_type, cb)
        .await?;
    Ok(Json(report))
}
