//! Test doubles and fixtures shared by the unit tests.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::backend::Backend;
use crate::callback::RelayerCallback;
use crate::config::Config;
use crate::db::{self, projects};
use crate::errors::{OracleError, Result};
use crate::events::BackendEvent;
use crate::models::{ActivityType, Project, ProjectParameters, ProjectStatus};
use crate::oracle::Oracle;
use crate::relayer::{Relayer, RelayerRequest};

/// Fresh in-memory database with migrations applied. One connection, kept
/// alive for the life of the pool, so every query sees the same database.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

/// Milestones used by [`seed_project`], in milliseconds.
pub const FAR_MILESTONES_MS: [i64; 2] = [4_000_000_000_000, 4_100_000_000_000];

pub fn sample_parameters() -> ProjectParameters {
    ProjectParameters {
        milestones: FAR_MILESTONES_MS.to_vec(),
        release_percents: vec![50, 50],
        backers: vec![101, 102, 103],
        amounts: vec![10, 20, 30],
        creator: 7,
        ..Default::default()
    }
}

/// Insert an Inactive project with [`sample_parameters`].
pub async fn seed_project(pool: &SqlitePool, id: i64) -> Project {
    let project = Project::new(id, sample_parameters(), 1_000);
    projects::insert_project(pool, &project).await.unwrap();
    projects::get_project(pool, id).await.unwrap()
}

/// Overwrite a project's status (and optionally its address) for a test.
pub async fn force_status(pool: &SqlitePool, id: i64, status: ProjectStatus) -> Project {
    let mut project = projects::get_project(pool, id).await.unwrap();
    project.status = status;
    if project.contract_address.is_empty() {
        project.contract_address = format!("0xproject{id}");
    }
    projects::update_project(pool, &mut project).await.unwrap();
    project
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        api_port: 0,
        app_domain: "http://oracle.test".into(),
        app_auth_token: "test-token".into(),
        cors_allowed_origins: "*".into(),
        relayer_url: "http://relayer.test".into(),
        relayer_auth_token: String::new(),
        backend_url: "http://backend.test".into(),
        backend_auth_token: String::new(),
        milestone_check_interval_secs: 60,
        fund_recovery_interval_secs: 3600,
        fund_recovery_dormancy_days: 90,
        cs_unstake_period_secs: 604_800,
        pending_sweep_interval_secs: 300,
        pending_activity_timeout_secs: 600,
    }
}

// ─────────────────────────────────────────────────────────
// Recording collaborators
// ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingRelayer {
    requests: Mutex<Vec<RelayerRequest>>,
    queries: Mutex<Vec<String>>,
    fail: AtomicBool,
    query_value: AtomicI64,
}

impl RecordingRelayer {
    pub fn requests(&self) -> Vec<RelayerRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn of_type(&self, activity_type: ActivityType) -> Vec<RelayerRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.transaction_type == activity_type)
            .collect()
    }

    pub fn last(&self) -> RelayerRequest {
        self.requests().pop().expect("no relayer request recorded")
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_query_value(&self, value: i64) {
        self.query_value.store(value, Ordering::SeqCst);
    }
}

#[async_trait]
impl Relayer for RecordingRelayer {
    async fn dispatch(&self, request: &RelayerRequest) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OracleError::Dispatch("relayer unavailable".into()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn query(&self, path: &str) -> Result<i64> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OracleError::Dispatch("relayer unavailable".into()));
        }
        self.queries.lock().unwrap().push(path.to_string());
        Ok(self.query_value.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
pub struct RecordingBackend {
    events: Mutex<Vec<BackendEvent>>,
    fail: AtomicBool,
}

impl RecordingBackend {
    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.event_type().map(str::to_string))
            .collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn notify(&self, event: &BackendEvent) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OracleError::Dispatch("backend unavailable".into()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

pub struct Harness {
    pub oracle: Arc<Oracle>,
    pub relayer: Arc<RecordingRelayer>,
    pub backend: Arc<RecordingBackend>,
}

pub async fn harness() -> Harness {
    let relayer = Arc::new(RecordingRelayer::default());
    let backend = Arc::new(RecordingBackend::default());
    let oracle = Arc::new(Oracle::new(
        memory_pool().await,
        relayer.clone(),
        backend.clone(),
        Arc::new(test_config()),
    ));
    Harness {
        oracle,
        relayer,
        backend,
    }
}

// ─────────────────────────────────────────────────────────
// Callback bodies
// ─────────────────────────────────────────────────────────

pub fn callback(activity_id: i64, status: i32, events: Value) -> RelayerCallback {
    serde_json::from_value(json!({
        "transaction_uuid": "00000000-0000-0000-0000-000000000000",
        "transaction_parent_id": activity_id,
        "transaction_hash": format!("0xhash{activity_id}"),
        "transaction_status": status,
        "transaction_contract_address": "0xcontract",
        "transaction_events": events,
    }))
    .unwrap()
}

pub fn complete(activity_id: i64, events: Value) -> RelayerCallback {
    callback(activity_id, 2, events)
}
