//! Events reported to the Backend.
//!
//! Every event is a JSON object with snake_case keys posted to a path that
//! encodes the owner and the event tag.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::models::{ActivityStatus, ActivityType, EventType, OwnerKind};

/// A single Backend notification: where it goes and what it carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendEvent {
    #[serde(skip)]
    pub path: String,
    pub body: Value,
}

impl BackendEvent {
    /// Project-scoped event, e.g. `PROJECT_CREATE` once a contract is deployed.
    pub fn project(
        event: EventType,
        project_id: i64,
        contract_address: &str,
        status: bool,
        extra: Value,
    ) -> Self {
        let mut body = Map::new();
        body.insert("event_type".into(), json!(event.as_str()));
        body.insert("project_id".into(), json!(project_id));
        body.insert("project_contract".into(), json!(contract_address));
        body.insert("status".into(), json!(status));
        merge(&mut body, extra);
        Self {
            path: format!("/events/blockchain/projects/{project_id}/{event}"),
            body: Value::Object(body),
        }
    }

    /// CampShare event addressed by user. `CS_POST_INTEREST` is global and
    /// carries no user segment.
    pub fn campshare(event: EventType, user_id: i64, status: bool, extra: Value) -> Self {
        let mut body = Map::new();
        body.insert("event_type".into(), json!(event.as_str()));
        body.insert("user_id".into(), json!(user_id));
        body.insert("status".into(), json!(status));
        merge(&mut body, extra);
        let path = match event {
            EventType::PostInterest => format!("/events/blockchain/cs/{event}/"),
            _ => format!("/events/blockchain/cs/{user_id}/{event}"),
        };
        Self {
            path,
            body: Value::Object(body),
        }
    }

    /// Account-level answer such as a user's on-chain balance.
    pub fn user(event: EventType, user_id: i64, extra: Value) -> Self {
        let mut body = Map::new();
        body.insert("event_type".into(), json!(event.as_str()));
        body.insert("user_id".into(), json!(user_id));
        body.insert("status".into(), json!(true));
        merge(&mut body, extra);
        Self {
            path: format!("/events/blockchain/users/{user_id}/{event}/"),
            body: Value::Object(body),
        }
    }

    /// Generic outcome of one activity. Used for failures and for
    /// activity types without a dedicated completion event.
    pub fn activity_outcome(
        kind: OwnerKind,
        owner_id: i64,
        activity_type: ActivityType,
        status: ActivityStatus,
        transaction_hash: Option<&str>,
    ) -> Self {
        let (segment, id_key) = match kind {
            OwnerKind::Project => ("projects", "project_id"),
            OwnerKind::CampShare => ("cs", "user_id"),
        };
        let event_type = activity_type
            .event_type()
            .map(|e| e.as_str())
            .unwrap_or_else(|| activity_type.as_str());
        let mut body = Map::new();
        body.insert("event_type".into(), json!(event_type));
        body.insert(id_key.into(), json!(owner_id));
        body.insert("status".into(), json!(status == ActivityStatus::Success));
        body.insert("activity_type".into(), json!(activity_type.as_str()));
        body.insert("activity_status".into(), json!(status));
        body.insert("transaction_hash".into(), json!(transaction_hash));
        Self {
            path: format!("/events/blockchain/{segment}/{owner_id}/callback/{activity_type}"),
            body: Value::Object(body),
        }
    }

    pub fn event_type(&self) -> Option<&str> {
        self.body.get("event_type").and_then(Value::as_str)
    }
}

fn merge(body: &mut Map<String, Value>, extra: Value) {
    if let Value::Object(fields) = extra {
        body.extend(fields);
    }
}
