//! Engine context shared by the API handlers, callbacks and scheduler.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::warn;

use crate::backend::Backend;
use crate::config::Config;
use crate::errors::Result;
use crate::events::BackendEvent;
use crate::locks::OwnerLocks;
use crate::models::{ActivityType, OwnerKind};
use crate::relayer::Relayer;

pub struct Oracle {
    pub pool: SqlitePool,
    pub relayer: Arc<dyn Relayer>,
    pub backend: Arc<dyn Backend>,
    pub config: Arc<Config>,
    pub locks: OwnerLocks,
}

impl Oracle {
    pub fn new(
        pool: SqlitePool,
        relayer: Arc<dyn Relayer>,
        backend: Arc<dyn Backend>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            pool,
            relayer,
            backend,
            config,
            locks: OwnerLocks::new(),
        }
    }

    /// Where the Relayer reports back. CampShare callbacks are addressed by
    /// user id, project callbacks by project id.
    pub fn callback_url(&self, kind: OwnerKind, id: i64, activity_type: ActivityType) -> String {
        let segment = match kind {
            OwnerKind::Project => "projects",
            OwnerKind::CampShare => "cs",
        };
        format!(
            "{}/{segment}/{id}/callback/{activity_type}",
            self.config.app_domain.trim_end_matches('/')
        )
    }

    /// Send one event to the Backend, logging a failed delivery.
    pub async fn notify(&self, event: &BackendEvent) -> Result<()> {
        let result = self.backend.notify(event).await;
        if let Err(e) = &result {
            warn!(path = %event.path, "Backend notification failed: {e}");
        }
        result
    }
}
