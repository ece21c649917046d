//! Per-owner serialisation of read-modify-write sections.
//!
//! One async mutex per `(OwnerKind, id)`, created on first use. Guards are
//! held across store calls only, never across a Relayer or Backend call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::OwnerKind;

type Key = (OwnerKind, i64);

#[derive(Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, kind: OwnerKind, id: i64) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            // Drop entries nobody is waiting on so the map stays small.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks
                .entry((kind, id))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_owner_is_serialised() {
        let locks = Arc::new(OwnerLocks::new());
        let guard = locks.lock(OwnerKind::Project, 1).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock(OwnerKind::Project, 1).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_owners_do_not_block() {
        let locks = OwnerLocks::new();
        let _a = locks.lock(OwnerKind::Project, 1).await;
        let _b = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock(OwnerKind::CampShare, 1),
        )
        .await
        .unwrap();
    }
}
