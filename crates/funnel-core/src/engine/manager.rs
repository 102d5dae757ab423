//! Registry of in-flight executions.
//!
//! The `ExecutionManager` owns the active-run map (one entry per execution
//! ID, each with a `CancellationToken`) and the semaphore bounding how many
//! runs may be in flight at once. It is constructed once and shared by
//! `Arc` between the engine and whoever needs to cancel runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::EngineError;

/// Bookkeeping for one in-flight run.
#[derive(Debug, Clone)]
pub struct ActiveExecution {
    pub funnel_id: String,
    pub started_at: DateTime<Utc>,
    token: CancellationToken,
}

/// Snapshot of an active run for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveExecutionInfo {
    pub id: Uuid,
    pub funnel_id: String,
    pub started_at: DateTime<Utc>,
    pub cancel_requested: bool,
}

pub struct ExecutionManager {
    active: DashMap<Uuid, ActiveExecution>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ExecutionManager {
    /// A manager allowing `max_concurrent` runs at once (at least one).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            active: DashMap::new(),
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Wait for a concurrency slot. The slot is released when the permit
    /// drops.
    ///
    /// Returns `None` only if the semaphore was closed, which this manager
    /// never does.
    pub async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Track a new run and hand back its cancellation token.
    pub fn register(&self, id: Uuid, funnel_id: &str) -> Result<CancellationToken, EngineError> {
        match self.active.entry(id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyActive(id)),
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(ActiveExecution {
                    funnel_id: funnel_id.to_string(),
                    started_at: Utc::now(),
                    token: token.clone(),
                });
                Ok(token)
            }
        }
    }

    /// Stop tracking a run. Returns `true` if it was tracked.
    pub fn deregister(&self, id: &Uuid) -> bool {
        self.active.remove(id).is_some()
    }

    /// Request cooperative cancellation. Returns `false` for unknown runs.
    pub fn cancel(&self, id: &Uuid) -> bool {
        match self.active.get(id) {
            Some(entry) => {
                entry.token.cancel();
                tracing::info!(execution_id = %id, "execution cancellation requested");
                true
            }
            None => false,
        }
    }

    /// The cancellation token of a tracked run.
    pub fn token(&self, id: &Uuid) -> Option<CancellationToken> {
        self.active.get(id).map(|entry| entry.token.clone())
    }

    pub fn is_active(&self, id: &Uuid) -> bool {
        self.active.contains_key(id)
    }

    pub fn active_executions(&self) -> Vec<ActiveExecutionInfo> {
        let mut runs: Vec<ActiveExecutionInfo> = self
            .active
            .iter()
            .map(|entry| ActiveExecutionInfo {
                id: *entry.key(),
                funnel_id: entry.funnel_id.clone(),
                started_at: entry.started_at,
                cancel_requested: entry.token.is_cancelled(),
            })
            .collect();
        runs.sort_by_key(|r| r.id);
        runs
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for ExecutionManager {
    fn default() -> Self {
        Self::new(funnel_types::config::EngineConfig::default().max_concurrent_executions)
    }
}
