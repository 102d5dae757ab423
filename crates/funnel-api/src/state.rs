//! Application state wiring the engine together.
//!
//! `AppState` holds the configuration and the shared, read-only pieces every
//! command needs. The engine itself is generic over its snapshot cache, so
//! commands build it with whichever cache they were asked for.

use std::path::Path;
use std::sync::Arc;

use funnel_core::engine::{ExecutionEngine, ExecutionManager};
use funnel_core::executor::NodeExecutorFactory;
use funnel_core::repository::cache::ExecutionCache;
use funnel_infra::config::load_funnel_config;
use funnel_infra::delivery::build_services;
use funnel_infra::metrics::TracingMetricsSink;
use funnel_infra::sqlite::{DatabasePool, SqliteExecutionCache};
use funnel_types::config::FunnelConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: FunnelConfig,
    pub factory: Arc<NodeExecutorFactory>,
    pub manager: Arc<ExecutionManager>,
}

impl AppState {
    /// Load configuration and build the executor registry.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_funnel_config(config_path).await?;
        let services = build_services(&config.delivery)?;
        let factory = NodeExecutorFactory::with_defaults(services);
        let manager = ExecutionManager::new(config.engine.max_concurrent_executions);

        tracing::debug!(
            node_types = factory.supported_types().len(),
            max_concurrent = manager.max_concurrent(),
            "application state initialized"
        );

        Ok(Self {
            config,
            factory: Arc::new(factory),
            manager: Arc::new(manager),
        })
    }

    pub fn engine<C: ExecutionCache>(&self, cache: C) -> ExecutionEngine<C> {
        ExecutionEngine::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.manager),
            Arc::new(cache),
            Arc::new(TracingMetricsSink),
            self.config.engine.clone(),
        )
    }
}

/// Open the SQLite snapshot cache at `url`.
///
/// Bare paths are accepted and turned into `sqlite://{path}?mode=rwc`.
pub async fn open_sqlite_cache(url: &str) -> anyhow::Result<SqliteExecutionCache> {
    let url = if url.starts_with("sqlite:") {
        url.to_string()
    } else {
        format!("sqlite://{url}?mode=rwc")
    };
    let pool = DatabasePool::new(&url).await?;
    let cache = SqliteExecutionCache::new(pool);
    let purged = cache.purge_expired().await?;
    if purged > 0 {
        tracing::debug!(purged, "removed expired execution snapshots");
    }
    Ok(cache)
}
