// DataPlug - pluggable data-source engines
// Core library

pub mod config;
pub mod engine;
pub mod observability;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use config::PlatformConfig;
use engine::{
    ConnectionFacade, EngineResult, PluginRegistry, SessionId, SessionManager, SqlxConnector,
    StoreRouter,
};

/// Everything a service needs to reach external data sources and its own
/// internal stores.
pub struct Platform {
    pub registry: &'static PluginRegistry,
    pub session_manager: Arc<SessionManager>,
    pub store_router: Arc<StoreRouter>,
    pub config: PlatformConfig,
}

impl Platform {
    /// Initializes the plugin registry and wires the session manager to `facade`.
    pub fn new(config: PlatformConfig, facade: Arc<dyn ConnectionFacade>) -> EngineResult<Self> {
        let registry = PluginRegistry::initialize()?;
        let store_router = Arc::new(StoreRouter::new(config.internal_stores.clone())?);
        let session_manager = Arc::new(
            SessionManager::new(registry, facade).with_timeouts(
                Duration::from_millis(config.connect_timeout_ms),
                Duration::from_millis(config.test_timeout_ms),
            ),
        );

        info!(
            engines = registry.len(),
            internal_stores = store_router.keys().len(),
            "Platform ready"
        );

        Ok(Self {
            registry,
            session_manager,
            store_router,
            config,
        })
    }

    /// Same as [`Platform::new`] with the bundled sqlx connector.
    pub fn with_sqlx(config: PlatformConfig) -> EngineResult<Self> {
        let connector = SqlxConnector::new(
            config.max_connections,
            Duration::from_millis(config.connect_timeout_ms),
        );
        Self::new(config, Arc::new(connector))
    }

    /// Opens a session on the internal store selected by the current routing key.
    pub async fn open_internal_store(&self) -> EngineResult<SessionId> {
        let record = self.store_router.current()?.clone();
        self.session_manager.connect(&record).await
    }
}
