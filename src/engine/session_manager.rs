//! Session Manager
//!
//! Centralized management of all open connections.
//! Resolves the engine plugin for a configured data source, hands its
//! descriptor to the connection facade and keeps the resulting handle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument};

use crate::engine::connector::{ConnectRequest, ConnectionFacade, ConnectionHandle};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::PluginRegistry;
use crate::engine::types::{ConnectionDescriptor, DataSourceRecord, SessionId};

/// Open session with its connection handle
pub struct ActiveSession {
    pub engine: String,
    pub descriptor: ConnectionDescriptor,
    pub display_name: String,
    pub connected_at: DateTime<Utc>,
    handle: Box<dyn ConnectionHandle>,
}

/// Manages all open sessions
pub struct SessionManager {
    registry: &'static PluginRegistry,
    facade: Arc<dyn ConnectionFacade>,
    sessions: RwLock<HashMap<SessionId, ActiveSession>>,
    connect_timeout: Duration,
    test_timeout: Duration,
}

impl SessionManager {
    const CONNECT_TIMEOUT_MS: u64 = 15000;
    const TEST_TIMEOUT_MS: u64 = 10000;

    pub fn new(registry: &'static PluginRegistry, facade: Arc<dyn ConnectionFacade>) -> Self {
        Self {
            registry,
            facade,
            sessions: RwLock::new(HashMap::new()),
            connect_timeout: Duration::from_millis(Self::CONNECT_TIMEOUT_MS),
            test_timeout: Duration::from_millis(Self::TEST_TIMEOUT_MS),
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, test_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.test_timeout = test_timeout;
        self
    }

    /// Resolves and configures the record's plugin, returning what the facade needs.
    ///
    /// The plugin instance does not outlive this call.
    pub fn prepare(&self, record: &DataSourceRecord) -> EngineResult<ConnectRequest> {
        let plugin = self
            .registry
            .create(&record.engine_type, record.to_attributes())?;
        let descriptor = plugin.connection_descriptor()?;

        Ok(ConnectRequest {
            engine: plugin.descriptor().identifier(),
            descriptor,
            attributes: plugin.attributes().clone(),
        })
    }

    /// Tests a data source without keeping the connection
    #[instrument(
        skip(self, record),
        fields(engine = %record.engine_type, data_source = %record.name)
    )]
    pub async fn test_connection(&self, record: &DataSourceRecord) -> EngineResult<()> {
        let request = self.prepare(record)?;

        match timeout(self.test_timeout, self.facade.test(&request)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                timeout_ms: self.test_timeout.as_millis() as u64,
            }),
        }
    }

    /// Opens a connection to a data source and returns its session ID
    #[instrument(
        skip(self, record),
        fields(engine = %record.engine_type, data_source = %record.name)
    )]
    pub async fn connect(&self, record: &DataSourceRecord) -> EngineResult<SessionId> {
        let request = self.prepare(record)?;

        let handle = match timeout(self.connect_timeout, self.facade.open(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(EngineError::Timeout {
                    timeout_ms: self.connect_timeout.as_millis() as u64,
                })
            }
        };

        let session_id = SessionId::new();
        let session = ActiveSession {
            engine: request.engine,
            descriptor: request.descriptor,
            display_name: record.display_name(),
            connected_at: Utc::now(),
            handle,
        };

        debug!(session_id = %session_id.0, driver = %session.handle.driver(), "Session opened");
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, session);

        Ok(session_id)
    }

    /// Closes a session
    #[instrument(skip(self), fields(session_id = %session_id.0))]
    pub async fn disconnect(&self, session_id: SessionId) -> EngineResult<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(&session_id)
                .ok_or_else(|| EngineError::session_not_found(session_id.0.to_string()))?
        };

        session.handle.close().await;
        Ok(())
    }

    /// Closes every open session
    pub async fn disconnect_all(&self) -> usize {
        let drained: Vec<ActiveSession> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, session)| session).collect()
        };

        let count = drained.len();
        join_all(drained.iter().map(|session| session.handle.close())).await;
        count
    }

    /// Lists all open sessions
    pub async fn list_sessions(&self) -> Vec<(SessionId, String)> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .map(|(id, session)| (*id, session.display_name.clone()))
            .collect()
    }

    /// Gets the descriptor a session was opened with
    pub async fn session_descriptor(&self, session_id: SessionId) -> EngineResult<ConnectionDescriptor> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|session| session.descriptor.clone())
            .ok_or_else(|| EngineError::session_not_found(session_id.0.to_string()))
    }

    /// Checks if a session exists
    pub async fn session_exists(&self, session_id: SessionId) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains_key(&session_id)
    }
}
