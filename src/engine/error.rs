//! Engine errors
//!
//! A single error type shared by the plugin registry, the engine plugins,
//! the routing context and the session facade.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No such engine type: {identifier}")]
    UnknownEngineType { identifier: String },

    #[error("Engine type registered more than once: {identifier}")]
    DuplicateEngineRegistration { identifier: String },

    #[error("Incomplete connection attributes for {engine}: missing {}", .missing.join(", "))]
    IncompleteConnectionAttributes {
        engine: String,
        missing: Vec<&'static str>,
    },

    #[error("Routing key '{key}' is still bound at the start of a new unit of work")]
    RoutingKeyLeak { key: String },

    #[error("No routing scope is active; run the work inside unit_of_work or routed")]
    NoRoutingScope,

    #[error("Plugin registry has not been initialized")]
    RegistryNotInitialized,

    #[error("Invalid attribute '{name}': {message}")]
    InvalidAttribute { name: String, message: String },

    #[error("No internal store registered for routing key '{key}'")]
    StoreNotFound { key: String },

    #[error("Internal store table has no default '{key}' store")]
    MissingDefaultStore { key: String },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn unknown_engine(identifier: impl Into<String>) -> Self {
        Self::UnknownEngineType {
            identifier: identifier.into(),
        }
    }

    pub fn duplicate_engine(identifier: impl Into<String>) -> Self {
        Self::DuplicateEngineRegistration {
            identifier: identifier.into(),
        }
    }

    pub fn incomplete(engine: impl Into<String>, missing: Vec<&'static str>) -> Self {
        Self::IncompleteConnectionAttributes {
            engine: engine.into(),
            missing,
        }
    }

    pub fn invalid_attribute(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn store_not_found(key: impl Into<String>) -> Self {
        Self::StoreNotFound { key: key.into() }
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound(id.into())
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
