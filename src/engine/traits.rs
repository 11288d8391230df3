//! EnginePlugin trait definition
//!
//! This is the core abstraction that every engine plugin must implement.
//! It gives generic code one way to configure an engine and obtain the
//! driver and connection string the connection facade needs, whatever the
//! engine behind it.

use std::sync::Arc;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{ConnectionAttributes, ConnectionDescriptor, EngineDescriptor};

/// Core trait that all engine plugins must implement
///
/// Plugins hold connection attributes only. They never perform I/O: opening
/// a connection is the job of the connection facade.
pub trait EnginePlugin: Send + Sync {
    /// Replaces the connection attributes
    ///
    /// May be called any number of times before the plugin is used.
    fn configure(&mut self, attributes: ConnectionAttributes);

    /// Returns the currently configured attributes
    fn attributes(&self) -> &ConnectionAttributes;

    /// Returns the descriptor for this plugin type
    fn descriptor(&self) -> &'static EngineDescriptor;

    /// Returns the vendor driver the connection facade should load
    fn driver_identifier(&self) -> &'static str;

    /// Builds the engine-specific connection string from the current attributes
    ///
    /// Fails with `IncompleteConnectionAttributes` when host, port or
    /// database name are missing.
    fn connection_string(&self) -> EngineResult<String>;

    /// Driver identifier and connection string together
    fn connection_descriptor(&self) -> EngineResult<ConnectionDescriptor> {
        Ok(ConnectionDescriptor {
            driver: self.driver_identifier().to_string(),
            url: self.connection_string()?,
        })
    }
}

/// Creates fresh, unconfigured plugin instances of one engine type
pub trait PluginFactory: Send + Sync {
    fn descriptor(&self) -> &'static EngineDescriptor;

    fn create(&self) -> Box<dyn EnginePlugin>;
}

/// A factory built from a plain constructor function
pub struct FnFactory {
    descriptor: &'static EngineDescriptor,
    constructor: fn() -> Box<dyn EnginePlugin>,
}

impl FnFactory {
    pub fn new(
        descriptor: &'static EngineDescriptor,
        constructor: fn() -> Box<dyn EnginePlugin>,
    ) -> Self {
        Self {
            descriptor,
            constructor,
        }
    }
}

impl PluginFactory for FnFactory {
    fn descriptor(&self) -> &'static EngineDescriptor {
        self.descriptor
    }

    fn create(&self) -> Box<dyn EnginePlugin> {
        (self.constructor)()
    }
}

/// What an engine module announces to the registry
#[derive(Clone)]
pub struct PluginProvider {
    pub factory: Arc<dyn PluginFactory>,
}

impl PluginProvider {
    pub fn new(factory: Arc<dyn PluginFactory>) -> Self {
        Self { factory }
    }

    pub fn from_fn(
        descriptor: &'static EngineDescriptor,
        constructor: fn() -> Box<dyn EnginePlugin>,
    ) -> Self {
        Self::new(Arc::new(FnFactory::new(descriptor, constructor)))
    }

    pub fn identifier(&self) -> String {
        self.factory.descriptor().identifier()
    }
}

/// Shared check used by every engine before formatting a connection string.
pub(crate) fn require_complete<'a>(
    descriptor: &EngineDescriptor,
    attributes: &'a ConnectionAttributes,
) -> EngineResult<(&'a str, u16, &'a str)> {
    attributes
        .required()
        .map_err(|missing| EngineError::incomplete(descriptor.identifier(), missing))
}

/// Formats a host for use inside a URL authority, bracketing IPv6 literals.
pub(crate) fn format_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Joins extra attributes as `key=value` pairs with the given separator.
pub(crate) fn encode_properties(attributes: &ConnectionAttributes, separator: &str) -> String {
    attributes
        .extra_attributes
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join(separator)
}
