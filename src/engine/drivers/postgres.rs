//! PostgreSQL Plugin
//!
//! Implements the EnginePlugin trait for PostgreSQL databases.

use crate::engine::drivers::mysql::url_with_query;
use crate::engine::error::EngineResult;
use crate::engine::traits::{
    encode_properties, format_host, require_complete, EnginePlugin, PluginProvider,
};
use crate::engine::types::{ConnectionAttributes, EngineCategory, EngineDescriptor};

pub static DESCRIPTOR: EngineDescriptor =
    EngineDescriptor::new(EngineCategory::DataSource, "postgresql", "PostgreSQL");

pub const DRIVER: &str = "org.postgresql.Driver";

/// PostgreSQL plugin implementation
#[derive(Debug, Clone, Default)]
pub struct PostgresPlugin {
    attributes: ConnectionAttributes,
}

impl PostgresPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnginePlugin for PostgresPlugin {
    fn configure(&mut self, attributes: ConnectionAttributes) {
        self.attributes = attributes;
    }

    fn attributes(&self) -> &ConnectionAttributes {
        &self.attributes
    }

    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn driver_identifier(&self) -> &'static str {
        DRIVER
    }

    fn connection_string(&self) -> EngineResult<String> {
        let (host, port, database) = require_complete(&DESCRIPTOR, &self.attributes)?;
        Ok(url_with_query(
            "jdbc:postgresql:",
            &format_host(host),
            port,
            &urlencoding::encode(database),
            &encode_properties(&self.attributes, "&"),
        ))
    }
}

fn create() -> Box<dyn EnginePlugin> {
    Box::new(PostgresPlugin::new())
}

pub fn provider() -> PluginProvider {
    PluginProvider::from_fn(&DESCRIPTOR, create)
}
