//! Hive Plugin
//!
//! Implements the EnginePlugin trait for HiveServer2. Session properties are
//! appended to the path with `;` rather than as a query string.

use crate::engine::error::EngineResult;
use crate::engine::traits::{
    encode_properties, format_host, require_complete, EnginePlugin, PluginProvider,
};
use crate::engine::types::{ConnectionAttributes, EngineCategory, EngineDescriptor};

pub static DESCRIPTOR: EngineDescriptor =
    EngineDescriptor::new(EngineCategory::DataSource, "hive", "Apache Hive");

pub const DRIVER: &str = "org.apache.hive.jdbc.HiveDriver";

/// Hive plugin implementation
#[derive(Debug, Clone, Default)]
pub struct HivePlugin {
    attributes: ConnectionAttributes,
}

impl HivePlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnginePlugin for HivePlugin {
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
        let mut url = format!(
            "jdbc:hive2://{}:{}/{}",
            format_host(host),
            port,
            urlencoding::encode(database)
        );

        let properties = encode_properties(&self.attributes, ";");
        if !properties.is_empty() {
            url.push(';');
            url.push_str(&properties);
        }
        Ok(url)
    }
}

fn create() -> Box<dyn EnginePlugin> {
    Box::new(HivePlugin::new())
}

pub fn provider() -> PluginProvider {
    PluginProvider::from_fn(&DESCRIPTOR, create)
}
