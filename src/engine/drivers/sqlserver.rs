//! SQL Server Plugin
//!
//! SQL Server carries the database and every property as `;key=value`
//! segments after the authority.

use crate::engine::error::EngineResult;
use crate::engine::traits::{
    encode_properties, format_host, require_complete, EnginePlugin, PluginProvider,
};
use crate::engine::types::{ConnectionAttributes, EngineCategory, EngineDescriptor};

pub static DESCRIPTOR: EngineDescriptor =
    EngineDescriptor::new(EngineCategory::DataSource, "sqlserver", "Microsoft SQL Server");

pub const DRIVER: &str = "com.microsoft.sqlserver.jdbc.SQLServerDriver";

/// SQL Server plugin implementation
#[derive(Debug, Clone, Default)]
pub struct SqlServerPlugin {
    attributes: ConnectionAttributes,
}

impl SqlServerPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnginePlugin for SqlServerPlugin {
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
            "jdbc:sqlserver://{}:{};databaseName={}",
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
    Box::new(SqlServerPlugin::new())
}

pub fn provider() -> PluginProvider {
    PluginProvider::from_fn(&DESCRIPTOR, create)
}
