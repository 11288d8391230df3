//! MySQL Plugin
//!
//! Implements the EnginePlugin trait for MySQL.
//!
//! ## MySQL family
//!
//! MySQL and its wire-compatible forks share attribute storage and
//! configuration through [`MySqlFamily`]. A family member only supplies its
//! descriptor, driver and a [`UrlStrategy`] that formats the connection string.

use crate::engine::error::EngineResult;
use crate::engine::traits::{
    encode_properties, format_host, require_complete, EnginePlugin, PluginProvider,
};
use crate::engine::types::{ConnectionAttributes, EngineCategory, EngineDescriptor};

/// Formats a connection string from host, port, database and encoded properties.
pub type UrlStrategy = fn(host: &str, port: u16, database: &str, properties: &str) -> String;

/// Attribute storage and connection-string logic shared by the MySQL family.
#[derive(Clone)]
pub struct MySqlFamily {
    attributes: ConnectionAttributes,
    url: UrlStrategy,
}

impl MySqlFamily {
    pub fn new(url: UrlStrategy) -> Self {
        Self {
            attributes: ConnectionAttributes::new(),
            url,
        }
    }

    pub fn configure(&mut self, attributes: ConnectionAttributes) {
        self.attributes = attributes;
    }

    pub fn attributes(&self) -> &ConnectionAttributes {
        &self.attributes
    }

    pub fn connection_string(&self, descriptor: &EngineDescriptor) -> EngineResult<String> {
        let (host, port, database) = require_complete(descriptor, &self.attributes)?;
        let properties = encode_properties(&self.attributes, "&");
        Ok((self.url)(&format_host(host), port, &urlencoding::encode(database), &properties))
    }
}

/// Builds `<scheme>//host:port/database[?k=v&...]`.
pub(crate) fn url_with_query(
    scheme: &str,
    host: &str,
    port: u16,
    database: &str,
    properties: &str,
) -> String {
    let mut url = format!("{}//{}:{}/{}", scheme, host, port, database);
    if !properties.is_empty() {
        url.push('?');
        url.push_str(properties);
    }
    url
}

fn mysql_url(host: &str, port: u16, database: &str, properties: &str) -> String {
    url_with_query("jdbc:mysql:", host, port, database, properties)
}

pub static DESCRIPTOR: EngineDescriptor =
    EngineDescriptor::new(EngineCategory::DataSource, "mysql", "MySQL");

pub const DRIVER: &str = "com.mysql.cj.jdbc.Driver";

/// MySQL plugin implementation
#[derive(Clone)]
pub struct MySqlPlugin {
    family: MySqlFamily,
}

impl MySqlPlugin {
    pub fn new() -> Self {
        Self {
            family: MySqlFamily::new(mysql_url),
        }
    }
}

impl Default for MySqlPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl EnginePlugin for MySqlPlugin {
    fn configure(&mut self, attributes: ConnectionAttributes) {
        self.family.configure(attributes);
    }

    fn attributes(&self) -> &ConnectionAttributes {
        self.family.attributes()
    }

    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn driver_identifier(&self) -> &'static str {
        DRIVER
    }

    fn connection_string(&self) -> EngineResult<String> {
        self.family.connection_string(&DESCRIPTOR)
    }
}

fn create() -> Box<dyn EnginePlugin> {
    Box::new(MySqlPlugin::new())
}

pub fn provider() -> PluginProvider {
    PluginProvider::from_fn(&DESCRIPTOR, create)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::EngineError;

    fn shop_attributes() -> ConnectionAttributes {
        ConnectionAttributes::new()
            .with_host("db1")
            .with_port(3306)
            .with_database("shop")
            .with_extra("useSSL", "false")
    }

    #[test]
    fn test_connection_string_building() {
        let mut plugin = MySqlPlugin::new();
        plugin.configure(shop_attributes());

        assert_eq!(
            plugin.connection_string().expect("configured"),
            "jdbc:mysql://db1:3306/shop?useSSL=false"
        );
    }

    #[test]
    fn omits_query_when_no_extra_attributes() {
        let mut plugin = MySqlPlugin::new();
        plugin.configure(
            ConnectionAttributes::new()
                .with_host("::1")
                .with_port(3307)
                .with_database("sales db"),
        );

        assert_eq!(
            plugin.connection_string().expect("configured"),
            "jdbc:mysql://[::1]:3307/sales%20db"
        );
    }

    #[test]
    fn unconfigured_plugin_refuses_to_build() {
        let plugin = MySqlPlugin::new();
        let err = plugin.connection_string().expect_err("not configured");

        match err {
            EngineError::IncompleteConnectionAttributes { engine, missing } => {
                assert_eq!(engine, "DATASOURCE_MYSQL");
                assert_eq!(missing, vec!["hostName", "port", "databaseName"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn configure_replaces_previous_attributes() {
        let mut plugin = MySqlPlugin::new();
        plugin.configure(shop_attributes());
        plugin.configure(shop_attributes());
        plugin.configure(
            ConnectionAttributes::new()
                .with_host("db2")
                .with_port(3306)
                .with_database("shop"),
        );

        assert_eq!(
            plugin.connection_string().expect("configured"),
            "jdbc:mysql://db2:3306/shop"
        );
        assert_eq!(plugin.driver_identifier(), DRIVER);
    }
}
