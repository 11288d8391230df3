//! MariaDB Plugin
//!
//! MariaDB speaks the MySQL protocol; the plugin embeds [`MySqlFamily`] and
//! only swaps the descriptor, the driver and the URL scheme.

use crate::engine::drivers::mysql::{url_with_query, MySqlFamily};
use crate::engine::error::EngineResult;
use crate::engine::traits::{EnginePlugin, PluginProvider};
use crate::engine::types::{ConnectionAttributes, EngineCategory, EngineDescriptor};

fn mariadb_url(host: &str, port: u16, database: &str, properties: &str) -> String {
    url_with_query("jdbc:mariadb:", host, port, database, properties)
}

pub static DESCRIPTOR: EngineDescriptor =
    EngineDescriptor::new(EngineCategory::DataSource, "mariadb", "MariaDB");

pub const DRIVER: &str = "org.mariadb.jdbc.Driver";

/// MariaDB plugin implementation
#[derive(Clone)]
pub struct MariaDbPlugin {
    family: MySqlFamily,
}

impl MariaDbPlugin {
    pub fn new() -> Self {
        Self {
            family: MySqlFamily::new(mariadb_url),
        }
    }
}

impl Default for MariaDbPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl EnginePlugin for MariaDbPlugin {
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
    Box::new(MariaDbPlugin::new())
}

pub fn provider() -> PluginProvider {
    PluginProvider::from_fn(&DESCRIPTOR, create)
}
