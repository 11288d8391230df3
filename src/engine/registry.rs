//! Plugin Registry
//!
//! Central registry for all available engine plugins.
//! Built once from the providers the engine modules announce, then read
//! without locking for the rest of the process.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::engine::drivers::builtin_providers;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::{EnginePlugin, PluginFactory, PluginProvider};
use crate::engine::types::{normalize_identifier, ConnectionAttributes, EngineDescriptor};

static GLOBAL: OnceLock<PluginRegistry> = OnceLock::new();

/// Registry that maps engine identifiers to plugin factories
pub struct PluginRegistry {
    factories: HashMap<String, Arc<dyn PluginFactory>>,
}

impl PluginRegistry {
    /// Builds a registry from the given providers
    ///
    /// Fails on the first identifier announced twice.
    pub fn from_providers<I>(providers: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = PluginProvider>,
    {
        let mut factories: HashMap<String, Arc<dyn PluginFactory>> = HashMap::new();

        for provider in providers {
            let identifier = normalize_identifier(&provider.identifier());
            if factories.contains_key(&identifier) {
                return Err(EngineError::duplicate_engine(identifier));
            }
            debug!(engine = %identifier, "Registered engine plugin");
            factories.insert(identifier, provider.factory);
        }

        Ok(Self { factories })
    }

    /// Initializes the process-wide registry from the builtin providers
    ///
    /// Only the first call builds the registry; later calls return it.
    pub fn initialize() -> EngineResult<&'static PluginRegistry> {
        if let Some(registry) = GLOBAL.get() {
            return Ok(registry);
        }

        let registry = Self::from_providers(builtin_providers())?;
        let count = registry.len();
        if GLOBAL.set(registry).is_ok() {
            info!(engines = count, "Plugin registry initialized");
        }

        GLOBAL.get().ok_or(EngineError::RegistryNotInitialized)
    }

    /// Returns the process-wide registry, failing if it was never initialized
    pub fn global() -> EngineResult<&'static PluginRegistry> {
        GLOBAL.get().ok_or(EngineError::RegistryNotInitialized)
    }

    /// Gets the factory for an engine identifier or tag
    ///
    /// Lookup is case-insensitive; `mysql` and `DATASOURCE_MYSQL` are the same key.
    pub fn resolve(&self, identifier: &str) -> EngineResult<Arc<dyn PluginFactory>> {
        self.factories
            .get(&normalize_identifier(identifier))
            .cloned()
            .ok_or_else(|| EngineError::unknown_engine(identifier))
    }

    /// Resolves, creates and configures a plugin instance in one step
    pub fn create(
        &self,
        identifier: &str,
        attributes: ConnectionAttributes,
    ) -> EngineResult<Box<dyn EnginePlugin>> {
        let mut plugin = self.resolve(identifier)?.create();
        plugin.configure(attributes);
        Ok(plugin)
    }

    /// Checks whether an engine is registered
    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(&normalize_identifier(identifier))
    }

    /// Lists all registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Lists the descriptors of all registered engines, sorted by identifier
    pub fn descriptors(&self) -> Vec<&'static EngineDescriptor> {
        let mut descriptors: Vec<&'static EngineDescriptor> =
            self.factories.values().map(|f| f.descriptor()).collect();
        descriptors.sort_by_key(|d| d.identifier());
        descriptors
    }

    /// Returns the number of registered engines
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no engines are registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::engine::drivers::{mariadb, mysql};

    #[test]
    fn every_builtin_round_trips_through_resolve() {
        let registry = PluginRegistry::from_providers(builtin_providers()).expect("no duplicates");

        for provider in builtin_providers() {
            let identifier = provider.identifier();
            let plugin = registry.resolve(&identifier).expect("registered").create();
            assert_eq!(plugin.descriptor().identifier(), identifier);
        }
    }

    #[test]
    fn builtin_identifiers_are_unique() {
        let ids: Vec<String> = builtin_providers().iter().map(|p| p.identifier()).collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn duplicate_registration_fails() {
        let providers = vec![mysql::provider(), mariadb::provider(), mysql::provider()];

        match PluginRegistry::from_providers(providers) {
            Err(EngineError::DuplicateEngineRegistration { identifier }) => {
                assert_eq!(identifier, "DATASOURCE_MYSQL");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("duplicate registration should fail"),
        }
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let registry = PluginRegistry::from_providers(builtin_providers()).expect("no duplicates");

        for id in ["mysql", "MySQL", "datasource_mysql", "DATASOURCE-MYSQL"] {
            let factory = registry.resolve(id).expect("should resolve");
            assert_eq!(factory.descriptor().identifier(), "DATASOURCE_MYSQL");
        }
        assert!(registry.contains("Hive"));
    }

    #[test]
    fn unknown_engine_is_an_error() {
        let registry = PluginRegistry::from_providers(builtin_providers()).expect("no duplicates");

        let err = registry.resolve("oracle").err().expect("oracle is not registered");
        assert!(matches!(err, EngineError::UnknownEngineType { ref identifier } if identifier == "oracle"));
    }

    #[test]
    fn create_configures_the_new_instance() {
        let registry = PluginRegistry::from_providers(builtin_providers()).expect("no duplicates");
        let attributes = ConnectionAttributes::new()
            .with_host("db1")
            .with_port(3306)
            .with_database("shop")
            .with_extra("useSSL", "false");

        let plugin = registry.create("mariadb", attributes).expect("registered");
        let descriptor = plugin.connection_descriptor().expect("configured");
        assert_eq!(descriptor.driver, mariadb::DRIVER);
        assert_eq!(descriptor.url, "jdbc:mariadb://db1:3306/shop?useSSL=false");
    }

    #[test]
    fn listing_is_sorted() {
        let registry = PluginRegistry::from_providers(builtin_providers()).expect("no duplicates");
        assert_eq!(
            registry.identifiers(),
            vec![
                "DATASOURCE_HIVE",
                "DATASOURCE_MARIADB",
                "DATASOURCE_MYSQL",
                "DATASOURCE_POSTGRESQL",
                "DATASOURCE_SQLSERVER",
            ]
        );
        assert_eq!(registry.descriptors().len(), registry.len());
    }

    #[test]
    fn global_registry_is_shared() {
        let first = PluginRegistry::initialize().expect("builtin providers are unique");
        let second = PluginRegistry::initialize().expect("already initialized");
        assert!(std::ptr::eq(first, second));
        assert!(std::ptr::eq(first, PluginRegistry::global().expect("initialized")));
    }
}
