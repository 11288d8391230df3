//! Store Router
//!
//! Maps the ambient routing key to one of the application's own internal
//! stores. Internal persistence code asks the router for the current store
//! instead of carrying a store handle through every call.

use std::collections::HashMap;

use tracing::debug;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::PluginRegistry;
use crate::engine::routing::{routing_key, DEFAULT_ROUTING_KEY};
use crate::engine::types::{ConnectionDescriptor, DataSourceRecord};

pub struct StoreRouter {
    stores: HashMap<String, DataSourceRecord>,
}

impl StoreRouter {
    /// Builds the router; the table must contain the default `master` store.
    pub fn new<I>(stores: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (String, DataSourceRecord)>,
    {
        let stores: HashMap<String, DataSourceRecord> = stores.into_iter().collect();
        if !stores.contains_key(DEFAULT_ROUTING_KEY) {
            return Err(EngineError::MissingDefaultStore {
                key: DEFAULT_ROUTING_KEY.to_string(),
            });
        }
        Ok(Self { stores })
    }

    /// Store selected by the calling unit of work's routing key
    pub fn current(&self) -> EngineResult<&DataSourceRecord> {
        let key = routing_key();
        debug!(routing_key = %key, "Selecting internal store");
        self.stores
            .get(&key)
            .ok_or_else(|| EngineError::store_not_found(key))
    }

    pub fn get(&self, key: &str) -> Option<&DataSourceRecord> {
        self.stores.get(key)
    }

    /// Connection descriptor of the current store, built by its engine plugin
    pub fn descriptor_for_current(
        &self,
        registry: &PluginRegistry,
    ) -> EngineResult<ConnectionDescriptor> {
        let store = self.current()?;
        registry
            .create(&store.engine_type, store.to_attributes())?
            .connection_descriptor()
    }

    /// Registered routing keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.stores.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}
