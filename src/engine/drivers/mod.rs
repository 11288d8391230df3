//! Engine plugins
//!
//! Every engine module exposes a `provider()` announcing its descriptor and
//! factory. The registry reads them through [`builtin_providers`] and never
//! names an engine itself.

pub mod hive;
pub mod mariadb;
pub mod mysql;
pub mod postgres;
pub mod sqlserver;

use crate::engine::traits::PluginProvider;

const PROVIDERS: &[fn() -> PluginProvider] = &[
    mysql::provider,
    mariadb::provider,
    postgres::provider,
    hive::provider,
    sqlserver::provider,
];

/// Providers of every engine compiled into this build.
pub fn builtin_providers() -> Vec<PluginProvider> {
    PROVIDERS.iter().map(|provider| provider()).collect()
}
