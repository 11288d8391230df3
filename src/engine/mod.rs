// Data Engine Module
// Engine plugins, their registry, and ambient routing between internal stores

pub mod connector;
pub mod drivers;
pub mod error;
pub mod registry;
pub mod routing;
pub mod session_manager;
pub mod store_router;
pub mod traits;
pub mod types;

pub use connector::{ConnectRequest, ConnectionFacade, ConnectionHandle, SqlxConnector};
pub use error::{EngineError, EngineResult};
pub use registry::PluginRegistry;
pub use session_manager::SessionManager;
pub use store_router::StoreRouter;
pub use traits::{EnginePlugin, PluginFactory, PluginProvider};
pub use types::*;
