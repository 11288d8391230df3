//! Connection facade
//!
//! Turns a [`ConnectionDescriptor`] produced by an engine plugin into a live
//! connection. The engine layer only depends on the [`ConnectionFacade`]
//! trait; [`SqlxConnector`] is the bundled implementation for the MySQL
//! family and PostgreSQL.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use crate::engine::drivers::{mariadb, mysql, postgres};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{ConnectionAttributes, ConnectionDescriptor};

/// Everything a facade needs to open one connection
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Identifier of the engine that produced the descriptor
    pub engine: String,
    pub descriptor: ConnectionDescriptor,
    /// Attributes the descriptor was built from; carries the credentials
    pub attributes: ConnectionAttributes,
}

/// A usable connection or pooled handle
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Driver the handle was opened with
    fn driver(&self) -> &str;

    /// Round-trips a trivial statement
    async fn ping(&self) -> EngineResult<()>;

    /// Releases the connection; further use is an error
    async fn close(&self);
}

/// Opens connections from engine descriptors
#[async_trait]
pub trait ConnectionFacade: Send + Sync {
    async fn open(&self, request: &ConnectRequest) -> EngineResult<Box<dyn ConnectionHandle>>;

    /// Opens, pings and closes a connection without keeping it
    async fn test(&self, request: &ConnectRequest) -> EngineResult<()> {
        let handle = self.open(request).await?;
        let result = handle.ping().await;
        handle.close().await;
        result
    }
}

enum Backend {
    MySql,
    Postgres,
}

fn backend_for(driver: &str) -> EngineResult<Backend> {
    match driver {
        mysql::DRIVER | mariadb::DRIVER => Ok(Backend::MySql),
        postgres::DRIVER => Ok(Backend::Postgres),
        other => Err(EngineError::not_supported(format!(
            "No bundled connector for driver {}",
            other
        ))),
    }
}

fn map_connect_error(e: sqlx::Error) -> EngineError {
    let msg = e.to_string();
    if msg.contains("Access denied") || msg.contains("password authentication failed") {
        EngineError::auth_failed(msg)
    } else {
        EngineError::connection_failed(msg)
    }
}

/// sqlx-backed facade for the MySQL family and PostgreSQL
pub struct SqlxConnector {
    max_connections: u32,
    acquire_timeout: Duration,
}

impl SqlxConnector {
    /// A pool size of zero is raised to one.
    pub fn new(max_connections: u32, acquire_timeout: Duration) -> Self {
        Self {
            max_connections: max_connections.max(1),
            acquire_timeout,
        }
    }

    fn mysql_options(
        attributes: &ConnectionAttributes,
        host: &str,
        port: u16,
        database: &str,
    ) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = attributes.user_name.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = attributes.password.as_deref() {
            options = options.password(password);
        }
        match attributes.extra_attributes.get("useSSL").map(String::as_str) {
            Some("true") => options.ssl_mode(MySqlSslMode::Required),
            Some("false") => options.ssl_mode(MySqlSslMode::Disabled),
            _ => options,
        }
    }

    fn postgres_options(
        attributes: &ConnectionAttributes,
        host: &str,
        port: u16,
        database: &str,
    ) -> EngineResult<PgConnectOptions> {
        let mut options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = attributes.user_name.as_deref() {
            options = options.username(user);
        }
        if let Some(password) = attributes.password.as_deref() {
            options = options.password(password);
        }
        if let Some(mode) = attributes.extra_attributes.get("sslmode") {
            let mode: PgSslMode = mode
                .parse()
                .map_err(|e: sqlx::Error| EngineError::invalid_attribute("sslmode", e.to_string()))?;
            options = options.ssl_mode(mode);
        }
        Ok(options)
    }
}

impl Default for SqlxConnector {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

#[async_trait]
impl ConnectionFacade for SqlxConnector {
    async fn open(&self, request: &ConnectRequest) -> EngineResult<Box<dyn ConnectionHandle>> {
        let backend = backend_for(&request.descriptor.driver)?;
        let (host, port, database) = request
            .attributes
            .required()
            .map_err(|missing| EngineError::incomplete(request.engine.clone(), missing))?;

        let pool = match backend {
            Backend::MySql => {
                let options = Self::mysql_options(&request.attributes, host, port, database);
                let pool = MySqlPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(self.acquire_timeout)
                    .connect_with(options)
                    .await
                    .map_err(map_connect_error)?;
                SqlxPool::MySql(pool)
            }
            Backend::Postgres => {
                let options = Self::postgres_options(&request.attributes, host, port, database)?;
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(self.acquire_timeout)
                    .connect_with(options)
                    .await
                    .map_err(map_connect_error)?;
                SqlxPool::Postgres(pool)
            }
        };

        Ok(Box::new(SqlxHandle {
            driver: request.descriptor.driver.clone(),
            pool,
        }))
    }
}

enum SqlxPool {
    MySql(MySqlPool),
    Postgres(PgPool),
}

struct SqlxHandle {
    driver: String,
    pool: SqlxPool,
}

#[async_trait]
impl ConnectionHandle for SqlxHandle {
    fn driver(&self) -> &str {
        &self.driver
    }

    async fn ping(&self) -> EngineResult<()> {
        let result = match &self.pool {
            SqlxPool::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            SqlxPool::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        };
        result.map_err(|e| EngineError::connection_failed(e.to_string()))
    }

    async fn close(&self) {
        match &self.pool {
            SqlxPool::MySql(pool) => pool.close().await,
            SqlxPool::Postgres(pool) => pool.close().await,
        }
    }
}
