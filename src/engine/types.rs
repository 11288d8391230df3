//! Shared data types for the engine layer
//!
//! Engine identity, connection attributes, the configuration record read
//! from persisted settings, and the descriptor handed to the connection
//! facade.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::error::{EngineError, EngineResult};

/// Unique identifier for an open session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Category an engine plugin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineCategory {
    DataSource,
}

impl EngineCategory {
    pub const ALL: [EngineCategory; 1] = [EngineCategory::DataSource];

    /// Upper-case prefix used in engine identifiers.
    pub fn prefix(&self) -> &'static str {
        match self {
            EngineCategory::DataSource => "DATASOURCE",
        }
    }
}

impl fmt::Display for EngineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Separator between the category prefix and the engine name.
pub const IDENTIFIER_SEPARATOR: char = '_';

/// Immutable identity of one engine plugin type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineDescriptor {
    category: EngineCategory,
    engine_name: &'static str,
    display_name: &'static str,
}

impl EngineDescriptor {
    pub const fn new(
        category: EngineCategory,
        engine_name: &'static str,
        display_name: &'static str,
    ) -> Self {
        Self {
            category,
            engine_name,
            display_name,
        }
    }

    /// Registry key, e.g. `DATASOURCE_MYSQL`.
    pub fn identifier(&self) -> String {
        format!(
            "{}{}{}",
            self.category.prefix(),
            IDENTIFIER_SEPARATOR,
            normalize_segment(self.engine_name)
        )
    }

    pub fn category(&self) -> EngineCategory {
        self.category
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine_name
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }
}

impl fmt::Display for EngineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.identifier())
    }
}

fn normalize_segment(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' | ' ' => IDENTIFIER_SEPARATOR,
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Normalizes a user-supplied engine identifier or engine tag.
///
/// `mysql`, `MySQL` and `datasource-mysql` all become `DATASOURCE_MYSQL`.
/// A value without a known category prefix is taken to be a data source
/// engine name.
pub fn normalize_identifier(raw: &str) -> String {
    let normalized = normalize_segment(raw);
    let has_category = EngineCategory::ALL.iter().any(|category| {
        normalized
            .strip_prefix(category.prefix())
            .is_some_and(|rest| rest.starts_with(IDENTIFIER_SEPARATOR))
    });

    if has_category || normalized.is_empty() {
        normalized
    } else {
        format!(
            "{}{}{}",
            EngineCategory::DataSource.prefix(),
            IDENTIFIER_SEPARATOR,
            normalized
        )
    }
}

/// Connection attributes for one configured data source
///
/// Host, port and database name are optional here so that an unconfigured
/// plugin can be represented; engines refuse to build a connection string
/// until they are present.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAttributes {
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub extra_attributes: BTreeMap<String, String>,
}

impl ConnectionAttributes {
    /// Empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds attributes from a flat property bag.
    ///
    /// Recognized keys are consumed; everything else becomes an extra
    /// attribute appended to the connection string.
    pub fn from_properties(properties: &HashMap<String, String>) -> EngineResult<Self> {
        let mut attributes = Self::new();

        for (key, value) in properties {
            match key.as_str() {
                "host" | "hostName" => attributes.host_name = Some(value.clone()),
                "port" => {
                    let port = value.trim().parse::<u16>().map_err(|e| {
                        EngineError::invalid_attribute("port", format!("'{}': {}", value, e))
                    })?;
                    attributes.port = Some(port);
                }
                "database" | "databaseName" => attributes.database_name = Some(value.clone()),
                "user" | "userName" | "username" => attributes.user_name = Some(value.clone()),
                "password" => attributes.password = Some(value.clone()),
                _ => {
                    attributes
                        .extra_attributes
                        .insert(key.clone(), value.clone());
                }
            }
        }

        Ok(attributes)
    }

    /// Builds attributes from every field at once.
    pub fn with_fields<I, K, V>(
        host_name: impl Into<String>,
        port: u16,
        database_name: impl Into<String>,
        user_name: impl Into<String>,
        password: impl Into<String>,
        extra_attributes: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            host_name: Some(host_name.into()),
            port: Some(port),
            database_name: Some(database_name.into()),
            user_name: Some(user_name.into()),
            password: Some(password.into()),
            extra_attributes: extra_attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host_name = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database_name = Some(database.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user_name = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_attributes.insert(key.into(), value.into());
        self
    }

    /// Names of the required fields that are absent or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host_name.as_deref().map_or(true, |h| h.trim().is_empty()) {
            missing.push("hostName");
        }
        if self.port.is_none() {
            missing.push("port");
        }
        if self
            .database_name
            .as_deref()
            .map_or(true, |d| d.trim().is_empty())
        {
            missing.push("databaseName");
        }
        missing
    }

    /// The required triple, or the list of missing field names.
    pub fn required(&self) -> Result<(&str, u16, &str), Vec<&'static str>> {
        match (
            self.host_name.as_deref(),
            self.port,
            self.database_name.as_deref(),
        ) {
            (Some(host), Some(port), Some(database))
                if !host.trim().is_empty() && !database.trim().is_empty() =>
            {
                Ok((host.trim(), port, database.trim()))
            }
            _ => Err(self.missing_required()),
        }
    }
}

impl fmt::Debug for ConnectionAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAttributes")
            .field("host_name", &self.host_name)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("extra_attributes", &self.extra_attributes)
            .finish()
    }
}

/// What the connection facade needs to open a connection: the driver to
/// load and the engine-specific connection string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub driver: String,
    pub url: String,
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.driver, self.url)
    }
}

/// A configured data source as read from persisted settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceRecord {
    /// Unique identifier for this data source
    pub id: String,
    /// Display name
    pub name: String,
    /// Engine tag or full identifier (`mysql`, `DATASOURCE_HIVE`, ...)
    #[serde(alias = "engineTypeTag")]
    pub engine_type: String,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub extra_attributes: BTreeMap<String, String>,
}

impl DataSourceRecord {
    pub fn to_attributes(&self) -> ConnectionAttributes {
        ConnectionAttributes {
            host_name: self.host_name.clone(),
            port: self.port,
            database_name: self.database_name.clone(),
            user_name: self.user_name.clone(),
            password: self.password.clone(),
            extra_attributes: self.extra_attributes.clone(),
        }
    }

    pub fn display_name(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user_name.as_deref().unwrap_or("anonymous"),
            self.host_name.as_deref().unwrap_or("?"),
            self.port.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
            self.database_name.as_deref().unwrap_or("default"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_upper_cased_with_category_prefix() {
        let descriptor = EngineDescriptor::new(EngineCategory::DataSource, "sql-server", "SQL Server");
        assert_eq!(descriptor.identifier(), "DATASOURCE_SQL_SERVER");
    }

    #[test]
    fn normalizes_bare_tags_and_full_identifiers_alike() {
        assert_eq!(normalize_identifier("mysql"), "DATASOURCE_MYSQL");
        assert_eq!(normalize_identifier(" MySQL "), "DATASOURCE_MYSQL");
        assert_eq!(normalize_identifier("datasource-mysql"), "DATASOURCE_MYSQL");
        assert_eq!(normalize_identifier("DATASOURCE_MYSQL"), "DATASOURCE_MYSQL");
        // "datasourcex" is an engine name, not a prefixed identifier
        assert_eq!(normalize_identifier("datasourcex"), "DATASOURCE_DATASOURCEX");
    }

    #[test]
    fn three_constructors_converge() {
        let explicit = ConnectionAttributes::with_fields(
            "db1",
            3306,
            "shop",
            "app",
            "secret",
            [("useSSL", "false")],
        );

        let mut bag = HashMap::new();
        bag.insert("host".to_string(), "db1".to_string());
        bag.insert("port".to_string(), "3306".to_string());
        bag.insert("databaseName".to_string(), "shop".to_string());
        bag.insert("user".to_string(), "app".to_string());
        bag.insert("password".to_string(), "secret".to_string());
        bag.insert("useSSL".to_string(), "false".to_string());
        let from_bag = ConnectionAttributes::from_properties(&bag).expect("valid bag");

        let built = ConnectionAttributes::new()
            .with_host("db1")
            .with_port(3306)
            .with_database("shop")
            .with_user("app")
            .with_password("secret")
            .with_extra("useSSL", "false");

        assert_eq!(explicit, from_bag);
        assert_eq!(explicit, built);
    }

    #[test]
    fn rejects_non_numeric_port_in_bag() {
        let mut bag = HashMap::new();
        bag.insert("port".to_string(), "thirty".to_string());

        let err = ConnectionAttributes::from_properties(&bag).expect_err("bad port");
        assert!(matches!(err, EngineError::InvalidAttribute { ref name, .. } if name == "port"));
    }

    #[test]
    fn empty_attributes_report_all_required_fields() {
        let attributes = ConnectionAttributes::new().with_host("  ");
        assert_eq!(
            attributes.missing_required(),
            vec!["hostName", "port", "databaseName"]
        );
        assert!(attributes.required().is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let attributes = ConnectionAttributes::new().with_password("hunter2");
        let rendered = format!("{:?}", attributes);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn record_deserializes_with_engine_type_tag_alias() {
        let json = r#"{
            "id": "ds-1",
            "name": "orders",
            "engineTypeTag": "mysql",
            "hostName": "db1",
            "port": 3306,
            "databaseName": "shop",
            "userName": "app",
            "password": "secret",
            "extraAttributes": {"useSSL": "false"}
        }"#;
        let record: DataSourceRecord = serde_json::from_str(json).expect("should parse");

        assert_eq!(record.engine_type, "mysql");
        let attributes = record.to_attributes();
        assert_eq!(attributes.required(), Ok(("db1", 3306, "shop")));
        assert_eq!(attributes.password.as_deref(), Some("secret"));

        let serialized = serde_json::to_string(&record).expect("should serialize");
        assert!(!serialized.contains("secret"));
    }
}
