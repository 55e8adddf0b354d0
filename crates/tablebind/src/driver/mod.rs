//! Native schema driver implementations.
//!
//! A [`SchemaDriver`] exposes an adapter's catalog introspection: table
//! enumeration, columns, primary keys, and foreign keys. Drivers report which
//! of those they support through [`DriverCapabilities`] presence flags, so
//! fallback dispatch in the inspector is a branch rather than error handling.
//!
//! - [`memory`]: in-process driver for tests and embedding
//! - [`postgres`]: PostgreSQL driver (feature `postgres`)
//!
//! # Adding New Adapters
//!
//! 1. Create a new module under `driver/` implementing [`SchemaDriver`]
//! 2. Implement [`Connector`] for pool/connection construction
//! 3. Register the connector in [`DriverFactory::with_builtins`]
//! 4. Gate the driver with a feature flag in `Cargo.toml`

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::{MemoryConnector, MemoryDriver, MemoryTable};
#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConnectConfig;
use crate::error::{BindError, Result};
use crate::schema::{ColumnDescriptor, ForeignKeyDescriptor, PrimaryKey};

/// Presence flags for a driver's native introspection capabilities.
///
/// A false flag is a normal condition, not an error: the inspector routes
/// foreign keys to heuristic inference when `foreign_keys` is false. The
/// remaining flags are advisory — those concerns have no fallback, so an
/// unsupported call surfaces the driver's own error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverCapabilities {
    pub tables: bool,
    pub columns: bool,
    pub primary_key: bool,
    pub foreign_keys: bool,
}

impl DriverCapabilities {
    /// All four concerns natively supported.
    pub const fn full() -> Self {
        Self {
            tables: true,
            columns: true,
            primary_key: true,
            foreign_keys: true,
        }
    }

    /// Everything except native foreign key metadata.
    pub const fn without_foreign_keys() -> Self {
        Self {
            tables: true,
            columns: true,
            primary_key: true,
            foreign_keys: false,
        }
    }
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Native catalog introspection for one adapter.
///
/// Table names are unqualified here; subschema prefixing happens in the
/// mapping layer. All calls are sequential — implementations need no internal
/// synchronization beyond their pool.
#[async_trait]
pub trait SchemaDriver: Send + Sync {
    /// The adapter identifier (e.g., "postgres", "memory").
    fn adapter(&self) -> &str;

    /// Which concerns this driver supports natively.
    fn capabilities(&self) -> DriverCapabilities;

    /// Enumerate table names in the connected schema.
    async fn tables(&self) -> Result<Vec<String>>;

    /// Column definitions for a table, in ordinal order.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Primary key of a table, if any.
    async fn primary_key(&self, table: &str) -> Result<Option<PrimaryKey>>;

    /// Native foreign key constraints of a table.
    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>>;

    /// Close the underlying connection pool.
    async fn close(&self);
}

/// A live connection handle wrapping a schema driver.
///
/// Cloning shares the underlying driver and pool.
#[derive(Clone)]
pub struct Connection {
    driver: Arc<dyn SchemaDriver>,
}

impl Connection {
    pub fn new(driver: Arc<dyn SchemaDriver>) -> Self {
        Self { driver }
    }

    /// The wrapped driver.
    pub fn driver(&self) -> &Arc<dyn SchemaDriver> {
        &self.driver
    }

    /// The adapter identifier of the wrapped driver.
    pub fn adapter(&self) -> &str {
        self.driver.adapter()
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.driver.close().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("adapter", &self.adapter())
            .finish()
    }
}

/// Opens a [`SchemaDriver`] from a resolved configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectConfig) -> Result<Arc<dyn SchemaDriver>>;
}

/// Normalize adapter aliases to the canonical identifier.
///
/// Known aliases collapse ("postgresql"/"pg" → "postgres"); unknown adapters
/// pass through lowercased so custom connectors can register any id.
pub fn canonical_adapter(adapter: &str) -> String {
    match adapter.to_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => "postgres".to_string(),
        "mysql" | "mariadb" => "mysql".to_string(),
        "mssql" | "sqlserver" | "sql_server" => "mssql".to_string(),
        other => other.to_string(),
    }
}

/// Registry of connectors by canonical adapter id.
///
/// Explicitly constructed and injected into the orchestrator; no global
/// state.
#[derive(Default)]
pub struct DriverFactory {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl DriverFactory {
    /// Create a new empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with the built-in connectors registered.
    pub fn with_builtins() -> Self {
        #[allow(unused_mut)]
        let mut factory = Self::new();

        #[cfg(feature = "postgres")]
        factory.register("postgres", postgres::PostgresConnector);

        factory
    }

    /// Register a connector under an adapter id (canonicalized).
    ///
    /// Re-registering an id replaces the previous connector.
    pub fn register(&mut self, adapter: impl AsRef<str>, connector: impl Connector + 'static) {
        self.connectors
            .insert(canonical_adapter(adapter.as_ref()), Arc::new(connector));
    }

    /// Check if a connector is registered for an adapter.
    pub fn has(&self, adapter: &str) -> bool {
        self.connectors.contains_key(&canonical_adapter(adapter))
    }

    /// All registered canonical adapter ids.
    pub fn adapter_ids(&self) -> Vec<&str> {
        self.connectors.keys().map(String::as_str).collect()
    }

    /// Open a connection for the configured adapter.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when no connector is registered for the
    /// adapter; connection failures propagate from the connector unchanged.
    pub async fn connect(&self, config: &ConnectConfig) -> Result<Connection> {
        let adapter = canonical_adapter(&config.adapter);
        let connector = self.connectors.get(&adapter).ok_or_else(|| {
            BindError::Config(format!(
                "No connector registered for adapter '{}'. Available: {}",
                adapter,
                self.adapter_ids().join(", ")
            ))
        })?;
        let driver = connector.connect(config).await?;
        Ok(Connection::new(driver))
    }
}

impl std::fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverFactory")
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}
