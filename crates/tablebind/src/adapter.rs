//! Adapter capability registry for explicit dependency injection.
//!
//! An [`AdapterOverrides`] set lets an adapter replace any subset of the four
//! introspection concerns (tables, columns, primary key, foreign keys) while
//! the native driver serves the rest. The [`AdapterRegistry`] maps adapter
//! identifiers to override sets; it is explicitly constructed and injected
//! into the orchestrator rather than living in global state.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::SchemaDriver;
use crate::error::{BindError, Result};
use crate::schema::{ColumnDescriptor, ForeignKeyDescriptor, PrimaryKey};

/// Override for table enumeration.
#[async_trait]
pub trait TablesProvider: Send + Sync {
    async fn tables(&self, driver: &dyn SchemaDriver) -> Result<Vec<String>>;
}

/// Override for column introspection.
#[async_trait]
pub trait ColumnsProvider: Send + Sync {
    async fn columns(&self, driver: &dyn SchemaDriver, table: &str)
        -> Result<Vec<ColumnDescriptor>>;
}

/// Override for primary key resolution.
#[async_trait]
pub trait PrimaryKeyProvider: Send + Sync {
    async fn primary_key(&self, driver: &dyn SchemaDriver, table: &str)
        -> Result<Option<PrimaryKey>>;
}

/// Override for foreign key retrieval.
#[async_trait]
pub trait ForeignKeysProvider: Send + Sync {
    async fn foreign_keys(
        &self,
        driver: &dyn SchemaDriver,
        table: &str,
    ) -> Result<Vec<ForeignKeyDescriptor>>;
}

/// An adapter's introspection overrides; each concern is independently
/// optional.
#[derive(Clone, Default)]
pub struct AdapterOverrides {
    pub tables: Option<Arc<dyn TablesProvider>>,
    pub columns: Option<Arc<dyn ColumnsProvider>>,
    pub primary_key: Option<Arc<dyn PrimaryKeyProvider>>,
    pub foreign_keys: Option<Arc<dyn ForeignKeysProvider>>,
}

impl AdapterOverrides {
    /// An override set with every concern left to the native driver.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether no concern is overridden.
    pub fn is_empty(&self) -> bool {
        self.tables.is_none()
            && self.columns.is_none()
            && self.primary_key.is_none()
            && self.foreign_keys.is_none()
    }

    pub fn with_tables(mut self, provider: impl TablesProvider + 'static) -> Self {
        self.tables = Some(Arc::new(provider));
        self
    }

    pub fn with_columns(mut self, provider: impl ColumnsProvider + 'static) -> Self {
        self.columns = Some(Arc::new(provider));
        self
    }

    pub fn with_primary_key(mut self, provider: impl PrimaryKeyProvider + 'static) -> Self {
        self.primary_key = Some(Arc::new(provider));
        self
    }

    pub fn with_foreign_keys(mut self, provider: impl ForeignKeysProvider + 'static) -> Self {
        self.foreign_keys = Some(Arc::new(provider));
        self
    }
}

impl std::fmt::Debug for AdapterOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterOverrides")
            .field("tables", &self.tables.is_some())
            .field("columns", &self.columns.is_some())
            .field("primary_key", &self.primary_key.is_some())
            .field("foreign_keys", &self.foreign_keys.is_some())
            .finish()
    }
}

/// Registry of adapter override sets.
///
/// Each adapter id is registered at most once; a second registration for the
/// same id fails with [`BindError::DuplicateAdapter`]. Lookup never fails —
/// unknown adapters get an empty override set.
#[derive(Default)]
pub struct AdapterRegistry {
    overrides: HashMap<String, AdapterOverrides>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an override set for an adapter id.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::DuplicateAdapter`] if the id is already
    /// registered.
    pub fn register(
        &mut self,
        adapter_id: impl Into<String>,
        overrides: AdapterOverrides,
    ) -> Result<()> {
        let adapter_id = adapter_id.into();
        if self.overrides.contains_key(&adapter_id) {
            return Err(BindError::DuplicateAdapter(adapter_id));
        }
        self.overrides.insert(adapter_id, overrides);
        Ok(())
    }

    /// Get the override set for an adapter id, or an empty set.
    pub fn lookup(&self, adapter_id: &str) -> AdapterOverrides {
        self.overrides.get(adapter_id).cloned().unwrap_or_default()
    }

    /// Check if an adapter id is registered.
    pub fn has(&self, adapter_id: &str) -> bool {
        self.overrides.contains_key(adapter_id)
    }

    /// All registered adapter ids.
    pub fn adapter_ids(&self) -> Vec<&str> {
        self.overrides.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}
