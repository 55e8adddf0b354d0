//! In-memory schema driver.
//!
//! Serves a fixed schema without any I/O. Used by the test suite and useful
//! for embedding: capability flags are configurable, so the heuristic
//! foreign-key fallback can be exercised deterministically by declaring the
//! driver FK-incapable.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ConnectConfig;
use crate::error::{BindError, Result};
use crate::schema::{ColumnDescriptor, ForeignKeyDescriptor, PrimaryKey};

use super::{Connector, DriverCapabilities, SchemaDriver};

/// A table definition for the in-memory driver.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    name: String,
    columns: Vec<ColumnDescriptor>,
    primary_key: Option<PrimaryKey>,
    foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl MemoryTable {
    /// Start a table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a column with the given raw type.
    pub fn column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(ColumnDescriptor::new(name, data_type));
        self
    }

    /// Set the primary key from an ordered column list.
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key =
            PrimaryKey::from_columns(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Add a native foreign key to another table.
    pub fn foreign_key(
        mut self,
        name: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKeyDescriptor {
            name: name.into(),
            from_table: self.name.clone(),
            to_table: to_table.into(),
            from_column: from_column.into(),
            to_column: to_column.into(),
            synthesized: false,
        });
        self
    }
}

/// Builder for [`MemoryDriver`].
#[derive(Debug, Default)]
pub struct MemoryDriverBuilder {
    tables: Vec<MemoryTable>,
    capabilities: Option<DriverCapabilities>,
}

impl MemoryDriverBuilder {
    /// Add a table definition. Enumeration order follows insertion order.
    pub fn table(mut self, table: MemoryTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Override the reported capability flags.
    pub fn capabilities(mut self, capabilities: DriverCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn build(self) -> MemoryDriver {
        let order: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        let tables: BTreeMap<String, MemoryTable> = self
            .tables
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        MemoryDriver {
            order,
            tables,
            capabilities: self.capabilities.unwrap_or_default(),
            closed: AtomicBool::new(false),
        }
    }
}

/// Fixed-schema driver with no backing database.
#[derive(Debug)]
pub struct MemoryDriver {
    order: Vec<String>,
    tables: BTreeMap<String, MemoryTable>,
    capabilities: DriverCapabilities,
    closed: AtomicBool,
}

impl MemoryDriver {
    pub fn builder() -> MemoryDriverBuilder {
        MemoryDriverBuilder::default()
    }

    /// Whether [`SchemaDriver::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| BindError::Config(format!("Unknown table: {name}")))
    }
}

#[async_trait]
impl SchemaDriver for MemoryDriver {
    fn adapter(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    async fn tables(&self) -> Result<Vec<String>> {
        Ok(self.order.clone())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn primary_key(&self, table: &str) -> Result<Option<PrimaryKey>> {
        Ok(self.table(table)?.primary_key.clone())
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        Ok(self.table(table)?.foreign_keys.clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector that hands out a pre-built shared [`MemoryDriver`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    driver: Arc<MemoryDriver>,
}

impl MemoryConnector {
    pub fn new(driver: Arc<MemoryDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _config: &ConnectConfig) -> Result<Arc<dyn SchemaDriver>> {
        Ok(self.driver.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_driver() -> MemoryDriver {
        MemoryDriver::builder()
            .table(
                MemoryTable::new("Authors")
                    .column("id", "int4")
                    .column("Name", "varchar")
                    .primary_key(["id"]),
            )
            .table(
                MemoryTable::new("Books")
                    .column("id", "int4")
                    .column("author_id", "int4")
                    .primary_key(["id"])
                    .foreign_key("books_author_fk", "author_id", "Authors", "id"),
            )
            .build()
    }

    #[tokio::test]
    async fn test_enumeration_preserves_insertion_order() {
        let driver = make_test_driver();
        assert_eq!(driver.tables().await.unwrap(), vec!["Authors", "Books"]);
    }

    #[tokio::test]
    async fn test_table_metadata() {
        let driver = make_test_driver();
        let columns = driver.columns("Authors").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(
            driver.primary_key("Authors").await.unwrap(),
            Some(PrimaryKey::Single("id".to_string()))
        );

        let fks = driver.foreign_keys("Books").await.unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].to_table, "Authors");
        assert!(!fks[0].synthesized);
    }

    #[tokio::test]
    async fn test_unknown_table_errors() {
        let driver = make_test_driver();
        assert!(driver.columns("Nope").await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_observable() {
        let driver = make_test_driver();
        assert!(!driver.is_closed());
        driver.close().await;
        assert!(driver.is_closed());
    }
}
