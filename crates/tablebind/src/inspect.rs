//! Per-connection schema introspection with caching and fallback dispatch.
//!
//! A [`SchemaInspector`] answers the four introspection questions for one
//! connection, consulting in order: the adapter's registered override, the
//! native driver, and — for foreign keys only — a heuristic inference pass
//! when the driver reports no native FK capability.
//!
//! Results are cached for the inspector's lifetime. Table names passed in may
//! carry a subschema prefix ("legacy.Books"); the prefix is split off before
//! the driver sees the name and reattached to inferred candidates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::adapter::AdapterOverrides;
use crate::driver::SchemaDriver;
use crate::error::Result;
use crate::naming::{normalize_name, singularize};
use crate::schema::{strip_prefix, ColumnDescriptor, ForeignKeyDescriptor, PrimaryKey};

/// Split a possibly-qualified table name into (prefix-with-dot, base).
fn split_qualified(table: &str) -> (&str, &str) {
    match table.rfind('.') {
        Some(idx) => (&table[..=idx], &table[idx + 1..]),
        None => ("", table),
    }
}

/// Strip a trailing `_id` or `Id` foreign-key suffix from a column name.
fn fk_stem(column: &str) -> Option<&str> {
    if let Some(stem) = column.strip_suffix("_id") {
        if !stem.is_empty() {
            return Some(stem);
        }
    }
    if let Some(stem) = column.strip_suffix("Id") {
        if !stem.is_empty() {
            return Some(stem);
        }
    }
    None
}

/// Per-connection, per-adapter introspection service.
pub struct SchemaInspector {
    driver: Arc<dyn SchemaDriver>,
    overrides: AdapterOverrides,
    tables: Mutex<Option<Vec<String>>>,
    columns: Mutex<HashMap<String, Vec<ColumnDescriptor>>>,
    primary_keys: Mutex<HashMap<String, Option<PrimaryKey>>>,
    foreign_keys: Mutex<HashMap<String, Vec<ForeignKeyDescriptor>>>,
}

impl SchemaInspector {
    /// Create an inspector over a live driver and the adapter's override set.
    pub fn new(driver: Arc<dyn SchemaDriver>, overrides: AdapterOverrides) -> Self {
        Self {
            driver,
            overrides,
            tables: Mutex::new(None),
            columns: Mutex::new(HashMap::new()),
            primary_keys: Mutex::new(HashMap::new()),
            foreign_keys: Mutex::new(HashMap::new()),
        }
    }

    /// The set of table names, cached for the inspector's lifetime.
    pub async fn tables(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.tables.lock().unwrap().clone() {
            return Ok(cached);
        }

        let tables = match &self.overrides.tables {
            Some(provider) => provider.tables(&*self.driver).await?,
            None => self.driver.tables().await?,
        };

        debug!("Cached {} table names", tables.len());
        *self.tables.lock().unwrap() = Some(tables.clone());
        Ok(tables)
    }

    /// Ordered column descriptors for a table, cached per table name.
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        if let Some(cached) = self.columns.lock().unwrap().get(table).cloned() {
            return Ok(cached);
        }

        let (_, base) = split_qualified(table);
        let columns = match &self.overrides.columns {
            Some(provider) => provider.columns(&*self.driver, base).await?,
            None => self.driver.columns(base).await?,
        };

        self.columns
            .lock()
            .unwrap()
            .insert(table.to_string(), columns.clone());
        Ok(columns)
    }

    /// Primary key of a table (single or composite), cached per table name.
    pub async fn primary_key(&self, table: &str) -> Result<Option<PrimaryKey>> {
        if let Some(cached) = self.primary_keys.lock().unwrap().get(table).cloned() {
            return Ok(cached);
        }

        let (_, base) = split_qualified(table);
        let primary_key = match &self.overrides.primary_key {
            Some(provider) => provider.primary_key(&*self.driver, base).await?,
            None => self.driver.primary_key(base).await?,
        };

        self.primary_keys
            .lock()
            .unwrap()
            .insert(table.to_string(), primary_key.clone());
        Ok(primary_key)
    }

    /// Foreign keys of a table, cached per table name.
    ///
    /// Dispatch: adapter override → native driver (if its capability flags
    /// report FK support) → heuristic inference. A driver without native FK
    /// metadata is a normal condition, not an error.
    pub async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        if let Some(cached) = self.foreign_keys.lock().unwrap().get(table).cloned() {
            return Ok(cached);
        }

        let (_, base) = split_qualified(table);
        let foreign_keys = if let Some(provider) = &self.overrides.foreign_keys {
            provider.foreign_keys(&*self.driver, base).await?
        } else if self.driver.capabilities().foreign_keys {
            self.driver.foreign_keys(base).await?
        } else {
            debug!(
                "Adapter '{}' has no native foreign key metadata; inferring for {}",
                self.driver.adapter(),
                table
            );
            self.infer_foreign_keys(table).await?
        };

        self.foreign_keys
            .lock()
            .unwrap()
            .insert(table.to_string(), foreign_keys.clone());
        Ok(foreign_keys)
    }

    /// Best-effort foreign key inference from column naming conventions.
    ///
    /// A column `author_id` (or `AuthorId`) is a candidate reference to a
    /// table whose singularized, normalized base name is `author`. The
    /// candidate only survives if its primary key is a single column named
    /// `id`/`Id`/`ID` or named exactly like the source column — the guard
    /// against false positives. Under-detection is acceptable.
    async fn infer_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        let (prefix, source_base) = split_qualified(table);
        let columns = self.columns(table).await?;
        let known_tables = self.tables().await?;

        let mut inferred = Vec::new();
        for column in &columns {
            let Some(stem) = fk_stem(&column.name) else {
                continue;
            };
            let normalized_stem = singularize(&normalize_name(stem));

            let Some(candidate) = known_tables.iter().find(|t| {
                singularize(&normalize_name(strip_prefix(t))) == normalized_stem
            }) else {
                continue;
            };

            // Self-referential links are out of scope.
            if strip_prefix(candidate) == source_base {
                continue;
            }

            // Reattach the source's prefix unless the candidate is already
            // qualified or the source has none.
            let to_table = if !prefix.is_empty() && !candidate.contains('.') {
                format!("{prefix}{candidate}")
            } else {
                candidate.clone()
            };

            let Some(primary_key) = self.primary_key(&to_table).await? else {
                continue;
            };
            let Some(key_name) = primary_key.single() else {
                continue;
            };
            if !matches!(key_name, "id" | "Id" | "ID") && key_name != column.name {
                continue;
            }

            let name = format!(
                "{}_{}_fk_{}",
                normalize_name(source_base),
                normalize_name(&column.name),
                Uuid::new_v4().simple()
            );
            debug!(
                "Inferred foreign key {}.{} -> {}.{}",
                table, column.name, to_table, key_name
            );
            inferred.push(ForeignKeyDescriptor {
                name,
                from_table: table.to_string(),
                to_table,
                from_column: column.name.clone(),
                to_column: key_name.to_string(),
                synthesized: true,
            });
        }

        Ok(inferred)
    }
}

impl std::fmt::Debug for SchemaInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaInspector")
            .field("adapter", &self.driver.adapter())
            .field("overrides", &self.overrides)
            .finish()
    }
}
