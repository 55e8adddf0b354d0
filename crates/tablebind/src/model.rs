//! Generated model types.
//!
//! There is no runtime subtyping here: a [`Model`] is an explicit accessor
//! object parameterized by its [`TableDescriptor`], and [`BoundSchema`] is
//! the base handle tying the generated models to the connection they share.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::driver::Connection;
use crate::error::{BindError, Result};
use crate::schema::{ColumnDescriptor, PrimaryKey, TableDescriptor};

/// A primary key value of one of the supported shapes.
///
/// Allows handling different key types uniformly in lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    /// Integer key (covers int, bigint, smallint).
    Int(i64),
    /// UUID/GUID key.
    Uuid(Uuid),
    /// String key (varchar, char, text).
    Text(String),
}

impl KeyValue {
    /// Convert to a SQL literal string for use in queries.
    ///
    /// Performs basic escaping (single quotes doubled), sufficient for
    /// typical key values. For untrusted input prefer parameterized queries.
    pub fn to_sql_literal(&self) -> String {
        match self {
            KeyValue::Int(v) => v.to_string(),
            KeyValue::Uuid(v) => format!("'{}'", v),
            KeyValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        KeyValue::Int(v as i64)
    }
}

impl From<Uuid> for KeyValue {
    fn from(v: Uuid) -> Self {
        KeyValue::Uuid(v)
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Text(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_string())
    }
}

/// A validated single-key lookup, ready for an external query engine.
#[derive(Debug, Clone)]
pub struct KeyLookup {
    /// Qualified table name.
    pub table: String,
    /// The single primary key column.
    pub key_column: String,
    /// The key value to match.
    pub value: KeyValue,
}

/// A many-to-one association from a source model to a target model.
#[derive(Debug, Clone)]
pub struct Association {
    /// Accessor name this association is exposed under.
    pub name: String,
    /// Source column holding the reference.
    pub foreign_key: String,
    /// Target model name.
    pub target_model: String,
    /// Target base table name.
    pub target_table: String,
    /// Target primary key column.
    pub target_key: String,
}

/// A generated per-table accessor type.
///
/// Associations are attached exactly once, after every model of the bind
/// pass exists, so forward references between tables never matter.
pub struct Model {
    descriptor: TableDescriptor,
    base_token: String,
    connection: Connection,
    associations: OnceLock<BTreeMap<String, Association>>,
}

impl Model {
    /// Define a model from its descriptor. Crate-internal: models are built
    /// by the orchestrator only.
    pub(crate) fn define(
        descriptor: TableDescriptor,
        base_token: &str,
        connection: Connection,
    ) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            base_token: base_token.to_string(),
            connection,
            associations: OnceLock::new(),
        })
    }

    /// The model name this type is registered under.
    pub fn name(&self) -> &str {
        &self.descriptor.model_name
    }

    /// The qualified table name.
    pub fn table(&self) -> &str {
        &self.descriptor.qualified_name
    }

    /// The base (unqualified) table name.
    pub fn base_table(&self) -> &str {
        &self.descriptor.base_name
    }

    /// The full table descriptor.
    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// The table's primary key, if any.
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.descriptor.primary_key.as_ref()
    }

    /// Token of the bind invocation this model belongs to.
    pub fn base_token(&self) -> &str {
        &self.base_token
    }

    /// The shared connection of the bind invocation.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Build a guarded single-key lookup.
    ///
    /// # Errors
    ///
    /// [`BindError::CompoundPrimaryKeyLookup`] on composite-key tables —
    /// always, regardless of the value passed — and
    /// [`BindError::NoPrimaryKey`] on keyless tables.
    pub fn lookup(&self, value: impl Into<KeyValue>) -> Result<KeyLookup> {
        match &self.descriptor.primary_key {
            None => Err(BindError::NoPrimaryKey(
                self.descriptor.qualified_name.clone(),
            )),
            Some(PrimaryKey::Composite(_)) => Err(BindError::CompoundPrimaryKeyLookup {
                table: self.descriptor.qualified_name.clone(),
            }),
            Some(PrimaryKey::Single(column)) => Ok(KeyLookup {
                table: self.descriptor.qualified_name.clone(),
                key_column: column.clone(),
                value: value.into(),
            }),
        }
    }

    /// Resolve a column by accessor alias (raw names are aliases of
    /// themselves).
    pub fn column(&self, alias: &str) -> Option<&ColumnDescriptor> {
        self.descriptor.column_for_alias(alias)
    }

    /// The alias → raw column name mapping.
    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.descriptor.column_aliases
    }

    /// Resolve an association by accessor name.
    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.get()?.get(name)
    }

    /// All associations, keyed by accessor name.
    pub fn associations(&self) -> &BTreeMap<String, Association> {
        static EMPTY: OnceLock<BTreeMap<String, Association>> = OnceLock::new();
        self.associations
            .get()
            .unwrap_or_else(|| EMPTY.get_or_init(BTreeMap::new))
    }

    /// Seal the association table. Called exactly once per model during
    /// relationship wiring; a second call is a wiring bug.
    pub(crate) fn seal_associations(&self, associations: BTreeMap<String, Association>) {
        if self.associations.set(associations).is_err() {
            debug_assert!(false, "associations sealed twice for {}", self.name());
        }
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name())
            .field("table", &self.table())
            .field("base_token", &self.base_token)
            .finish()
    }
}

/// Summary of a completed bind invocation.
#[derive(Debug, Clone, Serialize)]
pub struct BindReport {
    /// Unique token of this invocation.
    pub token: String,

    /// When the bind started.
    pub started_at: DateTime<Utc>,

    /// When the bind completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Number of tables bound.
    pub tables_bound: usize,

    /// Number of associations wired.
    pub relationships_wired: usize,

    /// Target namespace path (empty for the registry root).
    pub namespace: Vec<String>,
}

/// Base handle of a bind invocation: the common root of all generated models
/// and the owner of the dedicated connection.
pub struct BoundSchema {
    token: String,
    connection: Connection,
    models: Vec<Arc<Model>>,
    report: BindReport,
}

impl BoundSchema {
    pub(crate) fn new(
        token: String,
        connection: Connection,
        models: Vec<Arc<Model>>,
        report: BindReport,
    ) -> Self {
        Self {
            token,
            connection,
            models,
            report,
        }
    }

    /// The unique token identifying this invocation.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// All generated models, in mapping order.
    pub fn models(&self) -> &[Arc<Model>] {
        &self.models
    }

    /// Resolve a generated model by model name.
    pub fn model(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.iter().find(|m| m.name() == name)
    }

    /// The invocation summary.
    pub fn report(&self) -> &BindReport {
        &self.report
    }

    /// The owned connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Close the owned connection pool.
    pub async fn disconnect(&self) {
        self.connection.close().await;
    }
}

impl std::fmt::Debug for BoundSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundSchema")
            .field("token", &self.token)
            .field(
                "models",
                &self.models.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
