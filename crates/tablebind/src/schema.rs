//! Schema metadata types for tables, columns, primary keys, and foreign keys.
//!
//! These types provide a database-agnostic representation of introspected
//! schema metadata. Descriptors are built fresh for every bind invocation and
//! are never cached beyond it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse semantic classification of a column's data type.
///
/// Only the distinctions the naming and inference layers care about are
/// modeled; everything else collapses into [`SemanticType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    Boolean,
    Integer,
    Float,
    Decimal,
    Text,
    Date,
    DateTime,
    Binary,
    Uuid,
    Json,
    Other,
}

impl SemanticType {
    /// Classify a raw SQL type name.
    ///
    /// Covers the common spellings across PostgreSQL, MySQL, and SQL Server;
    /// unknown types map to `Other`.
    pub fn from_sql_type(data_type: &str) -> Self {
        match data_type.to_lowercase().as_str() {
            "bool" | "boolean" | "bit" => SemanticType::Boolean,
            "int" | "int2" | "int4" | "int8" | "integer" | "bigint" | "smallint" | "tinyint"
            | "serial" | "bigserial" => SemanticType::Integer,
            "float" | "float4" | "float8" | "real" | "double" | "double precision" => {
                SemanticType::Float
            }
            "numeric" | "decimal" | "money" => SemanticType::Decimal,
            "text" | "varchar" | "char" | "bpchar" | "nvarchar" | "nchar" | "citext" => {
                SemanticType::Text
            }
            "date" => SemanticType::Date,
            "timestamp" | "timestamptz" | "datetime" | "datetime2" | "smalldatetime"
            | "datetimeoffset" | "timestamp with time zone"
            | "timestamp without time zone" => SemanticType::DateTime,
            "bytea" | "blob" | "binary" | "varbinary" | "image" => SemanticType::Binary,
            "uuid" | "uniqueidentifier" => SemanticType::Uuid,
            "json" | "jsonb" => SemanticType::Json,
            _ => SemanticType::Other,
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, exactly as the database reports it.
    pub name: String,

    /// Raw data type string (e.g., "int4", "varchar", "datetime2").
    pub data_type: String,

    /// Semantic classification of the data type.
    pub semantic: SemanticType,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Default value expression, if any.
    pub default: Option<String>,
}

impl ColumnDescriptor {
    /// Build a descriptor from a name and raw type, deriving the semantic
    /// classification.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        let semantic = SemanticType::from_sql_type(&data_type);
        Self {
            name: name.into(),
            data_type,
            semantic,
            is_nullable: true,
            default: None,
        }
    }
}

/// Primary key of a table: a single column or an ordered composite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// Single-column key.
    Single(String),
    /// Composite key, columns in constraint order.
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Build from an ordered column list. Returns `None` for an empty list.
    pub fn from_columns(mut columns: Vec<String>) -> Option<Self> {
        match columns.len() {
            0 => None,
            1 => Some(PrimaryKey::Single(columns.remove(0))),
            _ => Some(PrimaryKey::Composite(columns)),
        }
    }

    /// Whether this is a composite key.
    pub fn is_composite(&self) -> bool {
        matches!(self, PrimaryKey::Composite(_))
    }

    /// The key's column names in order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::Single(name) => vec![name.as_str()],
            PrimaryKey::Composite(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// The single key column, if this is not a composite key.
    pub fn single(&self) -> Option<&str> {
        match self {
            PrimaryKey::Single(name) => Some(name.as_str()),
            PrimaryKey::Composite(_) => None,
        }
    }
}

/// Foreign key metadata, native or synthesized by inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Constraint name. Synthesized keys get a freshly generated unique name.
    pub name: String,

    /// Source table (qualified like the mapping pass qualified it).
    pub from_table: String,

    /// Referenced table, qualified with the same prefix context as the source.
    pub to_table: String,

    /// Source column name.
    pub from_column: String,

    /// Referenced column (the target's primary key).
    pub to_column: String,

    /// True when this key was inferred rather than read from the catalog.
    pub synthesized: bool,
}

/// Table metadata assembled by the mapping pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Subschema-prefixed name (e.g., "legacy.Authors").
    pub qualified_name: String,

    /// Name with any namespace prefix stripped (e.g., "Authors").
    pub base_name: String,

    /// Normalized, unique-within-namespace model identifier (e.g., "Author").
    pub model_name: String,

    /// Column definitions, in introspection order.
    pub columns: Vec<ColumnDescriptor>,

    /// Primary key, if the table has one.
    pub primary_key: Option<PrimaryKey>,

    /// Foreign key constraints (native or inferred).
    pub foreign_keys: Vec<ForeignKeyDescriptor>,

    /// Accessor alias → raw column name. Seeded with the identity mapping so
    /// later alias insertion skips already-claimed slots.
    pub column_aliases: BTreeMap<String, String>,
}

impl TableDescriptor {
    /// Whether the table's primary key spans more than one column.
    pub fn has_composite_pk(&self) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(PrimaryKey::is_composite)
    }

    /// Find a column by its raw name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve an accessor alias to its column descriptor.
    pub fn column_for_alias(&self, alias: &str) -> Option<&ColumnDescriptor> {
        self.column_aliases
            .get(alias)
            .and_then(|raw| self.column(raw))
    }
}

/// Strip the last dot-separated prefix from a qualified table name.
///
/// "legacy.Authors" → "Authors"; unqualified names pass through.
pub fn strip_prefix(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(idx) => &qualified[idx + 1..],
        None => qualified,
    }
}
