//! Table mapping: introspection results → table descriptors.

use tracing::info;

use crate::error::Result;
use crate::inspect::SchemaInspector;
use crate::naming::model_name;
use crate::schema::{strip_prefix, TableDescriptor};

/// Assembles [`TableDescriptor`]s for every table the inspector reports.
pub struct TableMapper;

impl TableMapper {
    /// Normalize a subschema into a single trailing-dot-terminated prefix.
    ///
    /// `None` and blank input yield the empty string; `"legacy"` and
    /// `"legacy."` both yield `"legacy."`.
    pub fn normalize_prefix(subschema: Option<&str>) -> String {
        match subschema.map(str::trim) {
            None | Some("") => String::new(),
            Some(name) => format!("{}.", name.trim_end_matches('.')),
        }
    }

    /// Build a descriptor for every table, in whatever order `tables()`
    /// yielded — not guaranteed stable across calls.
    ///
    /// Each descriptor starts with the identity column-alias mapping so later
    /// alias insertion skips already-claimed slots. Descriptors live only for
    /// the current bind invocation.
    pub async fn map_tables(
        inspector: &SchemaInspector,
        subschema: Option<&str>,
    ) -> Result<Vec<TableDescriptor>> {
        let prefix = Self::normalize_prefix(subschema);

        let mut descriptors = Vec::new();
        for table_name in inspector.tables().await? {
            let qualified_name = format!("{prefix}{table_name}");
            let columns = inspector.columns(&qualified_name).await?;
            let primary_key = inspector.primary_key(&qualified_name).await?;
            let foreign_keys = inspector.foreign_keys(&qualified_name).await?;

            let base_name = strip_prefix(&qualified_name).to_string();
            let column_aliases = columns
                .iter()
                .map(|c| (c.name.clone(), c.name.clone()))
                .collect();

            descriptors.push(TableDescriptor {
                model_name: model_name(&base_name),
                qualified_name,
                base_name,
                columns,
                primary_key,
                foreign_keys,
                column_aliases,
            });
        }

        info!("Mapped {} tables", descriptors.len());
        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterOverrides;
    use crate::driver::{DriverCapabilities, MemoryDriver, MemoryTable};
    use crate::schema::PrimaryKey;
    use std::sync::Arc;

    fn make_inspector(capabilities: DriverCapabilities) -> SchemaInspector {
        let driver = Arc::new(
            MemoryDriver::builder()
                .table(
                    MemoryTable::new("Authors")
                        .column("id", "int4")
                        .column("Name", "varchar")
                        .primary_key(["id"]),
                )
                .table(
                    MemoryTable::new("book_reviews")
                        .column("book_id", "int4")
                        .column("reviewer", "varchar")
                        .primary_key(["book_id", "reviewer"]),
                )
                .capabilities(capabilities)
                .build(),
        );
        SchemaInspector::new(driver, AdapterOverrides::none())
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(TableMapper::normalize_prefix(None), "");
        assert_eq!(TableMapper::normalize_prefix(Some("")), "");
        assert_eq!(TableMapper::normalize_prefix(Some("  ")), "");
        assert_eq!(TableMapper::normalize_prefix(Some("legacy")), "legacy.");
        assert_eq!(TableMapper::normalize_prefix(Some("legacy.")), "legacy.");
        assert_eq!(TableMapper::normalize_prefix(Some("legacy..")), "legacy.");
    }

    #[tokio::test]
    async fn test_map_tables_without_subschema() {
        let inspector = make_inspector(DriverCapabilities::full());
        let descriptors = TableMapper::map_tables(&inspector, None).await.unwrap();

        assert_eq!(descriptors.len(), 2);
        let authors = &descriptors[0];
        assert_eq!(authors.qualified_name, "Authors");
        assert_eq!(authors.base_name, "Authors");
        assert_eq!(authors.model_name, "Author");
        assert_eq!(
            authors.primary_key,
            Some(PrimaryKey::Single("id".to_string()))
        );

        let reviews = &descriptors[1];
        assert_eq!(reviews.model_name, "BookReview");
        assert!(reviews.has_composite_pk());
    }

    #[tokio::test]
    async fn test_map_tables_with_subschema() {
        let inspector = make_inspector(DriverCapabilities::full());
        let descriptors = TableMapper::map_tables(&inspector, Some("legacy"))
            .await
            .unwrap();

        let authors = &descriptors[0];
        assert_eq!(authors.qualified_name, "legacy.Authors");
        assert_eq!(authors.base_name, "Authors");
        assert_eq!(authors.model_name, "Author");
    }

    #[tokio::test]
    async fn test_identity_alias_seeding() {
        let inspector = make_inspector(DriverCapabilities::full());
        let descriptors = TableMapper::map_tables(&inspector, None).await.unwrap();

        let authors = &descriptors[0];
        assert_eq!(authors.column_aliases.len(), 2);
        assert_eq!(
            authors.column_aliases.get("Name").map(String::as_str),
            Some("Name")
        );
    }
}
