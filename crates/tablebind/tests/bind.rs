//! End-to-end bind tests over the in-memory driver.

use std::sync::Arc;

use tablebind::driver::{MemoryConnector, MemoryDriver, MemoryTable};
use tablebind::{
    AdapterOverrides, BindError, ConnectConfig, ConnectSpec, DriverCapabilities, DriverFactory,
    NamespaceRegistry, Orchestrator,
};

fn memory_config() -> ConnectConfig {
    ConnectConfig {
        adapter: "memory".to_string(),
        host: "local".to_string(),
        port: 0,
        database: "library".to_string(),
        user: String::new(),
        password: String::new(),
        subschema: None,
        namespace: Vec::new(),
        params: Default::default(),
    }
}

fn orchestrator_for(driver: Arc<MemoryDriver>) -> Orchestrator {
    let mut drivers = DriverFactory::new();
    drivers.register("memory", MemoryConnector::new(driver));
    Orchestrator::new().with_drivers(drivers)
}

/// The library fixture: spaced, mixed-case identifiers and native FKs.
fn library_driver() -> Arc<MemoryDriver> {
    Arc::new(
        MemoryDriver::builder()
            .table(
                MemoryTable::new("Authors")
                    .column("Author ID", "int4")
                    .column("Name", "varchar")
                    .column("Birthday", "date")
                    .column("Address", "varchar")
                    .primary_key(["Author ID"]),
            )
            .table(
                MemoryTable::new("Publishers")
                    .column("Publisher ID", "int4")
                    .column("Name", "varchar")
                    .column("Address", "varchar")
                    .column("Website", "varchar")
                    .primary_key(["Publisher ID"]),
            )
            .table(
                MemoryTable::new("Books")
                    .column("Book ID", "int4")
                    .column("Title", "varchar")
                    .column("Author ID", "int4")
                    .column("Publisher ID", "int4")
                    .primary_key(["Book ID"])
                    .foreign_key("books_authors_fk", "Author ID", "Authors", "Author ID")
                    .foreign_key(
                        "books_publishers_fk",
                        "Publisher ID",
                        "Publishers",
                        "Publisher ID",
                    ),
            )
            .build(),
    )
}

#[tokio::test]
async fn end_to_end_library_schema() {
    let orchestrator = orchestrator_for(library_driver());
    let mut registry = NamespaceRegistry::new();

    let schema = orchestrator
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap();

    let names: Vec<&str> = schema.models().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["Author", "Publisher", "Book"]);

    // Normalized column accessor on the generated type.
    let book = schema.model("Book").unwrap();
    let column = book.column("author_id").expect("normalized alias bound");
    assert_eq!(column.name, "Author ID");

    // Association reachable under the raw table name and the normalized alias.
    let via_table = book.association("Authors").expect("raw-name association");
    let via_alias = book.association("author").expect("aliased association");
    assert_eq!(via_table.target_model, "Author");
    assert_eq!(via_alias.target_model, "Author");
    assert_eq!(via_alias.foreign_key, "Author ID");
    assert_eq!(via_alias.target_key, "Author ID");
    assert_eq!(via_alias.target_table, "Authors");

    // Models are discoverable through the registry too.
    assert!(registry.get(&[], "Author").is_some());
    assert!(registry.get(&[], "Publisher").is_some());
    assert!(registry.get(&[], "Book").is_some());

    let report = schema.report();
    assert_eq!(report.tables_bound, 3);
    assert_eq!(report.relationships_wired, 2);
    assert!(report.token.starts_with("Schema_"));
}

#[tokio::test]
async fn heuristic_inference_wires_author_association() {
    let driver = Arc::new(
        MemoryDriver::builder()
            .table(
                MemoryTable::new("Authors")
                    .column("id", "int4")
                    .column("name", "varchar")
                    .primary_key(["id"]),
            )
            .table(
                MemoryTable::new("Books")
                    .column("id", "int4")
                    .column("title", "varchar")
                    .column("author_id", "int4")
                    .primary_key(["id"]),
            )
            .capabilities(DriverCapabilities::without_foreign_keys())
            .build(),
    );
    let orchestrator = orchestrator_for(driver);
    let mut registry = NamespaceRegistry::new();

    let schema = orchestrator
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap();

    let book = schema.model("Book").unwrap();
    let fk = &book.descriptor().foreign_keys[0];
    assert!(fk.synthesized);
    assert_eq!(fk.from_column, "author_id");
    assert_eq!(fk.to_table, "Authors");
    assert_eq!(fk.to_column, "id");

    let association = book.association("author").expect("inferred association");
    assert_eq!(association.target_model, "Author");
    assert_eq!(association.foreign_key, "author_id");
    assert_eq!(association.target_key, "id");
}

#[tokio::test]
async fn collision_fails_before_defining_and_disconnects() {
    let first_driver = library_driver();
    let mut registry = NamespaceRegistry::new();

    orchestrator_for(first_driver.clone())
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap();
    let bound_before: Vec<String> = registry.bound_names(&[]);

    // A second bind into the same namespace collides on every model name.
    let second_driver = library_driver();
    let err = orchestrator_for(second_driver.clone())
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap_err();

    match err {
        BindError::NameCollision { names } => {
            assert_eq!(names, vec!["Author", "Book", "Publisher"]);
        }
        other => panic!("expected NameCollision, got {other}"),
    }

    // The namespace is untouched and the failed bind's pool is closed.
    assert_eq!(registry.bound_names(&[]), bound_before);
    assert!(second_driver.is_closed());
    assert!(!first_driver.is_closed());
}

#[tokio::test]
async fn composite_primary_key_guards_lookup() {
    let driver = Arc::new(
        MemoryDriver::builder()
            .table(
                MemoryTable::new("order_items")
                    .column("order_id", "int4")
                    .column("item_id", "int4")
                    .column("quantity", "int4")
                    .primary_key(["order_id", "item_id"]),
            )
            .build(),
    );
    let orchestrator = orchestrator_for(driver);
    let mut registry = NamespaceRegistry::new();

    let schema = orchestrator
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap();

    let model = schema.model("OrderItem").unwrap();
    for value in [1, 2, 99] {
        let err = model.lookup(value).unwrap_err();
        assert!(matches!(err, BindError::CompoundPrimaryKeyLookup { .. }));
    }
}

#[tokio::test]
async fn already_normalized_column_gains_no_duplicate_alias() {
    let driver = Arc::new(
        MemoryDriver::builder()
            .table(
                MemoryTable::new("posts")
                    .column("id", "int4")
                    .column("author_id", "int4")
                    .primary_key(["id"]),
            )
            .build(),
    );
    let orchestrator = orchestrator_for(driver);
    let mut registry = NamespaceRegistry::new();

    let schema = orchestrator
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap();

    let post = schema.model("Post").unwrap();
    // Both columns are already in normalized form: identity aliases only.
    assert_eq!(post.aliases().len(), 2);
    assert_eq!(
        post.aliases().get("author_id").map(String::as_str),
        Some("author_id")
    );
}

#[tokio::test]
async fn boolean_columns_get_stripped_aliases() {
    let driver = Arc::new(
        MemoryDriver::builder()
            .table(
                MemoryTable::new("accounts")
                    .column("id", "int4")
                    .column("IsActive", "boolean")
                    .primary_key(["id"]),
            )
            .build(),
    );
    let orchestrator = orchestrator_for(driver);
    let mut registry = NamespaceRegistry::new();

    let schema = orchestrator
        .bind(ConnectSpec::Config(memory_config()), &mut registry)
        .await
        .unwrap();

    let account = schema.model("Account").unwrap();
    assert_eq!(
        account.column("active").map(|c| c.name.as_str()),
        Some("IsActive")
    );
}

#[tokio::test]
async fn subschema_prefixes_qualified_names() {
    let mut config = memory_config();
    config.subschema = Some("legacy".to_string());

    let orchestrator = orchestrator_for(library_driver());
    let mut registry = NamespaceRegistry::new();

    let schema = orchestrator
        .bind(ConnectSpec::Config(config), &mut registry)
        .await
        .unwrap();

    let book = schema.model("Book").unwrap();
    assert_eq!(book.table(), "legacy.Books");
    assert_eq!(book.base_table(), "Books");

    // Native FKs still wire by base name.
    assert!(book.association("author").is_some());
}

#[tokio::test]
async fn namespace_path_receives_bindings() {
    let mut config = memory_config();
    config.namespace = vec!["db".to_string(), "models".to_string()];

    let orchestrator = orchestrator_for(library_driver());
    let mut registry = NamespaceRegistry::new();

    orchestrator
        .bind(ConnectSpec::Config(config.clone()), &mut registry)
        .await
        .unwrap();

    assert!(registry.get(&config.namespace, "Author").is_some());
    assert!(registry.bound_names(&[]).is_empty());
}

#[tokio::test]
async fn bind_tokens_are_unique_per_invocation() {
    let mut registry_a = NamespaceRegistry::new();
    let mut registry_b = NamespaceRegistry::new();

    let a = orchestrator_for(library_driver())
        .bind(ConnectSpec::Config(memory_config()), &mut registry_a)
        .await
        .unwrap();
    let b = orchestrator_for(library_driver())
        .bind(ConnectSpec::Config(memory_config()), &mut registry_b)
        .await
        .unwrap();

    assert_ne!(a.token(), b.token());
}

#[tokio::test]
async fn duplicate_adapter_registration_fails() {
    let mut orchestrator = orchestrator_for(library_driver());
    orchestrator
        .adapters_mut()
        .register("memory", AdapterOverrides::none())
        .unwrap();

    let err = orchestrator
        .adapters_mut()
        .register("memory", AdapterOverrides::none())
        .unwrap_err();
    assert!(matches!(err, BindError::DuplicateAdapter(_)));
}
