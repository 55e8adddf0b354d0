//! Bind orchestrator - main workflow coordinator.
//!
//! Walks the full binding state machine: resolve the connection spec, open
//! the connection, map tables, check the target namespace for collisions,
//! define models, register them, wire relationships, and hand back the
//! [`BoundSchema`].

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::adapter::AdapterRegistry;
use crate::config::{ConnectSpec, DefaultResolver, SpecResolver};
use crate::driver::{canonical_adapter, DriverFactory};
use crate::error::{BindError, Result};
use crate::inspect::SchemaInspector;
use crate::mapper::TableMapper;
use crate::model::{Association, BindReport, BoundSchema, Model};
use crate::namespace::NamespaceRegistry;
use crate::naming::{normalize_column_name, normalize_name};
use crate::schema::strip_prefix;

/// Phases of a bind invocation, in order. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindPhase {
    Init,
    SpecResolved,
    ConnectionEstablished,
    TablesMapped,
    CollisionChecked,
    TypesDefined,
    RelationshipsWired,
    Done,
}

impl BindPhase {
    fn as_str(&self) -> &'static str {
        match self {
            BindPhase::Init => "init",
            BindPhase::SpecResolved => "spec_resolved",
            BindPhase::ConnectionEstablished => "connection_established",
            BindPhase::TablesMapped => "tables_mapped",
            BindPhase::CollisionChecked => "collision_checked",
            BindPhase::TypesDefined => "types_defined",
            BindPhase::RelationshipsWired => "relationships_wired",
            BindPhase::Done => "done",
        }
    }
}

impl std::fmt::Display for BindPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn advance(phase: &mut BindPhase, next: BindPhase) {
    debug!("Bind phase: {} -> {}", phase, next);
    *phase = next;
}

/// Bind orchestrator.
///
/// Holds the injected collaborators: the spec resolver, the adapter override
/// registry, and the driver factory. The namespace registry is passed per
/// invocation so callers control where models land.
pub struct Orchestrator {
    resolver: Arc<dyn SpecResolver>,
    adapters: AdapterRegistry,
    drivers: DriverFactory,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with the default resolver and built-in drivers.
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(DefaultResolver),
            adapters: AdapterRegistry::new(),
            drivers: DriverFactory::with_builtins(),
        }
    }

    /// Replace the spec resolver.
    pub fn with_resolver(mut self, resolver: impl SpecResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Replace the adapter override registry.
    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Replace the driver factory.
    pub fn with_drivers(mut self, drivers: DriverFactory) -> Self {
        self.drivers = drivers;
        self
    }

    /// Mutable access to the adapter override registry.
    pub fn adapters_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.adapters
    }

    /// Mutable access to the driver factory.
    pub fn drivers_mut(&mut self) -> &mut DriverFactory {
        &mut self.drivers
    }

    /// Run the full bind: spec → connection → mapping → collision check →
    /// model definition → registration → relationship wiring.
    ///
    /// Models land in `registry` under the namespace path from the resolved
    /// configuration (the registry root when none is configured). On a name
    /// collision the connection is closed, the registry is left untouched,
    /// and no model is defined.
    pub async fn bind(
        &self,
        spec: impl Into<ConnectSpec>,
        registry: &mut NamespaceRegistry,
    ) -> Result<Arc<BoundSchema>> {
        let spec = spec.into();
        let started_at = Utc::now();
        let mut phase = BindPhase::Init;

        // Step 1: resolve the spec into a canonical configuration.
        let config = self.resolver.resolve(&spec)?;
        advance(&mut phase, BindPhase::SpecResolved);

        // Step 2: mint the unique base token for this invocation.
        let token = format!("Schema_{}", Uuid::new_v4().simple());
        info!("Starting bind {} (adapter '{}')", token, config.adapter);

        // Step 3: open the dedicated connection.
        let connection = self.drivers.connect(&config).await?;
        advance(&mut phase, BindPhase::ConnectionEstablished);

        // Step 4: map tables.
        let overrides = self.adapters.lookup(&canonical_adapter(&config.adapter));
        let inspector = SchemaInspector::new(connection.driver().clone(), overrides);
        let mut descriptors =
            TableMapper::map_tables(&inspector, config.subschema.as_deref()).await?;
        advance(&mut phase, BindPhase::TablesMapped);

        // Step 5: collision safeguard. Snapshot-based; see DESIGN.md for the
        // concurrent-bind caveat.
        let namespace = config.namespace.clone();
        let existing: BTreeSet<String> = registry.bound_names(&namespace).into_iter().collect();
        let mut seen = BTreeSet::new();
        let mut colliding = Vec::new();
        for descriptor in &descriptors {
            let name = &descriptor.model_name;
            if existing.contains(name) || !seen.insert(name.clone()) {
                colliding.push(name.clone());
            }
        }
        if !colliding.is_empty() {
            connection.close().await;
            return Err(BindError::name_collision(colliding));
        }
        advance(&mut phase, BindPhase::CollisionChecked);

        // Step 6: alias columns and define one model per table.
        let mut models: Vec<Arc<Model>> = Vec::with_capacity(descriptors.len());
        for descriptor in &mut descriptors {
            let aliases: Vec<(String, String)> = descriptor
                .columns
                .iter()
                .map(|column| (normalize_column_name(column), column.name.clone()))
                .collect();
            for (alias, raw) in aliases {
                // Claimed slots (identity aliases included) stay untouched.
                descriptor.column_aliases.entry(alias).or_insert(raw);
            }
            models.push(Model::define(descriptor.clone(), &token, connection.clone()));
        }
        advance(&mut phase, BindPhase::TypesDefined);

        // Step 7: register every model under its model name.
        for model in &models {
            registry.register(&namespace, model.name(), model.clone());
        }

        // Step 8: wire relationships, now that every model exists.
        let by_base: HashMap<&str, usize> = descriptors
            .iter()
            .enumerate()
            .map(|(idx, d)| (d.base_name.as_str(), idx))
            .collect();

        let mut association_maps: Vec<BTreeMap<String, Association>> =
            vec![BTreeMap::new(); descriptors.len()];
        let mut wired = 0usize;

        for descriptor in &descriptors {
            for fk in &descriptor.foreign_keys {
                let source_base = strip_prefix(&fk.from_table);
                let target_base = strip_prefix(&fk.to_table);
                let (Some(&source_idx), Some(&target_idx)) =
                    (by_base.get(source_base), by_base.get(target_base))
                else {
                    debug!(
                        "Skipping foreign key {} ({} -> {}): table not in mapping pass",
                        fk.name, fk.from_table, fk.to_table
                    );
                    continue;
                };

                let target = &descriptors[target_idx];
                // Exposed under the raw target base name and under the
                // normalized alias of the target's model name.
                for accessor in [
                    target.base_name.clone(),
                    normalize_name(&target.model_name),
                ] {
                    association_maps[source_idx].insert(
                        accessor.clone(),
                        Association {
                            name: accessor,
                            foreign_key: fk.from_column.clone(),
                            target_model: target.model_name.clone(),
                            target_table: target.base_name.clone(),
                            target_key: fk.to_column.clone(),
                        },
                    );
                }
                wired += 1;
            }
        }

        for (model, associations) in models.iter().zip(association_maps) {
            model.seal_associations(associations);
        }
        advance(&mut phase, BindPhase::RelationshipsWired);

        // Step 9: assemble the handle.
        let completed_at = Utc::now();
        let report = BindReport {
            token: token.clone(),
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            tables_bound: models.len(),
            relationships_wired: wired,
            namespace,
        };
        let schema = Arc::new(BoundSchema::new(token, connection, models, report));
        advance(&mut phase, BindPhase::Done);
        info!(
            "Bind {} complete: {} models, {} relationships",
            schema.token(),
            schema.report().tables_bound,
            schema.report().relationships_wired
        );
        Ok(schema)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("adapters", &self.adapters)
            .field("drivers", &self.drivers)
            .finish()
    }
}
