//! Shared fixtures for the engine integration tests: registry construction
//! over the in-memory adapter and request contexts.

#![allow(dead_code)]

use indexmap::IndexMap;
use std::sync::Arc;

use strata_config::{FieldConfig, FieldTypeKind, ListConfig};
use strata_engine::ListRegistry;
use strata_memory_adapter::MemoryProvider;
use strata_types::{AccessControl, AllowAll, Context, FieldPath, ListKey, SchemaVariant};

pub fn build_registry(configs: IndexMap<ListKey, ListConfig>) -> (ListRegistry, MemoryProvider) {
    init_tracing();
    let provider = MemoryProvider::new();
    let registry = ListRegistry::build(configs, &provider, vec![SchemaVariant::default()])
        .expect("registry builds");
    (registry, provider)
}

/// Installs a subscriber once per test binary so `RUST_LOG` controls engine
/// log output during test runs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn allow_all_ctx() -> Arc<Context> {
    ctx_with(Arc::new(AllowAll), u64::MAX)
}

pub fn ctx_with(access: Arc<dyn AccessControl>, max_total_results: u64) -> Arc<Context> {
    Arc::new(Context::new(
        access,
        SchemaVariant::default(),
        max_total_results,
    ))
}

pub fn list_config(fields: &[(&str, FieldConfig)]) -> ListConfig {
    ListConfig {
        fields: fields
            .iter()
            .map(|(path, config)| (FieldPath::new(*path), config.clone()))
            .collect(),
        ..ListConfig::default()
    }
}

pub fn text() -> FieldConfig {
    FieldConfig::of(FieldTypeKind::Text)
}

pub fn to_one(ref_list: &str, ref_field: Option<&str>) -> FieldConfig {
    FieldConfig::of(FieldTypeKind::Relationship {
        ref_list: ListKey::new(ref_list),
        ref_field: ref_field.map(FieldPath::new),
        many: false,
    })
}

pub fn to_many(ref_list: &str, ref_field: Option<&str>) -> FieldConfig {
    FieldConfig::of(FieldTypeKind::Relationship {
        ref_list: ListKey::new(ref_list),
        ref_field: ref_field.map(FieldPath::new),
        many: true,
    })
}
