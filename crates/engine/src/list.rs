//! The `List` aggregate and the registry of all configured lists.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::{Arc, OnceLock};

use strata_config::{CacheHintPolicy, FieldConfig, ListConfig, ListHooks};
use strata_types::{
    AdapterProvider, CacheHint, ConfigError, FieldPath, Item, ListAdapter, ListKey, SchemaVariant,
};

use crate::access::ListAccessTable;
use crate::fields::{self, FieldSet};
use crate::naming::{self, ListNames};

/// Cache-hint policy after construction-time validation.
#[derive(Clone)]
pub(crate) enum ResolvedCacheHint {
    Static(CacheHint),
    Dynamic(Arc<dyn Fn(&[Item], &str, bool) -> CacheHint + Send + Sync>),
}

/// A configured entity type: derived names, adapter binding, frozen access
/// table, hooks and (after `init_fields`) the bound field set. Created once
/// at configuration time and immutable afterwards.
pub struct List {
    pub key: ListKey,
    pub names: ListNames,
    pub access: ListAccessTable,
    pub hooks: ListHooks,
    pub max_results: Option<u64>,
    pub is_auxiliary: bool,
    pub default_access: bool,
    pub admin_doc: Option<String>,
    pub(crate) adapter: Arc<dyn ListAdapter>,
    pub(crate) cache_hint: Option<ResolvedCacheHint>,
    field_configs: IndexMap<FieldPath, FieldConfig>,
    fields: OnceLock<FieldSet>,
}

impl List {
    /// Construction-time validation: naming derivation (which rejects
    /// ambiguous pluralization) and cache-hint parsing. Field binding is
    /// deferred to `init_fields`.
    pub fn new(
        key: ListKey,
        config: ListConfig,
        provider: &dyn AdapterProvider,
        variants: &[SchemaVariant],
    ) -> Result<List, ConfigError> {
        let names = naming::derive(&key, &config.naming)?;
        let cache_hint = match config.cache_hint {
            None => None,
            Some(CacheHintPolicy::Static(hint)) => Some(ResolvedCacheHint::Static(hint)),
            Some(CacheHintPolicy::Dynamic(f)) => Some(ResolvedCacheHint::Dynamic(f)),
            Some(CacheHintPolicy::Declarative(value)) => {
                let hint = CacheHintPolicy::parse_declarative(&value).map_err(|reason| {
                    ConfigError::MalformedCacheHint {
                        list: key.clone(),
                        reason,
                    }
                })?;
                Some(ResolvedCacheHint::Static(hint))
            }
        };
        let access = ListAccessTable::resolve(&config.access, config.default_access, variants);
        let adapter = provider.new_list_adapter(&key);
        Ok(List {
            key,
            names,
            access,
            hooks: config.hooks,
            max_results: config.max_results,
            is_auxiliary: config.is_auxiliary,
            default_access: config.default_access,
            admin_doc: config.admin_doc,
            adapter,
            cache_hint,
            field_configs: config.fields,
            fields: OnceLock::new(),
        })
    }

    /// One-time field binding. A second call is a configuration error; the
    /// field set is immutable once this completes.
    pub fn init_fields(
        &self,
        provider: &dyn AdapterProvider,
        variants: &[SchemaVariant],
    ) -> Result<(), ConfigError> {
        if self.fields.get().is_some() {
            return Err(ConfigError::FieldsAlreadyInitialized(self.key.clone()));
        }
        let set = fields::build(
            &self.key,
            &self.field_configs,
            provider,
            variants,
            self.default_access,
            self.is_auxiliary,
        )?;
        self.fields
            .set(set)
            .map_err(|_| ConfigError::FieldsAlreadyInitialized(self.key.clone()))
    }

    /// The bound field set. `ListRegistry::build` initializes every list, so
    /// this is always available on registry-constructed lists.
    #[must_use]
    pub fn fields(&self) -> &FieldSet {
        self.fields
            .get()
            .expect("init_fields runs during registry construction")
    }

    #[must_use]
    pub fn adapter(&self) -> &dyn ListAdapter {
        self.adapter.as_ref()
    }

    /// Derived metadata the admin UI builds its CRUD screens from.
    #[must_use]
    pub fn admin_meta(&self) -> AdminMeta {
        AdminMeta {
            key: self.key.clone(),
            label: self.names.label.clone(),
            singular: self.names.singular.clone(),
            plural: self.names.plural.clone(),
            path: self.names.path.clone(),
            admin_doc: self.admin_doc.clone(),
            fields: self
                .fields()
                .iter()
                .map(|field| AdminFieldMeta {
                    path: field.path.clone(),
                    label: field.label.clone(),
                    view: field.admin_view.clone(),
                    is_primary_key: field.is_primary_key,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdminMeta {
    pub key: ListKey,
    pub label: String,
    pub singular: String,
    pub plural: String,
    pub path: String,
    pub admin_doc: Option<String>,
    pub fields: Vec<AdminFieldMeta>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdminFieldMeta {
    pub path: FieldPath,
    pub label: String,
    pub view: String,
    pub is_primary_key: bool,
}

/// All configured lists, keyed by list key. Construction builds every list,
/// initializes its fields and cross-checks relationship references.
pub struct ListRegistry {
    lists: IndexMap<ListKey, Arc<List>>,
    variants: Vec<SchemaVariant>,
}

impl std::fmt::Debug for ListRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListRegistry")
            .field("lists", &self.lists.keys().collect::<Vec<_>>())
            .field("variants", &self.variants)
            .finish()
    }
}

impl ListRegistry {
    pub fn build(
        configs: IndexMap<ListKey, ListConfig>,
        provider: &dyn AdapterProvider,
        variants: Vec<SchemaVariant>,
    ) -> Result<ListRegistry, ConfigError> {
        let mut lists = IndexMap::new();
        for (key, config) in configs {
            let list = List::new(key.clone(), config, provider, &variants)?;
            list.init_fields(provider, &variants)?;
            lists.insert(key, Arc::new(list));
        }
        let registry = ListRegistry { lists, variants };
        registry.check_relationships()?;
        Ok(registry)
    }

    /// Every relationship must reference a known list, and a declared
    /// reciprocal field must exist on the target and itself be a
    /// relationship.
    fn check_relationships(&self) -> Result<(), ConfigError> {
        for list in self.lists.values() {
            for field in list.fields().iter() {
                let Some((ref_list, ref_field, _many)) = field.relationship() else {
                    continue;
                };
                let Some(target) = self.lists.get(ref_list) else {
                    return Err(ConfigError::UnknownRelatedList {
                        list: list.key.clone(),
                        field: field.path.clone(),
                        reference: ref_list.clone(),
                    });
                };
                if let Some(ref_field) = ref_field {
                    let reciprocal = target.fields().by_path(ref_field);
                    if !reciprocal.is_some_and(|field| field.is_relationship()) {
                        return Err(ConfigError::UnknownRelatedList {
                            list: list.key.clone(),
                            field: field.path.clone(),
                            reference: ListKey::new(format!("{ref_list}.{ref_field}")),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<List>> {
        self.lists.get(key)
    }

    #[must_use]
    pub fn lists(&self) -> impl Iterator<Item = &Arc<List>> {
        self.lists.values()
    }

    #[must_use]
    pub fn variants(&self) -> &[SchemaVariant] {
        self.variants.as_slice()
    }
}
