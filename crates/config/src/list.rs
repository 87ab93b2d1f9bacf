use indexmap::IndexMap;
use std::sync::Arc;

use strata_types::{CacheHint, FieldPath, Item};

use crate::access::ListAccessConfig;
use crate::field::FieldConfig;
use crate::hooks::ListHooks;

/// Explicit overrides for derived names. Every member is optional; anything
/// unset is derived deterministically from the list key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NamingOverrides {
    pub label: Option<String>,
    pub singular: Option<String>,
    pub plural: Option<String>,
    pub path: Option<String>,
    pub item_query_name: Option<String>,
    pub list_query_name: Option<String>,
}

/// Cache-hint policy for a list's queries: a fixed hint applied verbatim, a
/// function of the result set, the operation name and whether the query was
/// a meta (count) query, or a declarative JSON form that the engine parses
/// (and rejects as malformed) at list construction.
#[derive(Clone)]
pub enum CacheHintPolicy {
    Static(CacheHint),
    Dynamic(Arc<dyn Fn(&[Item], &str, bool) -> CacheHint + Send + Sync>),
    Declarative(serde_json::Value),
}

impl CacheHintPolicy {
    /// Parses the declarative form: `{"maxAge": <seconds>, "scope": "public" | "private"}`.
    pub fn parse_declarative(value: &serde_json::Value) -> Result<CacheHint, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected an object, got {value}"))?;
        for key in object.keys() {
            if !matches!(key.as_str(), "maxAge" | "scope") {
                return Err(format!("unknown cache hint key `{key}`"));
            }
        }
        let max_age_seconds = match object.get("maxAge") {
            None => 0,
            Some(value) => value
                .as_u64()
                .ok_or_else(|| format!("`maxAge` must be a non-negative integer, got {value}"))?,
        };
        let scope = match object.get("scope") {
            None => strata_types::CacheScope::Public,
            Some(value) => match value.as_str() {
                Some("public") => strata_types::CacheScope::Public,
                Some("private") => strata_types::CacheScope::Private,
                _ => return Err(format!("invalid cache hint scope {value}")),
            },
        };
        Ok(CacheHint {
            max_age_seconds,
            scope,
        })
    }
}

#[derive(Clone)]
pub struct ListConfig {
    pub fields: IndexMap<FieldPath, FieldConfig>,
    pub access: ListAccessConfig,
    /// Fallback for operations with no declared rule.
    pub default_access: bool,
    pub hooks: ListHooks,
    pub naming: NamingOverrides,
    /// Per-query result-count ceiling. `None` means unbounded.
    pub max_results: Option<u64>,
    pub cache_hint: Option<CacheHintPolicy>,
    /// Auxiliary lists back internal bookkeeping; they keep their leading
    /// underscore in labels and may use reserved field paths.
    pub is_auxiliary: bool,
    pub admin_doc: Option<String>,
}

impl Default for ListConfig {
    fn default() -> Self {
        ListConfig {
            fields: IndexMap::new(),
            access: ListAccessConfig::default(),
            default_access: true,
            hooks: ListHooks::default(),
            naming: NamingOverrides::default(),
            max_results: None,
            cache_hint: None,
            is_auxiliary: false,
            admin_doc: None,
        }
    }
}
