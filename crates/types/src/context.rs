use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::ids::{FieldPath, ItemId, ListKey, SchemaVariant};
use crate::item::{IdFilter, Item};

/// The operations a list exposes. `Auth` covers authentication-related reads
/// some deployments gate separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    Auth,
}

impl Operation {
    #[must_use]
    pub fn kind(self) -> OperationKind {
        match self {
            Operation::Read | Operation::Auth => OperationKind::Query,
            Operation::Create | Operation::Update | Operation::Delete => OperationKind::Mutation,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Auth => "auth",
        };
        f.write_str(name)
    }
}

/// Whether a denied operation surfaces as a query or a mutation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Query => f.write_str("query"),
            OperationKind::Mutation => f.write_str("mutation"),
        }
    }
}

/// The outcome of evaluating an access rule for the acting user.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessDecision {
    Static(bool),
    /// Operation allowed only for items matching the filter.
    Filtered(IdFilter),
}

impl AccessDecision {
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Static(false))
    }
}

/// Request metadata forwarded to dynamic access-control evaluation.
#[derive(Clone, Debug, Default)]
pub struct AccessMeta {
    /// The GraphQL operation name being served, e.g. `createUser`.
    pub gql_name: String,
    pub item_id: Option<ItemId>,
    pub item_ids: Option<Vec<ItemId>>,
}

/// External access-control collaborator, evaluated per request for rules the
/// configuration declares as dynamic.
#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn list_access(
        &self,
        list_key: &ListKey,
        original_input: &Value,
        operation: Operation,
        meta: &AccessMeta,
    ) -> AccessDecision;

    async fn field_access(
        &self,
        list_key: &ListKey,
        field_path: &FieldPath,
        input: &Value,
        existing_item: Option<&Item>,
        operation: Operation,
    ) -> bool;
}

/// Grants everything; the default collaborator for tests and trusted callers.
pub struct AllowAll;

#[async_trait]
impl AccessControl for AllowAll {
    async fn list_access(
        &self,
        _list_key: &ListKey,
        _original_input: &Value,
        _operation: Operation,
        _meta: &AccessMeta,
    ) -> AccessDecision {
        AccessDecision::Static(true)
    }

    async fn field_access(
        &self,
        _list_key: &ListKey,
        _field_path: &FieldPath,
        _input: &Value,
        _existing_item: Option<&Item>,
        _operation: Operation,
    ) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheScope {
    Public,
    Private,
}

/// A response cache hint, recorded per request and merged by the server
/// layer (shortest max-age wins there; the engine only records).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheHint {
    pub max_age_seconds: u64,
    pub scope: CacheScope,
}

/// Per-request state threaded through every list operation: the acting
/// user's access collaborator, the schema variant being served, the running
/// result-count total and recorded cache hints.
///
/// One `Context` is owned by exactly one request; the counter needs no
/// coordination beyond atomics because work within a request is joined
/// before the response is produced.
pub struct Context {
    pub schema_variant: SchemaVariant,
    pub max_total_results: u64,
    access: Arc<dyn AccessControl>,
    total_results: AtomicU64,
    cache_hints: Mutex<Vec<CacheHint>>,
}

impl Context {
    #[must_use]
    pub fn new(
        access: Arc<dyn AccessControl>,
        schema_variant: SchemaVariant,
        max_total_results: u64,
    ) -> Self {
        Context {
            schema_variant,
            max_total_results,
            access,
            total_results: AtomicU64::new(0),
            cache_hints: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn access(&self) -> &dyn AccessControl {
        self.access.as_ref()
    }

    /// Adds `count` to the request-wide result total, returning the new total.
    pub fn add_results(&self, count: u64) -> u64 {
        self.total_results.fetch_add(count, Ordering::Relaxed) + count
    }

    #[must_use]
    pub fn total_results(&self) -> u64 {
        self.total_results.load(Ordering::Relaxed)
    }

    pub fn record_cache_hint(&self, hint: CacheHint) {
        self.cache_hints
            .lock()
            .expect("cache hint lock poisoned")
            .push(hint);
    }

    #[must_use]
    pub fn cache_hints(&self) -> Vec<CacheHint> {
        self.cache_hints
            .lock()
            .expect("cache hint lock poisoned")
            .clone()
    }
}
