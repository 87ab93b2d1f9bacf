use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::ids::{ItemId, ListKey};
use crate::item::{Item, QueryArgs, QueryExtra, QueryResult, ResolvedData};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("item `{0}` does not exist")]
    ItemNotFound(ItemId),

    #[error("{0}")]
    Other(String),
}

/// Default primary-key configuration supplied by an adapter that can mint
/// ids itself. `type_name` must name a registered field type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryKeyConfig {
    pub type_name: String,
}

/// Per-list storage binding. Implementations translate the engine's query
/// and CRUD calls into a concrete storage backend.
#[async_trait]
pub trait ListAdapter: Send + Sync {
    async fn items_query(
        &self,
        args: QueryArgs,
        extra: QueryExtra,
    ) -> Result<QueryResult, AdapterError>;

    async fn create(&self, data: ResolvedData) -> Result<Item, AdapterError>;

    async fn update(&self, id: &ItemId, data: ResolvedData) -> Result<Item, AdapterError>;

    async fn delete(&self, id: &ItemId) -> Result<(), AdapterError>;
}

/// Factory for per-list adapters; one provider per storage backend.
pub trait AdapterProvider: Send + Sync {
    /// The adapter family name, used to check field-type support.
    fn name(&self) -> &str;

    fn new_list_adapter(&self, key: &ListKey) -> Arc<dyn ListAdapter>;

    /// `None` when the backend cannot supply a default primary key, in which
    /// case every list bound to it must declare an `id` field explicitly.
    fn default_primary_key_config(&self) -> Option<PrimaryKeyConfig> {
        None
    }
}
