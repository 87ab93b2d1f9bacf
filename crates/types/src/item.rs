use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{FieldPath, ItemId};

/// Field values produced by the mutation pipeline, keyed by field path.
/// An absent key means "leave unchanged"; an explicit `Value::Null` means
/// "set to null".
pub type ResolvedData = IndexMap<FieldPath, Value>;

/// A stored record as returned by an adapter: an id plus a mapping from
/// field path to value. The engine treats the values as opaque JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(flatten)]
    pub data: IndexMap<FieldPath, Value>,
}

impl Item {
    #[must_use]
    pub fn new(id: ItemId, data: IndexMap<FieldPath, Value>) -> Self {
        Item { id, data }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.data.get(path)
    }
}

/// Query arguments passed through to `ListAdapter::items_query`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    /// A filter object in the list's `WhereInput` shape.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Out-of-band query information for adapters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryExtra {
    /// When set, the adapter must return an exact `Count` instead of items.
    pub meta: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Items(Vec<Item>),
    Count(u64),
}

/// Item-identity filter used by declarative access rules. An item is allowed
/// when it matches the inclusion constraints (`id`, `id_in`) and none of the
/// exclusion constraints (`id_not`, `id_not_in`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_not: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_in: Option<Vec<ItemId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_not_in: Option<Vec<ItemId>>,
}

impl IdFilter {
    #[must_use]
    pub fn allows(&self, id: &ItemId) -> bool {
        if let Some(expected) = &self.id {
            if id != expected {
                return false;
            }
        }
        if let Some(excluded) = &self.id_not {
            if id == excluded {
                return false;
            }
        }
        if let Some(included) = &self.id_in {
            if !included.contains(id) {
                return false;
            }
        }
        if let Some(excluded) = &self.id_not_in {
            if excluded.contains(id) {
                return false;
            }
        }
        true
    }

    /// Intersects the filter with an explicit set of requested ids, returning
    /// the ids that survive. An empty result is a provably-empty query: the
    /// caller can skip the adapter round trip entirely.
    #[must_use]
    pub fn restrict_to(&self, ids: &[ItemId]) -> Vec<ItemId> {
        ids.iter().filter(|id| self.allows(id)).cloned().collect()
    }
}
