//! An in-memory storage backend, used by the test suites and as the
//! reference `ListAdapter` implementation. Ids are minted deterministically
//! and every query the engine issues is recorded in a per-list log, so tests
//! can assert not just what came back but whether the adapter was consulted
//! at all.

mod filter;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use strata_types::{
    AdapterError, AdapterProvider, FieldPath, Item, ItemId, ListAdapter, ListKey,
    PrimaryKeyConfig, QueryArgs, QueryExtra, QueryResult, ResolvedData,
};

/// Provider for in-memory list adapters. Keeps a handle to every adapter it
/// hands out so callers can seed and inspect stores directly.
#[derive(Default)]
pub struct MemoryProvider {
    stores: Mutex<BTreeMap<ListKey, Arc<MemoryListAdapter>>>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        MemoryProvider::default()
    }

    /// The adapter bound to `key`, once the engine has created one.
    #[must_use]
    pub fn store(&self, key: &str) -> Option<Arc<MemoryListAdapter>> {
        self.stores
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }
}

impl AdapterProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn new_list_adapter(&self, key: &ListKey) -> Arc<dyn ListAdapter> {
        let adapter = Arc::new(MemoryListAdapter::new(key.clone()));
        self.stores
            .lock()
            .expect("store lock poisoned")
            .insert(key.clone(), Arc::clone(&adapter));
        adapter
    }

    fn default_primary_key_config(&self) -> Option<PrimaryKeyConfig> {
        Some(PrimaryKeyConfig {
            type_name: "Uuid".to_string(),
        })
    }
}

/// One list's storage: insertion-ordered items plus a log of every query
/// served. Minted ids are sequential, rendered in UUID form so they stay
/// stable across runs.
pub struct MemoryListAdapter {
    list_key: ListKey,
    items: Mutex<IndexMap<ItemId, IndexMap<FieldPath, Value>>>,
    next_id: AtomicU64,
    query_log: Mutex<Vec<QueryArgs>>,
}

impl MemoryListAdapter {
    #[must_use]
    pub fn new(list_key: ListKey) -> Self {
        MemoryListAdapter {
            list_key,
            items: Mutex::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
            query_log: Mutex::new(Vec::new()),
        }
    }

    /// Inserts an item verbatim, keeping its id. Intended for test setup.
    pub fn seed(&self, item: Item) {
        self.items
            .lock()
            .expect("item lock poisoned")
            .insert(item.id, item.data);
    }

    /// A snapshot of every stored item, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.items
            .lock()
            .expect("item lock poisoned")
            .iter()
            .map(|(id, data)| Item::new(id.clone(), data.clone()))
            .collect()
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<Item> {
        self.items
            .lock()
            .expect("item lock poisoned")
            .iter()
            .find(|(stored, _)| stored.as_str() == id)
            .map(|(id, data)| Item::new(id.clone(), data.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().expect("item lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `items_query` served since the last `clear_query_log`.
    #[must_use]
    pub fn query_log(&self) -> Vec<QueryArgs> {
        self.query_log
            .lock()
            .expect("query log lock poisoned")
            .clone()
    }

    pub fn clear_query_log(&self) {
        self.query_log
            .lock()
            .expect("query log lock poisoned")
            .clear();
    }

    fn mint_id(&self) -> ItemId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        ItemId::new(format!("00000000-0000-0000-0000-{n:012}"))
    }
}

#[async_trait]
impl ListAdapter for MemoryListAdapter {
    async fn items_query(
        &self,
        args: QueryArgs,
        extra: QueryExtra,
    ) -> Result<QueryResult, AdapterError> {
        self.query_log
            .lock()
            .expect("query log lock poisoned")
            .push(args.clone());
        let items = self.items.lock().expect("item lock poisoned");
        let mut selected: Vec<Item> = items
            .iter()
            .filter(|(id, data)| {
                args.filter
                    .as_ref()
                    .map_or(true, |filter| filter::matches(filter, id, data))
            })
            .filter(|(_, data)| {
                args.search.as_deref().map_or(true, |needle| {
                    data.values()
                        .filter_map(Value::as_str)
                        .any(|value| value.contains(needle))
                })
            })
            .map(|(id, data)| Item::new(id.clone(), data.clone()))
            .collect();
        drop(items);

        if let Some(order_by) = &args.order_by {
            sort_items(&mut selected, order_by);
        }
        let skip = usize::try_from(args.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let mut windowed: Vec<Item> = selected.into_iter().skip(skip).collect();
        if let Some(first) = args.first {
            windowed.truncate(usize::try_from(first).unwrap_or(usize::MAX));
        }
        debug!(
            list = %self.list_key,
            returned = windowed.len(),
            meta = extra.meta,
            "memory query served"
        );
        if extra.meta {
            Ok(QueryResult::Count(windowed.len() as u64))
        } else {
            Ok(QueryResult::Items(windowed))
        }
    }

    async fn create(&self, data: ResolvedData) -> Result<Item, AdapterError> {
        let mut stored: IndexMap<FieldPath, Value> = IndexMap::new();
        let mut id: Option<ItemId> = None;
        for (path, value) in data {
            if path.as_str() == "id" {
                if let Some(given) = value.as_str().filter(|given| !given.is_empty()) {
                    id = Some(ItemId::new(given));
                }
            } else {
                stored.insert(path, value);
            }
        }
        let id = id.unwrap_or_else(|| self.mint_id());
        self.items
            .lock()
            .expect("item lock poisoned")
            .insert(id.clone(), stored.clone());
        Ok(Item::new(id, stored))
    }

    async fn update(&self, id: &ItemId, data: ResolvedData) -> Result<Item, AdapterError> {
        let mut items = self.items.lock().expect("item lock poisoned");
        let stored = items
            .get_mut(id)
            .ok_or_else(|| AdapterError::ItemNotFound(id.clone()))?;
        for (path, value) in data {
            if path.as_str() == "id" {
                continue;
            }
            stored.insert(path, value);
        }
        Ok(Item::new(id.clone(), stored.clone()))
    }

    async fn delete(&self, id: &ItemId) -> Result<(), AdapterError> {
        let mut items = self.items.lock().expect("item lock poisoned");
        if items.shift_remove(id).is_none() {
            return Err(AdapterError::ItemNotFound(id.clone()));
        }
        Ok(())
    }
}

/// `order_by` takes the form `<field>_ASC` or `<field>_DESC`.
fn sort_items(items: &mut [Item], order_by: &str) {
    let (path, descending) = match order_by.rsplit_once('_') {
        Some((path, "ASC")) => (path, false),
        Some((path, "DESC")) => (path, true),
        _ => (order_by, false),
    };
    items.sort_by(|a, b| {
        let ordering = if path == "id" {
            a.id.as_str().cmp(b.id.as_str())
        } else {
            compare_values(a.get(path), b.get(path))
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> CmpOrdering {
    match (left, right) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(entries: &[(&str, Value)]) -> ResolvedData {
        entries
            .iter()
            .map(|(path, value)| (FieldPath::new(*path), value.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_mints_sequential_ids_and_strips_the_id_key() {
        let adapter = MemoryListAdapter::new(ListKey::new("Post"));

        let first = adapter.create(data(&[("title", json!("one"))])).await.unwrap();
        let second = adapter
            .create(data(&[("id", json!("")), ("title", json!("two"))]))
            .await
            .unwrap();

        assert_eq!(first.id.as_str(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(second.id.as_str(), "00000000-0000-0000-0000-000000000002");
        // `id` never lands in the stored data; it only keys the store.
        assert_eq!(second.get("id"), None);

        let given = adapter
            .create(data(&[("id", json!("custom")), ("title", json!("three"))]))
            .await
            .unwrap();
        assert_eq!(given.id.as_str(), "custom");
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let adapter = MemoryListAdapter::new(ListKey::new("Post"));
        let item = adapter
            .create(data(&[("title", json!("old")), ("status", json!("draft"))]))
            .await
            .unwrap();

        let updated = adapter
            .update(&item.id, data(&[("title", json!("new"))]))
            .await
            .unwrap();
        assert_eq!(updated.get("title"), Some(&json!("new")));
        assert_eq!(updated.get("status"), Some(&json!("draft")));

        adapter.delete(&item.id).await.unwrap();
        assert!(adapter.is_empty());
        let error = adapter.delete(&item.id).await.unwrap_err();
        assert!(matches!(error, AdapterError::ItemNotFound(_)));
    }

    #[tokio::test]
    async fn queries_filter_sort_and_window() {
        let adapter = MemoryListAdapter::new(ListKey::new("Post"));
        for title in ["cherry", "apple", "banana"] {
            adapter.create(data(&[("title", json!(title))])).await.unwrap();
        }

        let args = QueryArgs {
            order_by: Some("title_ASC".to_string()),
            skip: Some(1),
            first: Some(1),
            ..QueryArgs::default()
        };
        let result = adapter.items_query(args, QueryExtra::default()).await.unwrap();
        let QueryResult::Items(items) = result else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].get("title"), Some(&json!("banana")));

        let args = QueryArgs {
            filter: Some(json!({ "title_contains": "err" })),
            ..QueryArgs::default()
        };
        let result = adapter
            .items_query(args, QueryExtra { meta: true })
            .await
            .unwrap();
        assert_eq!(result, QueryResult::Count(1));
    }

    #[tokio::test]
    async fn the_query_log_records_served_arguments() {
        let adapter = MemoryListAdapter::new(ListKey::new("Post"));
        let args = QueryArgs {
            filter: Some(json!({ "id": "a" })),
            first: Some(1),
            ..QueryArgs::default()
        };
        adapter
            .items_query(args.clone(), QueryExtra::default())
            .await
            .unwrap();

        assert_eq!(adapter.query_log(), vec![args]);
        adapter.clear_query_log();
        assert!(adapter.query_log().is_empty());
    }

    #[test]
    fn the_provider_hands_out_and_retains_stores() {
        let provider = MemoryProvider::new();
        let _ = provider.new_list_adapter(&ListKey::new("Post"));
        assert!(provider.store("Post").is_some());
        assert!(provider.store("User").is_none());
        assert_eq!(
            provider.default_primary_key_config(),
            Some(PrimaryKeyConfig {
                type_name: "Uuid".to_string()
            })
        );
    }
}
