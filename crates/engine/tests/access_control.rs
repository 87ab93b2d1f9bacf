//! List- and field-level access enforcement: static denial, id-filter rules,
//! dynamic collaborator rules and denial aggregation.

mod common;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{allow_all_ctx, build_registry, ctx_with, list_config, text};
use strata_config::{AccessRuleConfig, FieldOperationRules, ListConfig, OperationRules};
use strata_types::{
    AccessControl, AccessDecision, AccessMeta, FieldPath, IdFilter, Item, ItemId, ListKey,
    Operation, OperationError, QueryArgs,
};

fn with_list_rule(mut config: ListConfig, operation: Operation, rule: AccessRuleConfig) -> ListConfig {
    match operation {
        Operation::Read => config.access.base.read = Some(rule),
        Operation::Create => config.access.base.create = Some(rule),
        Operation::Update => config.access.base.update = Some(rule),
        Operation::Delete => config.access.base.delete = Some(rule),
        Operation::Auth => config.access.base.auth = Some(rule),
    }
    config
}

#[tokio::test]
async fn statically_denied_read_never_reaches_the_adapter() {
    let config = with_list_rule(
        list_config(&[("title", text())]),
        Operation::Read,
        AccessRuleConfig::Static(false),
    );
    let (registry, provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let ctx = allow_all_ctx();
    let post = registry.get("Post").unwrap();

    let error = post.list_query(&ctx, QueryArgs::default()).await.unwrap_err();

    assert!(matches!(error, OperationError::AccessDenied(_)));
    assert!(provider.store("Post").unwrap().query_log().is_empty());
}

#[tokio::test]
async fn filter_excluded_item_is_denied_without_a_query() {
    let filter = IdFilter {
        id_in: Some(vec![ItemId::new("allowed")]),
        ..IdFilter::default()
    };
    let config = with_list_rule(
        list_config(&[("title", text())]),
        Operation::Read,
        AccessRuleConfig::Filter(filter),
    );
    let (registry, provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let ctx = allow_all_ctx();
    let post = registry.get("Post").unwrap();

    let store = provider.store("Post").unwrap();
    store.seed(Item::new(ItemId::new("allowed"), IndexMap::new()));
    store.seed(Item::new(ItemId::new("hidden"), IndexMap::new()));
    store.clear_query_log();

    let error = post
        .item_query(&ctx, &ItemId::new("hidden"))
        .await
        .unwrap_err();
    // The denial is decided from the filter alone; the item's existence is
    // never probed, and the error never says "not found".
    assert!(matches!(error, OperationError::AccessDenied(_)));
    assert!(store.query_log().is_empty());

    let item = post.item_query(&ctx, &ItemId::new("allowed")).await.unwrap();
    assert_eq!(item.id.as_str(), "allowed");
}

#[tokio::test]
async fn field_denials_are_collected_before_raising() {
    let denied_field = || {
        let mut field = text();
        field.access.base = FieldOperationRules {
            create: Some(AccessRuleConfig::Static(false)),
            ..FieldOperationRules::default()
        };
        field
    };
    let config = list_config(&[
        ("title", text()),
        ("secret", denied_field()),
        ("hidden", denied_field()),
    ]);
    let (registry, provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let ctx = allow_all_ctx();
    let post = registry.get("Post").unwrap();

    let error = post
        .create_one(
            &registry,
            &ctx,
            json!({ "title": "ok", "secret": "a", "hidden": "b" }),
        )
        .await
        .unwrap_err();

    let OperationError::AccessDenied(denied) = error else {
        panic!("expected access denial, got {error}");
    };
    assert_eq!(
        denied.restricted_fields,
        vec![FieldPath::new("secret"), FieldPath::new("hidden")]
    );
    assert!(provider.store("Post").unwrap().is_empty());
}

#[tokio::test]
async fn update_field_denials_are_collected_with_the_item_id() -> anyhow::Result<()> {
    let locked_field = || {
        let mut field = text();
        field.access.base = FieldOperationRules {
            update: Some(AccessRuleConfig::Static(false)),
            ..FieldOperationRules::default()
        };
        field
    };
    let config = list_config(&[
        ("title", text()),
        ("slug", locked_field()),
        ("owner", locked_field()),
    ]);
    let (registry, provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let ctx = allow_all_ctx();
    let post = registry.get("Post").unwrap();

    let item = post
        .create_one(
            &registry,
            &ctx,
            json!({ "title": "ok", "slug": "initial", "owner": "ann" }),
        )
        .await?;

    let error = post
        .update_one(
            &registry,
            &ctx,
            &item.id,
            json!({ "title": "fine", "slug": "changed", "owner": "bob" }),
        )
        .await
        .unwrap_err();

    let OperationError::AccessDenied(denied) = error else {
        panic!("expected access denial, got {error}");
    };
    assert_eq!(
        denied.restricted_fields,
        vec![FieldPath::new("slug"), FieldPath::new("owner")]
    );
    assert_eq!(denied.item_ids, Some(vec![item.id.clone()]));

    // Nothing was written, the allowed field included.
    let stored = provider.store("Post").unwrap().item(item.id.as_str()).unwrap();
    assert_eq!(stored.get("slug"), Some(&json!("initial")));
    assert_eq!(stored.get("title"), Some(&json!("ok")));
    Ok(())
}

struct DenyPostReads {
    consulted: AtomicUsize,
}

#[async_trait]
impl AccessControl for DenyPostReads {
    async fn list_access(
        &self,
        list_key: &ListKey,
        _original_input: &Value,
        operation: Operation,
        _meta: &AccessMeta,
    ) -> AccessDecision {
        self.consulted.fetch_add(1, Ordering::SeqCst);
        AccessDecision::Static(!(list_key.as_str() == "Post" && operation == Operation::Read))
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

#[tokio::test]
async fn dynamic_rules_defer_to_the_collaborator() {
    let config = with_list_rule(
        list_config(&[("title", text())]),
        Operation::Read,
        AccessRuleConfig::Dynamic,
    );
    let (registry, _provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let collaborator = Arc::new(DenyPostReads {
        consulted: AtomicUsize::new(0),
    });
    let ctx = ctx_with(Arc::clone(&collaborator) as Arc<dyn AccessControl>, u64::MAX);
    let post = registry.get("Post").unwrap();

    let error = post.list_query(&ctx, QueryArgs::default()).await.unwrap_err();

    assert!(matches!(error, OperationError::AccessDenied(_)));
    assert_eq!(collaborator.consulted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bulk_delete_degrades_to_the_authorized_subset() {
    let filter = IdFilter {
        id_in: Some(vec![ItemId::new("p1"), ItemId::new("p2")]),
        ..IdFilter::default()
    };
    let config = with_list_rule(
        list_config(&[("title", text())]),
        Operation::Delete,
        AccessRuleConfig::Filter(filter),
    );
    let (registry, provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let ctx = allow_all_ctx();
    let post = registry.get("Post").unwrap();

    let store = provider.store("Post").unwrap();
    for id in ["p1", "p2", "p3", "p4", "p5"] {
        store.seed(Item::new(ItemId::new(id), IndexMap::new()));
    }

    let ids: Vec<ItemId> = ["p1", "p2", "p3", "p4", "p5"]
        .iter()
        .map(|id| ItemId::new(*id))
        .collect();
    let results = post.delete_many(&registry, &ctx, ids).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn statically_denied_bulk_delete_fails_whole() {
    let config = with_list_rule(
        list_config(&[("title", text())]),
        Operation::Delete,
        AccessRuleConfig::Static(false),
    );
    let (registry, provider) = build_registry(IndexMap::from([(ListKey::new("Post"), config)]));
    let ctx = allow_all_ctx();
    let post = registry.get("Post").unwrap();
    provider
        .store("Post")
        .unwrap()
        .seed(Item::new(ItemId::new("p1"), IndexMap::new()));

    let error = post
        .delete_many(&registry, &ctx, vec![ItemId::new("p1")])
        .await
        .unwrap_err();

    assert!(matches!(error, OperationError::AccessDenied(_)));
    assert_eq!(provider.store("Post").unwrap().len(), 1);
}
