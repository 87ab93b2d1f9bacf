//! Nested relationship operations: fixed apply order, to-one precedence and
//! reciprocal backlink bookkeeping.

mod common;

use indexmap::IndexMap;
use serde_json::json;

use common::{allow_all_ctx, build_registry, list_config, text, to_many, to_one};
use strata_types::{ListKey, OperationError};

#[tokio::test]
async fn to_many_operations_apply_in_fixed_order() {
    let user = list_config(&[("name", text()), ("posts", to_many("Post", None))]);
    let post = list_config(&[("title", text())]);
    let (registry, _provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let posts = registry.get("Post").unwrap();
    let users = registry.get("User").unwrap();

    let p1 = posts
        .create_one(&registry, &ctx, json!({ "title": "one" }))
        .await
        .unwrap();
    let p2 = posts
        .create_one(&registry, &ctx, json!({ "title": "two" }))
        .await
        .unwrap();

    let user = users
        .create_one(
            &registry,
            &ctx,
            json!({ "name": "Ann", "posts": { "connect": [{ "id": p1.id }, { "id": p2.id }] } }),
        )
        .await
        .unwrap();
    assert_eq!(user.get("posts"), Some(&json!([p1.id, p2.id])));

    // Disconnect applies before connect no matter how the input is keyed, so
    // disconnecting and reconnecting the same id in one call keeps it (moved
    // to the end of the set).
    let user = users
        .update_one(
            &registry,
            &ctx,
            &user.id,
            json!({ "posts": { "connect": [{ "id": p1.id }], "disconnect": [{ "id": p1.id }] } }),
        )
        .await
        .unwrap();
    assert_eq!(user.get("posts"), Some(&json!([p2.id, p1.id])));
}

#[tokio::test]
async fn disconnect_all_runs_before_creates() {
    let user = list_config(&[("name", text()), ("posts", to_many("Post", None))]);
    let post = list_config(&[("title", text())]);
    let (registry, provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let posts = registry.get("Post").unwrap();
    let users = registry.get("User").unwrap();

    let p1 = posts
        .create_one(&registry, &ctx, json!({ "title": "old" }))
        .await
        .unwrap();
    let user = users
        .create_one(
            &registry,
            &ctx,
            json!({ "posts": { "connect": [{ "id": p1.id }] } }),
        )
        .await
        .unwrap();

    let user = users
        .update_one(
            &registry,
            &ctx,
            &user.id,
            json!({ "posts": { "disconnectAll": true, "create": [{ "title": "new" }] } }),
        )
        .await
        .unwrap();

    let linked = user.get("posts").and_then(|value| value.as_array()).unwrap();
    assert_eq!(linked.len(), 1);
    assert_ne!(linked[0], json!(p1.id));
    // The nested create really persisted.
    assert_eq!(provider.store("Post").unwrap().len(), 2);
}

#[tokio::test]
async fn to_one_create_wins_over_connect() {
    let user = list_config(&[("name", text())]);
    let post = list_config(&[("title", text()), ("author", to_one("User", None))]);
    let (registry, provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let users = registry.get("User").unwrap();
    let posts = registry.get("Post").unwrap();

    let existing = users
        .create_one(&registry, &ctx, json!({ "name": "Old" }))
        .await
        .unwrap();
    let post = posts
        .create_one(
            &registry,
            &ctx,
            json!({
                "title": "t",
                "author": { "connect": { "id": existing.id }, "create": { "name": "New" } }
            }),
        )
        .await
        .unwrap();

    let author_id = post.get("author").and_then(|value| value.as_str()).unwrap();
    assert_ne!(author_id, existing.id.as_str());
    assert_eq!(provider.store("User").unwrap().len(), 2);
}

#[tokio::test]
async fn to_one_disconnect_only_clears_a_matching_id() {
    let user = list_config(&[("name", text())]);
    let post = list_config(&[("title", text()), ("author", to_one("User", None))]);
    let (registry, _provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let users = registry.get("User").unwrap();
    let posts = registry.get("Post").unwrap();

    let ann = users
        .create_one(&registry, &ctx, json!({ "name": "Ann" }))
        .await
        .unwrap();
    let post = posts
        .create_one(
            &registry,
            &ctx,
            json!({ "author": { "connect": { "id": ann.id } } }),
        )
        .await
        .unwrap();

    // A disconnect naming some other id is a no-op.
    let post = posts
        .update_one(
            &registry,
            &ctx,
            &post.id,
            json!({ "author": { "disconnect": { "id": "somebody-else" } } }),
        )
        .await
        .unwrap();
    assert_eq!(post.get("author"), Some(&json!(ann.id)));

    let post = posts
        .update_one(
            &registry,
            &ctx,
            &post.id,
            json!({ "author": { "disconnect": { "id": ann.id } } }),
        )
        .await
        .unwrap();
    assert_eq!(post.get("author"), Some(&serde_json::Value::Null));
}

#[tokio::test]
async fn two_sided_relationships_maintain_backlinks() {
    let user = list_config(&[("name", text()), ("posts", to_many("Post", Some("author")))]);
    let post = list_config(&[("title", text()), ("author", to_one("User", Some("posts")))]);
    let (registry, provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let users = registry.get("User").unwrap();
    let posts = registry.get("Post").unwrap();

    let ann = users
        .create_one(&registry, &ctx, json!({ "name": "Ann" }))
        .await
        .unwrap();
    let post = posts
        .create_one(
            &registry,
            &ctx,
            json!({ "title": "t", "author": { "connect": { "id": ann.id } } }),
        )
        .await
        .unwrap();

    let stored_ann = provider.store("User").unwrap().item(ann.id.as_str()).unwrap();
    assert_eq!(stored_ann.get("posts"), Some(&json!([post.id])));

    // Deleting the post removes the reverse reference.
    posts.delete_one(&registry, &ctx, &post.id).await.unwrap();
    let stored_ann = provider.store("User").unwrap().item(ann.id.as_str()).unwrap();
    assert_eq!(stored_ann.get("posts"), Some(&json!([])));
}

#[tokio::test]
async fn nested_create_sets_the_reciprocal_field() {
    let user = list_config(&[("name", text()), ("posts", to_many("Post", Some("author")))]);
    let post = list_config(&[("title", text()), ("author", to_one("User", Some("posts")))]);
    let (registry, provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let users = registry.get("User").unwrap();

    let ann = users
        .create_one(
            &registry,
            &ctx,
            json!({ "name": "Ann", "posts": { "create": [{ "title": "mine" }] } }),
        )
        .await
        .unwrap();

    let post_store = provider.store("Post").unwrap();
    let created = &post_store.items()[0];
    assert_eq!(created.get("author"), Some(&json!(ann.id)));
}

#[tokio::test]
async fn connecting_an_unknown_id_is_denied() {
    let user = list_config(&[("name", text()), ("posts", to_many("Post", None))]);
    let post = list_config(&[("title", text()), ("author", to_one("User", None))]);
    let (registry, provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let users = registry.get("User").unwrap();
    let posts = registry.get("Post").unwrap();

    // The bad reference is rejected before anything persists; no dangling id
    // ever reaches the store.
    let error = users
        .create_one(
            &registry,
            &ctx,
            json!({ "posts": { "connect": [{ "id": "no-such-post" }] } }),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, OperationError::AccessDenied(_)));
    assert!(provider.store("User").unwrap().is_empty());

    let error = posts
        .create_one(
            &registry,
            &ctx,
            json!({ "title": "t", "author": { "connect": { "id": "no-such-user" } } }),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, OperationError::AccessDenied(_)));
    assert!(provider.store("Post").unwrap().is_empty());
}

#[tokio::test]
async fn connected_ids_are_deduplicated() {
    let user = list_config(&[("posts", to_many("Post", None))]);
    let post = list_config(&[("title", text())]);
    let (registry, _provider) = build_registry(IndexMap::from([
        (ListKey::new("User"), user),
        (ListKey::new("Post"), post),
    ]));
    let ctx = allow_all_ctx();
    let posts = registry.get("Post").unwrap();
    let users = registry.get("User").unwrap();

    let p1 = posts
        .create_one(&registry, &ctx, json!({ "title": "one" }))
        .await
        .unwrap();
    let user = users
        .create_one(
            &registry,
            &ctx,
            json!({ "posts": { "connect": [{ "id": p1.id }, { "id": p1.id }] } }),
        )
        .await
        .unwrap();

    assert_eq!(user.get("posts"), Some(&json!([p1.id])));
}
