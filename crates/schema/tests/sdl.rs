//! Generated-schema behavior: deterministic output, access-based omission
//! and relationship input wiring.

use indexmap::IndexMap;
use serde_json::json;

use strata_config::{
    AccessRuleConfig, FieldConfig, FieldOperationRules, FieldTypeKind, ListConfig,
};
use strata_engine::ListRegistry;
use strata_memory_adapter::MemoryProvider;
use strata_schema::{build_schema, print_sdl};
use strata_types::{FieldPath, ListKey, SchemaVariant};

fn text() -> FieldConfig {
    FieldConfig::of(FieldTypeKind::Text)
}

fn list_config(fields: &[(&str, FieldConfig)]) -> ListConfig {
    ListConfig {
        fields: fields
            .iter()
            .map(|(path, config)| (FieldPath::new(*path), config.clone()))
            .collect(),
        ..ListConfig::default()
    }
}

fn blog_registry() -> (ListRegistry, MemoryProvider) {
    let user = list_config(&[
        ("name", text()),
        (
            "posts",
            FieldConfig::of(FieldTypeKind::Relationship {
                ref_list: ListKey::new("Post"),
                ref_field: Some(FieldPath::new("author")),
                many: true,
            }),
        ),
    ]);
    let post = list_config(&[
        ("title", text()),
        (
            "author",
            FieldConfig::of(FieldTypeKind::Relationship {
                ref_list: ListKey::new("User"),
                ref_field: Some(FieldPath::new("posts")),
                many: false,
            }),
        ),
    ]);
    let provider = MemoryProvider::new();
    let registry = ListRegistry::build(
        IndexMap::from([(ListKey::new("User"), user), (ListKey::new("Post"), post)]),
        &provider,
        vec![SchemaVariant::default()],
    )
    .unwrap();
    (registry, provider)
}

#[test]
fn sdl_is_deterministic() {
    let (registry, _provider) = blog_registry();
    let variant = SchemaVariant::default();
    let first = print_sdl(&build_schema(&registry, &variant));
    let second = print_sdl(&build_schema(&registry, &variant));
    assert_eq!(first, second);
}

#[test]
fn sdl_contains_the_full_operation_surface() {
    let (registry, _provider) = blog_registry();
    let sdl = print_sdl(&build_schema(&registry, &SchemaVariant::default()));

    assert!(sdl.contains("type User {"));
    assert!(sdl.contains("  id: ID!"));
    assert!(sdl.contains("  _label_: String"));
    assert!(sdl.contains(
        "  posts(where: PostWhereInput, search: String, orderBy: String, first: Int, skip: Int): [Post!]!"
    ));
    assert!(sdl.contains("  allUsers(where: UserWhereInput"));
    assert!(sdl.contains("  User(where: UserWhereUniqueInput!): User"));
    assert!(sdl.contains("  _allUsersMeta(where: UserWhereInput"));
    assert!(sdl.contains("  _UsersMeta: _ListMeta"));
    assert!(sdl.contains("  createUser(data: UserCreateInput): User"));
    assert!(sdl.contains("  createManyUsers(data: [UsersCreateInput!]): [User]"));
    assert!(sdl.contains("  updateUser(id: ID!, data: UserUpdateInput): User"));
    assert!(sdl.contains("  deleteUser(id: ID!): User"));
    assert!(sdl.contains("  deleteManyUsers(ids: [ID!]): [User]"));
    assert!(sdl.contains("input UserWhereUniqueInput {"));
    assert!(sdl.contains("  title_contains: String"));
}

#[test]
fn relate_inputs_are_emitted_once_per_target() {
    let (registry, _provider) = blog_registry();
    let sdl = print_sdl(&build_schema(&registry, &SchemaVariant::default()));

    assert_eq!(sdl.matches("input PostRelateToManyInput {").count(), 1);
    assert_eq!(sdl.matches("input UserRelateToOneInput {").count(), 1);
    assert!(sdl.contains("  create: [PostCreateInput!]"));
    assert!(sdl.contains("  connect: UserWhereUniqueInput"));
    assert!(sdl.contains("  disconnectAll: Boolean"));
}

#[test]
fn statically_denied_operations_are_omitted() {
    let mut post = list_config(&[("title", text())]);
    post.access.base.read = Some(AccessRuleConfig::Static(false));
    let provider = MemoryProvider::new();
    let registry = ListRegistry::build(
        IndexMap::from([(ListKey::new("Post"), post)]),
        &provider,
        vec![SchemaVariant::default()],
    )
    .unwrap();
    let sdl = print_sdl(&build_schema(&registry, &SchemaVariant::default()));

    // No queries, no filter inputs; mutations (and the output type they
    // return) survive.
    assert!(!sdl.contains("allPosts"));
    assert!(!sdl.contains("PostWhereInput"));
    assert!(sdl.contains("type Post {"));
    assert!(sdl.contains("createPost"));
    assert!(sdl.contains("deletePost"));
}

#[test]
fn filter_and_dynamic_rules_keep_their_operations() -> anyhow::Result<()> {
    let mut post = list_config(&[("title", text())]);
    post.access.base.read =
        Some(AccessRuleConfig::parse(&json!({ "id_in": ["a"] })).map_err(anyhow::Error::msg)?);
    post.access.base.delete = Some(AccessRuleConfig::Dynamic);
    let provider = MemoryProvider::new();
    let registry = ListRegistry::build(
        IndexMap::from([(ListKey::new("Post"), post)]),
        &provider,
        vec![SchemaVariant::default()],
    )?;
    let sdl = print_sdl(&build_schema(&registry, &SchemaVariant::default()));

    // Only a static `false` prunes the schema; filter and dynamic rules are
    // enforced per request, so their operations stay visible.
    assert!(sdl.contains("allPosts"));
    assert!(sdl.contains("input PostWhereInput {"));
    assert!(sdl.contains("deletePost"));
    Ok(())
}

#[test]
fn read_denied_fields_are_hidden_from_output_and_filters() {
    let mut secret = text();
    secret.access.base = FieldOperationRules {
        read: Some(AccessRuleConfig::Static(false)),
        ..FieldOperationRules::default()
    };
    let post = list_config(&[("title", text()), ("secret", secret)]);
    let provider = MemoryProvider::new();
    let registry = ListRegistry::build(
        IndexMap::from([(ListKey::new("Post"), post)]),
        &provider,
        vec![SchemaVariant::default()],
    )
    .unwrap();
    let schema = build_schema(&registry, &SchemaVariant::default());

    let field_names = |type_name: &str| -> Vec<String> {
        match schema
            .types
            .iter()
            .find(|type_def| type_def.name() == type_name)
            .unwrap()
        {
            strata_schema::TypeDef::Object(object) => {
                object.fields.iter().map(|field| field.name.clone()).collect()
            }
            strata_schema::TypeDef::Input(input) => {
                input.fields.iter().map(|field| field.name.clone()).collect()
            }
        }
    };

    assert!(!field_names("Post").contains(&"secret".to_string()));
    assert!(!field_names("PostWhereInput").contains(&"secret".to_string()));
    // Still writable: the field keeps its create/update entries.
    assert!(field_names("PostCreateInput").contains(&"secret".to_string()));
}
