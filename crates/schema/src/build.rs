//! Schema generation: derives each list's GraphQL fragment from its field
//! set and frozen access tables, then assembles the per-variant document.
//! Statically-denied operations are omitted from the schema outright;
//! dynamic rules keep their fields and are enforced at request time.

use indexmap::IndexMap;
use tracing::debug;

use strata_config::FieldTypeKind;
use strata_engine::{GqlNames, List, ListRegistry};
use strata_types::{Operation, SchemaVariant};

use crate::ast::{
    FieldDef, InputObjectTypeDef, InputValueDef, ObjectTypeDef, SchemaDocument, TypeDef, TypeRef,
};

/// Builds the complete schema document for one variant. Types are emitted in
/// registry order, so the output is deterministic for a given configuration.
#[must_use]
pub fn build_schema(registry: &ListRegistry, variant: &SchemaVariant) -> SchemaDocument {
    let mut document = SchemaDocument::default();
    document.types.push(query_meta_type());
    document.types.push(list_meta_type());
    let mut relate_inputs: IndexMap<String, TypeDef> = IndexMap::new();
    for list in registry.lists() {
        build_list(registry, list, variant, &mut document, &mut relate_inputs);
    }
    document.types.extend(relate_inputs.into_values());
    document
}

fn build_list(
    registry: &ListRegistry,
    list: &List,
    variant: &SchemaVariant,
    document: &mut SchemaDocument,
    relate_inputs: &mut IndexMap<String, TypeDef>,
) {
    let readable = !list.access.statically_denied(variant, Operation::Read);
    let creatable = !list.access.statically_denied(variant, Operation::Create);
    let updatable = !list.access.statically_denied(variant, Operation::Update);
    let deletable = !list.access.statically_denied(variant, Operation::Delete);
    if !(readable || creatable || updatable || deletable) {
        debug!(list = %list.key, variant = %variant, "list omitted from schema");
        return;
    }
    let names = &list.names.gql;

    // The output type is the return type of every operation, so any exposed
    // operation brings it along.
    document
        .types
        .push(TypeDef::Object(output_type(registry, list, variant)));

    if readable {
        document
            .types
            .push(TypeDef::Input(where_input(list, variant)));
        document.types.push(TypeDef::Input(where_unique_input(names)));
        let query_args = vec![
            InputValueDef::new("where", TypeRef::named(&names.where_input_name)),
            InputValueDef::new("search", TypeRef::named("String")),
            InputValueDef::new("orderBy", TypeRef::named("String")),
            InputValueDef::new("first", TypeRef::named("Int")),
            InputValueDef::new("skip", TypeRef::named("Int")),
        ];
        document.query_fields.push(
            FieldDef::new(
                &names.list_query_name,
                TypeRef::list_of(&names.output_type_name),
            )
            .with_args(query_args.clone()),
        );
        document.query_fields.push(
            FieldDef::new(&names.item_query_name, TypeRef::named(&names.output_type_name))
                .with_args(vec![InputValueDef::new(
                    "where",
                    TypeRef::non_null(&names.where_unique_input_name),
                )]),
        );
        document.query_fields.push(
            FieldDef::new(&names.list_query_meta_name, TypeRef::named("_QueryMeta"))
                .with_args(query_args),
        );
        document
            .query_fields
            .push(FieldDef::new(&names.list_meta_name, TypeRef::named("_ListMeta")));
    }

    if creatable {
        if let Some(create) = create_input(registry, list, variant, relate_inputs) {
            document.types.push(TypeDef::Input(create));
            document.types.push(TypeDef::Input(InputObjectTypeDef {
                name: names.create_many_input_name.clone(),
                fields: vec![InputValueDef::new(
                    "data",
                    TypeRef::non_null(&names.create_input_name),
                )],
            }));
            document.mutation_fields.push(
                FieldDef::new(
                    &names.create_mutation_name,
                    TypeRef::named(&names.output_type_name),
                )
                .with_args(vec![InputValueDef::new(
                    "data",
                    TypeRef::named(&names.create_input_name),
                )]),
            );
            document.mutation_fields.push(
                FieldDef::new(
                    &names.create_many_mutation_name,
                    nullable_items_list(&names.output_type_name),
                )
                .with_args(vec![InputValueDef::new(
                    "data",
                    TypeRef::list_of(&names.create_many_input_name).nullable(),
                )]),
            );
        }
    }

    if updatable {
        if let Some(update) = update_input(registry, list, variant, relate_inputs) {
            document.types.push(TypeDef::Input(update));
            document.types.push(TypeDef::Input(InputObjectTypeDef {
                name: names.update_many_input_name.clone(),
                fields: vec![
                    InputValueDef::new("id", TypeRef::non_null("ID")),
                    InputValueDef::new("data", TypeRef::named(&names.update_input_name)),
                ],
            }));
            document.mutation_fields.push(
                FieldDef::new(
                    &names.update_mutation_name,
                    TypeRef::named(&names.output_type_name),
                )
                .with_args(vec![
                    InputValueDef::new("id", TypeRef::non_null("ID")),
                    InputValueDef::new("data", TypeRef::named(&names.update_input_name)),
                ]),
            );
            document.mutation_fields.push(
                FieldDef::new(
                    &names.update_many_mutation_name,
                    nullable_items_list(&names.output_type_name),
                )
                .with_args(vec![InputValueDef::new(
                    "data",
                    TypeRef::list_of(&names.update_many_input_name).nullable(),
                )]),
            );
        }
    }

    if deletable {
        document.mutation_fields.push(
            FieldDef::new(
                &names.delete_mutation_name,
                TypeRef::named(&names.output_type_name),
            )
            .with_args(vec![InputValueDef::new("id", TypeRef::non_null("ID"))]),
        );
        document.mutation_fields.push(
            FieldDef::new(
                &names.delete_many_mutation_name,
                nullable_items_list(&names.output_type_name),
            )
            .with_args(vec![InputValueDef::new(
                "ids",
                TypeRef::list_of("ID").nullable(),
            )]),
        );
    }
}

/// `[Name]`: bulk mutations report per-item failures as null entries.
fn nullable_items_list(name: &str) -> TypeRef {
    TypeRef {
        name: name.to_string(),
        non_null: false,
        list: true,
        item_non_null: false,
    }
}

fn output_type(registry: &ListRegistry, list: &List, variant: &SchemaVariant) -> ObjectTypeDef {
    let mut fields = Vec::new();
    for field in list.fields().iter() {
        if field.access.statically_denied(variant, Operation::Read) {
            continue;
        }
        if let Some((ref_list, _, many)) = field.relationship() {
            let Some(target) = registry.get(ref_list.as_str()) else {
                continue;
            };
            if target.access.statically_denied(variant, Operation::Read) {
                continue;
            }
            let target_names = &target.names.gql;
            if many {
                fields.push(
                    FieldDef::new(
                        field.path.as_str(),
                        TypeRef::list_of(&target_names.output_type_name),
                    )
                    .with_args(vec![
                        InputValueDef::new(
                            "where",
                            TypeRef::named(&target_names.where_input_name),
                        ),
                        InputValueDef::new("search", TypeRef::named("String")),
                        InputValueDef::new("orderBy", TypeRef::named("String")),
                        InputValueDef::new("first", TypeRef::named("Int")),
                        InputValueDef::new("skip", TypeRef::named("Int")),
                    ]),
                );
            } else {
                fields.push(FieldDef::new(
                    field.path.as_str(),
                    TypeRef::named(&target_names.output_type_name),
                ));
            }
        } else if let Some(scalar) = field.kind.scalar_gql_type() {
            let type_ref = if field.is_primary_key {
                TypeRef::non_null(scalar)
            } else {
                TypeRef::named(scalar)
            };
            fields.push(FieldDef::new(field.path.as_str(), type_ref));
        }
    }
    // Synthetic display field resolved from the list's label strategy.
    fields.push(FieldDef::new("_label_", TypeRef::named("String")));
    ObjectTypeDef {
        name: list.names.gql.output_type_name.clone(),
        description: list.admin_doc.clone(),
        fields,
    }
}

fn where_input(list: &List, variant: &SchemaVariant) -> InputObjectTypeDef {
    let name = list.names.gql.where_input_name.clone();
    let mut fields = vec![
        InputValueDef::new("AND", TypeRef::list_of(&name).nullable()),
        InputValueDef::new("OR", TypeRef::list_of(&name).nullable()),
    ];
    for field in list.fields().iter() {
        if field.access.statically_denied(variant, Operation::Read) {
            continue;
        }
        let Some(scalar) = field.kind.scalar_gql_type() else {
            continue;
        };
        let path = field.path.as_str();
        fields.push(InputValueDef::new(path, TypeRef::named(scalar)));
        fields.push(InputValueDef::new(format!("{path}_not"), TypeRef::named(scalar)));
        fields.push(InputValueDef::new(
            format!("{path}_in"),
            TypeRef::list_of(scalar).nullable(),
        ));
        fields.push(InputValueDef::new(
            format!("{path}_not_in"),
            TypeRef::list_of(scalar).nullable(),
        ));
        if matches!(field.kind, FieldTypeKind::Text) {
            fields.push(InputValueDef::new(
                format!("{path}_contains"),
                TypeRef::named("String"),
            ));
        }
    }
    InputObjectTypeDef { name, fields }
}

fn where_unique_input(names: &GqlNames) -> InputObjectTypeDef {
    InputObjectTypeDef {
        name: names.where_unique_input_name.clone(),
        fields: vec![InputValueDef::new("id", TypeRef::non_null("ID"))],
    }
}

fn create_input(
    registry: &ListRegistry,
    list: &List,
    variant: &SchemaVariant,
    relate_inputs: &mut IndexMap<String, TypeDef>,
) -> Option<InputObjectTypeDef> {
    writable_input(
        registry,
        list,
        variant,
        Operation::Create,
        list.names.gql.create_input_name.clone(),
        relate_inputs,
    )
}

fn update_input(
    registry: &ListRegistry,
    list: &List,
    variant: &SchemaVariant,
    relate_inputs: &mut IndexMap<String, TypeDef>,
) -> Option<InputObjectTypeDef> {
    writable_input(
        registry,
        list,
        variant,
        Operation::Update,
        list.names.gql.update_input_name.clone(),
        relate_inputs,
    )
}

/// The writable-field input for one operation, or `None` when no field is
/// writable (an empty input type is invalid SDL, so the mutation is dropped
/// with it).
fn writable_input(
    registry: &ListRegistry,
    list: &List,
    variant: &SchemaVariant,
    operation: Operation,
    name: String,
    relate_inputs: &mut IndexMap<String, TypeDef>,
) -> Option<InputObjectTypeDef> {
    let mut fields = Vec::new();
    for field in list.fields().iter() {
        if field.is_primary_key || field.access.statically_denied(variant, operation) {
            continue;
        }
        if let Some((ref_list, _, many)) = field.relationship() {
            let Some(target) = registry.get(ref_list.as_str()) else {
                continue;
            };
            if target.access.statically_denied(variant, Operation::Read) {
                continue;
            }
            let relate_name = relate_input_for(registry, target, variant, many, relate_inputs);
            fields.push(InputValueDef::new(
                field.path.as_str(),
                TypeRef::named(relate_name),
            ));
        } else if let Some(scalar) = field.kind.scalar_gql_type() {
            fields.push(InputValueDef::new(field.path.as_str(), TypeRef::named(scalar)));
        }
    }
    if fields.is_empty() {
        None
    } else {
        Some(InputObjectTypeDef { name, fields })
    }
}

/// Registers (once per target and arity) the nested-operation input for a
/// relationship field and returns its name. The `create` member is only
/// offered when the target actually exposes a create input.
fn relate_input_for(
    registry: &ListRegistry,
    target: &List,
    variant: &SchemaVariant,
    many: bool,
    relate_inputs: &mut IndexMap<String, TypeDef>,
) -> String {
    let target_names = &target.names.gql;
    let name = if many {
        target_names.relate_to_many_input_name.clone()
    } else {
        target_names.relate_to_one_input_name.clone()
    };
    if relate_inputs.contains_key(&name) {
        return name;
    }
    let mut fields = Vec::new();
    if has_create_input(registry, target, variant) {
        let create_ref = if many {
            TypeRef::list_of(&target_names.create_input_name).nullable()
        } else {
            TypeRef::named(&target_names.create_input_name)
        };
        fields.push(InputValueDef::new("create", create_ref));
    }
    let unique_ref = |many: bool| {
        if many {
            TypeRef::list_of(&target_names.where_unique_input_name).nullable()
        } else {
            TypeRef::named(&target_names.where_unique_input_name)
        }
    };
    fields.push(InputValueDef::new("connect", unique_ref(many)));
    fields.push(InputValueDef::new("disconnect", unique_ref(many)));
    fields.push(InputValueDef::new("disconnectAll", TypeRef::named("Boolean")));
    relate_inputs.insert(
        name.clone(),
        TypeDef::Input(InputObjectTypeDef {
            name: name.clone(),
            fields,
        }),
    );
    name
}

/// Whether the list exposes a create input under this variant: the create
/// operation is not statically denied and at least one field is writable.
fn has_create_input(registry: &ListRegistry, list: &List, variant: &SchemaVariant) -> bool {
    if list.access.statically_denied(variant, Operation::Create) {
        return false;
    }
    list.fields().iter().any(|field| {
        if field.is_primary_key || field.access.statically_denied(variant, Operation::Create) {
            return false;
        }
        match field.relationship() {
            Some((ref_list, _, _)) => registry
                .get(ref_list.as_str())
                .is_some_and(|target| {
                    !target.access.statically_denied(variant, Operation::Read)
                }),
            None => field.kind.scalar_gql_type().is_some(),
        }
    })
}

fn query_meta_type() -> TypeDef {
    TypeDef::Object(ObjectTypeDef {
        name: "_QueryMeta".to_string(),
        description: None,
        fields: vec![FieldDef::new("count", TypeRef::non_null("Int"))],
    })
}

fn list_meta_type() -> TypeDef {
    TypeDef::Object(ObjectTypeDef {
        name: "_ListMeta".to_string(),
        description: None,
        fields: vec![
            FieldDef::new("key", TypeRef::non_null("String")),
            FieldDef::new("name", TypeRef::non_null("String")),
            FieldDef::new("path", TypeRef::non_null("String")),
            FieldDef::new("description", TypeRef::named("String")),
        ],
    })
}
