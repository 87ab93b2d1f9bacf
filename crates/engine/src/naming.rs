//! Derivation of human labels, singular/plural forms and the full GraphQL
//! name set from a list key. Everything here is a pure function of the key
//! and the declared overrides, computed once at list construction.

use convert_case::{Case, Casing};

use strata_config::NamingOverrides;
use strata_types::{ConfigError, ListKey};

/// Every GraphQL name a list exposes. All names are derived from the
/// singular/plural class forms; see the naming contract in the crate docs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GqlNames {
    pub output_type_name: String,
    pub item_query_name: String,
    pub list_query_name: String,
    pub list_query_meta_name: String,
    pub list_meta_name: String,
    pub create_mutation_name: String,
    pub update_mutation_name: String,
    pub delete_mutation_name: String,
    pub create_many_mutation_name: String,
    pub update_many_mutation_name: String,
    pub delete_many_mutation_name: String,
    pub where_input_name: String,
    pub where_unique_input_name: String,
    pub create_input_name: String,
    pub update_input_name: String,
    pub create_many_input_name: String,
    pub update_many_input_name: String,
    pub relate_to_one_input_name: String,
    pub relate_to_many_input_name: String,
}

/// Admin-facing labels plus the GraphQL name set for one list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListNames {
    pub label: String,
    pub singular: String,
    pub plural: String,
    pub path: String,
    pub gql: GqlNames,
}

/// Derives all names for `key`, honoring overrides. Fails when the singular
/// and plural class forms collapse into the same name and no override breaks
/// the tie.
pub fn derive(key: &ListKey, overrides: &NamingOverrides) -> Result<ListNames, ConfigError> {
    let label = overrides
        .label
        .clone()
        .unwrap_or_else(|| key_to_label(key.as_str()));
    let singular = overrides
        .singular
        .clone()
        .unwrap_or_else(|| singularize_label(&label));
    let plural = overrides
        .plural
        .clone()
        .unwrap_or_else(|| pluralize_label(&singular));

    let singular_class = overrides
        .item_query_name
        .clone()
        .unwrap_or_else(|| label_to_class(&singular));
    let plural_class = overrides
        .list_query_name
        .clone()
        .unwrap_or_else(|| label_to_class(&plural));

    if singular_class == plural_class {
        return Err(ConfigError::AmbiguousPlural {
            key: key.clone(),
            singular: singular_class,
            plural: plural_class,
        });
    }

    let path = overrides
        .path
        .clone()
        .unwrap_or_else(|| label_to_path(&plural));

    let gql = GqlNames {
        output_type_name: key.to_string(),
        item_query_name: singular_class.clone(),
        list_query_name: format!("all{plural_class}"),
        list_query_meta_name: format!("_all{plural_class}Meta"),
        list_meta_name: format!("_{plural_class}Meta"),
        create_mutation_name: format!("create{singular_class}"),
        update_mutation_name: format!("update{singular_class}"),
        delete_mutation_name: format!("delete{singular_class}"),
        create_many_mutation_name: format!("createMany{plural_class}"),
        update_many_mutation_name: format!("updateMany{plural_class}"),
        delete_many_mutation_name: format!("deleteMany{plural_class}"),
        where_input_name: format!("{singular_class}WhereInput"),
        where_unique_input_name: format!("{singular_class}WhereUniqueInput"),
        create_input_name: format!("{singular_class}CreateInput"),
        update_input_name: format!("{singular_class}UpdateInput"),
        create_many_input_name: format!("{plural_class}CreateInput"),
        update_many_input_name: format!("{plural_class}UpdateInput"),
        relate_to_one_input_name: format!("{singular_class}RelateToOneInput"),
        relate_to_many_input_name: format!("{singular_class}RelateToManyInput"),
    };

    Ok(ListNames {
        label,
        singular,
        plural,
        path,
        gql,
    })
}

/// `TestThing` -> `Test Thing`; a leading underscore (auxiliary lists) is
/// preserved.
fn key_to_label(key: &str) -> String {
    let (prefix, rest) = match key.strip_prefix('_') {
        Some(rest) => ("_", rest),
        None => ("", key),
    };
    format!("{prefix}{}", rest.to_case(Case::Title))
}

/// `Test Thing` -> `TestThing`. A leading underscore survives because it is
/// its own whitespace-delimited token only when it was a prefix.
fn label_to_class(label: &str) -> String {
    label.split_whitespace().collect()
}

/// `Test Things` -> `test-things`.
fn label_to_path(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn singularize_label(label: &str) -> String {
    transform_last_word(label, singularize)
}

fn pluralize_label(label: &str) -> String {
    transform_last_word(label, pluralize)
}

fn transform_last_word(label: &str, transform: fn(&str) -> String) -> String {
    let mut words: Vec<String> = label.split_whitespace().map(str::to_string).collect();
    if let Some(last) = words.pop() {
        words.push(transform(&last));
    }
    words.join(" ")
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
];

const UNCOUNTABLE: &[&str] = &[
    "sheep",
    "fish",
    "deer",
    "series",
    "species",
    "news",
    "information",
    "equipment",
];

fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return match_capitalization(word, plural);
    }
    let plural = if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{lower}es")
    } else if let Some(stem) = strip_consonant_y(&lower) {
        format!("{stem}ies")
    } else if let Some(stem) = lower.strip_suffix("fe") {
        format!("{stem}ves")
    } else if let Some(stem) = lower.strip_suffix('f') {
        format!("{stem}ves")
    } else {
        format!("{lower}s")
    };
    match_capitalization(word, &plural)
}

fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
        return match_capitalization(word, singular);
    }
    let singular = if let Some(stem) = lower.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = lower.strip_suffix("ves") {
        format!("{stem}f")
    } else if lower.ends_with("ses")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
    {
        lower[..lower.len() - 2].to_string()
    } else if lower.ends_with('s') && !lower.ends_with("ss") {
        lower[..lower.len() - 1].to_string()
    } else {
        lower.clone()
    };
    match_capitalization(word, &singular)
}

fn strip_consonant_y(word: &str) -> Option<&str> {
    let stem = word.strip_suffix('y')?;
    let last = stem.chars().last()?;
    if "aeiou".contains(last) {
        None
    } else {
        Some(stem)
    }
}

fn match_capitalization(original: &str, transformed: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = transformed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        transformed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::ListKey;

    fn derive_key(key: &str) -> Result<ListNames, ConfigError> {
        derive(&ListKey::new(key), &NamingOverrides::default())
    }

    #[test]
    fn derives_labels_and_gql_names() {
        let names = derive_key("TestThing").unwrap();
        assert_eq!(names.label, "Test Thing");
        assert_eq!(names.singular, "Test Thing");
        assert_eq!(names.plural, "Test Things");
        assert_eq!(names.path, "test-things");
        assert_eq!(names.gql.item_query_name, "TestThing");
        assert_eq!(names.gql.list_query_name, "allTestThings");
        assert_eq!(names.gql.list_query_meta_name, "_allTestThingsMeta");
        assert_eq!(names.gql.list_meta_name, "_TestThingsMeta");
        assert_eq!(names.gql.create_mutation_name, "createTestThing");
        assert_eq!(names.gql.create_many_mutation_name, "createManyTestThings");
        assert_eq!(names.gql.where_unique_input_name, "TestThingWhereUniqueInput");
        assert_eq!(names.gql.update_many_input_name, "TestThingsUpdateInput");
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = derive_key("Category").unwrap();
        let second = derive_key("Category").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.plural, "Categories");
    }

    #[test]
    fn plural_keys_singularize() {
        let names = derive_key("People").unwrap();
        assert_eq!(names.singular, "Person");
        assert_eq!(names.gql.item_query_name, "Person");
        assert_eq!(names.gql.list_query_name, "allPeople");
    }

    #[test]
    fn auxiliary_keys_keep_leading_underscore() {
        let names = derive_key("_InternalThing").unwrap();
        assert_eq!(names.label, "_Internal Thing");
        assert_eq!(names.gql.item_query_name, "_InternalThing");
    }

    #[test]
    fn ambiguous_plural_is_rejected() {
        let error = derive_key("Sheep").unwrap_err();
        assert!(matches!(error, ConfigError::AmbiguousPlural { .. }));
    }

    #[test]
    fn explicit_overrides_resolve_ambiguity() {
        let overrides = NamingOverrides {
            singular: Some("Sheep".to_string()),
            plural: Some("Sheep Herd".to_string()),
            ..NamingOverrides::default()
        };
        let names = derive(&ListKey::new("Sheep"), &overrides).unwrap();
        assert_eq!(names.gql.list_query_name, "allSheepHerd");
    }
}
