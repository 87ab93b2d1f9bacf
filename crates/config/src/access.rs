use indexmap::IndexMap;
use serde_json::Value;

use strata_types::{IdFilter, SchemaVariant};

/// A single declared access rule: statically granted or denied, restricted to
/// items matching an id filter, or deferred to the request-time
/// access-control collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessRuleConfig {
    Static(bool),
    Filter(IdFilter),
    Dynamic,
}

impl AccessRuleConfig {
    /// Parses a declarative JSON access rule: a boolean, or an object using
    /// only the item-identity keys (`id`, `id_not`, `id_in`, `id_not_in`).
    /// Anything else is malformed.
    pub fn parse(value: &Value) -> Result<AccessRuleConfig, String> {
        match value {
            Value::Bool(granted) => Ok(AccessRuleConfig::Static(*granted)),
            Value::Object(object) => {
                for key in object.keys() {
                    if !matches!(key.as_str(), "id" | "id_not" | "id_in" | "id_not_in") {
                        return Err(format!("unknown access filter key `{key}`"));
                    }
                }
                let filter: IdFilter = serde_json::from_value(value.clone())
                    .map_err(|error| format!("invalid access filter: {error}"))?;
                Ok(AccessRuleConfig::Filter(filter))
            }
            other => Err(format!(
                "expected a boolean or an id-filter object, got {other}"
            )),
        }
    }
}

/// Per-operation rules for one list. `None` falls back to the list's
/// `default_access`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationRules {
    pub read: Option<AccessRuleConfig>,
    pub create: Option<AccessRuleConfig>,
    pub update: Option<AccessRuleConfig>,
    pub delete: Option<AccessRuleConfig>,
    pub auth: Option<AccessRuleConfig>,
}

/// List-level access configuration: base rules plus per-schema-variant
/// overrides.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListAccessConfig {
    pub base: OperationRules,
    pub variants: IndexMap<SchemaVariant, OperationRules>,
}

/// Per-operation rules for one field. Fields have no delete operation of
/// their own; deletes are gated at list level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOperationRules {
    pub read: Option<AccessRuleConfig>,
    pub create: Option<AccessRuleConfig>,
    pub update: Option<AccessRuleConfig>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldAccessConfig {
    pub base: FieldOperationRules,
    pub variants: IndexMap<SchemaVariant, FieldOperationRules>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_parse_as_static_rules() {
        assert_eq!(
            AccessRuleConfig::parse(&json!(true)).unwrap(),
            AccessRuleConfig::Static(true)
        );
        assert_eq!(
            AccessRuleConfig::parse(&json!(false)).unwrap(),
            AccessRuleConfig::Static(false)
        );
    }

    #[test]
    fn id_objects_parse_as_filters() {
        let rule = AccessRuleConfig::parse(&json!({ "id_in": ["a", "b"], "id_not": "c" })).unwrap();
        let AccessRuleConfig::Filter(filter) = rule else {
            panic!("expected a filter rule");
        };
        assert_eq!(filter.id_in.as_ref().map(Vec::len), Some(2));
        assert!(filter.id_not.is_some());
    }

    #[test]
    fn non_identity_keys_are_malformed() {
        assert!(AccessRuleConfig::parse(&json!({ "title": "x" })).is_err());
        assert!(AccessRuleConfig::parse(&json!("yes")).is_err());
    }
}
