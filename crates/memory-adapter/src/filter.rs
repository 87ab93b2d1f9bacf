//! Filter evaluation over stored items, covering the operators the engine's
//! `WhereInput` shape exposes: id identity, per-field comparisons and
//! `AND`/`OR` composition.

use indexmap::IndexMap;
use serde_json::Value;

use strata_types::{FieldPath, ItemId};

pub fn matches(filter: &Value, id: &ItemId, data: &IndexMap<FieldPath, Value>) -> bool {
    let Some(object) = filter.as_object() else {
        return true;
    };
    object
        .iter()
        .all(|(key, expected)| clause_matches(key, expected, id, data))
}

fn clause_matches(
    key: &str,
    expected: &Value,
    id: &ItemId,
    data: &IndexMap<FieldPath, Value>,
) -> bool {
    match key {
        "AND" => expected
            .as_array()
            .is_some_and(|clauses| clauses.iter().all(|clause| matches(clause, id, data))),
        "OR" => expected
            .as_array()
            .is_some_and(|clauses| clauses.iter().any(|clause| matches(clause, id, data))),
        "id" => expected.as_str() == Some(id.as_str()),
        "id_not" => expected.as_str() != Some(id.as_str()),
        "id_in" => id_list(expected).iter().any(|entry| *entry == id.as_str()),
        "id_not_in" => !id_list(expected).iter().any(|entry| *entry == id.as_str()),
        _ => field_clause_matches(key, expected, data),
    }
}

fn field_clause_matches(key: &str, expected: &Value, data: &IndexMap<FieldPath, Value>) -> bool {
    let value_of = |path: &str| data.get(path).unwrap_or(&Value::Null);
    if let Some(path) = key.strip_suffix("_not_in") {
        return !in_list(expected, value_of(path));
    }
    if let Some(path) = key.strip_suffix("_in") {
        return in_list(expected, value_of(path));
    }
    if let Some(path) = key.strip_suffix("_not") {
        return value_of(path) != expected;
    }
    if let Some(path) = key.strip_suffix("_contains") {
        return match (value_of(path).as_str(), expected.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        };
    }
    value_of(key) == expected
}

fn in_list(expected: &Value, value: &Value) -> bool {
    expected
        .as_array()
        .is_some_and(|entries| entries.contains(value))
}

fn id_list(expected: &Value) -> Vec<&str> {
    expected
        .as_array()
        .map(|entries| entries.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
