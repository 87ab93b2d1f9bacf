use serde::{Deserialize, Serialize};
use serde_json::Value;

use strata_types::{FieldPath, ListKey};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// The closed set of built-in field types. Each variant carries its own
/// configuration; capabilities are exposed through the methods below rather
/// than through runtime registration.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldTypeKind {
    Text,
    Integer,
    Float,
    Checkbox,
    Select {
        options: Vec<SelectOption>,
    },
    Uuid,
    /// Sequential integer primary keys; only SQL-backed adapters can mint
    /// these.
    AutoIncrement,
    Relationship {
        ref_list: ListKey,
        /// The reciprocal field on the referenced list, when the relationship
        /// is two-sided. Backlink bookkeeping is skipped for one-sided
        /// relationships.
        ref_field: Option<FieldPath>,
        many: bool,
    },
}

impl FieldTypeKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldTypeKind::Text => "Text",
            FieldTypeKind::Integer => "Integer",
            FieldTypeKind::Float => "Float",
            FieldTypeKind::Checkbox => "Checkbox",
            FieldTypeKind::Select { .. } => "Select",
            FieldTypeKind::Uuid => "Uuid",
            FieldTypeKind::AutoIncrement => "AutoIncrement",
            FieldTypeKind::Relationship { .. } => "Relationship",
        }
    }

    /// Maps a native scalar shorthand (`"string"`, `"number"`, `"boolean"`)
    /// onto the built-in type that implements it.
    #[must_use]
    pub fn from_shorthand(shorthand: &str) -> Option<FieldTypeKind> {
        match shorthand {
            "string" => Some(FieldTypeKind::Text),
            "number" => Some(FieldTypeKind::Float),
            "boolean" => Some(FieldTypeKind::Checkbox),
            _ => None,
        }
    }

    /// Resolves an adapter's default primary-key type name. Only types that
    /// can serve as a primary key are eligible.
    #[must_use]
    pub fn primary_key_from_type_name(type_name: &str) -> Option<FieldTypeKind> {
        match type_name {
            "Uuid" => Some(FieldTypeKind::Uuid),
            "AutoIncrement" => Some(FieldTypeKind::AutoIncrement),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_relationship(&self) -> bool {
        matches!(self, FieldTypeKind::Relationship { .. })
    }

    /// Adapter families this type is restricted to; `None` means every
    /// adapter supports it.
    #[must_use]
    pub fn supported_adapters(&self) -> Option<&'static [&'static str]> {
        match self {
            FieldTypeKind::AutoIncrement => Some(&["sql"]),
            _ => None,
        }
    }

    /// The GraphQL scalar this type reads and writes as, or `None` for
    /// relationship fields whose types depend on the referenced list.
    #[must_use]
    pub fn scalar_gql_type(&self) -> Option<&'static str> {
        match self {
            FieldTypeKind::Text | FieldTypeKind::Select { .. } => Some("String"),
            FieldTypeKind::Integer | FieldTypeKind::AutoIncrement => Some("Int"),
            FieldTypeKind::Float => Some("Float"),
            FieldTypeKind::Checkbox => Some("Boolean"),
            FieldTypeKind::Uuid => Some("ID"),
            FieldTypeKind::Relationship { .. } => None,
        }
    }

    /// The type-level default, consulted before the per-field `default_value`
    /// configuration. Built-in types currently have none; the method is the
    /// seam the defaults phase calls through.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        None
    }

    /// Built-in input validation: checks that a submitted value has the JSON
    /// shape this type stores. Relationship inputs are validated by the
    /// nested-operation parser instead.
    pub fn validate_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }
        match self {
            FieldTypeKind::Text | FieldTypeKind::Uuid => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("expected a string, got {value}"))
                }
            }
            FieldTypeKind::Integer | FieldTypeKind::AutoIncrement => {
                if value.is_i64() || value.is_u64() {
                    Ok(())
                } else {
                    Err(format!("expected an integer, got {value}"))
                }
            }
            FieldTypeKind::Float => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("expected a number, got {value}"))
                }
            }
            FieldTypeKind::Checkbox => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("expected a boolean, got {value}"))
                }
            }
            FieldTypeKind::Select { options } => match value.as_str() {
                Some(submitted) if options.iter().any(|option| option.value == submitted) => Ok(()),
                Some(submitted) => Err(format!("`{submitted}` is not a known option")),
                None => Err(format!("expected a string option, got {value}")),
            },
            FieldTypeKind::Relationship { .. } => Ok(()),
        }
    }
}
