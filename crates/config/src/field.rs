use serde_json::Value;

use crate::access::FieldAccessConfig;
use crate::field_type::FieldTypeKind;
use crate::hooks::FieldHooks;

/// How a field's type is declared: the built-in kind directly, or a native
/// scalar shorthand that the field registry maps (with a warning).
#[derive(Clone, Debug, PartialEq)]
pub enum FieldTypeConfig {
    Kind(FieldTypeKind),
    Shorthand(String),
}

#[derive(Clone, Default)]
pub struct FieldConfig {
    /// Absence is a configuration error, caught by `init_fields`.
    pub field_type: Option<FieldTypeConfig>,
    pub is_required: bool,
    pub default_value: Option<Value>,
    pub access: FieldAccessConfig,
    pub hooks: FieldHooks,
    pub label: Option<String>,
    /// Which admin view renders the field; defaults to the type name.
    pub admin_view: Option<String>,
}

impl FieldConfig {
    #[must_use]
    pub fn of(kind: FieldTypeKind) -> Self {
        FieldConfig {
            field_type: Some(FieldTypeConfig::Kind(kind)),
            ..FieldConfig::default()
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}
