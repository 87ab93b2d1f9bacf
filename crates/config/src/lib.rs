//! Declarative list configuration: the types a deployment uses to describe
//! its lists, fields, access rules and hooks. Construction of runtime lists
//! from these types lives in `strata-engine`.

mod access;
mod field;
mod field_type;
mod hooks;
mod list;

pub use access::{
    AccessRuleConfig, FieldAccessConfig, FieldOperationRules, ListAccessConfig, OperationRules,
};
pub use field::{FieldConfig, FieldTypeConfig};
pub use field_type::{FieldTypeKind, SelectOption};
pub use hooks::{
    merge_hook_result, FieldHookArgs, FieldHooks, FieldResolveInputHook, FieldSideEffectHook,
    FieldValidateHook, HookArgs, ListHooks, ListResolveInputHook, ListSideEffectHook,
    ListValidateHook,
};
pub use list::{CacheHintPolicy, ListConfig, NamingOverrides};
