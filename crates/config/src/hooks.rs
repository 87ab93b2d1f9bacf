use futures_util::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use strata_types::{
    Context, FieldPath, FieldValidationError, Item, ListKey, Operation, ResolvedData,
};

/// Arguments handed to list-level hooks. Owned so hook futures can outlive
/// the borrow that produced them; the engine clones per invocation.
#[derive(Clone)]
pub struct HookArgs {
    pub list_key: ListKey,
    pub operation: Operation,
    /// Data about to be written; `None` for delete hooks.
    pub resolved_data: Option<ResolvedData>,
    pub existing_item: Option<Item>,
    /// The persisted item; populated for after-hooks only.
    pub updated_item: Option<Item>,
    pub original_input: Value,
    pub context: Arc<Context>,
}

/// Arguments handed to field-level hooks.
#[derive(Clone)]
pub struct FieldHookArgs {
    pub list_key: ListKey,
    pub field_path: FieldPath,
    pub operation: Operation,
    /// The field's value in the resolved data so far; `None` when the input
    /// did not touch this field.
    pub value: Option<Value>,
    pub resolved_data: ResolvedData,
    pub existing_item: Option<Item>,
    pub original_input: Value,
    pub context: Arc<Context>,
}

/// Returns replacement values keyed by field path; `None` means "no
/// changes". An absent key leaves the field unchanged, `Value::Null` sets it
/// to null.
pub type ListResolveInputHook =
    Arc<dyn Fn(HookArgs) -> BoxFuture<'static, Result<Option<ResolvedData>, String>> + Send + Sync>;

/// Returns every validation error found; an empty vec is a pass.
pub type ListValidateHook =
    Arc<dyn Fn(HookArgs) -> BoxFuture<'static, Vec<FieldValidationError>> + Send + Sync>;

/// Side-effect hook (before/after change and delete); may fail the mutation.
pub type ListSideEffectHook =
    Arc<dyn Fn(HookArgs) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Returns the field's new value; `None` means "leave as resolved so far".
pub type FieldResolveInputHook =
    Arc<dyn Fn(FieldHookArgs) -> BoxFuture<'static, Result<Option<Value>, String>> + Send + Sync>;

pub type FieldValidateHook =
    Arc<dyn Fn(FieldHookArgs) -> BoxFuture<'static, Vec<FieldValidationError>> + Send + Sync>;

pub type FieldSideEffectHook =
    Arc<dyn Fn(FieldHookArgs) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ListHooks {
    pub resolve_input: Option<ListResolveInputHook>,
    pub validate_input: Option<ListValidateHook>,
    pub validate_delete: Option<ListValidateHook>,
    pub before_change: Option<ListSideEffectHook>,
    pub after_change: Option<ListSideEffectHook>,
    pub before_delete: Option<ListSideEffectHook>,
    pub after_delete: Option<ListSideEffectHook>,
}

#[derive(Clone, Default)]
pub struct FieldHooks {
    pub resolve_input: Option<FieldResolveInputHook>,
    pub validate_input: Option<FieldValidateHook>,
    pub validate_delete: Option<FieldValidateHook>,
    pub before_change: Option<FieldSideEffectHook>,
    pub after_change: Option<FieldSideEffectHook>,
    pub before_delete: Option<FieldSideEffectHook>,
    pub after_delete: Option<FieldSideEffectHook>,
}

/// Merges a hook's result into the resolved data. Later writers win per key;
/// a key the hook did not return is left untouched, so "return nothing for a
/// key" and "never set it" are equivalent, while an explicit `Value::Null`
/// overwrites.
pub fn merge_hook_result(resolved: &mut ResolvedData, changes: ResolvedData) {
    for (path, value) in changes {
        resolved.insert(path, value);
    }
}
