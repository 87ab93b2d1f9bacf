//! The mutation pipeline: a fixed sequence of phases per mutation, composed
//! across relationship graphs through a shared `MutationState`. Phases run
//! strictly in order; within a phase, independent per-field work is
//! dispatched in parallel and joined.

use async_recursion::async_recursion;
use futures_util::future::{join_all, BoxFuture};
use nonempty::NonEmpty;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use strata_config::{merge_hook_result, FieldHookArgs, FieldSideEffectHook, HookArgs};
use strata_types::{
    AccessDeniedError, AccessMeta, Context, FieldPath, FieldValidationError, Item, ItemId,
    ListKey, Operation, OperationError, QueryArgs, QueryExtra, QueryResult, ResolvedData,
    ValidationFailureError,
};

use crate::access::{self, FieldCheck};
use crate::fields::Field;
use crate::list::{List, ListRegistry};

type AfterHook = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), OperationError>> + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BacklinkAction {
    Connect,
    Disconnect,
}

/// A pending reciprocal-relationship fix-up: add or remove `source_id` on
/// `target_list.target_field` of item `target_id`.
struct Backlink {
    target_list: ListKey,
    target_field: FieldPath,
    target_id: ItemId,
    source_id: ItemId,
    action: BacklinkAction,
}

/// Per-root-mutation shared state, passed by reference into every nested
/// mutation: the after-hook stack (drained LIFO by the root only), the
/// backlink queue (drained after each mutation body), and a placeholder for
/// a future adapter transaction handle.
#[derive(Default)]
pub struct MutationState {
    after_hooks: Vec<AfterHook>,
    backlinks: Vec<Backlink>,
    _transaction: (),
}

impl MutationState {
    #[must_use]
    pub fn new() -> Self {
        MutationState::default()
    }

    fn queue_after_hook(&mut self, hook: AfterHook) {
        self.after_hooks.push(hook);
    }

    fn queue_backlink(&mut self, backlink: Backlink) {
        self.backlinks.push(backlink);
    }

    /// Runs queued after-hooks, last pushed first. Only the root mutation
    /// calls this, once every mutation in the graph has persisted, so no
    /// hook ever observes a partially-committed graph.
    pub async fn drain_after_hooks(&mut self) -> Result<(), OperationError> {
        while let Some(hook) = self.after_hooks.pop() {
            hook().await?;
        }
        Ok(())
    }

    /// Applies queued backlinks through the target lists' adapters. A target
    /// that no longer exists is skipped; its reference is already gone.
    async fn drain_backlinks(
        &mut self,
        lists: &ListRegistry,
        _ctx: &Arc<Context>,
    ) -> Result<(), OperationError> {
        let pending = std::mem::take(&mut self.backlinks);
        for backlink in pending {
            let Some(target) = lists.get(backlink.target_list.as_str()) else {
                continue;
            };
            let Some(field) = target.fields().by_path(&backlink.target_field) else {
                continue;
            };
            let many = field
                .relationship()
                .is_some_and(|(_, _, many)| many);
            let args = QueryArgs {
                filter: Some(json!({ "id": backlink.target_id.as_str() })),
                first: Some(1),
                ..QueryArgs::default()
            };
            let result = target.adapter().items_query(args, QueryExtra::default()).await?;
            let QueryResult::Items(items) = result else {
                continue;
            };
            let Some(item) = items.into_iter().next() else {
                continue;
            };
            let current = item.get(backlink.target_field.as_str());
            let updated = if many {
                let mut ids = value_to_id_list(current);
                match backlink.action {
                    BacklinkAction::Connect => {
                        if ids.contains(&backlink.source_id) {
                            continue;
                        }
                        ids.push(backlink.source_id.clone());
                    }
                    BacklinkAction::Disconnect => {
                        let Some(position) = ids.iter().position(|id| *id == backlink.source_id)
                        else {
                            continue;
                        };
                        ids.remove(position);
                    }
                }
                json!(ids)
            } else {
                let current_id = value_to_id(current);
                match backlink.action {
                    BacklinkAction::Connect => {
                        if current_id.as_ref() == Some(&backlink.source_id) {
                            continue;
                        }
                        Value::String(backlink.source_id.to_string())
                    }
                    BacklinkAction::Disconnect => {
                        if current_id.as_ref() != Some(&backlink.source_id) {
                            continue;
                        }
                        Value::Null
                    }
                }
            };
            let mut data = ResolvedData::new();
            data.insert(backlink.target_field.clone(), updated);
            target.adapter().update(&backlink.target_id, data).await?;
            debug!(
                list = %backlink.target_list,
                field = %backlink.target_field,
                item = %backlink.target_id,
                "backlink resolved"
            );
        }
        Ok(())
    }
}

/// The relationship changes one field resolved to, recorded so backlinks can
/// be queued once the owning item's id is known.
struct RelationshipIntent {
    target_list: ListKey,
    ref_field: Option<FieldPath>,
    connects: Vec<ItemId>,
    disconnects: Vec<ItemId>,
}

enum RelationshipInput {
    /// An explicit null: clear the relationship.
    Clear,
    Ops(NestedOps),
}

#[derive(Default)]
struct NestedOps {
    disconnect_all: bool,
    disconnect: Vec<ItemId>,
    create: Vec<Value>,
    connect: Vec<ItemId>,
}

impl List {
    // ---- root-level mutations ------------------------------------------

    pub async fn create_one(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        input: Value,
    ) -> Result<Item, OperationError> {
        let mut state = MutationState::new();
        let item = self.create_nested(lists, ctx, input, &mut state).await?;
        state.drain_after_hooks().await?;
        Ok(item)
    }

    pub async fn update_one(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        id: &ItemId,
        input: Value,
    ) -> Result<Item, OperationError> {
        let mut state = MutationState::new();
        let item = self.update_nested(lists, ctx, id, input, &mut state).await?;
        state.drain_after_hooks().await?;
        Ok(item)
    }

    pub async fn delete_one(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        id: &ItemId,
    ) -> Result<Item, OperationError> {
        let mut state = MutationState::new();
        let meta = AccessMeta {
            gql_name: self.names.gql.delete_mutation_name.clone(),
            item_id: Some(id.clone()),
            ..AccessMeta::default()
        };
        let decision = access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &Value::Null,
            Operation::Delete,
            &meta,
        )
        .await?;
        let existing = self
            .get_access_controlled_item(ctx, id, &decision, Operation::Delete)
            .await?;
        let item = self
            .delete_with_item(lists, ctx, existing, &mut state)
            .await?;
        state.drain_after_hooks().await?;
        Ok(item)
    }

    /// Bulk create: every item is an independent root mutation with its own
    /// state; one failure never blocks the others.
    pub async fn create_many(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        inputs: Vec<Value>,
    ) -> Vec<Result<Item, OperationError>> {
        join_all(
            inputs
                .into_iter()
                .map(|input| self.create_one(lists, ctx, input)),
        )
        .await
    }

    pub async fn update_many(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        updates: Vec<(ItemId, Value)>,
    ) -> Vec<Result<Item, OperationError>> {
        join_all(updates.into_iter().map(|(id, input)| async move {
            self.update_one(lists, ctx, &id, input).await
        }))
        .await
    }

    /// Bulk delete: a single list-access evaluation, then only the
    /// authorized subset of ids is loaded and deleted; unauthorized ids are
    /// silently absent from the result rather than failing the batch.
    pub async fn delete_many(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        ids: Vec<ItemId>,
    ) -> Result<Vec<Result<Item, OperationError>>, OperationError> {
        let meta = AccessMeta {
            gql_name: self.names.gql.delete_many_mutation_name.clone(),
            item_ids: Some(ids.clone()),
            ..AccessMeta::default()
        };
        let decision = access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &Value::Null,
            Operation::Delete,
            &meta,
        )
        .await?;
        let items = self
            .get_access_controlled_items(ctx, &ids, &decision)
            .await?;
        Ok(join_all(items.into_iter().map(|item| async move {
            let mut state = MutationState::new();
            let deleted = self.delete_with_item(lists, ctx, item, &mut state).await?;
            state.drain_after_hooks().await?;
            Ok(deleted)
        }))
        .await)
    }

    // ---- nested mutation bodies ----------------------------------------

    /// Create pipeline: list access, field access, defaults, relationship
    /// resolution, input resolution, validation, before-hooks, persistence,
    /// backlink registration, queued after-hooks.
    #[async_recursion]
    pub(crate) async fn create_nested(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        input: Value,
        state: &mut MutationState,
    ) -> Result<Item, OperationError> {
        let meta = AccessMeta {
            gql_name: self.names.gql.create_mutation_name.clone(),
            ..AccessMeta::default()
        };
        // A create has no existing items for a filter rule to match; only a
        // static denial blocks it.
        access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &input,
            Operation::Create,
            &meta,
        )
        .await?;
        let mut resolved = self.input_data(&input);
        access::check_field_access(
            &self.key,
            self.fields(),
            ctx,
            Operation::Create,
            &[FieldCheck {
                existing: None,
                input: &resolved,
            }],
            &input,
        )
        .await?;
        self.resolve_defaults(&mut resolved);
        let intents = self
            .resolve_relationships(lists, ctx, &mut resolved, None, state)
            .await?;
        let resolved = self
            .run_resolve_input(ctx, resolved, None, &input, Operation::Create)
            .await?;
        self.run_validate_input(ctx, &resolved, None, &input, Operation::Create)
            .await?;
        self.run_before_change(ctx, &resolved, None, &input, Operation::Create)
            .await?;
        let item = self.adapter().create(resolved.clone()).await?;
        debug!(list = %self.key, id = %item.id, "item created");
        self.register_intent_backlinks(state, &intents, &item.id);
        self.queue_after_change(
            state,
            ctx,
            None,
            item.clone(),
            resolved,
            input,
            Operation::Create,
        );
        state.drain_backlinks(lists, ctx).await?;
        Ok(item)
    }

    /// Update pipeline: like create, but the existing item is loaded under
    /// the access filter first (invisible items read as access-denied) and
    /// no defaults are applied.
    pub(crate) async fn update_nested(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        id: &ItemId,
        input: Value,
        state: &mut MutationState,
    ) -> Result<Item, OperationError> {
        let meta = AccessMeta {
            gql_name: self.names.gql.update_mutation_name.clone(),
            item_id: Some(id.clone()),
            ..AccessMeta::default()
        };
        let decision = access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &input,
            Operation::Update,
            &meta,
        )
        .await?;
        let existing = self
            .get_access_controlled_item(ctx, id, &decision, Operation::Update)
            .await?;
        let mut resolved = self.input_data(&input);
        access::check_field_access(
            &self.key,
            self.fields(),
            ctx,
            Operation::Update,
            &[FieldCheck {
                existing: Some(&existing),
                input: &resolved,
            }],
            &input,
        )
        .await?;
        let intents = self
            .resolve_relationships(lists, ctx, &mut resolved, Some(&existing), state)
            .await?;
        let resolved = self
            .run_resolve_input(ctx, resolved, Some(&existing), &input, Operation::Update)
            .await?;
        self.run_validate_input(ctx, &resolved, Some(&existing), &input, Operation::Update)
            .await?;
        self.run_before_change(ctx, &resolved, Some(&existing), &input, Operation::Update)
            .await?;
        let item = self.adapter().update(id, resolved.clone()).await?;
        debug!(list = %self.key, id = %item.id, "item updated");
        self.register_intent_backlinks(state, &intents, &item.id);
        self.queue_after_change(
            state,
            ctx,
            Some(existing),
            item.clone(),
            resolved,
            input,
            Operation::Update,
        );
        state.drain_backlinks(lists, ctx).await?;
        Ok(item)
    }

    /// Delete pipeline body, for an item already loaded under access
    /// control: backlink registration, delete validation, before-hooks,
    /// persistence, queued after-hooks.
    pub(crate) async fn delete_with_item(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        existing: Item,
        state: &mut MutationState,
    ) -> Result<Item, OperationError> {
        self.register_delete_backlinks(state, &existing);
        self.run_validate_delete(ctx, &existing).await?;
        self.run_before_delete(ctx, &existing).await?;
        self.adapter().delete(&existing.id).await?;
        debug!(list = %self.key, id = %existing.id, "item deleted");
        self.queue_after_delete(state, ctx, existing.clone());
        state.drain_backlinks(lists, ctx).await?;
        Ok(existing)
    }

    // ---- phases ---------------------------------------------------------

    /// The declared fields present in the submitted input, in field order.
    fn input_data(&self, input: &Value) -> ResolvedData {
        let mut resolved = ResolvedData::new();
        if let Some(object) = input.as_object() {
            for field in self.fields().iter() {
                if let Some(value) = object.get(field.path.as_str()) {
                    resolved.insert(field.path.clone(), value.clone());
                }
            }
        }
        resolved
    }

    /// Fills untouched fields from the type-level default, then the per-field
    /// configured default. The primary key is never defaulted here; the
    /// adapter mints it.
    fn resolve_defaults(&self, resolved: &mut ResolvedData) {
        for field in self.fields().iter() {
            if field.is_primary_key || resolved.contains_key(&field.path) {
                continue;
            }
            let default = field
                .kind
                .default_value()
                .or_else(|| field.default_value.clone());
            if let Some(value) = default {
                resolved.insert(field.path.clone(), value);
            }
        }
    }

    /// Resolves relationship inputs to id values, performing nested creates
    /// through the shared state. Operations apply in a fixed order no matter
    /// how the input object was keyed: disconnectAll, disconnect, create,
    /// connect.
    async fn resolve_relationships(
        &self,
        lists: &ListRegistry,
        ctx: &Arc<Context>,
        resolved: &mut ResolvedData,
        existing: Option<&Item>,
        state: &mut MutationState,
    ) -> Result<Vec<RelationshipIntent>, OperationError> {
        let mut intents = Vec::new();
        let relationship_fields: Vec<Arc<Field>> = self
            .fields()
            .iter()
            .filter(|field| field.is_relationship() && resolved.contains_key(&field.path))
            .map(Arc::clone)
            .collect();

        for field in relationship_fields {
            let Some((ref_list, ref_field, many)) = field.relationship() else {
                continue;
            };
            let Some(target) = lists.get(ref_list.as_str()) else {
                // Unknown targets are rejected at construction time.
                continue;
            };
            let input_value = resolved
                .get(&field.path)
                .cloned()
                .unwrap_or(Value::Null);
            let parsed = parse_relationship_input(&field.path, many, &input_value)?;
            let current_value = existing.and_then(|item| item.get(field.path.as_str()));

            if many {
                let current = value_to_id_list(current_value);
                let ops = match parsed {
                    RelationshipInput::Clear => NestedOps {
                        disconnect_all: true,
                        ..NestedOps::default()
                    },
                    RelationshipInput::Ops(ops) => ops,
                };
                let mut working = current.clone();
                let mut disconnected: Vec<ItemId> = Vec::new();
                if ops.disconnect_all {
                    disconnected.append(&mut working);
                }
                for id in &ops.disconnect {
                    if let Some(position) = working.iter().position(|current| current == id) {
                        working.remove(position);
                        disconnected.push(id.clone());
                    }
                }
                let mut created: Vec<ItemId> = Vec::new();
                for create_input in ops.create {
                    let item = target.create_nested(lists, ctx, create_input, state).await?;
                    created.push(item.id);
                }
                check_connect_targets(target, ctx, &ops.connect).await?;
                let mut connects = created.clone();
                connects.extend(ops.connect.iter().cloned());
                let mut final_ids: Vec<ItemId> = Vec::new();
                for id in working
                    .into_iter()
                    .chain(created)
                    .chain(ops.connect)
                {
                    if !id.as_str().is_empty() && !final_ids.contains(&id) {
                        final_ids.push(id);
                    }
                }
                resolved.insert(field.path.clone(), json!(final_ids));
                intents.push(RelationshipIntent {
                    target_list: ref_list.clone(),
                    ref_field: ref_field.cloned(),
                    connects,
                    disconnects: disconnected,
                });
            } else {
                let current = value_to_id(current_value);
                let mut result = current.clone();
                match parsed {
                    RelationshipInput::Clear => result = None,
                    RelationshipInput::Ops(ops) => {
                        if ops.disconnect_all {
                            result = None;
                        } else if let Some(id) = ops.disconnect.first() {
                            if result.as_ref() == Some(id) {
                                result = None;
                            }
                        }
                        // create wins over connect when both are given
                        if let Some(create_input) = ops.create.into_iter().next() {
                            let item =
                                target.create_nested(lists, ctx, create_input, state).await?;
                            result = Some(item.id);
                        } else if let Some(id) = ops.connect.first() {
                            check_connect_targets(target, ctx, std::slice::from_ref(id)).await?;
                            result = Some(id.clone());
                        }
                    }
                }
                resolved.insert(
                    field.path.clone(),
                    result
                        .as_ref()
                        .map_or(Value::Null, |id| Value::String(id.to_string())),
                );
                if result != current {
                    intents.push(RelationshipIntent {
                        target_list: ref_list.clone(),
                        ref_field: ref_field.cloned(),
                        connects: result.into_iter().collect(),
                        disconnects: current.into_iter().collect(),
                    });
                }
            }
        }
        Ok(intents)
    }

    /// Input-resolution phase: per-field custom hooks dispatched in parallel
    /// and joined (cross-field order is unspecified), then the list-level
    /// hook. A hook returning no value for a key leaves that key unchanged.
    async fn run_resolve_input(
        &self,
        ctx: &Arc<Context>,
        mut resolved: ResolvedData,
        existing: Option<&Item>,
        original_input: &Value,
        operation: Operation,
    ) -> Result<ResolvedData, OperationError> {
        let mut pending = Vec::new();
        for field in self.fields().iter() {
            if let Some(hook) = &field.hooks.resolve_input {
                let hook = Arc::clone(hook);
                let path = field.path.clone();
                let args = self.field_hook_args(ctx, field, &resolved, existing, original_input, operation);
                pending.push(async move { (path, hook(args).await) });
            }
        }
        for (path, outcome) in join_all(pending).await {
            match outcome {
                Ok(Some(value)) => {
                    resolved.insert(path, value);
                }
                Ok(None) => {}
                Err(message) => return Err(OperationError::Hook(message)),
            }
        }
        if let Some(hook) = &self.hooks.resolve_input {
            let args = self.list_hook_args(
                ctx,
                operation,
                Some(resolved.clone()),
                existing.cloned(),
                None,
                original_input.clone(),
            );
            if let Some(changes) = hook(args).await.map_err(OperationError::Hook)? {
                merge_hook_result(&mut resolved, changes);
            }
        }
        Ok(resolved)
    }

    /// Validation phase. Required-field failures are structural: they raise
    /// immediately and no custom validator runs. Custom validators (built-in
    /// type checks, field hooks, the list hook) all run and their errors are
    /// aggregated into a single failure.
    async fn run_validate_input(
        &self,
        ctx: &Arc<Context>,
        resolved: &ResolvedData,
        existing: Option<&Item>,
        original_input: &Value,
        operation: Operation,
    ) -> Result<(), OperationError> {
        let mut missing = Vec::new();
        for field in self.fields().iter() {
            if !field.is_required || field.is_primary_key {
                continue;
            }
            let value = resolved.get(&field.path);
            let failed = match operation {
                Operation::Create => value.map_or(true, Value::is_null),
                Operation::Update => value.is_some_and(Value::is_null),
                _ => false,
            };
            if failed {
                missing.push(FieldValidationError {
                    field: Some(field.path.clone()),
                    message: format!("Required field `{}` is missing", field.path),
                    data: None,
                });
            }
        }
        if let Some(errors) = NonEmpty::from_vec(missing) {
            return Err(ValidationFailureError::new(errors).into());
        }

        let mut errors: Vec<FieldValidationError> = Vec::new();
        for field in self.fields().iter() {
            if let Some(value) = resolved.get(&field.path) {
                if let Err(message) = field.kind.validate_value(value) {
                    errors.push(FieldValidationError {
                        field: Some(field.path.clone()),
                        message,
                        data: None,
                    });
                }
            }
        }
        let mut pending = Vec::new();
        for field in self.fields().iter() {
            if let Some(hook) = &field.hooks.validate_input {
                let hook = Arc::clone(hook);
                let args = self.field_hook_args(ctx, field, resolved, existing, original_input, operation);
                pending.push(async move { hook(args).await });
            }
        }
        for field_errors in join_all(pending).await {
            errors.extend(field_errors);
        }
        if let Some(hook) = &self.hooks.validate_input {
            let args = self.list_hook_args(
                ctx,
                operation,
                Some(resolved.clone()),
                existing.cloned(),
                None,
                original_input.clone(),
            );
            errors.extend(hook(args).await);
        }
        if let Some(errors) = NonEmpty::from_vec(errors) {
            return Err(ValidationFailureError::new(errors).into());
        }
        Ok(())
    }

    async fn run_validate_delete(
        &self,
        ctx: &Arc<Context>,
        existing: &Item,
    ) -> Result<(), OperationError> {
        let mut errors: Vec<FieldValidationError> = Vec::new();
        let empty = ResolvedData::new();
        let mut pending = Vec::new();
        for field in self.fields().iter() {
            if let Some(hook) = &field.hooks.validate_delete {
                let hook = Arc::clone(hook);
                let args = self.field_hook_args(
                    ctx,
                    field,
                    &empty,
                    Some(existing),
                    &Value::Null,
                    Operation::Delete,
                );
                pending.push(async move { hook(args).await });
            }
        }
        for field_errors in join_all(pending).await {
            errors.extend(field_errors);
        }
        if let Some(hook) = &self.hooks.validate_delete {
            let args = self.list_hook_args(
                ctx,
                Operation::Delete,
                None,
                Some(existing.clone()),
                None,
                Value::Null,
            );
            errors.extend(hook(args).await);
        }
        if let Some(errors) = NonEmpty::from_vec(errors) {
            return Err(ValidationFailureError::new(errors).into());
        }
        Ok(())
    }

    async fn run_before_change(
        &self,
        ctx: &Arc<Context>,
        resolved: &ResolvedData,
        existing: Option<&Item>,
        original_input: &Value,
        operation: Operation,
    ) -> Result<(), OperationError> {
        let mut pending = Vec::new();
        for field in self.fields().iter() {
            if let Some(hook) = &field.hooks.before_change {
                let hook = Arc::clone(hook);
                let args = self.field_hook_args(ctx, field, resolved, existing, original_input, operation);
                pending.push(async move { hook(args).await });
            }
        }
        for outcome in join_all(pending).await {
            outcome.map_err(OperationError::Hook)?;
        }
        if let Some(hook) = &self.hooks.before_change {
            let args = self.list_hook_args(
                ctx,
                operation,
                Some(resolved.clone()),
                existing.cloned(),
                None,
                original_input.clone(),
            );
            hook(args).await.map_err(OperationError::Hook)?;
        }
        Ok(())
    }

    async fn run_before_delete(
        &self,
        ctx: &Arc<Context>,
        existing: &Item,
    ) -> Result<(), OperationError> {
        let empty = ResolvedData::new();
        let mut pending = Vec::new();
        for field in self.fields().iter() {
            if let Some(hook) = &field.hooks.before_delete {
                let hook = Arc::clone(hook);
                let args = self.field_hook_args(
                    ctx,
                    field,
                    &empty,
                    Some(existing),
                    &Value::Null,
                    Operation::Delete,
                );
                pending.push(async move { hook(args).await });
            }
        }
        for outcome in join_all(pending).await {
            outcome.map_err(OperationError::Hook)?;
        }
        if let Some(hook) = &self.hooks.before_delete {
            let args = self.list_hook_args(
                ctx,
                Operation::Delete,
                None,
                Some(existing.clone()),
                None,
                Value::Null,
            );
            hook(args).await.map_err(OperationError::Hook)?;
        }
        Ok(())
    }

    // ---- after-hook queueing and backlinks ------------------------------

    fn queue_after_change(
        &self,
        state: &mut MutationState,
        ctx: &Arc<Context>,
        existing: Option<Item>,
        updated: Item,
        resolved: ResolvedData,
        original_input: Value,
        operation: Operation,
    ) {
        let field_hooks: Vec<(FieldPath, FieldSideEffectHook)> = self
            .fields()
            .iter()
            .filter_map(|field| {
                field
                    .hooks
                    .after_change
                    .clone()
                    .map(|hook| (field.path.clone(), hook))
            })
            .collect();
        let list_hook = self.hooks.after_change.clone();
        if field_hooks.is_empty() && list_hook.is_none() {
            return;
        }
        let list_key = self.key.clone();
        let ctx = Arc::clone(ctx);
        state.queue_after_hook(Box::new(move || {
            Box::pin(async move {
                for (path, hook) in field_hooks {
                    let args = FieldHookArgs {
                        list_key: list_key.clone(),
                        field_path: path.clone(),
                        operation,
                        value: resolved.get(&path).cloned(),
                        resolved_data: resolved.clone(),
                        existing_item: existing.clone(),
                        original_input: original_input.clone(),
                        context: Arc::clone(&ctx),
                    };
                    hook(args).await.map_err(OperationError::Hook)?;
                }
                if let Some(hook) = list_hook {
                    let args = HookArgs {
                        list_key,
                        operation,
                        resolved_data: Some(resolved),
                        existing_item: existing,
                        updated_item: Some(updated),
                        original_input,
                        context: ctx,
                    };
                    hook(args).await.map_err(OperationError::Hook)?;
                }
                Ok(())
            })
        }));
    }

    fn queue_after_delete(&self, state: &mut MutationState, ctx: &Arc<Context>, existing: Item) {
        let field_hooks: Vec<(FieldPath, FieldSideEffectHook)> = self
            .fields()
            .iter()
            .filter_map(|field| {
                field
                    .hooks
                    .after_delete
                    .clone()
                    .map(|hook| (field.path.clone(), hook))
            })
            .collect();
        let list_hook = self.hooks.after_delete.clone();
        if field_hooks.is_empty() && list_hook.is_none() {
            return;
        }
        let list_key = self.key.clone();
        let ctx = Arc::clone(ctx);
        state.queue_after_hook(Box::new(move || {
            Box::pin(async move {
                for (path, hook) in field_hooks {
                    let args = FieldHookArgs {
                        list_key: list_key.clone(),
                        field_path: path.clone(),
                        operation: Operation::Delete,
                        value: existing.get(path.as_str()).cloned(),
                        resolved_data: ResolvedData::new(),
                        existing_item: Some(existing.clone()),
                        original_input: Value::Null,
                        context: Arc::clone(&ctx),
                    };
                    hook(args).await.map_err(OperationError::Hook)?;
                }
                if let Some(hook) = list_hook {
                    let args = HookArgs {
                        list_key,
                        operation: Operation::Delete,
                        resolved_data: None,
                        existing_item: Some(existing),
                        updated_item: None,
                        original_input: Value::Null,
                        context: ctx,
                    };
                    hook(args).await.map_err(OperationError::Hook)?;
                }
                Ok(())
            })
        }));
    }

    /// Queues reciprocal fix-ups for resolved relationship changes, now that
    /// the owning item's id is known.
    fn register_intent_backlinks(
        &self,
        state: &mut MutationState,
        intents: &[RelationshipIntent],
        source_id: &ItemId,
    ) {
        for intent in intents {
            let Some(ref_field) = &intent.ref_field else {
                continue;
            };
            for target_id in &intent.disconnects {
                state.queue_backlink(Backlink {
                    target_list: intent.target_list.clone(),
                    target_field: ref_field.clone(),
                    target_id: target_id.clone(),
                    source_id: source_id.clone(),
                    action: BacklinkAction::Disconnect,
                });
            }
            for target_id in &intent.connects {
                state.queue_backlink(Backlink {
                    target_list: intent.target_list.clone(),
                    target_field: ref_field.clone(),
                    target_id: target_id.clone(),
                    source_id: source_id.clone(),
                    action: BacklinkAction::Connect,
                });
            }
        }
    }

    /// On delete, every two-sided relationship the item holds queues a
    /// disconnect so related lists drop their reverse references.
    fn register_delete_backlinks(&self, state: &mut MutationState, existing: &Item) {
        for field in self.fields().iter() {
            let Some((ref_list, Some(ref_field), many)) = field.relationship() else {
                continue;
            };
            let targets = if many {
                value_to_id_list(existing.get(field.path.as_str()))
            } else {
                value_to_id(existing.get(field.path.as_str()))
                    .into_iter()
                    .collect()
            };
            for target_id in targets {
                state.queue_backlink(Backlink {
                    target_list: ref_list.clone(),
                    target_field: ref_field.clone(),
                    target_id,
                    source_id: existing.id.clone(),
                    action: BacklinkAction::Disconnect,
                });
            }
        }
    }

    // ---- hook argument assembly -----------------------------------------

    fn field_hook_args(
        &self,
        ctx: &Arc<Context>,
        field: &Field,
        resolved: &ResolvedData,
        existing: Option<&Item>,
        original_input: &Value,
        operation: Operation,
    ) -> FieldHookArgs {
        FieldHookArgs {
            list_key: self.key.clone(),
            field_path: field.path.clone(),
            operation,
            value: resolved.get(&field.path).cloned(),
            resolved_data: resolved.clone(),
            existing_item: existing.cloned(),
            original_input: original_input.clone(),
            context: Arc::clone(ctx),
        }
    }

    fn list_hook_args(
        &self,
        ctx: &Arc<Context>,
        operation: Operation,
        resolved_data: Option<ResolvedData>,
        existing_item: Option<Item>,
        updated_item: Option<Item>,
        original_input: Value,
    ) -> HookArgs {
        HookArgs {
            list_key: self.key.clone(),
            operation,
            resolved_data,
            existing_item,
            updated_item,
            original_input,
            context: Arc::clone(ctx),
        }
    }
}

/// Connect targets must exist and be readable by the acting user; an unknown
/// or invisible id is denied rather than stored as a dangling reference.
async fn check_connect_targets(
    target: &List,
    ctx: &Arc<Context>,
    ids: &[ItemId],
) -> Result<(), OperationError> {
    if ids.is_empty() {
        return Ok(());
    }
    let meta = AccessMeta {
        gql_name: target.names.gql.item_query_name.clone(),
        item_ids: Some(ids.to_vec()),
        ..AccessMeta::default()
    };
    let decision = access::check_list_access(
        &target.key,
        &target.access,
        ctx,
        &Value::Null,
        Operation::Read,
        &meta,
    )
    .await?;
    let found = target.get_access_controlled_items(ctx, ids, &decision).await?;
    let missing: Vec<ItemId> = ids
        .iter()
        .filter(|id| !found.iter().any(|item| &item.id == *id))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        debug!(list = %target.key, ids = ?missing, "connect target not reachable");
        Err(AccessDeniedError::list_level(Operation::Read.kind(), Some(missing)).into())
    }
}

// ---- relationship input parsing ----------------------------------------

fn validation_error(field: &FieldPath, message: impl Into<String>) -> OperationError {
    OperationError::Validation(ValidationFailureError::new(NonEmpty::new(
        FieldValidationError {
            field: Some(field.clone()),
            message: message.into(),
            data: None,
        },
    )))
}

fn parse_relationship_input(
    path: &FieldPath,
    many: bool,
    value: &Value,
) -> Result<RelationshipInput, OperationError> {
    match value {
        Value::Null => Ok(RelationshipInput::Clear),
        Value::Object(object) => {
            let mut ops = NestedOps::default();
            for (key, entry) in object {
                match key.as_str() {
                    "disconnectAll" => {
                        ops.disconnect_all = entry.as_bool().ok_or_else(|| {
                            validation_error(path, "`disconnectAll` must be a boolean")
                        })?;
                    }
                    "disconnect" => ops.disconnect = parse_unique_refs(path, many, entry)?,
                    "connect" => ops.connect = parse_unique_refs(path, many, entry)?,
                    "create" => {
                        ops.create = if many {
                            entry
                                .as_array()
                                .ok_or_else(|| {
                                    validation_error(path, "`create` must be a list of inputs")
                                })?
                                .clone()
                        } else {
                            vec![entry.clone()]
                        };
                    }
                    other => {
                        return Err(validation_error(
                            path,
                            format!("unknown nested operation `{other}`"),
                        ))
                    }
                }
            }
            Ok(RelationshipInput::Ops(ops))
        }
        _ => Err(validation_error(path, "expected a relationship input object")),
    }
}

fn parse_unique_refs(
    path: &FieldPath,
    many: bool,
    value: &Value,
) -> Result<Vec<ItemId>, OperationError> {
    let entries: Vec<&Value> = if many {
        value
            .as_array()
            .ok_or_else(|| validation_error(path, "expected a list of `{ id }` objects"))?
            .iter()
            .collect()
    } else {
        vec![value]
    };
    entries
        .into_iter()
        .map(|entry| parse_where_unique(path, entry))
        .collect()
}

fn parse_where_unique(path: &FieldPath, value: &Value) -> Result<ItemId, OperationError> {
    value
        .as_object()
        .and_then(|object| object.get("id"))
        .and_then(Value::as_str)
        .map(ItemId::new)
        .ok_or_else(|| validation_error(path, "expected a `{ id }` object"))
}

fn value_to_id_list(value: Option<&Value>) -> Vec<ItemId> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(ItemId::new)
            .collect(),
        Some(Value::String(id)) if !id.is_empty() => vec![ItemId::new(id.clone())],
        _ => Vec::new(),
    }
}

fn value_to_id(value: Option<&Value>) -> Option<ItemId> {
    match value {
        Some(Value::String(id)) if !id.is_empty() => Some(ItemId::new(id.clone())),
        _ => None,
    }
}
