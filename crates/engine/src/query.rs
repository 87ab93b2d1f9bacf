//! The query executor: access-control-agnostic raw queries with limit
//! enforcement and cache hints, plus the access-controlled item loaders the
//! public queries and the mutation pipeline share.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use strata_types::{
    AccessDecision, AccessDeniedError, AccessMeta, Context, Item, ItemId, LimitKind,
    LimitsExceededError, Operation, OperationError, QueryArgs, QueryExtra, QueryResult,
};

use crate::access;
use crate::list::{List, ResolvedCacheHint};

impl List {
    /// Access-control-agnostic query. Enforces two independent limits:
    /// an explicit `first` beyond `max_results` fails before any adapter
    /// work, and otherwise the adapter is capped at `max_results + 1` so an
    /// over-limit result set (no explicit `first`) is detectable. Also
    /// maintains the per-request `total_results` ceiling. Meta queries skip
    /// the cap because counting must be exact.
    pub async fn items_query_raw(
        &self,
        ctx: &Arc<Context>,
        mut args: QueryArgs,
        extra: QueryExtra,
        operation_name: &str,
    ) -> Result<QueryResult, OperationError> {
        if let Some(max) = self.max_results {
            if let Some(first) = args.first {
                if first > max {
                    return Err(LimitsExceededError {
                        kind: LimitKind::MaxResults,
                        limit: max,
                    }
                    .into());
                }
            }
            if !extra.meta {
                // One extra row acts as the over-limit sentinel.
                let cap = max + 1;
                args.first = Some(args.first.map_or(cap, |first| first.min(cap)));
            }
        }

        let result = self.adapter.items_query(args, extra).await?;
        match &result {
            QueryResult::Items(items) => {
                if let Some(max) = self.max_results {
                    if items.len() as u64 > max {
                        return Err(LimitsExceededError {
                            kind: LimitKind::MaxResults,
                            limit: max,
                        }
                        .into());
                    }
                }
                let total = ctx.add_results(items.len() as u64);
                if total > ctx.max_total_results {
                    return Err(LimitsExceededError {
                        kind: LimitKind::MaxTotalResults,
                        limit: ctx.max_total_results,
                    }
                    .into());
                }
                self.apply_cache_hint(ctx, items, operation_name, extra.meta);
            }
            QueryResult::Count(_) => {
                self.apply_cache_hint(ctx, &[], operation_name, extra.meta);
            }
        }
        Ok(result)
    }

    fn apply_cache_hint(
        &self,
        ctx: &Arc<Context>,
        items: &[Item],
        operation_name: &str,
        is_meta: bool,
    ) {
        match &self.cache_hint {
            None => {}
            Some(ResolvedCacheHint::Static(hint)) => ctx.record_cache_hint(*hint),
            Some(ResolvedCacheHint::Dynamic(f)) => {
                ctx.record_cache_hint(f(items, operation_name, is_meta));
            }
        }
    }

    /// Loads one item by id under an access decision. An id the filter
    /// excludes short-circuits to access-denied without touching the
    /// adapter, and an empty query result is also access-denied, never
    /// not-found, so callers cannot probe for existence.
    pub async fn get_access_controlled_item(
        &self,
        ctx: &Arc<Context>,
        id: &ItemId,
        access: &AccessDecision,
        operation: Operation,
    ) -> Result<Item, OperationError> {
        let denied = || {
            AccessDeniedError::list_level(operation.kind(), Some(vec![id.clone()]))
        };
        if let AccessDecision::Filtered(filter) = access {
            if !filter.allows(id) {
                debug!(list = %self.key, item = %id, "item excluded by access filter");
                return Err(denied().into());
            }
        }
        let args = QueryArgs {
            filter: Some(json!({ "id": id.as_str() })),
            first: Some(1),
            ..QueryArgs::default()
        };
        let result = self
            .items_query_raw(ctx, args, QueryExtra::default(), &self.names.gql.item_query_name)
            .await?;
        match result {
            QueryResult::Items(mut items) if !items.is_empty() => Ok(items.remove(0)),
            _ => Err(denied().into()),
        }
    }

    /// Bulk variant: intersects the requested ids with the access filter and
    /// queries only the survivors. A provably-empty intersection returns an
    /// empty vec without querying; unauthorized ids degrade per-item rather
    /// than failing the batch.
    pub async fn get_access_controlled_items(
        &self,
        ctx: &Arc<Context>,
        ids: &[ItemId],
        access: &AccessDecision,
    ) -> Result<Vec<Item>, OperationError> {
        let mut unique: Vec<ItemId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        let allowed = match access {
            AccessDecision::Static(true) => unique,
            AccessDecision::Static(false) => Vec::new(),
            AccessDecision::Filtered(filter) => filter.restrict_to(&unique),
        };
        if allowed.is_empty() {
            return Ok(Vec::new());
        }
        let args = QueryArgs {
            filter: Some(json!({ "id_in": allowed })),
            ..QueryArgs::default()
        };
        let result = self
            .items_query_raw(ctx, args, QueryExtra::default(), &self.names.gql.list_query_name)
            .await?;
        match result {
            QueryResult::Items(items) => Ok(items),
            QueryResult::Count(_) => Ok(Vec::new()),
        }
    }

    /// The `all<Plural>` resolver: read access, then a filtered query with
    /// any access filter folded into the caller's `where`.
    pub async fn list_query(
        &self,
        ctx: &Arc<Context>,
        mut args: QueryArgs,
    ) -> Result<Vec<Item>, OperationError> {
        let meta = AccessMeta {
            gql_name: self.names.gql.list_query_name.clone(),
            ..AccessMeta::default()
        };
        let decision = access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &Value::Null,
            Operation::Read,
            &meta,
        )
        .await?;
        args.filter = merge_access_filter(args.filter.take(), &decision);
        let result = self
            .items_query_raw(ctx, args, QueryExtra::default(), &self.names.gql.list_query_name)
            .await?;
        match result {
            QueryResult::Items(items) => Ok(items),
            QueryResult::Count(_) => Ok(Vec::new()),
        }
    }

    /// The `_all<Plural>Meta` resolver: an exact count under access control.
    pub async fn list_query_meta(
        &self,
        ctx: &Arc<Context>,
        mut args: QueryArgs,
    ) -> Result<u64, OperationError> {
        let meta = AccessMeta {
            gql_name: self.names.gql.list_query_meta_name.clone(),
            ..AccessMeta::default()
        };
        let decision = access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &Value::Null,
            Operation::Read,
            &meta,
        )
        .await?;
        args.filter = merge_access_filter(args.filter.take(), &decision);
        let result = self
            .items_query_raw(
                ctx,
                args,
                QueryExtra { meta: true },
                &self.names.gql.list_query_meta_name,
            )
            .await?;
        match result {
            QueryResult::Count(count) => Ok(count),
            QueryResult::Items(items) => Ok(items.len() as u64),
        }
    }

    /// The `<Singular>` resolver: one item by id under read access.
    pub async fn item_query(&self, ctx: &Arc<Context>, id: &ItemId) -> Result<Item, OperationError> {
        let meta = AccessMeta {
            gql_name: self.names.gql.item_query_name.clone(),
            item_id: Some(id.clone()),
            ..AccessMeta::default()
        };
        let decision = access::check_list_access(
            &self.key,
            &self.access,
            ctx,
            &Value::Null,
            Operation::Read,
            &meta,
        )
        .await?;
        self.get_access_controlled_item(ctx, id, &decision, Operation::Read)
            .await
    }
}

/// Folds an access filter into a caller-supplied `where`. Both present means
/// both must hold, expressed as an `AND` the adapter evaluates.
fn merge_access_filter(filter: Option<Value>, decision: &AccessDecision) -> Option<Value> {
    let AccessDecision::Filtered(access_filter) = decision else {
        return filter;
    };
    let access_value =
        serde_json::to_value(access_filter).unwrap_or_else(|_| Value::Object(Map::new()));
    match filter {
        None => Some(access_value),
        Some(user_filter) => Some(json!({ "AND": [user_filter, access_value] })),
    }
}
