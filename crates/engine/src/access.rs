//! Access resolution: frozen per-schema-variant access tables computed at
//! construction, and the request-time list/field checks.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use strata_config::{
    AccessRuleConfig, FieldAccessConfig, FieldOperationRules, ListAccessConfig, OperationRules,
};
use strata_types::{
    AccessDecision, AccessDeniedError, AccessMeta, Context, FieldPath, Item, ListKey, Operation,
    OperationError, ResolvedData, SchemaVariant,
};

/// The rules for every operation of one list under one schema variant.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationAccess {
    pub read: AccessRuleConfig,
    pub create: AccessRuleConfig,
    pub update: AccessRuleConfig,
    pub delete: AccessRuleConfig,
    pub auth: AccessRuleConfig,
}

impl OperationAccess {
    fn rule(&self, operation: Operation) -> &AccessRuleConfig {
        match operation {
            Operation::Read => &self.read,
            Operation::Create => &self.create,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
            Operation::Auth => &self.auth,
        }
    }
}

/// Frozen at list construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ListAccessTable {
    variants: IndexMap<SchemaVariant, OperationAccess>,
    default_access: bool,
}

impl ListAccessTable {
    pub fn resolve(
        config: &ListAccessConfig,
        default_access: bool,
        variants: &[SchemaVariant],
    ) -> ListAccessTable {
        let resolved = variants
            .iter()
            .map(|variant| {
                let overrides = config.variants.get(variant);
                let pick = |select: fn(&OperationRules) -> &Option<AccessRuleConfig>| {
                    overrides
                        .and_then(|rules| select(rules).clone())
                        .or_else(|| select(&config.base).clone())
                        .unwrap_or(AccessRuleConfig::Static(default_access))
                };
                (
                    variant.clone(),
                    OperationAccess {
                        read: pick(|rules| &rules.read),
                        create: pick(|rules| &rules.create),
                        update: pick(|rules| &rules.update),
                        delete: pick(|rules| &rules.delete),
                        auth: pick(|rules| &rules.auth),
                    },
                )
            })
            .collect();
        ListAccessTable {
            variants: resolved,
            default_access,
        }
    }

    /// The declared rule for an operation under a variant. Unknown variants
    /// fall back to the list's default access.
    #[must_use]
    pub fn rule(&self, variant: &SchemaVariant, operation: Operation) -> AccessRuleConfig {
        self.variants
            .get(variant)
            .map_or(AccessRuleConfig::Static(self.default_access), |access| {
                access.rule(operation).clone()
            })
    }

    /// True when the schema can omit the operation entirely.
    #[must_use]
    pub fn statically_denied(&self, variant: &SchemaVariant, operation: Operation) -> bool {
        self.rule(variant, operation) == AccessRuleConfig::Static(false)
    }
}

/// Field-level analogue of `ListAccessTable`; fields have no delete rules
/// and may not use item filters.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldAccessTable {
    variants: IndexMap<SchemaVariant, FieldOperationAccess>,
    default_access: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldOperationAccess {
    pub read: AccessRuleConfig,
    pub create: AccessRuleConfig,
    pub update: AccessRuleConfig,
}

impl FieldAccessTable {
    pub fn resolve(
        list_key: &ListKey,
        field_path: &FieldPath,
        config: &FieldAccessConfig,
        default_access: bool,
        variants: &[SchemaVariant],
    ) -> Result<FieldAccessTable, strata_types::ConfigError> {
        let mut resolved = IndexMap::new();
        for variant in variants {
            let overrides = config.variants.get(variant);
            let pick = |select: fn(&FieldOperationRules) -> &Option<AccessRuleConfig>,
                        operation: &str|
             -> Result<AccessRuleConfig, strata_types::ConfigError> {
                let rule = overrides
                    .and_then(|rules| select(rules).clone())
                    .or_else(|| select(&config.base).clone())
                    .unwrap_or(AccessRuleConfig::Static(default_access));
                if matches!(rule, AccessRuleConfig::Filter(_)) {
                    return Err(strata_types::ConfigError::MalformedAccess {
                        subject: format!("{list_key}.{field_path}.{operation}"),
                        reason: "field access rules must be booleans or dynamic, not item filters"
                            .to_string(),
                    });
                }
                Ok(rule)
            };
            resolved.insert(
                variant.clone(),
                FieldOperationAccess {
                    read: pick(|rules| &rules.read, "read")?,
                    create: pick(|rules| &rules.create, "create")?,
                    update: pick(|rules| &rules.update, "update")?,
                },
            );
        }
        Ok(FieldAccessTable {
            variants: resolved,
            default_access,
        })
    }

    #[must_use]
    pub fn rule(&self, variant: &SchemaVariant, operation: Operation) -> AccessRuleConfig {
        self.variants
            .get(variant)
            .map_or(AccessRuleConfig::Static(self.default_access), |access| {
                match operation {
                    Operation::Read | Operation::Auth => access.read.clone(),
                    Operation::Create => access.create.clone(),
                    Operation::Update | Operation::Delete => access.update.clone(),
                }
            })
    }

    #[must_use]
    pub fn statically_denied(&self, variant: &SchemaVariant, operation: Operation) -> bool {
        self.rule(variant, operation) == AccessRuleConfig::Static(false)
    }
}

/// Evaluates the list-level rule for one operation. Static rules come from
/// the frozen table; dynamic rules defer to the request's access-control
/// collaborator. Denial is terminal to the request, never the process.
pub async fn check_list_access(
    list_key: &ListKey,
    table: &ListAccessTable,
    ctx: &Arc<Context>,
    original_input: &Value,
    operation: Operation,
    meta: &AccessMeta,
) -> Result<AccessDecision, OperationError> {
    let decision = match table.rule(&ctx.schema_variant, operation) {
        AccessRuleConfig::Static(granted) => AccessDecision::Static(granted),
        AccessRuleConfig::Filter(filter) => AccessDecision::Filtered(filter),
        AccessRuleConfig::Dynamic => {
            ctx.access()
                .list_access(list_key, original_input, operation, meta)
                .await
        }
    };
    if decision.is_denied() {
        debug!(
            list = %list_key,
            operation = %operation,
            gql_name = %meta.gql_name,
            "list access denied"
        );
        info!(list = %list_key, operation = %operation, "access denied");
        return Err(AccessDeniedError::list_level(
            operation.kind(),
            meta.item_ids
                .clone()
                .or_else(|| meta.item_id.clone().map(|id| vec![id])),
        )
        .into());
    }
    Ok(decision)
}

/// One item's worth of submitted data for a field-access check.
pub struct FieldCheck<'a> {
    pub existing: Option<&'a Item>,
    pub input: &'a ResolvedData,
}

/// Evaluates field-level access for every field present in the submitted
/// data of every item. All denied paths are collected before raising a
/// single aggregated error; the check is all-or-nothing per request.
pub async fn check_field_access(
    list_key: &ListKey,
    fields: &crate::fields::FieldSet,
    ctx: &Arc<Context>,
    operation: Operation,
    items: &[FieldCheck<'_>],
    original_input: &Value,
) -> Result<(), OperationError> {
    let mut restricted: Vec<FieldPath> = Vec::new();
    for check in items {
        for (path, _value) in check.input {
            let Some(field) = fields.by_path(path) else {
                continue;
            };
            let allowed = match field.access.rule(&ctx.schema_variant, operation) {
                AccessRuleConfig::Static(granted) => granted,
                // Filters are rejected for fields at construction time.
                AccessRuleConfig::Filter(_) => false,
                AccessRuleConfig::Dynamic => {
                    ctx.access()
                        .field_access(list_key, path, original_input, check.existing, operation)
                        .await
                }
            };
            if !allowed && !restricted.contains(path) {
                restricted.push(path.clone());
            }
        }
    }
    if restricted.is_empty() {
        return Ok(());
    }
    debug!(list = %list_key, operation = %operation, fields = ?restricted, "field access denied");
    info!(list = %list_key, operation = %operation, "access denied");
    let item_ids: Vec<_> = items
        .iter()
        .filter_map(|check| check.existing.map(|item| item.id.clone()))
        .collect();
    let item_ids = if item_ids.is_empty() {
        None
    } else {
        Some(item_ids)
    };
    Err(AccessDeniedError::field_level(item_ids, restricted).into())
}
