//! The field registry: binds each declared field to a built-in field type
//! and the list's adapter, producing the ordered, frozen field set.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use strata_config::{FieldAccessConfig, FieldConfig, FieldHooks, FieldTypeConfig, FieldTypeKind};
use strata_types::{AdapterProvider, ConfigError, FieldPath, ListKey, SchemaVariant};

use crate::access::FieldAccessTable;

/// A fully-bound field: type kind, frozen access table, hooks and admin
/// metadata. Immutable once built.
pub struct Field {
    pub path: FieldPath,
    pub kind: FieldTypeKind,
    pub is_required: bool,
    pub default_value: Option<Value>,
    pub access: FieldAccessTable,
    pub hooks: FieldHooks,
    pub label: String,
    pub admin_view: String,
    /// Set for the implicit or declared primary-key field.
    pub is_primary_key: bool,
}

impl Field {
    #[must_use]
    pub fn is_relationship(&self) -> bool {
        self.kind.is_relationship()
    }

    /// Relationship details: (referenced list, reciprocal field, to-many).
    #[must_use]
    pub fn relationship(&self) -> Option<(&ListKey, Option<&FieldPath>, bool)> {
        match &self.kind {
            FieldTypeKind::Relationship {
                ref_list,
                ref_field,
                many,
            } => Some((ref_list, ref_field.as_ref(), *many)),
            _ => None,
        }
    }
}

/// The ordered field collection of one list, `id` first.
pub struct FieldSet {
    fields: Vec<Arc<Field>>,
    by_path: IndexMap<FieldPath, Arc<Field>>,
}

impl FieldSet {
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Field>> {
        self.fields.iter()
    }

    #[must_use]
    pub fn by_path(&self, path: &FieldPath) -> Option<&Arc<Field>> {
        self.by_path.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builds the field set for a list. Runs exactly once per list; the one-shot
/// guard lives on `List`.
pub fn build(
    list_key: &ListKey,
    declared: &IndexMap<FieldPath, FieldConfig>,
    provider: &dyn AdapterProvider,
    variants: &[SchemaVariant],
    default_access: bool,
    is_auxiliary: bool,
) -> Result<FieldSet, ConfigError> {
    let mut fields: Vec<Arc<Field>> = Vec::with_capacity(declared.len() + 1);

    // The id field always comes first. When the configuration declares none,
    // the adapter must be able to supply a default primary key.
    if !declared.contains_key("id") {
        let pk_config = provider
            .default_primary_key_config()
            .ok_or_else(|| ConfigError::MissingPrimaryKeyStrategy(list_key.clone()))?;
        let kind = FieldTypeKind::primary_key_from_type_name(&pk_config.type_name).ok_or_else(
            || ConfigError::UnknownFieldType {
                list: list_key.clone(),
                field: FieldPath::new("id"),
                type_name: pk_config.type_name.clone(),
            },
        )?;
        fields.push(Arc::new(build_field(
            list_key,
            FieldPath::new("id"),
            kind,
            &FieldConfig::default(),
            provider,
            variants,
            default_access,
            true,
        )?));
    }

    for (path, config) in declared {
        if path.starts_with('_') && !is_auxiliary {
            return Err(ConfigError::ReservedFieldPath {
                list: list_key.clone(),
                field: path.clone(),
            });
        }
        let kind = match &config.field_type {
            None => {
                return Err(ConfigError::MissingFieldType {
                    list: list_key.clone(),
                    field: path.clone(),
                })
            }
            Some(FieldTypeConfig::Kind(kind)) => kind.clone(),
            Some(FieldTypeConfig::Shorthand(shorthand)) => {
                let kind = FieldTypeKind::from_shorthand(shorthand).ok_or_else(|| {
                    ConfigError::UnknownFieldType {
                        list: list_key.clone(),
                        field: path.clone(),
                        type_name: shorthand.clone(),
                    }
                })?;
                warn!(
                    list = %list_key,
                    field = %path,
                    shorthand = %shorthand,
                    mapped_to = kind.type_name(),
                    "native scalar shorthand mapped to a built-in field type"
                );
                kind
            }
        };
        let is_primary_key = path.as_str() == "id";
        fields.push(Arc::new(build_field(
            list_key,
            path.clone(),
            kind,
            config,
            provider,
            variants,
            default_access,
            is_primary_key,
        )?));
    }

    let by_path = fields
        .iter()
        .map(|field| (field.path.clone(), Arc::clone(field)))
        .collect();
    Ok(FieldSet { fields, by_path })
}

#[allow(clippy::too_many_arguments)]
fn build_field(
    list_key: &ListKey,
    path: FieldPath,
    kind: FieldTypeKind,
    config: &FieldConfig,
    provider: &dyn AdapterProvider,
    variants: &[SchemaVariant],
    default_access: bool,
    is_primary_key: bool,
) -> Result<Field, ConfigError> {
    if let Some(supported) = kind.supported_adapters() {
        if !supported.contains(&provider.name()) {
            return Err(ConfigError::UnsupportedFieldType {
                list: list_key.clone(),
                field: path,
                type_name: kind.type_name().to_string(),
                adapter: provider.name().to_string(),
            });
        }
    }
    let access = resolve_access(list_key, &path, &config.access, default_access, variants)?;
    let label = config
        .label
        .clone()
        .unwrap_or_else(|| default_field_label(&path));
    let admin_view = config
        .admin_view
        .clone()
        .unwrap_or_else(|| kind.type_name().to_string());
    Ok(Field {
        path,
        kind,
        is_required: config.is_required,
        default_value: config.default_value.clone(),
        access,
        hooks: config.hooks.clone(),
        label,
        admin_view,
        is_primary_key,
    })
}

fn resolve_access(
    list_key: &ListKey,
    path: &FieldPath,
    config: &FieldAccessConfig,
    default_access: bool,
    variants: &[SchemaVariant],
) -> Result<FieldAccessTable, ConfigError> {
    FieldAccessTable::resolve(list_key, path, config, default_access, variants)
}

fn default_field_label(path: &FieldPath) -> String {
    use convert_case::{Case, Casing};
    path.as_str().to_case(Case::Title)
}
