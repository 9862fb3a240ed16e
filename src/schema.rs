//! Field specifications and the schema compiler.
//!
//! A list of [`FieldSpec`] entries describes where each source column lands
//! in the output document. [`CompiledSchema::compile`] checks that list
//! against the CSV header once, before any row is read:
//!
//! - the first two header columns must be the range sentinels
//!   [`RANGE_START_COLUMN`] and [`RANGE_END_COLUMN`];
//! - every source column must exist in the header;
//! - no two fields may share a target, and no target may be used both as a
//!   scalar and as an object prefix of another target;
//! - type and capitalization options must be known.
//!
//! The result is immutable and can be shared across threads without locking.
//! Every distinct target path component is interned here, so row mapping
//! never allocates keys.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    document::Key,
    error::SchemaError,
    fieldmap::{FieldMapper, ValueType},
    transform::casing::Capitalization,
};

pub const RANGE_START_COLUMN: &str = "start_ip_int";
pub const RANGE_END_COLUMN: &str = "end_ip_int";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    pub target: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capitalization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<HashMap<String, String>>,
    #[serde(default)]
    pub ignore_empty: bool,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub omit_zero_value: bool,
}

impl FieldSpec {
    /// Resolves the declared type, defaulting to string.
    pub fn value_type(&self) -> Result<ValueType, SchemaError> {
        let token = self.value_type.as_deref().unwrap_or_default();
        token
            .parse()
            .map_err(|_| self.unsupported("type", token))
    }

    /// Resolves the capitalization mode, defaulting to none.
    pub fn capitalization(&self) -> Result<Capitalization, SchemaError> {
        let token = self.capitalization.as_deref().unwrap_or_default();
        token
            .parse()
            .map_err(|_| self.unsupported("capitalization", token))
    }

    /// Splits the target on `.`, rejecting empty components.
    pub fn target_components(&self) -> Result<Vec<&str>, SchemaError> {
        let components = self.target.split('.').collect::<Vec<_>>();
        if components.iter().any(|segment| segment.is_empty()) {
            return Err(SchemaError::InvalidTarget {
                field: self.name.clone(),
                target: self.target.clone(),
            });
        }
        Ok(components)
    }

    /// Header-independent checks, usable as soon as the config is loaded.
    pub fn validate(&self) -> Result<(), SchemaError> {
        self.value_type()?;
        self.capitalization()?;
        self.target_components()?;
        Ok(())
    }

    fn unsupported(&self, option: &'static str, value: &str) -> SchemaError {
        SchemaError::UnsupportedOption {
            field: self.name.clone(),
            option,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSchema {
    column_offsets: HashMap<String, usize>,
    fields: Vec<FieldMapper>,
    keys: HashMap<String, Key>,
}

impl CompiledSchema {
    pub fn compile<S: AsRef<str>>(specs: &[FieldSpec], header: &[S]) -> Result<Self, SchemaError> {
        let header = header.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
        validate_range_columns(&header)?;

        let mut column_offsets = HashMap::new();
        let mut fields: Vec<FieldMapper> = Vec::with_capacity(specs.len());
        let mut keys: HashMap<String, Key> = HashMap::new();
        let mut target_owner: HashMap<&str, usize> = HashMap::new();
        // object prefix -> index of the first field that creates it
        let mut object_owner: HashMap<String, usize> = HashMap::new();

        for (idx, spec) in specs.iter().enumerate() {
            let components = spec.target_components()?;
            // a repeated header name resolves to its last occurrence
            let column = header
                .iter()
                .rposition(|name| *name == spec.name)
                .ok_or_else(|| SchemaError::MissingColumn {
                    field: spec.name.clone(),
                    target: spec.target.clone(),
                })?;

            if let Some(&first) = target_owner.get(spec.target.as_str()) {
                return Err(SchemaError::DuplicateTarget {
                    first: specs[first].name.clone(),
                    second: spec.name.clone(),
                    target: spec.target.clone(),
                });
            }
            target_owner.insert(spec.target.as_str(), idx);

            for depth in 1..components.len() {
                object_owner
                    .entry(components[..depth].join("."))
                    .or_insert(idx);
            }

            let path = components
                .iter()
                .map(|segment| intern(&mut keys, segment))
                .collect::<Vec<_>>();
            column_offsets.insert(spec.name.clone(), column);
            fields.push(FieldMapper::new(spec, column, path)?);
        }

        for field in &fields {
            if let Some(&owner) = object_owner.get(field.target()) {
                return Err(SchemaError::TargetConflict {
                    target: field.target().to_string(),
                    field: field.name().to_string(),
                    object_field: specs[owner].name.clone(),
                });
            }
        }

        debug!(
            "Compiled {} field(s): {}",
            fields.len(),
            fields
                .iter()
                .map(|f| format!("{}[{}] -> {} ({})", f.name(), f.column(), f.target(), f.value_type()))
                .join(", ")
        );

        Ok(Self {
            column_offsets,
            fields,
            keys,
        })
    }

    /// Builds a schema without any compile-time checks.
    #[cfg(test)]
    pub(crate) fn from_fields(fields: Vec<FieldMapper>) -> Self {
        Self {
            column_offsets: fields
                .iter()
                .map(|field| (field.name().to_string(), field.column()))
                .collect(),
            fields,
            keys: HashMap::new(),
        }
    }

    pub fn fields(&self) -> &[FieldMapper] {
        &self.fields
    }

    pub fn column_offset(&self, source_name: &str) -> Option<usize> {
        self.column_offsets.get(source_name).copied()
    }

    /// The shared key for a target path component, if any field uses it.
    pub fn interned_key(&self, segment: &str) -> Option<&Key> {
        self.keys.get(segment)
    }

    pub fn interned_key_count(&self) -> usize {
        self.keys.len()
    }
}

fn validate_range_columns(header: &[&str]) -> Result<(), SchemaError> {
    let start = header.first().copied().unwrap_or_default();
    let end = header.get(1).copied().unwrap_or_default();
    if start != RANGE_START_COLUMN || end != RANGE_END_COLUMN {
        return Err(SchemaError::SchemaMismatch {
            expected_start: RANGE_START_COLUMN,
            expected_end: RANGE_END_COLUMN,
            found_start: start.to_string(),
            found_end: end.to_string(),
        });
    }
    Ok(())
}

fn intern(keys: &mut HashMap<String, Key>, segment: &str) -> Key {
    keys.entry(segment.to_string())
        .or_insert_with(|| Arc::from(segment))
        .clone()
}
