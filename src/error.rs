//! Typed error kinds for schema compilation and row mapping.
//!
//! [`SchemaError`] is raised once, before any row is read. [`FieldError`] is
//! produced by a single field coercion and is wrapped into a [`RowError`]
//! carrying the 1-based data row number once the row mapper sees it.

use thiserror::Error;

use crate::fieldmap::ValueType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(
        "expecting '{expected_start}' and '{expected_end}' to be the first two column headers, found '{found_start}' and '{found_end}'"
    )]
    SchemaMismatch {
        expected_start: &'static str,
        expected_end: &'static str,
        found_start: String,
        found_end: String,
    },
    #[error("field '{field}' for target '{target}' not found in input header")]
    MissingColumn { field: String, target: String },
    #[error("duplicate target fields, field '{first}' and '{second}' both target '{target}'")]
    DuplicateTarget {
        first: String,
        second: String,
        target: String,
    },
    #[error(
        "target '{target}' of field '{field}' conflicts with object created by target of field '{object_field}'"
    )]
    TargetConflict {
        target: String,
        field: String,
        object_field: String,
    },
    #[error("unknown {option} '{value}' for field '{field}'")]
    UnsupportedOption {
        field: String,
        option: &'static str,
        value: String,
    },
    #[error("invalid target '{target}' for field '{field}': empty path component")]
    InvalidTarget { field: String, target: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("error converting field '{field}' to {value_type}: '{raw}'")]
    FieldConversion {
        field: String,
        value_type: ValueType,
        raw: String,
    },
}

impl FieldError {
    pub fn field(&self) -> &str {
        match self {
            FieldError::FieldConversion { field, .. } => field,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            FieldError::FieldConversion { raw, .. } => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("row {row}: {source}")]
    Field {
        row: usize,
        #[source]
        source: FieldError,
    },
    #[error("row {row}: cannot parse {bound} bound '{raw}' as an unsigned 32-bit integer")]
    RangeBound {
        row: usize,
        bound: &'static str,
        raw: String,
    },
    #[error("row {row}: range start {start} is greater than range end {end}")]
    InvertedRange { row: usize, start: u32, end: u32 },
    #[error("row {row}: no value for field '{field}' at column {column}")]
    MissingValue {
        row: usize,
        field: String,
        column: usize,
    },
    #[error("row {row}: field '{field}' has an empty target path")]
    EmptyTarget { row: usize, field: String },
    #[error("row {row}: field '{field}' expected sub-field '{segment}' to be an object")]
    PathConflict {
        row: usize,
        field: String,
        segment: String,
    },
}

impl RowError {
    pub fn row(&self) -> usize {
        match self {
            RowError::Field { row, .. }
            | RowError::RangeBound { row, .. }
            | RowError::InvertedRange { row, .. }
            | RowError::MissingValue { row, .. }
            | RowError::EmptyTarget { row, .. }
            | RowError::PathConflict { row, .. } => *row,
        }
    }
}
