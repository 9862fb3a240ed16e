//! Per-field value coercion.
//!
//! A [`FieldMapper`] is compiled from one [`FieldSpec`] and turns the raw
//! cell text of its source column into a [`FieldOutcome`]. The declared type
//! selects one [`Coercion`] variant; capitalization and translation only
//! exist on the string variant.

use std::{collections::HashMap, fmt, str::FromStr};

use log::warn;

use crate::{
    document::{Key, Scalar},
    error::{FieldError, SchemaError},
    schema::FieldSpec,
    transform::casing::Capitalization,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValueType {
    #[default]
    String,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Boolean,
    Float32,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int32 => "int32",
            ValueType::Uint32 => "uint32",
            ValueType::Int64 => "int64",
            ValueType::Uint64 => "uint64",
            ValueType::Boolean => "boolean",
            ValueType::Float32 => "float32",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "string", "int32", "uint32", "int64", "uint64", "boolean", "float32",
        ]
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "string" => Ok(ValueType::String),
            "int32" => Ok(ValueType::Int32),
            "uint32" => Ok(ValueType::Uint32),
            "int64" => Ok(ValueType::Int64),
            "uint64" => Ok(ValueType::Uint64),
            "boolean" => Ok(ValueType::Boolean),
            "float32" => Ok(ValueType::Float32),
            other => Err(format!(
                "unknown field type '{other}', expected one of: {}",
                ValueType::variants().join(", ")
            )),
        }
    }
}

/// Result of mapping one raw cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The whole row produces no document.
    OmitRecord,
    /// This field contributes no key; the rest of the row is still mapped.
    OmitValue,
    Value(Scalar),
}

#[derive(Debug, Clone)]
pub enum Coercion {
    String {
        capitalization: Capitalization,
        translations: Option<HashMap<String, String>>,
    },
    Int32,
    Uint32,
    Int64,
    Uint64,
    Boolean,
    Float32,
}

impl Coercion {
    pub fn value_type(&self) -> ValueType {
        match self {
            Coercion::String { .. } => ValueType::String,
            Coercion::Int32 => ValueType::Int32,
            Coercion::Uint32 => ValueType::Uint32,
            Coercion::Int64 => ValueType::Int64,
            Coercion::Uint64 => ValueType::Uint64,
            Coercion::Boolean => ValueType::Boolean,
            Coercion::Float32 => ValueType::Float32,
        }
    }

    /// Only booleans and floats drop their zero value under `omitZeroValue`;
    /// strings and integers are always written.
    pub fn honours_omit_zero(&self) -> bool {
        matches!(self, Coercion::Boolean | Coercion::Float32)
    }
}

#[derive(Debug, Clone)]
pub struct FieldMapper {
    name: String,
    target: String,
    target_path: Vec<Key>,
    column: usize,
    critical: bool,
    ignore_empty: bool,
    omit_zero_value: bool,
    coercion: Coercion,
}

impl FieldMapper {
    /// Builds the mapper for `spec`, reading from `column` and writing to the
    /// already interned `target_path`.
    pub fn new(spec: &FieldSpec, column: usize, target_path: Vec<Key>) -> Result<Self, SchemaError> {
        let value_type = spec.value_type()?;
        let capitalization = spec.capitalization()?;
        if value_type != ValueType::String
            && (capitalization != Capitalization::None || spec.translate.is_some())
        {
            warn!(
                "Field '{}' is of type {value_type}; capitalization and translation are ignored",
                spec.name
            );
        }
        let coercion = match value_type {
            ValueType::String => Coercion::String {
                capitalization,
                translations: spec.translate.clone(),
            },
            ValueType::Int32 => Coercion::Int32,
            ValueType::Uint32 => Coercion::Uint32,
            ValueType::Int64 => Coercion::Int64,
            ValueType::Uint64 => Coercion::Uint64,
            ValueType::Boolean => Coercion::Boolean,
            ValueType::Float32 => Coercion::Float32,
        };
        Ok(Self {
            name: spec.name.clone(),
            target: spec.target.clone(),
            target_path,
            column,
            critical: spec.critical,
            ignore_empty: spec.ignore_empty,
            omit_zero_value: spec.omit_zero_value,
            coercion,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn target_path(&self) -> &[Key] {
        &self.target_path
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn value_type(&self) -> ValueType {
        self.coercion.value_type()
    }

    pub fn should_omit_record(&self, raw: &str) -> bool {
        self.critical && raw.is_empty()
    }

    pub fn should_omit_value(&self, raw: &str) -> bool {
        self.ignore_empty && raw.is_empty()
    }

    pub fn map(&self, raw: &str) -> Result<FieldOutcome, FieldError> {
        if self.should_omit_record(raw) {
            return Ok(FieldOutcome::OmitRecord);
        }
        if self.should_omit_value(raw) {
            return Ok(FieldOutcome::OmitValue);
        }
        let value = self.coerce(raw)?;
        if self.omit_zero_value && self.coercion.honours_omit_zero() && value.is_zero() {
            return Ok(FieldOutcome::OmitValue);
        }
        Ok(FieldOutcome::Value(value))
    }

    fn coerce(&self, raw: &str) -> Result<Scalar, FieldError> {
        let value = match &self.coercion {
            Coercion::String {
                capitalization,
                translations,
            } => Scalar::String(self.map_string(raw, *capitalization, translations.as_ref())),
            Coercion::Int32 => Scalar::Int32(raw.parse().map_err(|_| self.conversion_error(raw))?),
            Coercion::Uint32 => {
                Scalar::Uint32(parse_unsigned(raw).ok_or_else(|| self.conversion_error(raw))?)
            }
            Coercion::Int64 => Scalar::Int64(raw.parse().map_err(|_| self.conversion_error(raw))?),
            Coercion::Uint64 => {
                Scalar::Uint64(parse_unsigned(raw).ok_or_else(|| self.conversion_error(raw))?)
            }
            Coercion::Boolean => {
                Scalar::Bool(parse_boolean(raw).ok_or_else(|| self.conversion_error(raw))?)
            }
            Coercion::Float32 => {
                Scalar::Float32(parse_float32(raw).ok_or_else(|| self.conversion_error(raw))?)
            }
        };
        Ok(value)
    }

    fn map_string(
        &self,
        raw: &str,
        capitalization: Capitalization,
        translations: Option<&HashMap<String, String>>,
    ) -> String {
        let capitalized = capitalization.apply(raw);
        let Some(translations) = translations else {
            return capitalized.into_owned();
        };
        match translations.get(capitalized.as_ref()) {
            Some(translated) => translated.clone(),
            None => {
                warn!(
                    "No translation for '{}' value '{}' with target field '{}'",
                    self.name, capitalized, self.target
                );
                capitalized.into_owned()
            }
        }
    }

    fn conversion_error(&self, raw: &str) -> FieldError {
        FieldError::FieldConversion {
            field: self.name.clone(),
            value_type: self.value_type(),
            raw: raw.to_string(),
        }
    }
}

/// Empty input is read as `false`; everything else must be a boolean token.
pub fn parse_boolean(raw: &str) -> Option<bool> {
    if raw.is_empty() {
        return Some(false);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Parses an unsigned integer. Unlike `FromStr`, a leading `+` is rejected.
pub fn parse_unsigned<T: FromStr>(raw: &str) -> Option<T> {
    if raw.starts_with('+') {
        return None;
    }
    raw.parse().ok()
}

/// Parses a 32-bit float, rejecting finite literals that overflow to infinity.
pub fn parse_float32(raw: &str) -> Option<f32> {
    let value: f32 = raw.parse().ok()?;
    if value.is_infinite() {
        let unsigned = raw.trim_start_matches(['+', '-']).to_ascii_lowercase();
        if !unsigned.starts_with("inf") {
            return None;
        }
    }
    Some(value)
}
