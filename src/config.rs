//! YAML conversion config.
//!
//! ```yaml
//! databaseType: GeoLite2-Country
//! recordSize: 28
//! useValueCache: true
//! fields:
//!   - name: country_iso_code
//!     target: country.iso_code
//!     capitalization: upper
//!     critical: true
//!   - name: is_anonymous_proxy
//!     target: traits.is_anonymous_proxy
//!     type: boolean
//!     omitZeroValue: true
//! ```
//!
//! Unknown keys are rejected. Header-independent field checks run on load so
//! a bad config fails before the input file is opened.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::schema::FieldSpec;

const SUPPORTED_RECORD_SIZES: &[u8] = &[24, 28, 32];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_database_type")]
    pub database_type: String,
    #[serde(default = "Config::default_record_size")]
    pub record_size: u8,
    #[serde(default)]
    pub use_value_cache: bool,
    pub fields: Vec<FieldSpec>,
}

impl Config {
    pub fn default_database_type() -> String {
        env!("CARGO_PKG_NAME").to_string()
    }

    pub const fn default_record_size() -> u8 {
        28
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: Config = serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(input).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.fields.is_empty(), "Config must declare at least one field");
        ensure!(
            SUPPORTED_RECORD_SIZES.contains(&self.record_size),
            "Unsupported record size {} (expected one of 24, 28, 32)",
            self.record_size
        );
        for field in &self.fields {
            field.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    #[test]
    fn parses_camel_case_keys_with_defaults() {
        let config = Config::from_yaml_str(
            r#"
fields:
  - name: country
    target: country.iso
    capitalization: upper
    ignoreEmpty: true
  - name: anon
    target: traits.anonymous
    type: boolean
    omitZeroValue: true
    translate:
      "1": "yes"
"#,
        )
        .expect("parse config");
        assert_eq!(config.database_type, "csv2rangedb");
        assert_eq!(config.record_size, 28);
        assert!(!config.use_value_cache);
        assert!(config.fields[0].ignore_empty);
        assert_eq!(config.fields[1].value_type.as_deref(), Some("boolean"));
        assert!(config.fields[1].omit_zero_value);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::from_yaml_str("fields: []\nuseCache: true\n").unwrap_err();
        assert!(format!("{err:#}").contains("useCache"));
    }

    #[test]
    fn rejects_unknown_field_options() {
        let err = Config::from_yaml_str(
            "fields:\n  - name: a\n    target: a\n    type: float64\n",
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SchemaError>(),
            Some(SchemaError::UnsupportedOption { option: "type", .. })
        ));
    }

    #[test]
    fn rejects_empty_field_list_and_bad_record_size() {
        assert!(Config::from_yaml_str("fields: []\n").is_err());
        assert!(
            Config::from_yaml_str("recordSize: 16\nfields:\n  - name: a\n    target: a\n").is_err()
        );
    }
}
