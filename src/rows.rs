//! Row mapping: one raw CSV row in, one nested [`Document`] (or nothing) out.
//!
//! [`RowMapper::map`] runs every compiled field against its source column and
//! places the coerced scalar at the field's target path, creating
//! intermediate objects on the way down. A critical field with an empty cell
//! suppresses the whole row before any other field is converted.
//!
//! [`parse_range_bounds`] decodes the two leading range columns.

use std::{net::Ipv4Addr, sync::Arc};

use crate::{
    document::{Document, Key, Object},
    error::RowError,
    fieldmap::{FieldMapper, FieldOutcome, parse_unsigned},
    schema::{CompiledSchema, RANGE_END_COLUMN, RANGE_START_COLUMN},
};

#[derive(Debug, Clone)]
pub struct RowMapper {
    schema: Arc<CompiledSchema>,
}

impl RowMapper {
    pub fn new(schema: Arc<CompiledSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    /// Maps data row `row_number` (1-based). `Ok(None)` means the row was
    /// omitted by a critical field.
    pub fn map<S: AsRef<str>>(
        &self,
        row_number: usize,
        row: &[S],
    ) -> Result<Option<Document>, RowError> {
        for field in self.schema.fields() {
            if field.should_omit_record(raw_value(row_number, row, field)?) {
                return Ok(None);
            }
        }

        let mut root = Object::new();
        for field in self.schema.fields() {
            let raw = raw_value(row_number, row, field)?;
            let value = match field.map(raw).map_err(|source| RowError::Field {
                row: row_number,
                source,
            })? {
                FieldOutcome::OmitRecord => return Ok(None),
                FieldOutcome::OmitValue => continue,
                FieldOutcome::Value(value) => value,
            };
            let Some((leaf, prefix)) = field.target_path().split_last() else {
                return Err(RowError::EmptyTarget {
                    row: row_number,
                    field: field.name().to_string(),
                });
            };
            let parent = descend(&mut root, prefix).map_err(|segment| RowError::PathConflict {
                row: row_number,
                field: field.name().to_string(),
                segment: segment.to_string(),
            })?;
            parent.insert(leaf.clone(), Document::Scalar(value));
        }
        Ok(Some(Document::Object(root)))
    }
}

fn raw_value<'r, S: AsRef<str>>(
    row_number: usize,
    row: &'r [S],
    field: &FieldMapper,
) -> Result<&'r str, RowError> {
    row.get(field.column())
        .map(AsRef::as_ref)
        .ok_or_else(|| RowError::MissingValue {
            row: row_number,
            field: field.name().to_string(),
            column: field.column(),
        })
}

/// Walks `path` below `node`, creating empty objects where nothing exists yet.
/// Returns the offending segment if a scalar sits where an object is needed.
fn descend<'a>(mut node: &'a mut Object, path: &[Key]) -> Result<&'a mut Object, Key> {
    for segment in path {
        let child = node
            .entry(segment.clone())
            .or_insert_with(|| Document::Object(Object::new()));
        node = match child {
            Document::Object(map) => map,
            Document::Scalar(_) => return Err(segment.clone()),
        };
    }
    Ok(node)
}

/// Decodes the inclusive range bounds from the first two columns.
pub fn parse_range_bounds<S: AsRef<str>>(
    row_number: usize,
    row: &[S],
) -> Result<(Ipv4Addr, Ipv4Addr), RowError> {
    let start = parse_bound(row_number, row, 0, RANGE_START_COLUMN)?;
    let end = parse_bound(row_number, row, 1, RANGE_END_COLUMN)?;
    if start > end {
        return Err(RowError::InvertedRange {
            row: row_number,
            start,
            end,
        });
    }
    Ok((Ipv4Addr::from(start), Ipv4Addr::from(end)))
}

fn parse_bound<S: AsRef<str>>(
    row_number: usize,
    row: &[S],
    index: usize,
    bound: &'static str,
) -> Result<u32, RowError> {
    let raw: &str = row.get(index).map(AsRef::as_ref).unwrap_or_default();
    parse_unsigned(raw).ok_or_else(|| RowError::RangeBound {
        row: row_number,
        bound,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::Scalar, error::FieldError, schema::FieldSpec};

    const HEADER: &[&str] = &[RANGE_START_COLUMN, RANGE_END_COLUMN, "country", "city", "anon"];

    fn field(name: &str, target: &str) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            target: target.to_string(),
            ..FieldSpec::default()
        }
    }

    fn mapper(specs: &[FieldSpec]) -> RowMapper {
        RowMapper::new(Arc::new(CompiledSchema::compile(specs, HEADER).expect("compile")))
    }

    fn string(doc: &Document, path: &str) -> Option<String> {
        match doc.get_path(path)? {
            Document::Scalar(Scalar::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    #[test]
    fn builds_nested_objects_along_target_path() {
        let mut country = field("country", "country.iso");
        country.capitalization = Some("upper".to_string());
        let rows = mapper(&[country, field("city", "city.names.en")]);

        let doc = rows
            .map(1, &["16777216", "16777471", "us", "Dallas", ""])
            .unwrap()
            .expect("document");
        assert_eq!(string(&doc, "country.iso").as_deref(), Some("US"));
        assert_eq!(string(&doc, "city.names.en").as_deref(), Some("Dallas"));
        assert!(doc.get("city").is_some_and(Document::is_object));
        assert!(doc.get_path("city.names").is_some_and(Document::is_object));
    }

    #[test]
    fn fields_sharing_a_prefix_reuse_the_object() {
        let rows = mapper(&[field("country", "geo.country"), field("city", "geo.city")]);
        let doc = rows
            .map(1, &["1", "2", "DE", "Berlin", ""])
            .unwrap()
            .expect("document");
        let geo = doc.get("geo").and_then(Document::as_object).expect("object");
        assert_eq!(geo.len(), 2);
    }

    #[test]
    fn critical_empty_omits_row_even_if_other_fields_are_invalid() {
        let mut anon = field("anon", "traits.anonymous");
        anon.value_type = Some("boolean".to_string());
        let mut city = field("city", "city");
        city.critical = true;
        let rows = mapper(&[anon, city]);

        assert_eq!(rows.map(3, &["1", "2", "US", "", "not-a-bool"]).unwrap(), None);
        let err = rows.map(4, &["1", "2", "US", "Austin", "not-a-bool"]).unwrap_err();
        assert_eq!(err.row(), 4);
        assert!(matches!(
            err,
            RowError::Field {
                source: FieldError::FieldConversion { .. },
                ..
            }
        ));
    }

    #[test]
    fn ignore_empty_only_drops_its_own_key() {
        let mut city = field("city", "location.city");
        city.ignore_empty = true;
        let rows = mapper(&[field("country", "location.country"), city]);

        let doc = rows.map(1, &["1", "2", "FR", "", ""]).unwrap().expect("document");
        assert_eq!(string(&doc, "location.country").as_deref(), Some("FR"));
        assert!(doc.get_path("location.city").is_none());
    }

    #[test]
    fn empty_string_without_flags_is_kept() {
        let rows = mapper(&[field("city", "city")]);
        let doc = rows.map(1, &["1", "2", "FR", "", ""]).unwrap().expect("document");
        assert_eq!(string(&doc, "city").as_deref(), Some(""));
    }

    #[test]
    fn short_rows_report_missing_value() {
        let rows = mapper(&[field("anon", "anon")]);
        let err = rows.map(7, &["1", "2", "FR"]).unwrap_err();
        assert_eq!(
            err,
            RowError::MissingValue {
                row: 7,
                field: "anon".to_string(),
                column: 4
            }
        );
    }

    #[test]
    fn empty_target_path_is_an_error() {
        let city = FieldMapper::new(&field("city", "city"), 3, Vec::new()).expect("mapper");
        let rows = RowMapper::new(Arc::new(CompiledSchema::from_fields(vec![city])));
        let err = rows.map(5, &["1", "2", "FR", "Paris", ""]).unwrap_err();
        assert_eq!(
            err,
            RowError::EmptyTarget {
                row: 5,
                field: "city".to_string()
            }
        );
    }

    #[test]
    fn descend_reports_scalar_in_the_way() {
        let mut root = Object::new();
        root.insert(Arc::from("geo"), Document::Scalar(Scalar::Bool(true)));
        let err = descend(&mut root, &[Arc::from("geo"), Arc::from("city")]).unwrap_err();
        assert_eq!(err.as_ref(), "geo");
    }

    #[test]
    fn range_bounds_are_decoded_as_ipv4() {
        let (start, end) = parse_range_bounds(1, &["16777216", "16777471"]).unwrap();
        assert_eq!(start, Ipv4Addr::new(1, 0, 0, 0));
        assert_eq!(end, Ipv4Addr::new(1, 0, 0, 255));

        let err = parse_range_bounds(2, &["4294967296", "1"]).unwrap_err();
        assert!(matches!(err, RowError::RangeBound { bound: RANGE_START_COLUMN, .. }));
        let err = parse_range_bounds(3, &["10", "9"]).unwrap_err();
        assert!(matches!(err, RowError::InvertedRange { row: 3, .. }));
        let err = parse_range_bounds(4, &["+16777216", "16777471"]).unwrap_err();
        assert!(matches!(err, RowError::RangeBound { row: 4, .. }));
    }
}
