mod common;

use std::net::Ipv4Addr;

use csv2rangedb::{
    config::Config,
    convert::{ConversionSummary, Converter},
    error::{FieldError, RowError, SchemaError},
    io_utils::RowSource,
    range_db::RangeDatabaseBuilder,
};
use encoding_rs::UTF_8;
use serde_json::json;

use common::{BLOCKS_CSV, CONFIG_YAML};

fn convert(config: &Config, csv: &str) -> anyhow::Result<(ConversionSummary, RangeDatabaseBuilder)> {
    let mut source = RowSource::from_reader(csv.as_bytes(), b',', UTF_8)?;
    let converter = Converter::new(config, source.header())?;
    let mut builder = RangeDatabaseBuilder::new(config.database_type.clone(), config.record_size);
    let summary = converter.run(&mut source, &mut builder)?;
    Ok((summary, builder))
}

#[test]
fn single_field_row_becomes_nested_document() {
    let config = Config::from_yaml_str(
        "fields:\n  - name: country\n    target: country.iso\n    type: string\n    capitalization: upper\n",
    )
    .expect("config");
    let converter =
        Converter::new(&config, &["start_ip_int", "end_ip_int", "country"]).expect("compile");
    let mut builder = RangeDatabaseBuilder::new("Test", 28);

    let bounds = converter
        .convert_row(1, &["16777216", "16777471", "us"], &mut builder)
        .expect("convert row");
    assert_eq!(
        bounds,
        Some((Ipv4Addr::from(16777216u32), Ipv4Addr::from(16777471u32)))
    );

    let database = builder.finish();
    let entry = database.ranges()[0];
    assert_eq!(entry.start, Ipv4Addr::new(1, 0, 0, 0));
    assert_eq!(entry.end, Ipv4Addr::new(1, 0, 0, 255));
    assert_eq!(
        database.document(&entry).map(|doc| doc.to_json()),
        Some(json!({"country": {"iso": "US"}}))
    );
}

#[test]
fn full_config_shapes_documents() {
    let config = Config::from_yaml_str(CONFIG_YAML).expect("config");
    let (summary, builder) = convert(&config, BLOCKS_CSV).expect("convert");
    assert_eq!(
        summary,
        ConversionSummary {
            rows_read: 4,
            rows_omitted: 0,
            ranges_inserted: 4,
            distinct_documents: Some(4),
        }
    );

    let database = builder.finish();
    assert_eq!(database.database_type(), "Test-City");
    let lookup = |ip: &str| {
        database
            .lookup(ip.parse().unwrap())
            .map(|doc| doc.to_json())
            .expect("range present")
    };
    assert_eq!(
        lookup("1.0.0.1"),
        json!({
            "city": {"names": {"en": "South Brisbane"}},
            "country": {"iso_code": "AU"},
            "location": {"accuracy_radius": 1000}
        })
    );
    assert_eq!(
        lookup("1.0.1.1"),
        json!({
            "country": {"iso_code": "CN"},
            "location": {"accuracy_radius": 50}
        })
    );
    assert_eq!(
        lookup("1.0.4.1"),
        json!({
            "city": {"names": {"en": "Melbourne"}},
            "country": {"iso_code": "AU"},
            "location": {"accuracy_radius": 20},
            "traits": {"is_anonymous_proxy": true}
        })
    );
    assert!(
        database
            .lookup("1.0.8.1".parse().unwrap())
            .and_then(|doc| doc.get("traits"))
            .is_none()
    );
}

#[test]
fn critical_empty_rows_are_counted_as_omitted() {
    let config = Config::from_yaml_str(CONFIG_YAML).expect("config");
    let csv = format!("{BLOCKS_CSV}16781312,16781567,,tokyo,0,5\n");
    let (summary, builder) = convert(&config, &csv).expect("convert");
    assert_eq!(summary.rows_read, 5);
    assert_eq!(summary.rows_omitted, 1);
    assert_eq!(builder.range_count(), 4);
}

#[test]
fn repeated_documents_collapse_through_the_cache() {
    let config = Config::from_yaml_str(
        "useValueCache: true\nfields:\n  - name: country\n    target: country.iso\n    capitalization: upper\n",
    )
    .expect("config");
    let mut csv = String::from("start_ip_int,end_ip_int,country\n");
    for block in 0..10_000u32 {
        let start = block * 256;
        csv.push_str(&format!("{start},{},us\n", start + 255));
    }

    let (summary, builder) = convert(&config, &csv).expect("convert");
    assert_eq!(summary.ranges_inserted, 10_000);
    assert_eq!(summary.distinct_documents, Some(1));
    assert_eq!(builder.document_count(), 1);
}

#[test]
fn without_cache_every_range_owns_its_document() {
    let config = Config::from_yaml_str(
        "fields:\n  - name: country\n    target: country.iso\n",
    )
    .expect("config");
    let csv = "start_ip_int,end_ip_int,country\n0,255,US\n256,511,US\n";
    let (summary, builder) = convert(&config, csv).expect("convert");
    assert_eq!(summary.distinct_documents, None);
    assert_eq!(builder.document_count(), 2);
}

#[test]
fn conversion_errors_report_row_and_field() {
    let config = Config::from_yaml_str(CONFIG_YAML).expect("config");
    let csv = "\
start_ip_int,end_ip_int,country_iso_code,city_name,is_anonymous_proxy,accuracy_radius
0,255,us,austin,0,10
256,511,us,austin,0,far
";
    let err = convert(&config, csv).unwrap_err();
    let row_error = err.downcast_ref::<RowError>().expect("row error");
    assert_eq!(row_error.row(), 2);
    match row_error {
        RowError::Field { source, .. } => {
            assert_eq!(source.field(), "accuracy_radius");
            assert_eq!(source.raw(), "far");
            assert!(matches!(source, FieldError::FieldConversion { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn malformed_range_bounds_abort_the_run() {
    let config = Config::from_yaml_str(CONFIG_YAML).expect("config");
    let csv = "\
start_ip_int,end_ip_int,country_iso_code,city_name,is_anonymous_proxy,accuracy_radius
0,1.0.0.0,us,austin,0,10
";
    let err = convert(&config, csv).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RowError>(),
        Some(RowError::RangeBound { row: 1, .. })
    ));
}

#[test]
fn conflicting_targets_fail_before_any_row() {
    let config = Config::from_yaml_str(
        "fields:\n  - name: country\n    target: geo\n  - name: city\n    target: geo.city\n",
    )
    .expect("config");
    let err = Converter::new(&config, &["start_ip_int", "end_ip_int", "country", "city"])
        .err()
        .expect("conflict");
    assert!(matches!(err, SchemaError::TargetConflict { .. }));
}
