//! The sequential conversion pipeline.
//!
//! Header → [`CompiledSchema`] once, then per row: range bounds →
//! [`RowMapper`] → optional [`ValueCache`] → [`RangeSink`]. Any error aborts
//! the run, and the output file is only created after every row succeeded.

use std::{io::Read, net::Ipv4Addr, sync::Arc};

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::{
    cache::ValueCache,
    cli::{CheckArgs, ConvertArgs},
    config::Config,
    error::SchemaError,
    io_utils::{self, RowSource},
    range_db::{RangeDatabaseBuilder, RangeSink},
    rows::{RowMapper, parse_range_bounds},
    schema::CompiledSchema,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub rows_read: usize,
    pub rows_omitted: usize,
    pub ranges_inserted: usize,
    /// Distinct documents retained by the value cache, when enabled.
    pub distinct_documents: Option<usize>,
}

pub struct Converter {
    mapper: RowMapper,
    cache: Option<ValueCache>,
}

impl Converter {
    pub fn new<S: AsRef<str>>(config: &Config, header: &[S]) -> Result<Self, SchemaError> {
        let schema = CompiledSchema::compile(&config.fields, header)?;
        Ok(Self {
            mapper: RowMapper::new(Arc::new(schema)),
            cache: config.use_value_cache.then(ValueCache::new),
        })
    }

    pub fn schema(&self) -> &CompiledSchema {
        self.mapper.schema()
    }

    pub fn cache(&self) -> Option<&ValueCache> {
        self.cache.as_ref()
    }

    /// Maps one data row and forwards it to `sink`. Returns the inserted
    /// range, or `None` when a critical field omitted the row.
    pub fn convert_row<S: AsRef<str>, K: RangeSink>(
        &self,
        row_number: usize,
        row: &[S],
        sink: &mut K,
    ) -> Result<Option<(Ipv4Addr, Ipv4Addr)>> {
        let (start, end) = parse_range_bounds(row_number, row)?;
        let Some(document) = self.mapper.map(row_number, row)? else {
            return Ok(None);
        };
        let document = match &self.cache {
            Some(cache) => cache.store(document),
            None => Arc::new(document),
        };
        sink.insert_range(start, end, document)
            .with_context(|| format!("Inserting range {start}-{end} from row {row_number}"))?;
        Ok(Some((start, end)))
    }

    pub fn run<R: Read, K: RangeSink>(
        &self,
        source: &mut RowSource<R>,
        sink: &mut K,
    ) -> Result<ConversionSummary> {
        let mut summary = ConversionSummary::default();
        while let Some(row) = source.next_row()? {
            let row_number = source.rows_read();
            summary.rows_read = row_number;
            match self.convert_row(row_number, &row, sink)? {
                Some(_) => summary.ranges_inserted += 1,
                None => summary.rows_omitted += 1,
            }
        }
        summary.distinct_documents = self.cache.as_ref().map(ValueCache::len);
        Ok(summary)
    }
}

pub fn execute(args: &ConvertArgs) -> Result<()> {
    if !io_utils::is_dash(&args.input) && args.input == args.output {
        return Err(anyhow!(
            "Output file must be different from the input file ({:?})",
            args.output
        ));
    }
    let config = Config::load(&args.config)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Converting '{}' -> '{}' (delimiter '{}', format {:?}, value cache {})",
        args.input.display(),
        args.output.display(),
        crate::printable_delimiter(delimiter),
        args.format,
        if config.use_value_cache { "on" } else { "off" }
    );

    let mut source = RowSource::open(&args.input, delimiter, encoding)?;
    let converter = Converter::new(&config, source.header())
        .with_context(|| format!("Compiling field config against {:?}", args.input))?;
    let mut builder = RangeDatabaseBuilder::new(config.database_type.clone(), config.record_size);
    let summary = converter
        .run(&mut source, &mut builder)
        .with_context(|| format!("Converting {:?}", args.input))?;
    if let Some(cache) = converter.cache() {
        let stats = cache.stats();
        debug!(
            "Value cache: {} store(s), {} hit(s), {} distinct document(s)",
            stats.stores, stats.hits, stats.distinct
        );
    }

    let database = builder.finish();
    info!(
        "Writing {} range(s) and {} document(s) to {:?}",
        database.ranges().len(),
        database.documents().len(),
        args.output
    );
    database.save(&args.output, args.format)?;
    info!(
        "Converted {} row(s): {} range(s) written, {} row(s) omitted",
        summary.rows_read, summary.ranges_inserted, summary.rows_omitted
    );
    Ok(())
}

pub fn check(args: &CheckArgs) -> Result<()> {
    let config = Config::load(&args.config)?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = RowSource::open(&args.input, delimiter, encoding)?;
    let schema = CompiledSchema::compile(&config.fields, source.header())
        .with_context(|| format!("Compiling field config against {:?}", args.input))?;
    for field in schema.fields() {
        println!(
            "{} (column {}) -> {} [{}]",
            field.name(),
            field.column() + 1,
            field.target(),
            field.value_type()
        );
    }
    info!(
        "Config {:?} is valid for {:?}: {} field(s)",
        args.config,
        args.input,
        schema.fields().len()
    );
    Ok(())
}
