//! CSV input: delimiter and encoding resolution plus a row-at-a-time reader.
//!
//! [`RowSource`] reads the header eagerly and then yields one decoded row at
//! a time, reusing a single byte buffer, so the converter never holds more
//! than the current row. The `-` path reads from standard input.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::ByteRecord;
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub struct RowSource<R: Read> {
    reader: csv::Reader<R>,
    encoding: &'static Encoding,
    header: Vec<String>,
    record: ByteRecord,
    rows_read: usize,
}

impl RowSource<Box<dyn Read>> {
    pub fn open(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let reader: Box<dyn Read> = if is_dash(path) {
            Box::new(std::io::stdin().lock())
        } else {
            Box::new(BufReader::new(
                File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
            ))
        };
        Self::from_reader(reader, delimiter, encoding)
    }
}

impl<R: Read> RowSource<R> {
    pub fn from_reader(reader: R, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .delimiter(delimiter)
            .double_quote(true)
            .flexible(false);
        let mut reader = builder.from_reader(reader);
        let header = reader.byte_headers().context("Reading CSV header")?.clone();
        let header = decode_record(&header, encoding).context("Decoding CSV header")?;
        Ok(Self {
            reader,
            encoding,
            header,
            record: ByteRecord::new(),
            rows_read: 0,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows returned so far, which is also the 1-based number
    /// of the last returned row.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        let row_number = self.rows_read + 1;
        let has_row = self
            .reader
            .read_byte_record(&mut self.record)
            .with_context(|| format!("Reading CSV row {row_number}"))?;
        if !has_row {
            return Ok(None);
        }
        self.rows_read = row_number;
        let decoded = decode_record(&self.record, self.encoding)
            .with_context(|| format!("Decoding CSV row {row_number}"))?;
        Ok(Some(decoded))
    }
}
