//! Range-keyed document database: the builder the converter feeds and the
//! artifact it writes.
//!
//! [`RangeDatabaseBuilder`] accepts `(start, end, document)` triples in any
//! order. Documents are stored once per shared instance, so ranges that went
//! through the value cache point at a single stored document. Ranges are kept
//! in insertion order; nothing is sorted, merged or checked for overlap.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    net::Ipv4Addr,
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{cli::OutputFormat, document::Document};

const DATABASE_VERSION: u32 = 1;
const IP_VERSION: u8 = 4;

/// Receives one mapped range at a time.
pub trait RangeSink {
    fn insert_range(&mut self, start: Ipv4Addr, end: Ipv4Addr, document: Arc<Document>)
    -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub document: u32,
}

impl RangeEntry {
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.start <= address && address <= self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeDatabase {
    version: u32,
    database_type: String,
    record_size: u8,
    ip_version: u8,
    documents: Vec<Arc<Document>>,
    ranges: Vec<RangeEntry>,
}

impl RangeDatabase {
    pub fn database_type(&self) -> &str {
        &self.database_type
    }

    pub fn record_size(&self) -> u8 {
        self.record_size
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn ranges(&self) -> &[RangeEntry] {
        &self.ranges
    }

    pub fn document(&self, entry: &RangeEntry) -> Option<&Document> {
        self.documents
            .get(entry.document as usize)
            .map(|doc| doc.as_ref())
    }

    /// The document of the most recently inserted range containing `address`.
    pub fn lookup(&self, address: Ipv4Addr) -> Option<&Document> {
        self.ranges
            .iter()
            .rev()
            .find(|entry| entry.contains(address))
            .and_then(|entry| self.document(entry))
    }

    pub fn save(&self, path: &Path, format: OutputFormat) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating database file {path:?}"))?;
        let mut writer = BufWriter::new(file);
        match format {
            OutputFormat::Binary => self.write_binary(&mut writer)?,
            OutputFormat::Jsonl => self.write_jsonl(&mut writer)?,
        }
        writer
            .flush()
            .with_context(|| format!("Flushing database file {path:?}"))
    }

    pub fn write_binary<W: Write>(&self, writer: &mut W) -> Result<()> {
        bincode::serde::encode_into_std_write(self, writer, bincode::config::standard())
            .context("Writing binary database")?;
        Ok(())
    }

    pub fn write_jsonl<W: Write>(&self, writer: &mut W) -> Result<()> {
        for entry in &self.ranges {
            let data = self
                .document(entry)
                .map(Document::to_json)
                .ok_or_else(|| anyhow!("Range references missing document {}", entry.document))?;
            let line = json!({
                "start": entry.start.to_string(),
                "end": entry.end.to_string(),
                "data": data,
            });
            writeln!(writer, "{line}").context("Writing JSON lines database")?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening database file {path:?}"))?;
        Self::read_binary(&mut BufReader::new(file))
            .with_context(|| format!("Reading database file {path:?}"))
    }

    pub fn read_binary<R: Read>(reader: &mut R) -> Result<Self> {
        let database: RangeDatabase =
            bincode::serde::decode_from_std_read(reader, bincode::config::standard())
                .context("Decoding binary database")?;
        if database.version != DATABASE_VERSION {
            return Err(anyhow!(
                "Unsupported database version {} (expected {DATABASE_VERSION})",
                database.version
            ));
        }
        Ok(database)
    }
}

#[derive(Debug)]
pub struct RangeDatabaseBuilder {
    database_type: String,
    record_size: u8,
    documents: Vec<Arc<Document>>,
    // address of a stored document -> its index in `documents`
    positions: HashMap<usize, u32>,
    ranges: Vec<RangeEntry>,
}

impl RangeDatabaseBuilder {
    pub fn new(database_type: impl Into<String>, record_size: u8) -> Self {
        Self {
            database_type: database_type.into(),
            record_size,
            documents: Vec::new(),
            positions: HashMap::new(),
            ranges: Vec::new(),
        }
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn finish(self) -> RangeDatabase {
        RangeDatabase {
            version: DATABASE_VERSION,
            database_type: self.database_type,
            record_size: self.record_size,
            ip_version: IP_VERSION,
            documents: self.documents,
            ranges: self.ranges,
        }
    }

    fn document_index(&mut self, document: Arc<Document>) -> Result<u32> {
        // `documents` keeps every stored Arc alive, so addresses stay unique.
        let address = Arc::as_ptr(&document) as usize;
        if let Some(&index) = self.positions.get(&address) {
            return Ok(index);
        }
        let index = u32::try_from(self.documents.len())
            .map_err(|_| anyhow!("Too many distinct documents for one database"))?;
        self.documents.push(document);
        self.positions.insert(address, index);
        Ok(index)
    }
}

impl RangeSink for RangeDatabaseBuilder {
    fn insert_range(
        &mut self,
        start: Ipv4Addr,
        end: Ipv4Addr,
        document: Arc<Document>,
    ) -> Result<()> {
        let document = self.document_index(document)?;
        self.ranges.push(RangeEntry {
            start,
            end,
            document,
        });
        Ok(())
    }
}
