use std::{net::Ipv4Addr, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert IPv4 range CSV files into range-keyed document databases", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a range CSV file into a database using a YAML field config
    Convert(ConvertArgs),
    /// Validate a YAML field config against the header of a CSV file
    Check(CheckArgs),
    /// Print the document stored for an IPv4 address
    Lookup(LookupArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input CSV file whose first two columns are start_ip_int and end_ip_int
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination database file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// YAML config describing the field mapping
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Output format of the database file
    #[arg(long, value_enum, default_value = "binary")]
    pub format: OutputFormat,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Input CSV file providing the header
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML config describing the field mapping
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Binary database file produced by `convert`
    #[arg(short = 'd', long = "database")]
    pub database: PathBuf,
    /// IPv4 address to look up
    pub address: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Versioned bincode encoding, readable by `lookup`
    #[default]
    Binary,
    /// One JSON object per range
    Jsonl,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
