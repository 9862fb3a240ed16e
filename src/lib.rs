pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod fieldmap;
pub mod io_utils;
pub mod range_db;
pub mod rows;
pub mod schema;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv2rangedb", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => convert::execute(&args),
        Commands::Check(args) => convert::check(&args),
        Commands::Lookup(args) => handle_lookup(&args),
    }
}

fn handle_lookup(args: &cli::LookupArgs) -> Result<()> {
    let database = range_db::RangeDatabase::load(&args.database)
        .with_context(|| format!("Loading database {:?}", args.database))?;
    info!(
        "Loaded '{}' with {} range(s) from {:?}",
        database.database_type(),
        database.ranges().len(),
        args.database
    );
    match database.lookup(args.address) {
        Some(document) => println!("{document}"),
        None => println!("No range contains {}", args.address),
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
