//! maptag CLI - enrich a stream of metrics
//!
//! Reads newline-delimited JSON metrics, tags them from the configured lookup
//! command and writes them back out as newline-delimited JSON.
//!
//! Usage:
//!     maptag --config maptag.json < metrics.jsonl > enriched.jsonl
//!     maptag --config maptag.json --input metrics.jsonl --batch-size 500
//!     maptag --config maptag.json --dump-mapping
//!     maptag --schema

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use maptag_core::{stream, ConfigIssue, ConfigPolicy, Enricher, MaptagError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "maptag")]
#[command(about = "Tag metrics from an external lookup command")]
#[command(version)]
struct Args {
    /// Path to the JSON configuration (flat key/value map)
    #[arg(short, long, required_unless_present = "schema")]
    config: Option<PathBuf>,

    /// Read metrics from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Metrics per batch; the cache TTL is checked once per batch
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Run the lookup command once and print the resulting table
    #[arg(long)]
    dump_mapping: bool,

    /// Print the configuration schema and exit
    #[arg(long)]
    schema: bool,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean JSON
    let default_filter = if args.verbose { "maptag_core=debug" } else { "maptag_core=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if args.schema {
        println!("{}", serde_json::to_string_pretty(&ConfigPolicy::maptag())?);
        return Ok(());
    }

    let config_path = args.config.as_deref().ok_or_else(|| {
        MaptagError::config(ConfigIssue::Missing {
            key: "--config".to_string(),
        })
    })?;
    let mut enricher = Enricher::new(stream::load_config(config_path)?);

    if args.dump_mapping {
        return stream::dump_mapping(&mut enricher, io::stdout().lock());
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let out = BufWriter::new(io::stdout().lock());

    let stats = stream::enrich_stream(&mut enricher, reader, out, args.batch_size)?;
    tracing::info!(
        records = stats.records,
        enriched = stats.enriched,
        unmatched = stats.unmatched,
        no_key = stats.no_key,
        "stream finished"
    );
    Ok(())
}
