//! Newline-delimited JSON streaming
//!
//! The pieces of the `maptag` binary that do real work: loading a JSON
//! configuration file, enriching a stream of metrics batch by batch, and
//! dumping the lookup table.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::config::{ConfigMap, MaptagConfig};
use crate::enrich::{EnrichStats, Enricher};
use crate::error::Result;
use crate::metric::Metric;

/// Load a configuration from a JSON file holding a flat key/value map
pub fn load_config(path: &Path) -> Result<MaptagConfig> {
    tracing::debug!(path = %path.display(), "loading configuration");
    let content = std::fs::read_to_string(path)?;
    let source: ConfigMap = serde_json::from_str(&content)?;
    MaptagConfig::from_source(&source)
}

/// Enrich newline-delimited JSON metrics from `reader` into `writer`
///
/// Metrics are processed in batches of `batch_size` (at least one), so the
/// cache is checked once per batch. Blank lines are skipped. The first
/// unparsable line or failed batch stops the stream; batches already written
/// stay written.
pub fn enrich_stream<R: BufRead, W: Write>(
    enricher: &mut Enricher,
    reader: R,
    mut writer: W,
    batch_size: usize,
) -> Result<EnrichStats> {
    let batch_size = batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut totals = EnrichStats::default();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        batch.push(serde_json::from_str::<Metric>(&line)?);
        if batch.len() == batch_size {
            totals.absorb(&flush_batch(enricher, &mut batch, &mut writer)?);
        }
    }
    totals.absorb(&flush_batch(enricher, &mut batch, &mut writer)?);

    writer.flush()?;
    Ok(totals)
}

fn flush_batch(
    enricher: &mut Enricher,
    batch: &mut Vec<Metric>,
    writer: &mut impl Write,
) -> Result<EnrichStats> {
    if batch.is_empty() {
        return Ok(EnrichStats::default());
    }
    let stats = enricher.process(batch)?;
    for metric in batch.drain(..) {
        serde_json::to_writer(&mut *writer, &metric)?;
        writer.write_all(b"\n")?;
    }
    Ok(stats)
}

/// Refresh once and write the resulting lookup table as pretty JSON
pub fn dump_mapping<W: Write>(enricher: &mut Enricher, mut writer: W) -> Result<()> {
    enricher.refresh()?;
    serde_json::to_writer_pretty(&mut writer, &*enricher.mapping())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
