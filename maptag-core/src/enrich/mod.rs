//! Enrichment engine
//!
//! Joins each metric against a cached lookup table and copies the matching
//! row onto the metric as tags.
//!
//! ## Flow
//!
//! ```text
//! process(batch)
//!   │
//!   ├─ cache Stale? ──yes──▶ refresh(): run command ─▶ build Mapping ─▶ swap in
//!   │                          (any failure aborts the batch untouched)
//!   ▼
//! for each metric
//!   locate key (tag / ns_name / ns_value)
//!     └─▶ row index in reference column
//!           └─▶ tag[group] = column[group][row] for every other group
//! ```
//!
//! The cache is only checked at the start of a batch. There is no background
//! timer, no retry and no timeout on the command.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use maptag_core::{AddressingMode, Enricher, MaptagConfig, Metric, Namespace};
//! use maptag_core::clock::SystemClock;
//! use maptag_core::runner::MockRunner;
//!
//! let config = MaptagConfig::new(
//!     "lookup",
//!     AddressingMode::Tag,
//!     "tagone",
//!     "first",
//!     r"(?P<first>\S+)\s+(?P<newtag>\S+)",
//! );
//! let runner = Arc::new(MockRunner::new("valueone somevalue"));
//! let mut enricher = Enricher::with_backends(config, runner, Arc::new(SystemClock::new()));
//!
//! let mut batch = vec![Metric::new(Namespace::new(&["test"])).with_tag("tagone", "valueone")];
//! enricher.process(&mut batch).unwrap();
//!
//! assert_eq!(batch[0].tag("newtag"), Some("somevalue"));
//! ```

mod addressing;
mod cache;

pub use addressing::locate_key;
pub use cache::{CacheState, MappingCache};

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::MaptagConfig;
use crate::error::Result;
use crate::mapping::{Mapping, MappingBuilder};
use crate::metric::Metric;
use crate::runner::{CommandRunner, ProcessRunner};

/// What happened to a single metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// The metric has no field to join on
    NoKey,
    /// A key was found but no row matches it
    Unmatched,
    /// A row matched and this many tags were set
    Enriched { tags: usize },
}

/// Summary of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichStats {
    /// Metrics in the batch
    pub records: usize,
    /// Metrics that received tags
    pub enriched: usize,
    /// Metrics with a key that matched no row
    pub unmatched: usize,
    /// Metrics with no key at all
    pub no_key: usize,
    /// Total tags written
    pub tags_set: usize,
    /// Whether the lookup table was rebuilt for this batch
    pub refreshed: bool,
}

impl EnrichStats {
    fn record(&mut self, outcome: EnrichOutcome) {
        self.records += 1;
        match outcome {
            EnrichOutcome::NoKey => self.no_key += 1,
            EnrichOutcome::Unmatched => self.unmatched += 1,
            EnrichOutcome::Enriched { tags } => {
                self.enriched += 1;
                self.tags_set += tags;
            }
        }
    }

    /// Add another batch's counts into this one
    pub fn absorb(&mut self, other: &EnrichStats) {
        self.records += other.records;
        self.enriched += other.enriched;
        self.unmatched += other.unmatched;
        self.no_key += other.no_key;
        self.tags_set += other.tags_set;
        self.refreshed |= other.refreshed;
    }
}

/// Tag enrichment engine with a TTL-cached lookup table
///
/// Not internally synchronized: `process` and `refresh` take `&mut self`.
/// Share an engine across threads by wrapping it in a `Mutex`.
pub struct Enricher {
    config: MaptagConfig,
    runner: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    cache: MappingCache,
}

impl Enricher {
    /// Create an engine that spawns real processes and uses the system clock
    pub fn new(config: MaptagConfig) -> Self {
        Self::with_backends(config, Arc::new(ProcessRunner::new()), Arc::new(SystemClock::new()))
    }

    /// Create with a custom command runner and clock
    pub fn with_backends(
        config: MaptagConfig,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            runner,
            clock,
            cache: MappingCache::new(),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &MaptagConfig {
        &self.config
    }

    /// Freshness of the cached mapping right now
    pub fn state(&self) -> CacheState {
        self.cache.state(self.clock.now(), self.config.ttl)
    }

    /// Snapshot of the cached mapping
    pub fn mapping(&self) -> Arc<Mapping> {
        self.cache.snapshot()
    }

    /// Instant of the last successful refresh
    pub fn last_refresh(&self) -> Option<Instant> {
        self.cache.refreshed_at()
    }

    /// Force the next batch to rebuild the lookup table
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Install a mapping without touching the refresh instant
    ///
    /// While the cache is fresh this mapping is used as-is; it is discarded
    /// by the next refresh.
    pub fn replace_mapping(&mut self, mapping: Mapping) {
        self.cache.replace(mapping);
    }

    /// Rebuild the lookup table from the command output
    ///
    /// On failure the previous mapping and refresh instant are kept, so the
    /// cache stays stale and the next batch tries again.
    pub fn refresh(&mut self) -> Result<()> {
        tracing::debug!(
            command = %self.config.command,
            runner = self.runner.name(),
            "refreshing lookup table"
        );

        let result = MappingBuilder::new(&self.config.pattern).and_then(|builder| {
            let output = self.runner.run(&self.config.command, &self.config.arguments)?;
            Ok(builder.build(&output))
        });

        match result {
            Ok(mapping) => {
                tracing::info!(
                    rows = mapping.row_count(),
                    groups = mapping.group_count(),
                    "lookup table refreshed"
                );
                self.cache.install(mapping, self.clock.now());
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "lookup table refresh failed");
                Err(e)
            }
        }
    }

    /// Enrich a batch of metrics in place
    ///
    /// Refreshes first if the cache is stale. A refresh failure returns the
    /// error before any metric is touched. Metrics without a key, or whose
    /// key matches no row, are left as they are.
    pub fn process(&mut self, metrics: &mut [Metric]) -> Result<EnrichStats> {
        let mut stats = EnrichStats::default();

        if self.state() == CacheState::Stale {
            self.refresh()?;
            stats.refreshed = true;
        }

        for metric in metrics.iter_mut() {
            stats.record(self.enrich(metric));
        }

        tracing::debug!(
            records = stats.records,
            enriched = stats.enriched,
            unmatched = stats.unmatched,
            no_key = stats.no_key,
            "batch enriched"
        );

        Ok(stats)
    }

    /// Enrich one metric against the cached mapping, without a freshness check
    pub fn enrich(&self, metric: &mut Metric) -> EnrichOutcome {
        let mapping = self.cache.mapping();
        let reference_group = self.config.reference_group.as_str();

        let Some(key) = locate_key(metric, self.config.addressing_mode, &self.config.reference_name)
        else {
            return EnrichOutcome::NoKey;
        };

        let Some(row) = mapping.row_index(reference_group, key) else {
            tracing::trace!(key, group = reference_group, "no matching row");
            return EnrichOutcome::Unmatched;
        };

        let new_tags: Vec<(String, String)> = mapping
            .row(row)
            .filter(|(group, _)| *group != reference_group)
            .map(|(group, value)| (group.to_string(), value.to_string()))
            .collect();

        let tags = new_tags.len();
        metric.tags.extend(new_tags);
        EnrichOutcome::Enriched { tags }
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("config", &self.config)
            .field("runner", &self.runner.name())
            .field("clock", &self.clock.name())
            .field("rows", &self.cache.mapping().row_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::clock::MockClock;
    use crate::config::AddressingMode;
    use crate::error::MaptagError;
    use crate::metric::Namespace;
    use crate::runner::MockRunner;

    const PATTERN: &str = r"(?P<first>\S+)\s+(?P<newtag>\S+)";

    fn engine(output: &str) -> (Enricher, Arc<MockRunner>, Arc<MockClock>) {
        let config = MaptagConfig::new("lookup", AddressingMode::Tag, "tagone", "first", PATTERN)
            .with_arguments(["-c", "table"])
            .with_ttl(Duration::from_secs(60));
        let runner = Arc::new(MockRunner::new(output));
        let clock = Arc::new(MockClock::new());
        let enricher = Enricher::with_backends(config, runner.clone(), clock.clone());
        (enricher, runner, clock)
    }

    fn tagged(value: &str) -> Metric {
        Metric::new(Namespace::new(&["test"])).with_tag("tagone", value)
    }

    #[test]
    fn test_first_batch_refreshes() {
        let (mut enricher, runner, _) = engine("valueone somevalue");
        assert_eq!(enricher.state(), CacheState::Stale);

        let mut batch = vec![tagged("valueone")];
        let stats = enricher.process(&mut batch).unwrap();

        assert!(stats.refreshed);
        assert_eq!(runner.call_count(), 1);
        assert_eq!(runner.calls()[0].args, vec!["-c", "table"]);
        assert_eq!(enricher.state(), CacheState::Fresh);
        assert_eq!(batch[0].tag("newtag"), Some("somevalue"));
    }

    #[test]
    fn test_reference_group_not_copied() {
        let (mut enricher, _, _) = engine("valueone somevalue");
        let mut batch = vec![tagged("valueone")];
        enricher.process(&mut batch).unwrap();

        assert!(batch[0].tags.get("first").is_none());
        assert_eq!(batch[0].tags.len(), 2);
    }

    #[test]
    fn test_existing_tag_overwritten() {
        let (mut enricher, _, _) = engine("valueone somevalue");
        let mut batch = vec![tagged("valueone").with_tag("newtag", "old")];
        enricher.process(&mut batch).unwrap();

        assert_eq!(batch[0].tag("newtag"), Some("somevalue"));
    }

    #[test]
    fn test_stats_count_outcomes() {
        let (mut enricher, _, _) = engine("valueone somevalue\nvaluetwo othervalue");
        let mut batch = vec![
            tagged("valueone"),
            tagged("valuetwo"),
            tagged("valuethree"),
            Metric::new(Namespace::new(&["untagged"])),
        ];

        let stats = enricher.process(&mut batch).unwrap();
        assert_eq!(
            stats,
            EnrichStats {
                records: 4,
                enriched: 2,
                unmatched: 1,
                no_key: 1,
                tags_set: 2,
                refreshed: true,
            }
        );
        assert_eq!(batch[1].tag("newtag"), Some("othervalue"));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_mapping() {
        let (mut enricher, runner, clock) = engine("valueone somevalue");
        enricher.process(&mut [tagged("valueone")]).unwrap();
        let refreshed_at = enricher.last_refresh();

        clock.advance(Duration::from_secs(61));
        runner.set_failure("exit status 1");

        let mut batch = vec![tagged("valueone")];
        let err = enricher.process(&mut batch).unwrap_err();

        assert!(matches!(err, MaptagError::CommandExecution { .. }));
        assert!(batch[0].tag("newtag").is_none());
        assert_eq!(enricher.last_refresh(), refreshed_at);
        assert_eq!(enricher.mapping().row_index("first", "valueone"), Some(0));
        assert_eq!(enricher.state(), CacheState::Stale);
    }

    #[test]
    fn test_bad_pattern_fails_before_running_command() {
        let config = MaptagConfig::new("lookup", AddressingMode::Tag, "tagone", "first", "(?P<x");
        let runner = Arc::new(MockRunner::new("valueone somevalue"));
        let mut enricher =
            Enricher::with_backends(config, runner.clone(), Arc::new(MockClock::new()));

        let err = enricher.process(&mut [tagged("valueone")]).unwrap_err();
        assert!(matches!(err, MaptagError::PatternCompile { .. }));
        assert_eq!(runner.call_count(), 0);
        assert!(enricher.last_refresh().is_none());
    }

    #[test]
    fn test_invalidate_forces_refresh() {
        let (mut enricher, runner, _) = engine("valueone somevalue");
        enricher.process(&mut [tagged("valueone")]).unwrap();

        enricher.invalidate();
        let stats = enricher.process(&mut [tagged("valueone")]).unwrap();

        assert!(stats.refreshed);
        assert_eq!(runner.call_count(), 2);
    }

    #[test]
    fn test_stats_absorb() {
        let mut totals = EnrichStats {
            records: 2,
            enriched: 1,
            refreshed: true,
            ..Default::default()
        };
        totals.absorb(&EnrichStats {
            records: 3,
            unmatched: 2,
            no_key: 1,
            ..Default::default()
        });

        assert_eq!(totals.records, 5);
        assert_eq!(totals.enriched, 1);
        assert_eq!(totals.unmatched, 2);
        assert_eq!(totals.no_key, 1);
        assert!(totals.refreshed);
    }

    #[test]
    fn test_enrich_without_mapping_is_unmatched() {
        let (enricher, runner, _) = engine("valueone somevalue");
        let mut metric = tagged("valueone");

        assert_eq!(enricher.enrich(&mut metric), EnrichOutcome::Unmatched);
        assert_eq!(runner.call_count(), 0);
    }
}
