//! Host adapter
//!
//! Collector frameworks hand a processor plugin a batch of metrics together
//! with the plugin's raw configuration on every call, and expect the batch
//! back. [`MapTagPlugin`] adapts the [`Enricher`] to that shape:
//!
//! - the configuration is loaded from the first call that provides a valid
//!   one, then kept for the life of the plugin
//! - a failed call hands the original metrics back inside [`ProcessFailure`]

use std::sync::Arc;

use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigPolicy, ConfigSource, MaptagConfig};
use crate::enrich::Enricher;
use crate::error::MaptagError;
use crate::metric::Metric;
use crate::runner::{CommandRunner, ProcessRunner};

/// A failed batch: the error plus the untouched metrics
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ProcessFailure {
    /// Metrics exactly as they were passed in
    pub metrics: Vec<Metric>,
    /// Why the batch failed
    #[source]
    pub error: MaptagError,
}

/// Processor plugin wrapping an [`Enricher`]
pub struct MapTagPlugin {
    runner: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    enricher: Option<Enricher>,
}

impl MapTagPlugin {
    /// Create a plugin that spawns real processes
    pub fn new() -> Self {
        Self::with_backends(Arc::new(ProcessRunner::new()), Arc::new(SystemClock::new()))
    }

    /// Create with a custom command runner and clock
    pub fn with_backends(runner: Arc<dyn CommandRunner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            runner,
            clock,
            enricher: None,
        }
    }

    /// Declarative schema of accepted configuration keys
    pub fn config_policy(&self) -> ConfigPolicy {
        ConfigPolicy::maptag()
    }

    /// The engine, once a configuration has been loaded
    pub fn enricher(&self) -> Option<&Enricher> {
        self.enricher.as_ref()
    }

    /// Mutable access to the engine, once a configuration has been loaded
    pub fn enricher_mut(&mut self) -> Option<&mut Enricher> {
        self.enricher.as_mut()
    }

    /// Enrich a batch
    ///
    /// `source` is only read until a configuration loads successfully; later
    /// calls reuse that configuration.
    pub fn process(
        &mut self,
        mut metrics: Vec<Metric>,
        source: &dyn ConfigSource,
    ) -> Result<Vec<Metric>, ProcessFailure> {
        let enricher = match self.configured(source) {
            Ok(enricher) => enricher,
            Err(error) => return Err(ProcessFailure { metrics, error }),
        };

        match enricher.process(&mut metrics) {
            Ok(_) => Ok(metrics),
            Err(error) => Err(ProcessFailure { metrics, error }),
        }
    }

    fn configured(&mut self, source: &dyn ConfigSource) -> Result<&mut Enricher, MaptagError> {
        let enricher = match self.enricher.take() {
            Some(enricher) => enricher,
            None => {
                let config = MaptagConfig::from_source(source).inspect_err(|e| {
                    tracing::warn!(error = %e, "rejecting plugin configuration");
                })?;
                tracing::info!(
                    command = %config.command,
                    mode = %config.addressing_mode,
                    ttl_secs = config.ttl.as_secs(),
                    "plugin configured"
                );
                Enricher::with_backends(config, Arc::clone(&self.runner), Arc::clone(&self.clock))
            }
        };
        Ok(self.enricher.insert(enricher))
    }
}

impl Default for MapTagPlugin {
    fn default() -> Self {
        Self::new()
    }
}
