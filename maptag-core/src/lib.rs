//! # maptag core - metric tag enrichment
//!
//! maptag attaches descriptive tags to metrics by joining a value already on
//! each metric against a lookup table built from an external command's output.
//!
//! - **Mapping**: command output is parsed line by line with a regular
//!   expression; every named capture group becomes a column, and columns stay
//!   row-aligned
//! - **Enricher**: finds a join key on each metric (a tag, a named namespace
//!   element, or a namespace value), looks it up in the reference column and
//!   copies the rest of the row onto the metric as tags
//! - **Cache**: the lookup table is rebuilt only when it is older than the
//!   configured TTL
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use maptag_core::{ConfigMap, MapTagPlugin, Metric, Namespace};
//! use maptag_core::clock::SystemClock;
//! use maptag_core::runner::MockRunner;
//!
//! let config: ConfigMap = serde_json::from_value(serde_json::json!({
//!     "command": "lookup-hosts",
//!     "addressingMode": "ns_name",
//!     "referenceName": "host",
//!     "referenceGroup": "host",
//!     "pattern": r"(?P<host>\S+)\s+(?P<rack>\S+)\s+(?P<dc>\S+)",
//!     "timeToLive": 60
//! })).unwrap();
//!
//! let runner = Arc::new(MockRunner::new("web01 r12 ams\nweb02 r14 fra\n"));
//! let mut plugin = MapTagPlugin::with_backends(runner, Arc::new(SystemClock::new()));
//!
//! let mut ns = Namespace::new(&["cpu"]).add_dynamic_element("host", "host name");
//! ns.get_mut(1).unwrap().value = "web02".to_string();
//!
//! let metrics = plugin.process(vec![Metric::new(ns)], &config).unwrap();
//! assert_eq!(metrics[0].tag("rack"), Some("r14"));
//! assert_eq!(metrics[0].tag("dc"), Some("fra"));
//! assert_eq!(metrics[0].tag("host"), None);
//! ```

pub mod clock;
pub mod config;
pub mod enrich;
pub mod error;
pub mod mapping;
pub mod metric;
pub mod plugin;
pub mod runner;
pub mod stream;

// Re-export main types
pub use config::{
    AddressingMode, ConfigIssue, ConfigMap, ConfigPolicy, ConfigSource, ConfigValue, MaptagConfig,
};
pub use enrich::{CacheState, EnrichOutcome, EnrichStats, Enricher};
pub use error::{ErrorCategory, ErrorDetail, ErrorResponse, MaptagError, Result};
pub use mapping::{Mapping, MappingBuilder};
pub use metric::{Metric, Namespace, NamespaceElement};
pub use plugin::{MapTagPlugin, ProcessFailure};
