//! Configuration for the enrichment engine
//!
//! Configuration arrives from the host as flat key/value pairs. This module
//! provides:
//! - [`ConfigSource`]: typed, per-key access to those pairs
//! - [`ConfigMap`]: a map-backed source that deserializes from JSON
//! - [`ConfigPolicy`]: the declarative schema of accepted keys
//! - [`MaptagConfig`]: the validated, immutable engine configuration
//!
//! Loading collects every missing or malformed key and reports them together.
//!
//! # Example
//!
//! ```rust
//! use maptag_core::config::{ConfigMap, MaptagConfig, AddressingMode};
//!
//! let source: ConfigMap = serde_json::from_str(r#"{
//!     "command": "/bin/sh",
//!     "arg0": "-c",
//!     "arg1": "cat /etc/hosts",
//!     "addressingMode": "tag",
//!     "referenceName": "host",
//!     "referenceGroup": "ip",
//!     "pattern": "(?P<ip>\\S+)\\s+(?P<hostname>\\S+)"
//! }"#).unwrap();
//!
//! let config = MaptagConfig::from_source(&source).unwrap();
//! assert_eq!(config.addressing_mode, AddressingMode::Tag);
//! assert_eq!(config.arguments, vec!["-c", "cat /etc/hosts"]);
//! ```

mod policy;

pub use policy::{ConfigPolicy, ConfigRule, RuleKind};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{MaptagError, Result};

/// Key holding the external program
pub const KEY_COMMAND: &str = "command";
/// Key holding the addressing mode
pub const KEY_ADDRESSING_MODE: &str = "addressingMode";
/// Key holding the tag name, namespace element name or value to resolve
pub const KEY_REFERENCE_NAME: &str = "referenceName";
/// Key holding the join-column group name
pub const KEY_REFERENCE_GROUP: &str = "referenceGroup";
/// Key holding the regular expression
pub const KEY_PATTERN: &str = "pattern";
/// Key holding the cache TTL in minutes
pub const KEY_TIME_TO_LIVE: &str = "timeToLive";

/// Maximum number of positional arguments (`arg0` .. `arg9`)
pub const MAX_ARGS: usize = 10;

/// Default cache TTL in minutes
pub const DEFAULT_TTL_MINUTES: i64 = 180;

/// Name of the positional argument key at `index`
pub fn arg_key(index: usize) -> String {
    format!("arg{}", index)
}

/// A problem with a single configuration key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// Required key is absent
    #[error("missing required key '{key}'")]
    Missing { key: String },

    /// Key is present with the wrong value type
    #[error("key '{key}' must be {expected}")]
    WrongType { key: String, expected: &'static str },

    /// Key has the right type but an unusable value
    #[error("key '{key}' is invalid: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigIssue {
    /// The configuration key this issue refers to
    pub fn key(&self) -> &str {
        match self {
            ConfigIssue::Missing { key }
            | ConfigIssue::WrongType { key, .. }
            | ConfigIssue::Invalid { key, .. } => key,
        }
    }
}

/// A raw configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Float(f64),
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

/// Typed, per-key access to host configuration
///
/// Implement this to feed configuration from a host framework. Each getter
/// fails with a [`ConfigIssue`] naming the key.
pub trait ConfigSource {
    /// Get a string value
    fn get_string(&self, key: &str) -> std::result::Result<String, ConfigIssue>;

    /// Get an integer value
    fn get_int(&self, key: &str) -> std::result::Result<i64, ConfigIssue>;

    /// Check whether a key is present at all
    fn contains(&self, key: &str) -> bool;
}

/// Map-backed configuration source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap {
    values: HashMap<String, ConfigValue>,
}

impl ConfigMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.values.remove(key)
    }

    /// Raw value lookup
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for ConfigMap {
    fn get_string(&self, key: &str) -> std::result::Result<String, ConfigIssue> {
        match self.values.get(key) {
            Some(ConfigValue::Str(s)) => Ok(s.clone()),
            Some(_) => Err(ConfigIssue::WrongType {
                key: key.to_string(),
                expected: "a string",
            }),
            None => Err(ConfigIssue::Missing { key: key.to_string() }),
        }
    }

    fn get_int(&self, key: &str) -> std::result::Result<i64, ConfigIssue> {
        match self.values.get(key) {
            Some(ConfigValue::Int(i)) => Ok(*i),
            Some(_) => Err(ConfigIssue::WrongType {
                key: key.to_string(),
                expected: "an integer",
            }),
            None => Err(ConfigIssue::Missing { key: key.to_string() }),
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Strategy for locating the join key on a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressingMode {
    /// Value of the tag named `reference_name`
    #[serde(rename = "tag")]
    Tag,
    /// Value of the namespace element named `reference_name`
    #[serde(rename = "ns_name")]
    NamespaceName,
    /// `reference_name` itself, if some namespace element has it as value
    #[serde(rename = "ns_value")]
    NamespaceValue,
}

impl AddressingMode {
    /// Configuration spelling of this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressingMode::Tag => "tag",
            AddressingMode::NamespaceName => "ns_name",
            AddressingMode::NamespaceValue => "ns_value",
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressingMode {
    type Err = MaptagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tag" => Ok(AddressingMode::Tag),
            "ns_name" => Ok(AddressingMode::NamespaceName),
            "ns_value" => Ok(AddressingMode::NamespaceValue),
            other => Err(MaptagError::UnknownAddressingMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Validated engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaptagConfig {
    /// External program producing the lookup table
    pub command: String,
    /// Positional arguments, at most [`MAX_ARGS`]
    pub arguments: Vec<String>,
    /// How the join key is located on each metric
    pub addressing_mode: AddressingMode,
    /// Tag name, namespace element name or value, depending on mode
    pub reference_name: String,
    /// Capture group used as the join column
    pub reference_group: String,
    /// Regular expression with named capture groups
    pub pattern: String,
    /// Cache validity window
    pub ttl: Duration,
}

impl MaptagConfig {
    /// Create a configuration with no arguments and the default TTL
    pub fn new(
        command: &str,
        addressing_mode: AddressingMode,
        reference_name: &str,
        reference_group: &str,
        pattern: &str,
    ) -> Self {
        Self {
            command: command.to_string(),
            arguments: Vec::new(),
            addressing_mode,
            reference_name: reference_name.to_string(),
            reference_group: reference_group.to_string(),
            pattern: pattern.to_string(),
            ttl: ttl_from_minutes(DEFAULT_TTL_MINUTES),
        }
    }

    /// Set command arguments (extra arguments beyond [`MAX_ARGS`] are dropped)
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).take(MAX_ARGS).collect();
        self
    }

    /// Set the cache TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Load and validate from a configuration source
    ///
    /// Missing and malformed keys are collected into one
    /// [`MaptagError::Configuration`]. Only once every key reads cleanly is the
    /// addressing mode parsed, so an unknown mode surfaces as
    /// [`MaptagError::UnknownAddressingMode`].
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let mut issues = ConfigPolicy::maptag().validate(source);

        let ttl_minutes = source
            .get_int(KEY_TIME_TO_LIVE)
            .unwrap_or(DEFAULT_TTL_MINUTES);
        if ttl_minutes < 0 {
            issues.push(ConfigIssue::Invalid {
                key: KEY_TIME_TO_LIVE.to_string(),
                reason: format!("must not be negative, got {}", ttl_minutes),
            });
        }

        if !issues.is_empty() {
            return Err(MaptagError::Configuration { issues });
        }

        let string = |key: &str| source.get_string(key).map_err(MaptagError::config);

        Ok(Self {
            command: string(KEY_COMMAND)?,
            arguments: (0..MAX_ARGS)
                .filter_map(|i| source.get_string(&arg_key(i)).ok())
                .collect(),
            addressing_mode: string(KEY_ADDRESSING_MODE)?.parse()?,
            reference_name: string(KEY_REFERENCE_NAME)?,
            reference_group: string(KEY_REFERENCE_GROUP)?,
            pattern: string(KEY_PATTERN)?,
            ttl: ttl_from_minutes(ttl_minutes),
        })
    }
}

/// Saturates at the largest representable duration
fn ttl_from_minutes(minutes: i64) -> Duration {
    Duration::from_secs((minutes.max(0) as u64).saturating_mul(60))
}
