//! Declarative configuration schema
//!
//! Hosts that register plugins up front (before any configuration exists)
//! need to know which keys are accepted, their types and defaults. The
//! policy is plain data and serializes to JSON.

use serde::{Deserialize, Serialize};

use super::{
    arg_key, ConfigSource, ConfigValue, ConfigIssue, DEFAULT_TTL_MINUTES, KEY_ADDRESSING_MODE,
    KEY_COMMAND, KEY_PATTERN, KEY_REFERENCE_GROUP, KEY_REFERENCE_NAME, KEY_TIME_TO_LIVE, MAX_ARGS,
};

/// Value type accepted by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    String,
    Integer,
}

/// A single accepted configuration key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRule {
    /// Configuration key
    pub key: String,

    /// Expected value type
    pub kind: RuleKind,

    /// Whether the key must be present
    pub required: bool,

    /// Value used when the key is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,
}

impl ConfigRule {
    fn string(key: &str, required: bool) -> Self {
        Self {
            key: key.to_string(),
            kind: RuleKind::String,
            required,
            default: None,
        }
    }

    fn integer(key: &str, default: i64) -> Self {
        Self {
            key: key.to_string(),
            kind: RuleKind::Integer,
            required: false,
            default: Some(ConfigValue::Int(default)),
        }
    }

    /// Check one source against this rule
    pub fn check(&self, source: &dyn ConfigSource) -> Option<ConfigIssue> {
        if !source.contains(&self.key) {
            return self.required.then(|| ConfigIssue::Missing { key: self.key.clone() });
        }
        let checked = match self.kind {
            RuleKind::String => source.get_string(&self.key).map(|_| ()),
            RuleKind::Integer => source.get_int(&self.key).map(|_| ()),
        };
        checked.err()
    }
}

/// The full set of accepted configuration keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPolicy {
    /// Rules, one per accepted key
    pub rules: Vec<ConfigRule>,
}

impl ConfigPolicy {
    /// The policy for the enrichment engine
    pub fn maptag() -> Self {
        let mut rules = vec![
            ConfigRule::string(KEY_COMMAND, true),
            ConfigRule::string(KEY_ADDRESSING_MODE, true),
            ConfigRule::string(KEY_REFERENCE_NAME, true),
            ConfigRule::string(KEY_REFERENCE_GROUP, true),
            ConfigRule::string(KEY_PATTERN, true),
            ConfigRule::integer(KEY_TIME_TO_LIVE, DEFAULT_TTL_MINUTES),
        ];
        rules.extend((0..MAX_ARGS).map(|i| ConfigRule::string(&arg_key(i), false)));
        Self { rules }
    }

    /// Look up the rule for a key
    pub fn rule(&self, key: &str) -> Option<&ConfigRule> {
        self.rules.iter().find(|r| r.key == key)
    }

    /// Keys that must be present
    pub fn required_keys(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.required)
            .map(|r| r.key.as_str())
            .collect()
    }

    /// Check a source against every rule, returning all issues found
    pub fn validate(&self, source: &dyn ConfigSource) -> Vec<ConfigIssue> {
        self.rules.iter().filter_map(|r| r.check(source)).collect()
    }
}

impl Default for ConfigPolicy {
    fn default() -> Self {
        Self::maptag()
    }
}
