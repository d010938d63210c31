//! Lookup table built from command output
//!
//! A [`Mapping`] is a set of parallel columns, one per named capture group.
//! Row `i` of every column came from the same matching input line, so a row
//! index found in one column addresses the same record in all the others.
//!
//! ```text
//! pattern: (?P<ip>\S+)\s+(?P<host>\S+)
//!
//! input                      mapping
//! ─────────────────────      ───────────────────────────
//! 10.0.0.1  alpha            ip:   ["10.0.0.1", "10.0.0.2"]
//! # comment (no match)       host: ["alpha",    "beta"    ]
//! 10.0.0.2  beta
//! ```

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MaptagError, Result};

/// Group name to column of captured values, all columns the same length
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    columns: HashMap<String, Vec<String>>,
}

impl Mapping {
    /// An empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping by running `pattern` against every line of `text`
    ///
    /// Lines without a match are skipped. For each matching line every named
    /// group contributes one value, or `""` if it did not participate. A group
    /// that never matched has no column at all.
    pub fn build(text: &str, pattern: &Regex) -> Self {
        let groups: Vec<(usize, &str)> = pattern
            .capture_names()
            .enumerate()
            .filter_map(|(idx, name)| name.map(|n| (idx, n)))
            .collect();

        let mut columns: HashMap<String, Vec<String>> = HashMap::new();

        for line in text.split('\n') {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            for &(idx, name) in &groups {
                let value = caps.get(idx).map_or("", |m| m.as_str());
                columns
                    .entry(name.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        Self { columns }
    }

    /// Column for a group, if the group matched at least once
    pub fn column(&self, group: &str) -> Option<&[String]> {
        self.columns.get(group).map(Vec::as_slice)
    }

    /// Index of the first row whose `group` value equals `value`
    ///
    /// A missing group behaves like an empty column.
    pub fn row_index(&self, group: &str, value: &str) -> Option<usize> {
        self.column(group)?.iter().position(|v| v == value)
    }

    /// All `(group, value)` pairs of one row
    pub fn row(&self, index: usize) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.columns
            .iter()
            .filter_map(move |(name, values)| values.get(index).map(|v| (name.as_str(), v.as_str())))
    }

    /// Number of rows (matching input lines)
    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    /// Number of columns
    pub fn group_count(&self) -> usize {
        self.columns.len()
    }

    /// Group names, in no particular order
    pub fn groups(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// Whether no line matched
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

impl FromIterator<(String, Vec<String>)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Compiled pattern ready to turn command output into a [`Mapping`]
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    pattern: Regex,
}

impl MappingBuilder {
    /// Compile `pattern`, surfacing syntax errors as [`MaptagError::PatternCompile`]
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| MaptagError::PatternCompile {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// Named groups of the pattern, in pattern order
    pub fn group_names(&self) -> Vec<&str> {
        self.pattern.capture_names().flatten().collect()
    }

    /// Build a mapping from `text`
    pub fn build(&self, text: &str) -> Mapping {
        Mapping::build(text, &self.pattern)
    }
}
