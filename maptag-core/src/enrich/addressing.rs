//! Locating the join key on a metric

use crate::config::AddressingMode;
use crate::metric::Metric;

/// Find the value to look up in the reference column
///
/// - `Tag`: the value of tag `reference_name`
/// - `NamespaceName`: the value of the last namespace element named
///   `reference_name`
/// - `NamespaceValue`: `reference_name` itself, provided some namespace
///   element carries it as its value
///
/// Returns `None` when the metric has nothing to join on.
pub fn locate_key<'a>(metric: &'a Metric, mode: AddressingMode, reference_name: &str) -> Option<&'a str> {
    match mode {
        AddressingMode::Tag => metric.tag(reference_name),

        AddressingMode::NamespaceName => metric
            .namespace
            .iter()
            .rev()
            .find(|e| e.name == reference_name)
            .map(|e| e.value.as_str()),

        AddressingMode::NamespaceValue => metric
            .namespace
            .iter()
            .find(|e| e.value == reference_name)
            .map(|e| e.value.as_str()),
    }
}
