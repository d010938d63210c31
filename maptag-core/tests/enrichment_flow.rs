//! Enrichment flow tests
//!
//! Drives the plugin the way a collector would: a batch of metrics plus the
//! raw configuration map on every call, with a mock command and a mock clock.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use maptag_core::clock::MockClock;
use maptag_core::runner::MockRunner;
use maptag_core::{
    CacheState, ConfigMap, MapTagPlugin, Mapping, MaptagError, Metric, Namespace,
};

const PATTERN: &str = r"(?P<first>\S+)\s+(?P<newtag>\S+)";

/// Two metrics: one with a static namespace containing "namespace", one with
/// a dynamic element named "dynamic" whose value is "valuedynamic"
fn mock_metrics() -> Vec<Metric> {
    let first = Metric::new(Namespace::new(&["test", "static", "namespace", "pi"]))
        .with_data(3.1415926)
        .with_tag("tagone", "valueone")
        .with_tag("tagtwo", "valuetwo");

    let mut ns = Namespace::new(&["test"])
        .add_dynamic_element("dynamic", "dynamic namespace element")
        .add_static_elements(&["namespace", "e"]);
    ns.get_mut(1).unwrap().value = "valuedynamic".to_string();
    let second = Metric::new(ns)
        .with_data(2.7182818)
        .with_tag("tagone", "anothervalueone")
        .with_tag("tagtwo", "valuetwo");

    vec![first, second]
}

fn mock_config(mode: &str, reference_name: &str, ttl_minutes: i64) -> ConfigMap {
    ConfigMap::new()
        .with("command", "/bin/sh")
        .with("arg0", "-c")
        .with("arg1", "lookup-table")
        .with("pattern", PATTERN)
        .with("addressingMode", mode)
        .with("referenceName", reference_name)
        .with("referenceGroup", "first")
        .with("timeToLive", ttl_minutes)
}

fn plugin_with(output: &str) -> (MapTagPlugin, Arc<MockRunner>, Arc<MockClock>) {
    let runner = Arc::new(MockRunner::new(output));
    let clock = Arc::new(MockClock::new());
    let plugin = MapTagPlugin::with_backends(runner.clone(), clock.clone());
    (plugin, runner, clock)
}

#[test]
fn test_process_by_tag() {
    let (mut plugin, runner, _) = plugin_with("valueone somevalue");

    let mts = plugin.process(mock_metrics(), &mock_config("tag", "tagone", 1)).unwrap();

    assert_eq!(mts.len(), 2);
    assert_eq!(mts[0].tag("newtag"), Some("somevalue"));
    assert!(mts[1].tag("newtag").is_none());

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "/bin/sh");
    assert_eq!(calls[0].args, vec!["-c", "lookup-table"]);
}

#[test]
fn test_process_by_namespace_value() {
    let (mut plugin, _, _) = plugin_with("namespace somevalue");

    let mts = plugin
        .process(mock_metrics(), &mock_config("ns_value", "namespace", 1))
        .unwrap();

    assert_eq!(mts.len(), 2);
    assert_eq!(mts[0].tag("newtag"), Some("somevalue"));
    assert_eq!(mts[1].tag("newtag"), Some("somevalue"));
}

#[test]
fn test_process_by_namespace_name() {
    let (mut plugin, _, _) = plugin_with("valuedynamic somevalue");

    let mts = plugin
        .process(mock_metrics(), &mock_config("ns_name", "dynamic", 1))
        .unwrap();

    assert_eq!(mts.len(), 2);
    assert!(mts[0].tag("newtag").is_none());
    assert_eq!(mts[1].tag("newtag"), Some("somevalue"));
}

#[test]
fn test_existing_tags_are_kept() {
    let (mut plugin, _, _) = plugin_with("valueone somevalue");

    let mts = plugin.process(mock_metrics(), &mock_config("tag", "tagone", 1)).unwrap();

    assert_eq!(mts[0].tag("tagone"), Some("valueone"));
    assert_eq!(mts[0].tag("tagtwo"), Some("valuetwo"));
    assert_eq!(mts[0].namespace, mock_metrics()[0].namespace);
}

#[test]
fn test_reference_group_never_added() {
    let output = "valueone somevalue\nvaluedynamic othervalue\nnamespace thirdvalue";

    for (mode, name) in [("tag", "tagone"), ("ns_name", "dynamic"), ("ns_value", "namespace")] {
        let (mut plugin, _, _) = plugin_with(output);
        let mts = plugin.process(mock_metrics(), &mock_config(mode, name, 1)).unwrap();

        assert!(mts.iter().any(|m| m.tag("newtag").is_some()), "mode {}", mode);
        assert!(mts.iter().all(|m| m.tag("first").is_none()), "mode {}", mode);
    }
}

#[test]
fn test_multi_column_row() {
    let output = "\
# host   rack  dc
web01    r12   ams
web02    r14   fra
";
    let (mut plugin, _, _) = plugin_with(output);
    let config = ConfigMap::new()
        .with("command", "inventory")
        .with("pattern", r"^(?P<host>\w+)\s+(?P<rack>\w+)\s+(?P<dc>\w+)$")
        .with("addressingMode", "tag")
        .with("referenceName", "hostname")
        .with("referenceGroup", "host");

    let metrics = vec![
        Metric::new(Namespace::new(&["cpu"])).with_tag("hostname", "web02"),
        Metric::new(Namespace::new(&["cpu"])).with_tag("hostname", "web03"),
    ];
    let mts = plugin.process(metrics, &config).unwrap();

    let keys: HashSet<&str> = mts[0].tags.keys().map(String::as_str).collect();
    assert_eq!(keys, HashSet::from(["hostname", "rack", "dc"]));
    assert_eq!(mts[0].tag("rack"), Some("r14"));
    assert_eq!(mts[0].tag("dc"), Some("fra"));
    assert_eq!(mts[1].tags.len(), 1);
}

#[test]
fn test_cache_is_used_within_ttl() {
    let (mut plugin, runner, clock) = plugin_with("valueone somevalue");
    let config = mock_config("tag", "tagone", 1000);

    plugin.process(mock_metrics(), &config).unwrap();

    // Put other data into the cache without touching its refresh time
    let replacement: Mapping = vec![
        ("first".to_string(), vec!["valueone".to_string()]),
        ("newtag".to_string(), vec!["newsomevalue".to_string()]),
    ]
    .into_iter()
    .collect();
    plugin.enricher_mut().unwrap().replace_mapping(replacement);
    clock.advance(Duration::from_secs(60 * 999));

    let mts = plugin.process(mock_metrics(), &config).unwrap();

    assert_eq!(runner.call_count(), 1);
    assert_eq!(mts[0].tag("newtag"), Some("newsomevalue"));
}

#[test]
fn test_cache_is_rebuilt_after_invalidation() {
    let (mut plugin, runner, _) = plugin_with("valueone somevalue");
    let config = mock_config("tag", "tagone", 1000);

    plugin.process(mock_metrics(), &config).unwrap();

    let enricher = plugin.enricher_mut().unwrap();
    enricher.invalidate();
    enricher.replace_mapping(
        vec![
            ("first".to_string(), vec!["valueone".to_string()]),
            ("newtag".to_string(), vec!["newsomevalue".to_string()]),
        ]
        .into_iter()
        .collect(),
    );

    let mts = plugin.process(mock_metrics(), &config).unwrap();

    assert_eq!(runner.call_count(), 2);
    assert_eq!(mts[0].tag("newtag"), Some("somevalue"));
}

#[test]
fn test_cache_expires_after_ttl() {
    let (mut plugin, runner, clock) = plugin_with("valueone somevalue");
    let config = mock_config("tag", "tagone", 1);

    plugin.process(mock_metrics(), &config).unwrap();
    runner.set_output("valueone changedvalue");

    clock.advance(Duration::from_secs(59));
    let mts = plugin.process(mock_metrics(), &config).unwrap();
    assert_eq!(runner.call_count(), 1);
    assert_eq!(mts[0].tag("newtag"), Some("somevalue"));

    clock.advance(Duration::from_secs(1));
    assert_eq!(plugin.enricher().unwrap().state(), CacheState::Stale);
    let mts = plugin.process(mock_metrics(), &config).unwrap();
    assert_eq!(runner.call_count(), 2);
    assert_eq!(mts[0].tag("newtag"), Some("changedvalue"));
}

#[test]
fn test_idempotent_within_ttl() {
    let (mut plugin, runner, clock) = plugin_with("valueone somevalue\nvaluedynamic other");
    let config = mock_config("tag", "tagone", 5);

    let first = plugin.process(mock_metrics(), &config).unwrap();
    clock.advance(Duration::from_secs(120));
    let second = plugin.process(mock_metrics(), &config).unwrap();

    assert_eq!(runner.call_count(), 1);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.tags, b.tags);
    }
}

#[test]
fn test_unknown_addressing_mode_fails_whole_batch() {
    let (mut plugin, runner, _) = plugin_with("valueone somevalue");
    let original = mock_metrics();

    let failure = plugin
        .process(original.clone(), &mock_config("label", "tagone", 1))
        .unwrap_err();

    assert!(matches!(
        failure.error,
        MaptagError::UnknownAddressingMode { ref mode } if mode == "label"
    ));
    assert_eq!(failure.metrics, original);
    assert!(failure.metrics.iter().all(|m| m.tag("newtag").is_none()));
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn test_command_failure_returns_original_metrics_and_retries() {
    let (mut plugin, runner, _) = plugin_with("");
    runner.set_failure("exit status 127");
    let config = mock_config("tag", "tagone", 1);
    let original = mock_metrics();

    let failure = plugin.process(original.clone(), &config).unwrap_err();
    assert!(failure.error.is_recoverable());
    assert_eq!(failure.metrics, original);

    runner.set_output("valueone somevalue");
    let mts = plugin.process(mock_metrics(), &config).unwrap();
    assert_eq!(runner.call_count(), 2);
    assert_eq!(mts[0].tag("newtag"), Some("somevalue"));
}

#[test]
fn test_invalid_pattern_fails_batch() {
    let (mut plugin, _, _) = plugin_with("valueone somevalue");
    let config = mock_config("tag", "tagone", 1).with("pattern", r"(?P<first>\S+");

    let failure = plugin.process(mock_metrics(), &config).unwrap_err();

    assert!(matches!(failure.error, MaptagError::PatternCompile { .. }));
    assert_eq!(failure.error.error_code(), "PATTERN_COMPILE_FAILED");
}

#[test]
fn test_configuration_errors_reported_together() {
    let (mut plugin, _, _) = plugin_with("valueone somevalue");
    let config = ConfigMap::new().with("command", "lookup").with("timeToLive", "ten");

    let failure = plugin.process(mock_metrics(), &config).unwrap_err();

    match failure.error {
        MaptagError::Configuration { issues } => {
            let keys: Vec<&str> = issues.iter().map(|i| i.key()).collect();
            assert_eq!(
                keys,
                vec!["addressingMode", "referenceName", "referenceGroup", "pattern", "timeToLive"]
            );
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
}

#[test]
fn test_empty_output_leaves_metrics_untouched() {
    let (mut plugin, runner, _) = plugin_with("");
    let original = mock_metrics();

    let mts = plugin.process(original.clone(), &mock_config("tag", "tagone", 1)).unwrap();

    assert_eq!(mts, original);
    assert_eq!(runner.call_count(), 1);
    assert!(plugin.enricher().unwrap().mapping().is_empty());
}
