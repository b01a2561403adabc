//! anchorage.toml integration tests.
//!
//! - example config parsing and validation
//! - partial-section loading
//! - environment-variable precedence
//! - empty / malformed input errors

use anchorage_core::config::PipelineConfig;
use anchorage_core::error::{AnchorageError, ConfigError};

const EXAMPLE: &str = include_str!("../../../anchorage.toml.example");

// =============================================================================
// Example config
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = PipelineConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.general.artifacts_dir, "_artifacts");
}

#[test]
fn example_config_passes_validation() {
    let config = PipelineConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_defines_all_referenced_wait_profiles() {
    let config = PipelineConfig::parse(EXAMPLE).expect("should parse");
    let registry = config.interval_registry().expect("intervals should build");

    for name in [
        "wait-cluster",
        "wait-rancher",
        "wait-controllers",
        "wait-gitea",
        "wait-gitea-service",
        "wait-gitea-uninstall",
    ] {
        registry
            .resolve(name)
            .unwrap_or_else(|_| panic!("profile '{name}' should resolve"));
    }
}

#[test]
fn example_config_scenario_section() {
    let config = PipelineConfig::parse(EXAMPLE).expect("should parse");

    assert_eq!(config.scenario.cluster_name, "workload-docker-kubeadm");
    assert_eq!(config.scenario.control_plane_count, 1);
    assert_eq!(config.scenario.worker_count, 1);
    assert!(config.scenario.label_namespace);
    assert!(config.scenario.test_cluster_reimport);
    assert!(!config.scenario.skip_deletion_test);
    assert!(!config.scenario.skip_cleanup);
}

#[test]
fn example_config_variables_table() {
    let config = PipelineConfig::parse(EXAMPLE).expect("should parse");

    assert_eq!(
        config.get_variable("GITSERVER_REPO_URL").unwrap(),
        "https://dl.gitea.com/charts"
    );
    assert!(config.get_variable("DOES_NOT_EXIST").is_err());
}

#[test]
fn example_config_controller_additional_values() {
    let config = PipelineConfig::parse(EXAMPLE).expect("should parse");
    assert_eq!(
        config
            .controller
            .additional_values
            .get("features.addon-provider-fleet.enabled")
            .map(String::as_str),
        Some("true")
    );
}

// =============================================================================
// Partial configs
// =============================================================================

#[test]
fn partial_section_keeps_defaults_for_missing_fields() {
    let toml = r#"
[gitserver]
username = "operator"
"#;
    let config = PipelineConfig::parse(toml).expect("partial section should parse");
    assert_eq!(config.gitserver.username, "operator");
    assert_eq!(config.gitserver.namespace, "gitserver");
    assert_eq!(config.gitserver.rollout_wait_profile, "wait-gitea");
}

#[test]
fn empty_input_parses_to_defaults() {
    let config = PipelineConfig::parse("").expect("empty input should parse");
    assert_eq!(config.cluster.provider, "kind");
    assert!(config.variables.is_empty());
}

// =============================================================================
// Environment precedence
// =============================================================================

#[test]
fn env_override_beats_file_value() {
    let mut config = PipelineConfig::parse(EXAMPLE).expect("should parse");
    // SAFETY: test-local env mutation, no concurrent reader of this key.
    unsafe { std::env::set_var("ANCHORAGE_SCENARIO_SKIP_CLEANUP", "true") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("ANCHORAGE_SCENARIO_SKIP_CLEANUP") };
    assert!(config.scenario.skip_cleanup);
}

// =============================================================================
// Malformed input
// =============================================================================

#[test]
fn malformed_toml_is_parse_failed() {
    let err = PipelineConfig::parse("[intervals.wait-x\ntimeout_secs = ").unwrap_err();
    assert!(matches!(
        err,
        AnchorageError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_is_parse_failed() {
    let err =
        PipelineConfig::parse("[scenario]\ncontrol_plane_count = \"three\"").unwrap_err();
    assert!(matches!(
        err,
        AnchorageError::Config(ConfigError::ParseFailed { .. })
    ));
}
