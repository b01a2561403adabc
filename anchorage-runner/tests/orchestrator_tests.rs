//! Orchestrator integration tests.
//!
//! Full pipeline flow against the recording mocks: setup stages ->
//! scenario -> guaranteed cleanup, plus the exit-code policy.

use std::sync::Arc;

use anchorage_core::config::{MINIMAL_TEST_CONFIG, PipelineConfig};
use anchorage_runner::orchestrator::Orchestrator;
use anchorage_scenario::ScenarioState;
use anchorage_testenv::hooks::DefaultHooks;
use anchorage_testenv::testing::{MockClusterApi, MockInstaller};

const CHART_VARIABLES: &str = r#"
[variables]
CERT_MANAGER_REPO_NAME = "jetstack"
CERT_MANAGER_REPO_URL = "https://charts.jetstack.io"
CERT_MANAGER_CHART = "cert-manager"
CERT_MANAGER_VERSION = "v1.16.1"
PLATFORM_REPO_NAME = "rancher-latest"
PLATFORM_REPO_URL = "https://releases.rancher.com/server-charts/latest"
PLATFORM_CHART = "rancher"
PLATFORM_VERSION = "2.10.1"
CONTROLLER_REPO_NAME = "turtles"
CONTROLLER_REPO_URL = "https://rancher.github.io/turtles"
CONTROLLER_CHART = "rancher-turtles"
CONTROLLER_VERSION = "0.14.0"
GITSERVER_REPO_NAME = "gitea-charts"
GITSERVER_REPO_URL = "https://dl.gitea.com/charts"
GITSERVER_CHART = "gitea"
GITSERVER_CHART_VERSION = "10.4.1"
"#;

fn full_test_config(extra: &str) -> PipelineConfig {
    let toml = format!("{MINIMAL_TEST_CONFIG}\n{CHART_VARIABLES}\n{extra}");
    let config = PipelineConfig::parse(&toml).unwrap();
    config.validate().unwrap();
    config
}

struct Fixture {
    installer: Arc<MockInstaller>,
    api: Arc<MockClusterApi>,
    orchestrator: Orchestrator<MockInstaller, MockClusterApi>,
}

fn fixture(extra: &str, skip_cleanup: bool) -> Fixture {
    let config = full_test_config(extra);
    let installer = Arc::new(MockInstaller::new());
    let api = Arc::new(MockClusterApi::new());
    let orchestrator = Orchestrator::build(
        Arc::new(config),
        Arc::clone(&installer),
        Arc::clone(&api),
        Arc::new(DefaultHooks),
        skip_cleanup,
    )
    .unwrap();
    Fixture {
        installer,
        api,
        orchestrator,
    }
}

#[tokio::test(start_paused = true)]
async fn happy_path_passes_and_cleans_up() {
    let mut f = fixture("", false);

    let outcome = f.orchestrator.run().await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(!outcome.cleanup.skipped);
    assert!(outcome.cleanup.is_clean());
    let report = outcome.scenario.unwrap();
    assert_eq!(report.final_state, ScenarioState::Deleted);

    // Reverse teardown: git server uninstalled, then the bootstrap
    // cluster deleted last.
    let journal = f.installer.journal();
    let uninstall_at = journal
        .iter()
        .position(|e| e == "uninstall_release:gitserver")
        .unwrap();
    let delete_at = journal
        .iter()
        .position(|e| e == "delete_cluster:anchorage-e2e")
        .unwrap();
    assert!(uninstall_at < delete_at);
}

#[tokio::test(start_paused = true)]
async fn setup_failure_still_tears_down_completed_stages() {
    let mut f = fixture("", false);
    f.installer.fail_on("install_chart:rancher-turtles");

    let outcome = f.orchestrator.run().await;

    assert_eq!(outcome.exit_code(), 1);
    let err = outcome.scenario.unwrap_err();
    assert!(err.to_string().contains("controller"), "{err}");

    // Cluster, ingress, and platform completed; the cluster teardown
    // still ran even though setup failed mid-pipeline.
    assert_eq!(f.installer.count_of("delete_cluster"), 1);
    // The git server never installed, so nothing to uninstall.
    assert_eq!(f.installer.count_of("uninstall_release"), 0);
    // The scenario never ran.
    assert_eq!(f.api.count_of("label_namespace"), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_failure_still_cleans_up_and_exits_nonzero() {
    let mut f = fixture("", false);
    f.api.fault("imported:workload-docker-kubeadm");

    let outcome = f.orchestrator.run().await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(!outcome.cleanup.skipped);
    assert_eq!(f.installer.count_of("delete_cluster"), 1);
    assert_eq!(f.installer.count_of("uninstall_release"), 1);
}

#[tokio::test(start_paused = true)]
async fn skip_cleanup_leaves_everything_standing() {
    let mut f = fixture("", true);

    let outcome = f.orchestrator.run().await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(outcome.cleanup.skipped);
    assert_eq!(f.installer.count_of("delete_cluster"), 0);
    assert_eq!(f.installer.count_of("uninstall_release"), 0);
}

#[tokio::test(start_paused = true)]
async fn skip_cleanup_from_config_section() {
    let mut f = {
        let config = full_test_config("[scenario]\nskip_cleanup = true");
        let skip = config.scenario.skip_cleanup;
        let installer = Arc::new(MockInstaller::new());
        let api = Arc::new(MockClusterApi::new());
        let orchestrator = Orchestrator::build(
            Arc::new(config),
            Arc::clone(&installer),
            Arc::clone(&api),
            Arc::new(DefaultHooks),
            skip,
        )
        .unwrap();
        Fixture {
            installer,
            api,
            orchestrator,
        }
    };

    let outcome = f.orchestrator.run().await;
    assert!(outcome.cleanup.skipped);
    assert_eq!(f.installer.count_of("delete_cluster"), 0);
}

#[tokio::test(start_paused = true)]
async fn cleanup_failure_does_not_change_exit_code() {
    let mut f = fixture("", false);
    f.installer.fail_on("uninstall_release:gitserver");

    let outcome = f.orchestrator.run().await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(!outcome.cleanup.is_clean());
    assert_eq!(outcome.cleanup.errors.len(), 1);
    assert_eq!(outcome.cleanup.errors[0].stage, "gitserver");
    // The failed git-server teardown did not block cluster deletion.
    assert_eq!(f.installer.count_of("delete_cluster"), 1);
}

#[tokio::test(start_paused = true)]
async fn full_reimport_run_passes() {
    let mut f = fixture("[scenario]\ntest_cluster_reimport = true", false);

    let outcome = f.orchestrator.run().await;

    let report = outcome.scenario.unwrap();
    assert!(report.reimport_verified);
    assert!(report.deletion_verified);
    assert_eq!(report.final_state, ScenarioState::Deleted);
}
