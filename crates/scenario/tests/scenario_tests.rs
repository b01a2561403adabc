//! Scenario state-machine tests against the recording mocks.

use std::sync::Arc;

use anchorage_core::config::{MINIMAL_TEST_CONFIG, PipelineConfig};
use anchorage_core::envstate::{EnvironmentState, GitAccess};
use anchorage_core::intervals::IntervalRegistry;
use anchorage_scenario::{ScenarioInput, ScenarioRunner, ScenarioState};
use anchorage_testenv::testing::{MockClusterApi, MockInstaller, test_proxy};

fn complete_env() -> EnvironmentState {
    let mut env = EnvironmentState::new();
    env.set_cluster_proxy(test_proxy("anchorage-e2e")).unwrap();
    env.set_git_access(GitAccess {
        http_address: "http://172.18.0.2:30080".to_owned(),
        auth_secret_name: "gitserver-auth".to_owned(),
        username: "gitadmin".to_owned(),
        password: "pw".to_owned(),
    })
    .unwrap();
    env
}

fn test_input(config: &PipelineConfig, env: &EnvironmentState) -> ScenarioInput {
    ScenarioInput::from_environment(config, env).unwrap()
}

struct Fixture {
    installer: Arc<MockInstaller>,
    api: Arc<MockClusterApi>,
    runner: ScenarioRunner<MockInstaller, MockClusterApi>,
    config: PipelineConfig,
}

fn fixture(scenario_section: &str) -> Fixture {
    let toml = format!("{MINIMAL_TEST_CONFIG}\n{scenario_section}");
    let config = PipelineConfig::parse(&toml).unwrap();
    config.validate().unwrap();
    let intervals: Arc<IntervalRegistry> = Arc::new(config.interval_registry().unwrap());
    let installer = Arc::new(MockInstaller::new());
    let api = Arc::new(MockClusterApi::new());
    let runner = ScenarioRunner::new(Arc::clone(&installer), Arc::clone(&api), intervals);
    Fixture {
        installer,
        api,
        runner,
        config,
    }
}

#[tokio::test(start_paused = true)]
async fn default_run_creates_imports_and_deletes() {
    let f = fixture("");
    let env = complete_env();
    let input = test_input(&f.config, &env);

    let report = f.runner.run(&input, &env).await.unwrap();

    assert_eq!(report.final_state, ScenarioState::Deleted);
    assert!(!report.reimport_verified);
    assert!(report.deletion_verified);
    assert_eq!(f.installer.count_of("apply_manifest"), 1);
    assert_eq!(f.installer.count_of("delete_manifest"), 1);
    assert_eq!(
        f.api.journal(),
        vec![
            "create_namespace:workload-docker-kubeadm",
            "label_namespace:workload-docker-kubeadm:cluster-api.cattle.io/rancher-auto-import=true",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn reimport_recreates_cluster_under_same_identity() {
    let f = fixture("[scenario]\ntest_cluster_reimport = true");
    let env = complete_env();
    let input = test_input(&f.config, &env);

    let report = f.runner.run(&input, &env).await.unwrap();

    assert_eq!(report.final_state, ScenarioState::Deleted);
    assert!(report.reimport_verified);
    // Initial apply + reimport apply; reimport delete + final delete.
    assert_eq!(f.installer.count_of("apply_manifest"), 2);
    assert_eq!(f.installer.count_of("delete_manifest"), 2);
}

#[tokio::test(start_paused = true)]
async fn skip_deletion_terminates_in_imported() {
    let f = fixture("[scenario]\nskip_deletion_test = true");
    let env = complete_env();
    let input = test_input(&f.config, &env);

    let report = f.runner.run(&input, &env).await.unwrap();

    assert_eq!(report.final_state, ScenarioState::Imported);
    assert!(!report.deletion_verified);
    assert_eq!(f.installer.count_of("delete_manifest"), 0);
}

#[tokio::test(start_paused = true)]
async fn unlabeled_namespace_is_not_labeled() {
    let f = fixture("[scenario]\nlabel_namespace = false");
    let env = complete_env();
    let input = test_input(&f.config, &env);

    f.runner.run(&input, &env).await.unwrap();
    assert_eq!(f.api.count_of("label_namespace"), 0);
    assert_eq!(f.api.count_of("create_namespace"), 1);
}

#[tokio::test(start_paused = true)]
async fn import_timeout_reports_importing_state() {
    let f = fixture("");
    let env = complete_env();
    let input = test_input(&f.config, &env);
    f.api
        .delay(format!("imported:{}", input.cluster_name), u32::MAX);

    let err = f.runner.run(&input, &env).await.unwrap_err();
    assert_eq!(err.last_state, "importing");
    assert!(err.to_string().contains("wait-rancher"), "{err}");
}

#[tokio::test(start_paused = true)]
async fn deletion_probe_fault_reports_deleting_state() {
    let f = fixture("");
    let env = complete_env();
    let input = test_input(&f.config, &env);
    f.api.fault(format!("cluster-gone:{}", input.cluster_name));

    let err = f.runner.run(&input, &env).await.unwrap_err();
    assert_eq!(err.last_state, "deleting");
}

#[tokio::test(start_paused = true)]
async fn reimport_failure_reports_reimporting_state() {
    let f = fixture("[scenario]\ntest_cluster_reimport = true");
    let env = complete_env();
    let input = test_input(&f.config, &env);
    f.api
        .delay(format!("cluster-gone:{}", input.cluster_name), u32::MAX);

    let err = f.runner.run(&input, &env).await.unwrap_err();
    assert_eq!(err.last_state, "reimporting");
    // The failing walk never reached the final deletion.
    assert_eq!(f.installer.count_of("apply_manifest"), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_import_within_budget_still_succeeds() {
    let f = fixture("");
    let env = complete_env();
    let input = test_input(&f.config, &env);
    f.api.delay(format!("imported:{}", input.cluster_name), 10);
    f.api
        .delay(format!("cluster-gone:{}", input.cluster_name), 10);

    let report = f.runner.run(&input, &env).await.unwrap();
    assert_eq!(report.final_state, ScenarioState::Deleted);
}

#[tokio::test(start_paused = true)]
async fn incomplete_environment_is_rejected_up_front() {
    let f = fixture("");
    let env = complete_env();
    let input = test_input(&f.config, &env);

    let bare = EnvironmentState::new();
    let err = f.runner.run(&input, &bare).await.unwrap_err();
    assert_eq!(err.last_state, "created");
    assert!(f.installer.journal().is_empty());
}
