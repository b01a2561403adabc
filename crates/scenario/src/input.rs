//! Scenario input surface.

use anchorage_core::config::PipelineConfig;
use anchorage_core::envstate::EnvironmentState;
use anchorage_core::error::ScenarioError;

use crate::state::ScenarioState;

/// Everything one scenario run needs, resolved up front.
///
/// Built from the `[scenario]` config section plus the environment the
/// setup stages produced; the runner itself never reads config or
/// mutates the environment.
#[derive(Debug, Clone)]
pub struct ScenarioInput {
    /// Cluster topology class (`docker-kubeadm`, `docker-rke2`, ...).
    pub template: String,
    /// Workload cluster name.
    pub cluster_name: String,
    /// Namespace the cluster manifest lands in.
    pub namespace: String,
    /// Kubernetes version of the workload cluster.
    pub kubernetes_version: String,
    /// Control-plane machine count.
    pub control_plane_count: u32,
    /// Worker machine count.
    pub worker_count: u32,
    /// HTTP endpoint of the git server the GitOps flow syncs from.
    pub git_http_address: String,
    /// Secret holding the git credentials.
    pub git_auth_secret_name: String,
    /// Label the namespace so the controller auto-imports the cluster.
    pub label_namespace: bool,
    /// Delete and recreate the cluster to validate repeatable import.
    pub test_cluster_reimport: bool,
    /// Skip the deletion phase.
    pub skip_deletion_test: bool,
    /// Wait-profile name for import.
    pub create_wait_profile: String,
    /// Wait-profile name for deletion.
    pub delete_wait_profile: String,
}

impl ScenarioInput {
    /// Resolve the input from config and the completed environment.
    ///
    /// Fails when the git server was never published, i.e. setup did
    /// not finish.
    pub fn from_environment(
        config: &PipelineConfig,
        env: &EnvironmentState,
    ) -> Result<Self, ScenarioError> {
        let git = env.git_access().map_err(|e| {
            ScenarioError::new(
                ScenarioState::Created.to_string(),
                format!("environment incomplete: {e}"),
            )
        })?;
        let scenario = &config.scenario;
        Ok(Self {
            template: scenario.template.clone(),
            cluster_name: scenario.cluster_name.clone(),
            // One namespace per workload cluster.
            namespace: scenario.cluster_name.clone(),
            kubernetes_version: config.cluster.kubernetes_version.clone(),
            control_plane_count: scenario.control_plane_count,
            worker_count: scenario.worker_count,
            git_http_address: git.http_address.clone(),
            git_auth_secret_name: git.auth_secret_name.clone(),
            label_namespace: scenario.label_namespace,
            test_cluster_reimport: scenario.test_cluster_reimport,
            skip_deletion_test: scenario.skip_deletion_test,
            create_wait_profile: scenario.create_wait_profile.clone(),
            delete_wait_profile: scenario.delete_wait_profile.clone(),
        })
    }
}

#[cfg(test)]
impl ScenarioInput {
    /// Defaults mirroring the `[scenario]` config defaults.
    pub(crate) fn for_tests() -> Self {
        Self {
            template: "docker-kubeadm".to_owned(),
            cluster_name: "workload-docker-kubeadm".to_owned(),
            namespace: "workload-docker-kubeadm".to_owned(),
            kubernetes_version: "v1.31.0".to_owned(),
            control_plane_count: 1,
            worker_count: 1,
            git_http_address: "http://172.18.0.2:30080".to_owned(),
            git_auth_secret_name: "gitserver-auth".to_owned(),
            label_namespace: true,
            test_cluster_reimport: false,
            skip_deletion_test: false,
            create_wait_profile: "wait-rancher".to_owned(),
            delete_wait_profile: "wait-controllers".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use anchorage_core::envstate::GitAccess;

    use super::*;

    #[test]
    fn from_environment_requires_git_access() {
        let config = PipelineConfig::default();
        let env = EnvironmentState::new();
        let err = ScenarioInput::from_environment(&config, &env).unwrap_err();
        assert_eq!(err.last_state, "created");
    }

    #[test]
    fn from_environment_copies_git_endpoint() {
        let config = PipelineConfig::default();
        let mut env = EnvironmentState::new();
        env.set_git_access(GitAccess {
            http_address: "http://10.0.0.9:31234".to_owned(),
            auth_secret_name: "gitserver-auth".to_owned(),
            username: "gitadmin".to_owned(),
            password: "pw".to_owned(),
        })
        .unwrap();

        let input = ScenarioInput::from_environment(&config, &env).unwrap();
        assert_eq!(input.git_http_address, "http://10.0.0.9:31234");
        assert_eq!(input.namespace, input.cluster_name);
        assert!(input.label_namespace);
    }
}
