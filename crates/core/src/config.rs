//! Pipeline configuration — TOML parsing and runtime settings.
//!
//! [`PipelineConfig`] is the top-level structure of the config file
//! passed via `--config`. Each stage reads only its own section plus
//! the flat `[variables]` table.
//!
//! # Loading precedence
//! 1. Environment variables (`ANCHORAGE_SCENARIO_SKIP_CLEANUP=true`)
//! 2. Config file (TOML)
//! 3. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), anchorage_core::error::AnchorageError> {
//! use anchorage_core::config::PipelineConfig;
//!
//! // Load from file + env overrides.
//! let config = PipelineConfig::load("anchorage.toml").await?;
//!
//! // Parse a TOML string directly (tests).
//! let config = PipelineConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnchorageError, ConfigError};
use crate::intervals::{IntervalRegistry, IntervalSpec};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Process-wide settings (logging, artifacts).
    #[serde(default)]
    pub general: GeneralConfig,
    /// Flat name → value map for chart repos, versions, paths,
    /// credentials. Resolved once at startup, read-only afterwards.
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Named wait profiles.
    #[serde(default)]
    pub intervals: HashMap<String, IntervalSpec>,
    /// Bootstrap-cluster stage settings.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Ingress stage settings.
    #[serde(default)]
    pub ingress: IngressConfig,
    /// Platform install stage settings.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Lifecycle-controller install stage settings.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Git-server install stage settings.
    #[serde(default)]
    pub gitserver: GitServerConfig,
    /// Scenario input.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

/// `[general]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format: `"json"` or `"pretty"`.
    pub log_format: String,
    /// Directory test artifacts (kubeconfigs, rendered manifests) are
    /// written to.
    pub artifacts_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            artifacts_dir: "_artifacts".to_owned(),
        }
    }
}

/// `[cluster]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Bootstrap cluster name.
    pub name: String,
    /// Provider: `"kind"` or `"eks"`. A pre-cluster hook may override.
    pub provider: String,
    /// Kubernetes version for the bootstrap cluster.
    pub kubernetes_version: String,
    /// Reuse an already-running cluster instead of creating one.
    pub use_existing: bool,
    /// Wait-profile name for cluster readiness.
    pub wait_profile: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: "anchorage-e2e".to_owned(),
            provider: "kind".to_owned(),
            kubernetes_version: "v1.31.0".to_owned(),
            use_existing: false,
            wait_profile: "wait-cluster".to_owned(),
        }
    }
}

/// `[ingress]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    /// Exposure mode: `"classic"`, `"ngrok"`, or `"eks-native"`.
    /// A pre-cluster hook may override.
    pub ingress_type: String,
    /// Namespace the classic ingress controller deploys into.
    pub namespace: String,
    /// Deployment name waited on in classic mode.
    pub deployment: String,
    /// Wait-profile name for ingress readiness.
    pub wait_profile: String,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            ingress_type: "classic".to_owned(),
            namespace: "ingress-nginx".to_owned(),
            deployment: "ingress-nginx-controller".to_owned(),
            wait_profile: "wait-rancher".to_owned(),
        }
    }
}

/// `[platform]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Namespace the platform chart installs into.
    pub namespace: String,
    /// Bootstrap admin password.
    pub password: String,
    /// Install cert-manager before the platform chart.
    pub install_cert_manager: bool,
    /// Namespace cert-manager installs into.
    pub cert_manager_namespace: String,
    /// Wait-profile name for platform deployment readiness.
    pub wait_profile: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            namespace: "cattle-system".to_owned(),
            password: "admin".to_owned(),
            install_cert_manager: true,
            cert_manager_namespace: "cert-manager".to_owned(),
            wait_profile: "wait-rancher".to_owned(),
        }
    }
}

/// `[controller]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Namespace the lifecycle-controller chart installs into.
    pub namespace: String,
    /// Extra chart values (feature toggles) passed through verbatim.
    #[serde(default)]
    pub additional_values: HashMap<String, String>,
    /// Wait-profile name for controller deployment readiness.
    pub wait_profile: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: "lifecycle-system".to_owned(),
            additional_values: HashMap::new(),
            wait_profile: "wait-controllers".to_owned(),
        }
    }
}

/// `[gitserver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitServerConfig {
    /// Namespace the git-server chart installs into.
    pub namespace: String,
    /// Admin user name.
    pub username: String,
    /// Admin password; generated when empty.
    pub password: String,
    /// Name of the auth secret published for the scenario.
    pub auth_secret_name: String,
    /// Wait-profile name for chart rollout.
    pub rollout_wait_profile: String,
    /// Wait-profile name for service address resolution.
    pub service_wait_profile: String,
    /// Wait-profile name for uninstall confirmation.
    pub uninstall_wait_profile: String,
}

impl Default for GitServerConfig {
    fn default() -> Self {
        Self {
            namespace: "gitserver".to_owned(),
            username: "gitadmin".to_owned(),
            password: String::new(),
            auth_secret_name: "gitserver-auth".to_owned(),
            rollout_wait_profile: "wait-gitea".to_owned(),
            service_wait_profile: "wait-gitea-service".to_owned(),
            uninstall_wait_profile: "wait-gitea-uninstall".to_owned(),
        }
    }
}

/// `[scenario]` section — parameters of the GitOps import scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Cluster template identifier (resolved through `[variables]`).
    pub template: String,
    /// Workload cluster name.
    pub cluster_name: String,
    /// Control-plane machine count.
    pub control_plane_count: u32,
    /// Worker machine count.
    pub worker_count: u32,
    /// Label the namespace so the controller auto-imports the cluster.
    pub label_namespace: bool,
    /// Delete and recreate the cluster to validate repeatable import.
    pub test_cluster_reimport: bool,
    /// Skip the deletion phase of the scenario.
    pub skip_deletion_test: bool,
    /// Leave all provisioned resources standing after the run.
    pub skip_cleanup: bool,
    /// Wait-profile name for cluster creation/import.
    pub create_wait_profile: String,
    /// Wait-profile name for cluster deletion.
    pub delete_wait_profile: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            template: "docker-kubeadm".to_owned(),
            cluster_name: "workload-docker-kubeadm".to_owned(),
            control_plane_count: 1,
            worker_count: 1,
            label_namespace: true,
            test_cluster_reimport: false,
            skip_deletion_test: false,
            skip_cleanup: false,
            create_wait_profile: "wait-rancher".to_owned(),
            delete_wait_profile: "wait-controllers".to_owned(),
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file and apply environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AnchorageError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AnchorageError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AnchorageError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AnchorageError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parse from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, AnchorageError> {
        toml::from_str(toml_str).map_err(|e| {
            AnchorageError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Apply environment overrides.
    ///
    /// Naming rule: `ANCHORAGE_{SECTION}_{FIELD}`, e.g.
    /// `ANCHORAGE_SCENARIO_SKIP_CLEANUP=true`.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "ANCHORAGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "ANCHORAGE_GENERAL_LOG_FORMAT");
        override_string(
            &mut self.general.artifacts_dir,
            "ANCHORAGE_GENERAL_ARTIFACTS_DIR",
        );

        override_string(&mut self.cluster.name, "ANCHORAGE_CLUSTER_NAME");
        override_string(&mut self.cluster.provider, "ANCHORAGE_CLUSTER_PROVIDER");
        override_bool(&mut self.cluster.use_existing, "ANCHORAGE_CLUSTER_USE_EXISTING");

        override_string(&mut self.ingress.ingress_type, "ANCHORAGE_INGRESS_TYPE");

        override_bool(
            &mut self.scenario.label_namespace,
            "ANCHORAGE_SCENARIO_LABEL_NAMESPACE",
        );
        override_bool(
            &mut self.scenario.test_cluster_reimport,
            "ANCHORAGE_SCENARIO_TEST_CLUSTER_REIMPORT",
        );
        override_bool(
            &mut self.scenario.skip_deletion_test,
            "ANCHORAGE_SCENARIO_SKIP_DELETION_TEST",
        );
        override_bool(&mut self.scenario.skip_cleanup, "ANCHORAGE_SCENARIO_SKIP_CLEANUP");
        override_u32(
            &mut self.scenario.control_plane_count,
            "ANCHORAGE_SCENARIO_CONTROL_PLANE_COUNT",
        );
        override_u32(
            &mut self.scenario.worker_count,
            "ANCHORAGE_SCENARIO_WORKER_COUNT",
        );
    }

    /// Validate cross-field consistency.
    ///
    /// Interval entries are validated by building a throwaway
    /// registry; every wait-profile name referenced by a stage or the
    /// scenario must resolve, so a typo fails here instead of minutes
    /// into provisioning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.general.log_format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "general.log_format".to_owned(),
                    reason: format!("'{other}' is not 'json' or 'pretty'"),
                });
            }
        }

        match self.ingress.ingress_type.as_str() {
            "classic" | "ngrok" | "eks-native" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "ingress.ingress_type".to_owned(),
                    reason: format!("'{other}' is not 'classic', 'ngrok', or 'eks-native'"),
                });
            }
        }

        if self.scenario.cluster_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scenario.cluster_name".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        if self.scenario.control_plane_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scenario.control_plane_count".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let registry = IntervalRegistry::from_specs(&self.intervals)?;
        for name in self.referenced_wait_profiles() {
            registry.resolve(name)?;
        }
        Ok(())
    }

    /// Look up a `[variables]` entry.
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingVariable` when the name is absent.
    pub fn get_variable(&self, name: &str) -> Result<&str, ConfigError> {
        self.variables
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingVariable {
                name: name.to_owned(),
            })
    }

    /// Build the interval registry from the `[intervals]` table.
    pub fn interval_registry(&self) -> Result<IntervalRegistry, ConfigError> {
        IntervalRegistry::from_specs(&self.intervals)
    }

    /// Every wait-profile name the config references.
    fn referenced_wait_profiles(&self) -> impl Iterator<Item = &str> {
        [
            self.cluster.wait_profile.as_str(),
            self.ingress.wait_profile.as_str(),
            self.platform.wait_profile.as_str(),
            self.controller.wait_profile.as_str(),
            self.gitserver.rollout_wait_profile.as_str(),
            self.gitserver.service_wait_profile.as_str(),
            self.gitserver.uninstall_wait_profile.as_str(),
            self.scenario.create_wait_profile.as_str(),
            self.scenario.delete_wait_profile.as_str(),
        ]
        .into_iter()
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(env_key, value, "ignoring unparsable bool override"),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(env_key, value, "ignoring unparsable integer override"),
        }
    }
}

/// A minimal valid config used by tests across the workspace.
///
/// Defines every wait profile the default sections reference.
#[doc(hidden)]
pub const MINIMAL_TEST_CONFIG: &str = r#"
[intervals.wait-cluster]
timeout_secs = 300
poll_period_secs = 10

[intervals.wait-rancher]
timeout_secs = 1800
poll_period_secs = 30

[intervals.wait-controllers]
timeout_secs = 900
poll_period_secs = 15

[intervals.wait-gitea]
timeout_secs = 600
poll_period_secs = 10

[intervals.wait-gitea-service]
timeout_secs = 120
poll_period_secs = 5

[intervals.wait-gitea-uninstall]
timeout_secs = 300
poll_period_secs = 10
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_and_validates() {
        let config = PipelineConfig::parse(MINIMAL_TEST_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.scenario.control_plane_count, 1);
    }

    #[test]
    fn empty_config_fails_validation_on_missing_profiles() {
        let config = PipelineConfig::parse("").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownIntervalProfile { .. }));
    }

    #[test]
    fn unknown_log_format_rejected() {
        let toml = format!("{MINIMAL_TEST_CONFIG}\n[general]\nlog_format = \"xml\"");
        let config = PipelineConfig::parse(&toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field, .. } if field == "general.log_format"
        ));
    }

    #[test]
    fn unknown_ingress_type_rejected() {
        let toml = format!("{MINIMAL_TEST_CONFIG}\n[ingress]\ningress_type = \"istio\"");
        let config = PipelineConfig::parse(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_control_plane_count_rejected() {
        let toml = format!("{MINIMAL_TEST_CONFIG}\n[scenario]\ncontrol_plane_count = 0");
        let config = PipelineConfig::parse(&toml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { field, .. } if field == "scenario.control_plane_count"
        ));
    }

    #[test]
    fn variables_resolve_or_fail_by_name() {
        let toml = format!(
            "{MINIMAL_TEST_CONFIG}\n[variables]\nGITSERVER_REPO_URL = \"https://dl.gitea.com/charts\""
        );
        let config = PipelineConfig::parse(&toml).unwrap();
        assert_eq!(
            config.get_variable("GITSERVER_REPO_URL").unwrap(),
            "https://dl.gitea.com/charts"
        );
        let err = config.get_variable("PLATFORM_REPO_URL").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable { .. }));
    }

    #[test]
    fn scenario_section_round_trips() {
        let toml = format!(
            r#"{MINIMAL_TEST_CONFIG}
[scenario]
template = "docker-rke2"
cluster_name = "workload-docker-rke2"
control_plane_count = 3
worker_count = 2
test_cluster_reimport = true
"#
        );
        let config = PipelineConfig::parse(&toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.scenario.template, "docker-rke2");
        assert_eq!(config.scenario.control_plane_count, 3);
        assert!(config.scenario.test_cluster_reimport);
        // Unspecified fields keep defaults.
        assert!(!config.scenario.skip_cleanup);
        assert_eq!(config.scenario.create_wait_profile, "wait-rancher");
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = PipelineConfig::from_file("/nonexistent/anchorage.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnchorageError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchorage.toml");
        tokio::fs::write(&path, MINIMAL_TEST_CONFIG).await.unwrap();
        let config = PipelineConfig::load(&path).await.unwrap();
        assert_eq!(config.intervals.len(), 6);
    }
}
