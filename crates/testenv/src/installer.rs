//! Installer and cluster-API collaborator traits.
//!
//! Actual install mechanics (package-manager invocations, manifest
//! application) are out of scope for the pipeline core; stages talk to
//! them through these traits. Production wires real implementations,
//! tests use recording mocks.
//!
//! ```text
//! ┌───────────────┐      ┌──────────────┐
//! │ Stage / Runner│─────▶│  Installer   │ (mutating operations)
//! └───────────────┘      └──────────────┘
//!         │              ┌──────────────┐
//!         └─────────────▶│  ClusterApi  │ (side-effect-free probes
//!                        └──────────────┘  + small API mutations)
//! ```
//!
//! `ClusterApi` probe methods must be re-checkable: the readiness
//! waiter calls them repeatedly against eventually-consistent remote
//! state.

use std::collections::HashMap;
use std::future::Future;

use anchorage_core::envstate::{ClusterProvider, ClusterProxy};
use anchorage_core::error::ProbeError;

use crate::error::TestEnvError;

/// A chart install request built by a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    /// Repository alias (`helm repo add` name).
    pub repo_name: String,
    /// Repository URL.
    pub repo_url: String,
    /// Chart name within the repository.
    pub chart: String,
    /// Chart version.
    pub version: String,
    /// Release name.
    pub release_name: String,
    /// Target namespace (created if absent).
    pub namespace: String,
    /// `--set` style value overrides.
    pub values: HashMap<String, String>,
}

/// A bootstrap-cluster provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterRequest {
    /// Cluster name.
    pub name: String,
    /// Backing provider.
    pub provider: ClusterProvider,
    /// Kubernetes version.
    pub kubernetes_version: String,
    /// Reuse a running cluster instead of creating one.
    pub use_existing: bool,
    /// Directory kubeconfig and provisioning logs are written to.
    pub artifacts_dir: String,
}

/// Mutating install/provisioning operations. Opaque to the pipeline.
pub trait Installer: Send + Sync + 'static {
    /// Register a chart repository.
    fn add_repository(
        &self,
        name: &str,
        url: &str,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Install (or upgrade) a chart release.
    fn install_chart(
        &self,
        request: &ChartRequest,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Uninstall a chart release.
    fn uninstall_release(
        &self,
        release_name: &str,
        namespace: &str,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Provision (or attach to) the bootstrap cluster.
    fn create_cluster(
        &self,
        request: &ClusterRequest,
    ) -> impl Future<Output = Result<ClusterProxy, TestEnvError>> + Send;

    /// Delete the bootstrap cluster and its backing resources.
    fn delete_cluster(
        &self,
        proxy: &ClusterProxy,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Apply a rendered manifest to the bootstrap cluster.
    fn apply_manifest(
        &self,
        manifest: &str,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Delete the resources of a rendered manifest.
    fn delete_manifest(
        &self,
        manifest: &str,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;
}

/// Kubernetes API surface used for probes and small mutations.
pub trait ClusterApi: Send + Sync + 'static {
    /// Whether a deployment has its desired replicas available.
    fn deployment_ready(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<bool, ProbeError>> + Send;

    /// Externally reachable address of a service, once assigned.
    ///
    /// Returns `Ok(None)` while the provider has not yet assigned an
    /// address (LoadBalancer pending, NodePort node not registered).
    fn service_address(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, ProbeError>> + Send;

    /// Whether a namespace still exists.
    fn namespace_exists(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<bool, ProbeError>> + Send;

    /// Whether a deployment (and its replicas) no longer exists.
    ///
    /// Distinct from `!deployment_ready`: a deployment that exists but
    /// has unavailable replicas is not gone.
    fn deployment_gone(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<bool, ProbeError>> + Send;

    /// Whether the platform reports the workload cluster as imported
    /// and ready.
    fn cluster_imported(
        &self,
        cluster_name: &str,
    ) -> impl Future<Output = Result<bool, ProbeError>> + Send;

    /// Whether the workload cluster and its backing infrastructure
    /// are fully reclaimed.
    fn cluster_gone(
        &self,
        cluster_name: &str,
    ) -> impl Future<Output = Result<bool, ProbeError>> + Send;

    /// Create a namespace (idempotent).
    fn create_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Add a label to a namespace.
    fn label_namespace(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;

    /// Create an opaque secret.
    fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        data: &HashMap<String, String>,
    ) -> impl Future<Output = Result<(), TestEnvError>> + Send;
}
