//! Hook injection points.
//!
//! Environments that differ from the defaults (managed clusters,
//! tunneled ingress, provider-specific service exposure) customize
//! the pipeline through [`SetupHooks`] instead of editing stages.
//! Hooks are invoked at three fixed points and only parameterize the
//! stage about to run; they can never reorder or skip stages.
//!
//! [`DefaultHooks`] is the identity implementation: every resolution
//! falls through to the config file.

use anchorage_core::config::PipelineConfig;
use anchorage_core::envstate::{ClusterProvider, EnvironmentState, IngressType};

use crate::installer::ChartRequest;

/// Overrides produced before cluster provisioning.
#[derive(Debug, Clone, Default)]
pub struct PreClusterOutput {
    /// Custom cluster provider; `None` keeps the configured one.
    pub provider: Option<ClusterProvider>,
    /// Resolved ingress strategy; `None` keeps the configured one.
    pub ingress_type: Option<IngressType>,
}

/// Overrides produced before the platform install.
#[derive(Debug, Clone, Default)]
pub struct PrePlatformOutput {
    /// Externally reachable host name computed from cluster state;
    /// `None` keeps the configured default.
    pub host_name: Option<String>,
}

/// Strategy functions injected into the pipeline constructor.
///
/// Every method has an identity default, so implementors override
/// only the points their environment needs.
pub trait SetupHooks: Send + Sync {
    /// Invoked before the bootstrap cluster is provisioned.
    fn pre_cluster(&self, _config: &PipelineConfig) -> PreClusterOutput {
        PreClusterOutput::default()
    }

    /// Invoked before the platform chart install, after the cluster
    /// and ingress stages published their outputs.
    fn pre_platform(
        &self,
        _config: &PipelineConfig,
        _env: &EnvironmentState,
    ) -> PrePlatformOutput {
        PrePlatformOutput::default()
    }

    /// Invoked before the git-server install with the request the
    /// stage built; may adjust values (service exposure mode) in
    /// place.
    fn pre_gitserver(
        &self,
        _config: &PipelineConfig,
        _env: &EnvironmentState,
        _request: &mut ChartRequest,
    ) {
    }
}

/// Identity hook set used when no environment customization applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl SetupHooks for DefaultHooks {}
