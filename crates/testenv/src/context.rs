//! Shared construction context for stage executors.

use std::sync::Arc;

use anchorage_core::config::PipelineConfig;
use anchorage_core::intervals::IntervalRegistry;

use crate::hooks::SetupHooks;
use crate::installer::{ClusterApi, Installer};

/// Everything a stage needs besides the environment record: the
/// resolved config, the wait-profile registry, the external
/// collaborators, and the hook set.
///
/// Cheap to clone; one context is shared by all stages of a pipeline.
pub struct StageContext<I, A> {
    /// Resolved pipeline configuration (read-only).
    pub config: Arc<PipelineConfig>,
    /// Named wait profiles.
    pub intervals: Arc<IntervalRegistry>,
    /// Install/provisioning collaborator.
    pub installer: Arc<I>,
    /// Probe/API collaborator.
    pub api: Arc<A>,
    /// Hook injection points.
    pub hooks: Arc<dyn SetupHooks>,
}

impl<I, A> Clone for StageContext<I, A> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            intervals: Arc::clone(&self.intervals),
            installer: Arc::clone(&self.installer),
            api: Arc::clone(&self.api),
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<I: Installer, A: ClusterApi> StageContext<I, A> {
    /// Bundle the shared parts of a pipeline into a context.
    pub fn new(
        config: Arc<PipelineConfig>,
        intervals: Arc<IntervalRegistry>,
        installer: Arc<I>,
        api: Arc<A>,
        hooks: Arc<dyn SetupHooks>,
    ) -> Self {
        Self {
            config,
            intervals,
            installer,
            api,
            hooks,
        }
    }
}
