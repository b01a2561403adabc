//! Stage abstraction and ordered pipeline.
//!
//! A [`Stage`] provisions one component of the test environment and
//! knows how to tear it down again. [`StagePipeline`] holds the fixed
//! stage order as data: setup folds the list left-to-right fail-fast,
//! teardown walks the completed prefix in reverse, collecting errors
//! instead of aborting.
//!
//! ```text
//! register: cluster → ingress → platform → controller → gitserver
//! setup:    ────────────────────────────────────────────────────▶
//! teardown: ◀──────────────────────────────────────────────────── (completed prefix only)
//! ```

use std::future::Future;
use std::pin::Pin;

use tracing::{info, warn};

use crate::envstate::EnvironmentState;
use crate::error::{CleanupError, StageError};

/// Boxed future used by the dyn-compatible stage trait.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One provisioning stage of the test environment.
///
/// `run` builds the stage's request from config and prior environment
/// state, delegates the install to the external collaborator, waits
/// for readiness, and publishes outputs into the environment record.
/// It must not attempt partial rollback on failure; teardown is
/// centralized in the cleanup coordinator.
///
/// `teardown` removes whatever `run` provisioned. Stages whose
/// resources are reclaimed by an earlier stage's teardown (everything
/// living inside the bootstrap cluster) return `Ok(())`.
pub trait Stage: Send + Sync {
    /// Stage name, unique within a pipeline.
    fn name(&self) -> &str;

    /// Provision the component and publish outputs.
    fn run(
        &self,
        env: &mut EnvironmentState,
    ) -> impl Future<Output = Result<(), StageError>> + Send;

    /// Remove the component.
    fn teardown(
        &self,
        env: &EnvironmentState,
    ) -> impl Future<Output = Result<(), StageError>> + Send;
}

/// dyn-compatible counterpart of [`Stage`].
///
/// `Stage` uses RPITIT and cannot be boxed directly; `DynStage`
/// returns [`BoxFuture`] so the pipeline can hold
/// `Vec<Box<dyn DynStage>>`.
pub trait DynStage: Send + Sync {
    /// Stage name, unique within a pipeline.
    fn name(&self) -> &str;

    /// Provision the component and publish outputs.
    fn run<'a>(&'a self, env: &'a mut EnvironmentState) -> BoxFuture<'a, Result<(), StageError>>;

    /// Remove the component.
    fn teardown<'a>(&'a self, env: &'a EnvironmentState)
    -> BoxFuture<'a, Result<(), StageError>>;
}

impl<T: Stage> DynStage for T {
    fn name(&self) -> &str {
        Stage::name(self)
    }

    fn run<'a>(&'a self, env: &'a mut EnvironmentState) -> BoxFuture<'a, Result<(), StageError>> {
        Box::pin(Stage::run(self, env))
    }

    fn teardown<'a>(
        &'a self,
        env: &'a EnvironmentState,
    ) -> BoxFuture<'a, Result<(), StageError>> {
        Box::pin(Stage::teardown(self, env))
    }
}

/// Ordered list of stages plus a record of how far setup got.
///
/// Registration order is execution order; a stage must be registered
/// after every stage it depends on. The pipeline remembers the number
/// of completed stages so teardown covers exactly the resources that
/// exist.
pub struct StagePipeline {
    stages: Vec<Box<dyn DynStage>>,
    completed: usize,
}

impl StagePipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            completed: 0,
        }
    }

    /// Append a stage.
    ///
    /// # Errors
    ///
    /// `StageError` when a stage with the same name is already
    /// registered.
    pub fn register(&mut self, stage: Box<dyn DynStage>) -> Result<(), StageError> {
        let name = stage.name().to_owned();
        if self.stages.iter().any(|s| s.name() == name) {
            return Err(StageError::new(name, "stage already registered"));
        }
        self.stages.push(stage);
        Ok(())
    }

    /// Registered stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages that completed successfully.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Run all stages in registration order, fail-fast.
    ///
    /// On failure the error is returned immediately; already-completed
    /// stages stay recorded so [`teardown_completed`] can reclaim
    /// their resources.
    ///
    /// [`teardown_completed`]: StagePipeline::teardown_completed
    pub async fn run_all(&mut self, env: &mut EnvironmentState) -> Result<(), StageError> {
        for stage in &self.stages {
            info!(stage = stage.name(), "running setup stage");
            stage.run(env).await?;
            self.completed += 1;
            info!(stage = stage.name(), "setup stage complete");
        }
        Ok(())
    }

    /// Tear down the completed prefix in reverse registration order.
    ///
    /// Every failure is collected; teardown never stops early, so a
    /// broken git-server uninstall cannot strand the bootstrap
    /// cluster.
    pub async fn teardown_completed(&self, env: &EnvironmentState) -> Vec<CleanupError> {
        let mut errors = Vec::new();
        for stage in self.stages[..self.completed].iter().rev() {
            info!(stage = stage.name(), "tearing down stage");
            if let Err(e) = stage.teardown(env).await {
                warn!(stage = stage.name(), error = %e, "teardown failed, continuing");
                errors.push(CleanupError::new(stage.name(), e.to_string()));
            }
        }
        errors
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}
