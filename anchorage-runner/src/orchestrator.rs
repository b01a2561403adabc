//! Pipeline orchestration -- stage assembly, scenario execution, and
//! guaranteed cleanup.
//!
//! The [`Orchestrator`] is the central coordinator of
//! `anchorage-runner`. It wires the five setup stages into a
//! [`StagePipeline`], runs them fail-fast, hands the completed
//! environment to the scenario runner, and always finishes with the
//! cleanup coordinator, whatever happened before.
//!
//! # Stage Order
//!
//! 1. Bootstrap cluster (publishes the cluster proxy)
//! 2. Ingress (classic / ngrok / eks-native)
//! 3. Platform (cert-manager + platform chart)
//! 4. Lifecycle controller
//! 5. Git server
//!
//! Teardown runs in strict reverse over the stages that completed.

use std::sync::Arc;

use anchorage_core::config::PipelineConfig;
use anchorage_core::envstate::EnvironmentState;
use anchorage_core::error::AnchorageError;
use anchorage_core::intervals::IntervalRegistry;
use anchorage_core::stage::StagePipeline;
use anchorage_scenario::{ScenarioInput, ScenarioReport, ScenarioRunner};
use anchorage_testenv::hooks::SetupHooks;
use anchorage_testenv::installer::{ClusterApi, Installer};
use anchorage_testenv::{
    ClusterStage, ControllerStage, GitServerStage, IngressStage, PlatformStage, StageContext,
};
use tracing::{error, info};

use crate::cleanup::{self, CleanupReport};

/// Result of one full pipeline run.
///
/// The scenario result and the cleanup report are deliberately
/// separate: cleanup failures are reported but never change the
/// scenario's pass/fail outcome.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Setup + scenario result.
    pub scenario: Result<ScenarioReport, AnchorageError>,
    /// What cleanup did afterwards.
    pub cleanup: CleanupReport,
}

impl PipelineOutcome {
    /// Process exit code: 0 when the scenario passed, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.scenario.is_ok() { 0 } else { 1 }
    }
}

/// The main pipeline orchestrator.
pub struct Orchestrator<I, A> {
    config: Arc<PipelineConfig>,
    intervals: Arc<IntervalRegistry>,
    installer: Arc<I>,
    api: Arc<A>,
    pipeline: StagePipeline,
    skip_cleanup: bool,
}

impl<I: Installer, A: ClusterApi> Orchestrator<I, A> {
    /// Wire the five setup stages from a validated configuration.
    pub fn build(
        config: Arc<PipelineConfig>,
        installer: Arc<I>,
        api: Arc<A>,
        hooks: Arc<dyn SetupHooks>,
        skip_cleanup: bool,
    ) -> Result<Self, AnchorageError> {
        let intervals = Arc::new(config.interval_registry()?);
        let ctx = StageContext::new(
            Arc::clone(&config),
            Arc::clone(&intervals),
            Arc::clone(&installer),
            Arc::clone(&api),
            hooks,
        );

        let mut pipeline = StagePipeline::new();
        pipeline.register(Box::new(ClusterStage::new(ctx.clone())))?;
        pipeline.register(Box::new(IngressStage::new(ctx.clone())))?;
        pipeline.register(Box::new(PlatformStage::new(ctx.clone())))?;
        pipeline.register(Box::new(ControllerStage::new(ctx.clone())))?;
        pipeline.register(Box::new(GitServerStage::new(ctx)))?;

        Ok(Self {
            config,
            intervals,
            installer,
            api,
            pipeline,
            skip_cleanup,
        })
    }

    /// Run setup, the scenario, and always cleanup.
    pub async fn run(&mut self) -> PipelineOutcome {
        let mut env = EnvironmentState::new();
        let scenario = self.execute(&mut env).await;

        match &scenario {
            Ok(report) => info!(final_state = %report.final_state, "scenario passed"),
            Err(e) => error!(error = %e, "pipeline failed"),
        }
        if self.skip_cleanup && !self.config.scenario.skip_deletion_test {
            // Orthogonal flags: the scenario may already have deleted
            // its own workload cluster even though cleanup is skipped.
            info!("cleanup skipped while the scenario's deletion phase was enabled");
        }

        let cleanup = cleanup::cleanup(&self.pipeline, &env, self.skip_cleanup).await;
        PipelineOutcome { scenario, cleanup }
    }

    async fn execute(
        &mut self,
        env: &mut EnvironmentState,
    ) -> Result<ScenarioReport, AnchorageError> {
        info!(stages = ?self.pipeline.stage_names(), "starting environment setup");
        self.pipeline.run_all(env).await?;

        let input = ScenarioInput::from_environment(&self.config, env)?;
        let runner = ScenarioRunner::new(
            Arc::clone(&self.installer),
            Arc::clone(&self.api),
            Arc::clone(&self.intervals),
        );
        let report = runner.run(&input, env).await?;
        Ok(report)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
