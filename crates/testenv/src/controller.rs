//! Lifecycle-controller install stage.
//!
//! Installs the cluster-lifecycle controller chart (the component that
//! watches labeled namespaces and imports workload clusters into the
//! platform) and publishes its namespace and version.

use anchorage_core::envstate::EnvironmentState;
use anchorage_core::error::StageError;
use anchorage_core::stage::Stage;
use anchorage_core::wait::wait_until_ready;
use tracing::info;

use crate::context::StageContext;
use crate::installer::{ChartRequest, ClusterApi, Installer};

pub const STAGE_NAME: &str = "controller";

pub struct ControllerStage<I, A> {
    ctx: StageContext<I, A>,
}

impl<I: Installer, A: ClusterApi> ControllerStage<I, A> {
    pub fn new(ctx: StageContext<I, A>) -> Self {
        Self { ctx }
    }

    fn variable(&self, name: &str) -> Result<String, StageError> {
        self.ctx
            .config
            .get_variable(name)
            .map(str::to_owned)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))
    }
}

impl<I: Installer, A: ClusterApi> Stage for ControllerStage<I, A> {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    async fn run(&self, env: &mut EnvironmentState) -> Result<(), StageError> {
        let config = &self.ctx.config;
        let chart = self.variable("CONTROLLER_CHART")?;
        let version = self.variable("CONTROLLER_VERSION")?;

        let request = ChartRequest {
            repo_name: self.variable("CONTROLLER_REPO_NAME")?,
            repo_url: self.variable("CONTROLLER_REPO_URL")?,
            chart: chart.clone(),
            version: version.clone(),
            release_name: chart.clone(),
            namespace: config.controller.namespace.clone(),
            values: config.controller.additional_values.clone(),
        };

        self.ctx
            .installer
            .add_repository(&request.repo_name, &request.repo_url)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;
        self.ctx
            .installer
            .install_chart(&request)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;

        let profile = self
            .ctx
            .intervals
            .resolve(&config.controller.wait_profile)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        wait_until_ready(profile, || {
            self.ctx
                .api
                .deployment_ready(&config.controller.namespace, &chart)
        })
        .await
        .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;

        info!(namespace = %config.controller.namespace, version = %version, "lifecycle controller ready");
        env.set_controller_namespace(config.controller.namespace.clone())
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        env.set_controller_version(version)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))
    }

    async fn teardown(&self, _env: &EnvironmentState) -> Result<(), StageError> {
        // Reclaimed with the bootstrap cluster.
        Ok(())
    }
}
