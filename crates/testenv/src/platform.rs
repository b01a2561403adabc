//! Platform install stage.
//!
//! Installs cert-manager (when configured), resolves the externally
//! reachable host name (pre-platform hook wins, then the
//! `PLATFORM_HOSTNAME` variable, then a name derived from the
//! bootstrap cluster), installs the platform chart, applies the
//! settings patch, and waits for the platform deployment.

use std::collections::HashMap;

use anchorage_core::envstate::{EnvironmentState, PlatformAccess};
use anchorage_core::error::StageError;
use anchorage_core::stage::Stage;
use anchorage_core::wait::wait_until_ready;
use tracing::info;

use crate::context::StageContext;
use crate::installer::{ChartRequest, ClusterApi, Installer};
use crate::manifests;

pub const STAGE_NAME: &str = "platform";

pub struct PlatformStage<I, A> {
    ctx: StageContext<I, A>,
}

impl<I: Installer, A: ClusterApi> PlatformStage<I, A> {
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

    async fn install_cert_manager(&self) -> Result<(), StageError> {
        let config = &self.ctx.config;
        let request = ChartRequest {
            repo_name: self.variable("CERT_MANAGER_REPO_NAME")?,
            repo_url: self.variable("CERT_MANAGER_REPO_URL")?,
            chart: self.variable("CERT_MANAGER_CHART")?,
            version: self.variable("CERT_MANAGER_VERSION")?,
            release_name: "cert-manager".to_owned(),
            namespace: config.platform.cert_manager_namespace.clone(),
            values: HashMap::from([("crds.enabled".to_owned(), "true".to_owned())]),
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
            .resolve(&config.platform.wait_profile)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        wait_until_ready(profile, || {
            self.ctx
                .api
                .deployment_ready(&config.platform.cert_manager_namespace, "cert-manager")
        })
        .await
        .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        info!("cert-manager ready");
        Ok(())
    }

    fn resolve_host_name(&self, env: &EnvironmentState) -> Result<String, StageError> {
        if let Some(host) = self
            .ctx
            .hooks
            .pre_platform(&self.ctx.config, env)
            .host_name
        {
            info!(host, "host name resolved by pre-platform hook");
            return Ok(host);
        }
        if let Ok(host) = self.ctx.config.get_variable("PLATFORM_HOSTNAME") {
            return Ok(host.to_owned());
        }
        let proxy = env
            .cluster_proxy()
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        Ok(format!("{}.sslip.io", proxy.name))
    }
}

impl<I: Installer, A: ClusterApi> Stage for PlatformStage<I, A> {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    async fn run(&self, env: &mut EnvironmentState) -> Result<(), StageError> {
        let config = &self.ctx.config;

        if config.platform.install_cert_manager {
            self.install_cert_manager().await?;
        }

        let host_name = self.resolve_host_name(env)?;
        let chart = self.variable("PLATFORM_CHART")?;
        let request = ChartRequest {
            repo_name: self.variable("PLATFORM_REPO_NAME")?,
            repo_url: self.variable("PLATFORM_REPO_URL")?,
            chart: chart.clone(),
            version: self.variable("PLATFORM_VERSION")?,
            release_name: chart.clone(),
            namespace: config.platform.namespace.clone(),
            values: HashMap::from([
                ("hostname".to_owned(), host_name.clone()),
                (
                    "bootstrapPassword".to_owned(),
                    config.platform.password.clone(),
                ),
            ]),
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
        self.ctx
            .installer
            .apply_manifest(manifests::PLATFORM_SETTINGS_PATCH)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;

        let profile = self
            .ctx
            .intervals
            .resolve(&config.platform.wait_profile)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        wait_until_ready(profile, || {
            self.ctx
                .api
                .deployment_ready(&config.platform.namespace, &chart)
        })
        .await
        .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;

        info!(host = %host_name, namespace = %config.platform.namespace, "platform ready");
        env.set_platform(PlatformAccess {
            host_name,
            namespace: config.platform.namespace.clone(),
            password: config.platform.password.clone(),
        })
        .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))
    }

    async fn teardown(&self, _env: &EnvironmentState) -> Result<(), StageError> {
        // Reclaimed with the bootstrap cluster.
        Ok(())
    }
}
