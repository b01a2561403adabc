//! Git-server install stage.
//!
//! Last setup stage: installs the source-control server the scenario
//! pushes manifests to. Creates the admin auth secret (password
//! generated per run when not configured), installs the chart (the
//! pre-gitserver hook may rewrite service exposure for the active
//! cluster provider), waits for the rollout, resolves the externally
//! reachable HTTP address from the service, and publishes the access
//! record.
//!
//! Unlike the in-cluster stages it owns a real teardown: the release
//! is uninstalled and removal is confirmed under the dedicated
//! uninstall wait profile.

use std::collections::HashMap;
use std::sync::Mutex;

use anchorage_core::envstate::{EnvironmentState, GitAccess};
use anchorage_core::error::StageError;
use anchorage_core::stage::Stage;
use anchorage_core::wait::wait_until_ready;
use tracing::info;
use uuid::Uuid;

use crate::context::StageContext;
use crate::installer::{ChartRequest, ClusterApi, Installer};

pub const STAGE_NAME: &str = "gitserver";

const RELEASE_NAME: &str = "gitserver";

pub struct GitServerStage<I, A> {
    ctx: StageContext<I, A>,
}

impl<I: Installer, A: ClusterApi> GitServerStage<I, A> {
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

    fn stage_err(&self, e: impl std::fmt::Display) -> StageError {
        StageError::new(STAGE_NAME, e.to_string())
    }
}

impl<I: Installer, A: ClusterApi> Stage for GitServerStage<I, A> {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    async fn run(&self, env: &mut EnvironmentState) -> Result<(), StageError> {
        let config = &self.ctx.config;
        let gs = &config.gitserver;

        let password = if gs.password.is_empty() {
            Uuid::new_v4().simple().to_string()
        } else {
            gs.password.clone()
        };

        self.ctx
            .api
            .create_namespace(&gs.namespace)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;
        self.ctx
            .api
            .create_secret(
                &gs.namespace,
                &gs.auth_secret_name,
                &HashMap::from([
                    ("username".to_owned(), gs.username.clone()),
                    ("password".to_owned(), password.clone()),
                ]),
            )
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;

        let mut request = ChartRequest {
            repo_name: self.variable("GITSERVER_REPO_NAME")?,
            repo_url: self.variable("GITSERVER_REPO_URL")?,
            chart: self.variable("GITSERVER_CHART")?,
            version: self.variable("GITSERVER_CHART_VERSION")?,
            release_name: RELEASE_NAME.to_owned(),
            namespace: gs.namespace.clone(),
            values: HashMap::from([
                ("gitea.admin.username".to_owned(), gs.username.clone()),
                ("gitea.admin.password".to_owned(), password.clone()),
                ("service.http.type".to_owned(), "NodePort".to_owned()),
            ]),
        };
        // Environment-specific exposure (e.g. LoadBalancer on managed
        // providers) comes from the hook.
        self.ctx.hooks.pre_gitserver(config, env, &mut request);

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

        let rollout_profile = self
            .ctx
            .intervals
            .resolve(&gs.rollout_wait_profile)
            .map_err(|e| self.stage_err(e))?;
        wait_until_ready(rollout_profile, || {
            self.ctx.api.deployment_ready(&gs.namespace, RELEASE_NAME)
        })
        .await
        .map_err(|e| self.stage_err(e))?;

        // The address probe doubles as the result: remember the last
        // value the service reported.
        let service_name = format!("{RELEASE_NAME}-http");
        let resolved: Mutex<Option<String>> = Mutex::new(None);
        let service_profile = self
            .ctx
            .intervals
            .resolve(&gs.service_wait_profile)
            .map_err(|e| self.stage_err(e))?;
        wait_until_ready(service_profile, || async {
            let address = self
                .ctx
                .api
                .service_address(&gs.namespace, &service_name)
                .await?;
            let found = address.is_some();
            *resolved.lock().unwrap_or_else(|p| p.into_inner()) = address;
            Ok(found)
        })
        .await
        .map_err(|e| self.stage_err(e))?;

        let address = resolved
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .ok_or_else(|| self.stage_err("service reported ready without an address"))?;
        let http_address = format!("http://{address}");
        info!(address = %http_address, "git server ready");

        env.set_git_access(GitAccess {
            http_address,
            auth_secret_name: gs.auth_secret_name.clone(),
            username: gs.username.clone(),
            password,
        })
        .map_err(|e| self.stage_err(e))
    }

    async fn teardown(&self, _env: &EnvironmentState) -> Result<(), StageError> {
        let gs = &self.ctx.config.gitserver;
        self.ctx
            .installer
            .uninstall_release(RELEASE_NAME, &gs.namespace)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;

        let profile = self
            .ctx
            .intervals
            .resolve(&gs.uninstall_wait_profile)
            .map_err(|e| self.stage_err(e))?;
        wait_until_ready(profile, || {
            self.ctx.api.deployment_gone(&gs.namespace, RELEASE_NAME)
        })
        .await
        .map_err(|e| self.stage_err(e))
    }
}
