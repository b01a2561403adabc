//! Ingress stage.
//!
//! Exposes the platform to the outside world in one of three modes,
//! chosen during the cluster stage (hook override or config):
//!
//! - `classic`: apply the bundled ingress-controller manifest plus the
//!   default-ingress-class patch, wait for the controller deployment.
//! - `ngrok`: install the ngrok operator chart with credentials from
//!   the variables table, wait for the operator deployment.
//! - `eks-native`: nothing to deploy, only the default-class patch;
//!   the provider's load balancer terminates traffic.

use std::collections::HashMap;

use anchorage_core::envstate::{EnvironmentState, IngressType};
use anchorage_core::error::StageError;
use anchorage_core::stage::Stage;
use anchorage_core::wait::wait_until_ready;
use tracing::info;

use crate::context::StageContext;
use crate::installer::{ChartRequest, ClusterApi, Installer};
use crate::manifests;

pub const STAGE_NAME: &str = "ingress";

const NGROK_RELEASE: &str = "ngrok-operator";

pub struct IngressStage<I, A> {
    ctx: StageContext<I, A>,
}

impl<I: Installer, A: ClusterApi> IngressStage<I, A> {
    pub fn new(ctx: StageContext<I, A>) -> Self {
        Self { ctx }
    }

    async fn deploy_classic(&self) -> Result<(), StageError> {
        let config = &self.ctx.config;
        self.ctx
            .installer
            .apply_manifest(manifests::CLASSIC_INGRESS)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;
        self.ctx
            .installer
            .apply_manifest(manifests::DEFAULT_INGRESS_CLASS_PATCH)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;

        let profile = self
            .ctx
            .intervals
            .resolve(&config.ingress.wait_profile)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        wait_until_ready(profile, || {
            self.ctx
                .api
                .deployment_ready(&config.ingress.namespace, &config.ingress.deployment)
        })
        .await
        .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))
    }

    async fn deploy_ngrok(&self) -> Result<(), StageError> {
        let config = &self.ctx.config;
        let get = |name: &str| {
            config
                .get_variable(name)
                .map(str::to_owned)
                .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))
        };

        let request = ChartRequest {
            repo_name: get("NGROK_REPO_NAME")?,
            repo_url: get("NGROK_REPO_URL")?,
            chart: NGROK_RELEASE.to_owned(),
            version: get("NGROK_VERSION")?,
            release_name: NGROK_RELEASE.to_owned(),
            namespace: config.ingress.namespace.clone(),
            values: HashMap::from([
                ("credentials.apiKey".to_owned(), get("NGROK_API_KEY")?),
                ("credentials.authtoken".to_owned(), get("NGROK_AUTH_TOKEN")?),
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

        let profile = self
            .ctx
            .intervals
            .resolve(&config.ingress.wait_profile)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        wait_until_ready(profile, || {
            self.ctx
                .api
                .deployment_ready(&config.ingress.namespace, NGROK_RELEASE)
        })
        .await
        .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))
    }

    async fn patch_default_class(&self) -> Result<(), StageError> {
        self.ctx
            .installer
            .apply_manifest(manifests::DEFAULT_INGRESS_CLASS_PATCH)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))
    }
}

impl<I: Installer, A: ClusterApi> Stage for IngressStage<I, A> {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    async fn run(&self, env: &mut EnvironmentState) -> Result<(), StageError> {
        let ingress_type = *env
            .ingress_type()
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        info!(%ingress_type, "deploying ingress");

        match ingress_type {
            IngressType::Classic => self.deploy_classic().await,
            IngressType::Ngrok => self.deploy_ngrok().await,
            IngressType::EksNative => self.patch_default_class().await,
        }
    }

    async fn teardown(&self, _env: &EnvironmentState) -> Result<(), StageError> {
        // Lives inside the bootstrap cluster; reclaimed when the
        // cluster stage tears down.
        Ok(())
    }
}
