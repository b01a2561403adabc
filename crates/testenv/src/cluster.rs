//! Bootstrap-cluster stage.
//!
//! First stage of the pipeline: resolves the cluster provider and the
//! ingress strategy (hook overrides win over config), provisions or
//! attaches to the bootstrap cluster, waits until its control plane
//! answers, and publishes the cluster proxy for every later stage.

use anchorage_core::envstate::{ClusterProvider, EnvironmentState, IngressType};
use anchorage_core::error::StageError;
use anchorage_core::stage::Stage;
use anchorage_core::wait::wait_until_ready;
use tracing::info;

use crate::context::StageContext;
use crate::installer::{ClusterApi, ClusterRequest, Installer};

pub const STAGE_NAME: &str = "cluster";

/// Deployment probed to decide the cluster is answering.
const DNS_DEPLOYMENT: (&str, &str) = ("kube-system", "coredns");

pub struct ClusterStage<I, A> {
    ctx: StageContext<I, A>,
}

impl<I: Installer, A: ClusterApi> ClusterStage<I, A> {
    pub fn new(ctx: StageContext<I, A>) -> Self {
        Self { ctx }
    }

    fn parse_provider(raw: &str) -> ClusterProvider {
        match raw {
            "kind" => ClusterProvider::Kind,
            "eks" => ClusterProvider::Eks,
            other => ClusterProvider::Custom(other.to_owned()),
        }
    }

    fn parse_ingress_type(raw: &str) -> IngressType {
        match raw {
            "ngrok" => IngressType::Ngrok,
            "eks-native" => IngressType::EksNative,
            // Config validation already restricted the set.
            _ => IngressType::Classic,
        }
    }
}

impl<I: Installer, A: ClusterApi> Stage for ClusterStage<I, A> {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    async fn run(&self, env: &mut EnvironmentState) -> Result<(), StageError> {
        let config = &self.ctx.config;
        let hook_output = self.ctx.hooks.pre_cluster(config);

        let provider = hook_output
            .provider
            .unwrap_or_else(|| Self::parse_provider(&config.cluster.provider));
        let ingress_type = hook_output
            .ingress_type
            .unwrap_or_else(|| Self::parse_ingress_type(&config.ingress.ingress_type));
        info!(%provider, %ingress_type, "resolved cluster provider and ingress strategy");

        let request = ClusterRequest {
            name: config.cluster.name.clone(),
            provider,
            kubernetes_version: config.cluster.kubernetes_version.clone(),
            use_existing: config.cluster.use_existing,
            artifacts_dir: config.general.artifacts_dir.clone(),
        };

        let proxy = self
            .ctx
            .installer
            .create_cluster(&request)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))?;

        let profile = self
            .ctx
            .intervals
            .resolve(&config.cluster.wait_profile)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        let (dns_ns, dns_name) = DNS_DEPLOYMENT;
        wait_until_ready(profile, || self.ctx.api.deployment_ready(dns_ns, dns_name))
            .await
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;

        info!(cluster = %proxy.name, kubeconfig = %proxy.kubeconfig_path, "bootstrap cluster ready");
        env.set_cluster_proxy(proxy)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        env.set_ingress_type(ingress_type)
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        Ok(())
    }

    async fn teardown(&self, env: &EnvironmentState) -> Result<(), StageError> {
        if self.ctx.config.cluster.use_existing {
            info!("bootstrap cluster was pre-existing, leaving it in place");
            return Ok(());
        }
        let proxy = env
            .cluster_proxy()
            .map_err(|e| StageError::new(STAGE_NAME, e.to_string()))?;
        self.ctx
            .installer
            .delete_cluster(proxy)
            .await
            .map_err(|e| e.into_stage_error(STAGE_NAME))
    }
}
