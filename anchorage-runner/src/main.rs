use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use anchorage_core::config::PipelineConfig;
use anchorage_runner::cli::RunnerCli;
use anchorage_runner::exec::{CommandInstaller, KubectlApi, kubeconfig_path};
use anchorage_runner::logging;
use anchorage_runner::orchestrator::Orchestrator;
use anchorage_testenv::hooks::DefaultHooks;

/// Namespace the platform registers imported clusters in.
const IMPORT_NAMESPACE: &str = "fleet-default";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RunnerCli::parse();

    let mut config = PipelineConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    logging::init_tracing(&config.general)?;

    if cli.validate {
        tracing::info!(config = %cli.config.display(), "configuration valid");
        return Ok(());
    }

    let skip_cleanup = cli.skip_cleanup || config.scenario.skip_cleanup;
    let kubeconfig = kubeconfig_path(&config.general.artifacts_dir, &config.cluster.name);
    let installer = Arc::new(CommandInstaller::new(&kubeconfig));
    let api = Arc::new(KubectlApi::new(&kubeconfig, IMPORT_NAMESPACE));

    tracing::info!("anchorage-runner starting");
    let mut orchestrator = Orchestrator::build(
        Arc::new(config),
        installer,
        api,
        Arc::new(DefaultHooks),
        skip_cleanup,
    )
    .map_err(|e| anyhow::anyhow!("failed to build pipeline: {}", e))?;

    let outcome = orchestrator.run().await;
    std::process::exit(outcome.exit_code());
}
