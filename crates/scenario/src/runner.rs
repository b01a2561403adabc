//! Scenario runner.
//!
//! Walks the import scenario as an explicit state machine. Every
//! failure is converted into a [`ScenarioError`] carrying the last
//! state reached; the caller still owns cleanup.

use std::fmt;
use std::sync::Arc;

use anchorage_core::envstate::EnvironmentState;
use anchorage_core::error::ScenarioError;
use anchorage_core::intervals::{IntervalProfile, IntervalRegistry};
use anchorage_core::wait::wait_until_ready;
use anchorage_testenv::installer::{ClusterApi, Installer};
use tracing::info;

use crate::input::ScenarioInput;
use crate::manifest;
use crate::state::ScenarioState;

/// Namespace label the lifecycle controller watches for; clusters in a
/// namespace carrying it are imported without manual registration.
pub const AUTO_IMPORT_LABEL: &str = "cluster-api.cattle.io/rancher-auto-import";

/// What a successful run did, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Terminal state of the walk.
    pub final_state: ScenarioState,
    /// Whether the delete-and-recreate segment ran.
    pub reimport_verified: bool,
    /// Whether the deletion segment ran.
    pub deletion_verified: bool,
}

pub struct ScenarioRunner<I, A> {
    installer: Arc<I>,
    api: Arc<A>,
    intervals: Arc<IntervalRegistry>,
}

impl<I: Installer, A: ClusterApi> ScenarioRunner<I, A> {
    pub fn new(installer: Arc<I>, api: Arc<A>, intervals: Arc<IntervalRegistry>) -> Self {
        Self {
            installer,
            api,
            intervals,
        }
    }

    fn fail(state: ScenarioState, e: impl fmt::Display) -> ScenarioError {
        ScenarioError::new(state.to_string(), e.to_string())
    }

    fn profile(
        &self,
        state: ScenarioState,
        name: &str,
    ) -> Result<&IntervalProfile, ScenarioError> {
        self.intervals.resolve(name).map_err(|e| Self::fail(state, e))
    }

    async fn await_imported(
        &self,
        input: &ScenarioInput,
        profile: &IntervalProfile,
        state: ScenarioState,
    ) -> Result<(), ScenarioError> {
        wait_until_ready(profile, || self.api.cluster_imported(&input.cluster_name))
            .await
            .map_err(|e| Self::fail(state, e))
    }

    async fn await_gone(
        &self,
        input: &ScenarioInput,
        profile: &IntervalProfile,
        state: ScenarioState,
    ) -> Result<(), ScenarioError> {
        wait_until_ready(profile, || self.api.cluster_gone(&input.cluster_name))
            .await
            .map_err(|e| Self::fail(state, e))
    }

    /// Execute the scenario against a completed environment.
    ///
    /// The environment is read-only here; the runner only touches the
    /// workload cluster, never the setup stages' resources.
    pub async fn run(
        &self,
        input: &ScenarioInput,
        env: &EnvironmentState,
    ) -> Result<ScenarioReport, ScenarioError> {
        let mut state = ScenarioState::Created;

        if !env.has_cluster() || !env.has_git_server() {
            return Err(Self::fail(state, "environment incomplete, setup did not finish"));
        }
        let manifest = manifest::cluster_manifest(input).map_err(|e| Self::fail(state, e))?;
        let create_profile = self.profile(state, &input.create_wait_profile)?;
        let delete_profile = self.profile(state, &input.delete_wait_profile)?;

        info!(
            cluster = %input.cluster_name,
            template = %input.template,
            git = %input.git_http_address,
            "starting import scenario"
        );

        self.api
            .create_namespace(&input.namespace)
            .await
            .map_err(|e| Self::fail(state, e))?;
        if input.label_namespace {
            self.api
                .label_namespace(&input.namespace, AUTO_IMPORT_LABEL, "true")
                .await
                .map_err(|e| Self::fail(state, e))?;
        }
        self.installer
            .apply_manifest(&manifest)
            .await
            .map_err(|e| Self::fail(state, e))?;

        state = ScenarioState::Importing;
        info!(%state, "waiting for cluster import");
        self.await_imported(input, create_profile, state).await?;
        state = ScenarioState::Imported;
        info!(%state, "cluster imported");

        let mut reimport_verified = false;
        if input.test_cluster_reimport {
            state = ScenarioState::Reimporting;
            info!(%state, "recreating cluster under the same identity");
            self.installer
                .delete_manifest(&manifest)
                .await
                .map_err(|e| Self::fail(state, e))?;
            self.await_gone(input, delete_profile, state).await?;
            self.installer
                .apply_manifest(&manifest)
                .await
                .map_err(|e| Self::fail(state, e))?;
            self.await_imported(input, create_profile, state).await?;
            state = ScenarioState::Reimported;
            reimport_verified = true;
            info!(%state, "reimport confirmed");
        }

        let mut deletion_verified = false;
        if !input.skip_deletion_test {
            state = ScenarioState::Deleting;
            info!(%state, "deleting workload cluster");
            self.installer
                .delete_manifest(&manifest)
                .await
                .map_err(|e| Self::fail(state, e))?;
            self.await_gone(input, delete_profile, state).await?;
            state = ScenarioState::Deleted;
            deletion_verified = true;
            info!(%state, "workload cluster reclaimed");
        }

        Ok(ScenarioReport {
            final_state: state,
            reimport_verified,
            deletion_verified,
        })
    }
}
