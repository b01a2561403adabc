//! Error taxonomy for the anchorage pipeline.
//!
//! Every domain has its own enum; [`AnchorageError`] is the top-level
//! type the orchestrator and the `?` operator converge on. Cleanup
//! errors are deliberately separate: they are collected and reported,
//! never propagated through `?`.

use std::time::Duration;

/// Top-level anchorage error.
#[derive(Debug, thiserror::Error)]
pub enum AnchorageError {
    /// Configuration error (fatal before any provisioning begins).
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Readiness wait failed (timeout or probe fault).
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),

    /// Environment-state discipline violation.
    #[error("environment state error: {0}")]
    EnvState(#[from] EnvStateError),

    /// A provisioning stage failed.
    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    /// A scenario state transition failed.
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration file could not be parsed.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A configuration value is out of range or inconsistent.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A required variable is absent from the `[variables]` table.
    #[error("missing config variable: {name}")]
    MissingVariable { name: String },

    /// A wait-profile name has no entry in the `[intervals]` table.
    #[error("unknown interval profile: {name}")]
    UnknownIntervalProfile { name: String },
}

/// A readiness probe detected a non-transient remote fault.
///
/// Probes return this to stop polling immediately: the condition will
/// never become true (install rejected, resource in terminal error
/// state), so waiting out the timeout would only hide the cause.
#[derive(Debug, thiserror::Error)]
#[error("probe failed for {component}: {reason}")]
pub struct ProbeError {
    /// Component the probe was checking.
    pub component: String,
    /// Fault description from the remote API.
    pub reason: String,
}

impl ProbeError {
    pub fn new(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

/// Readiness wait outcome when the condition was never observed.
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The profile's timeout elapsed without readiness.
    #[error("'{profile}' not ready within {timeout:?}")]
    Timeout {
        /// Wait-profile name, for diagnostics.
        profile: String,
        /// The profile's configured timeout.
        timeout: Duration,
    },

    /// The probe reported a non-transient error; not retried.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

/// Environment-state discipline errors.
///
/// The environment record is write-once per field; both directions of
/// violation (rewriting, or reading before the owning stage ran) are
/// surfaced explicitly rather than panicking.
#[derive(Debug, thiserror::Error)]
pub enum EnvStateError {
    /// A stage attempted to rewrite a field an earlier stage owns.
    #[error("environment field '{field}' already set")]
    AlreadySet { field: &'static str },

    /// A stage read a field its dependency never published.
    #[error("environment field '{field}' not set")]
    Missing { field: &'static str },
}

/// A provisioning stage failed.
#[derive(Debug, thiserror::Error)]
#[error("stage '{stage}' failed: {reason}")]
pub struct StageError {
    /// Stage name as registered in the pipeline.
    pub stage: String,
    /// Underlying failure description.
    pub reason: String,
}

impl StageError {
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

/// A scenario state transition failed or timed out.
///
/// Carries the last state the scenario reached so the report can say
/// how far the flow got before failing.
#[derive(Debug, thiserror::Error)]
#[error("scenario failed in state '{last_state}': {reason}")]
pub struct ScenarioError {
    /// Last state reached before the failing transition.
    pub last_state: String,
    /// Transition failure description.
    pub reason: String,
}

impl ScenarioError {
    pub fn new(last_state: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            last_state: last_state.into(),
            reason: reason.into(),
        }
    }
}

/// A teardown step failed.
///
/// Collected by the cleanup coordinator and reported after the primary
/// result; never aborts remaining teardown steps and never changes the
/// scenario's pass/fail outcome.
#[derive(Debug, thiserror::Error)]
#[error("cleanup of '{stage}' failed: {reason}")]
pub struct CleanupError {
    /// Stage whose teardown failed.
    pub stage: String,
    /// Failure description.
    pub reason: String,
}

impl CleanupError {
    pub fn new(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_profile_and_duration() {
        let err = WaitError::Timeout {
            profile: "wait-gitea".to_owned(),
            timeout: Duration::from_secs(600),
        };
        let msg = err.to_string();
        assert!(msg.contains("wait-gitea"));
        assert!(msg.contains("not ready within"));
    }

    #[test]
    fn probe_error_propagates_through_wait_error() {
        let err: WaitError = ProbeError::new("platform", "install rejected").into();
        assert!(matches!(err, WaitError::Probe(_)));
        assert!(err.to_string().contains("install rejected"));
    }

    #[test]
    fn scenario_error_carries_last_state() {
        let err = ScenarioError::new("Importing", "registration never observed");
        assert!(err.to_string().contains("Importing"));
    }

    #[test]
    fn env_state_errors_name_the_field() {
        let set = EnvStateError::AlreadySet {
            field: "git_address",
        };
        let missing = EnvStateError::Missing {
            field: "cluster_proxy",
        };
        assert!(set.to_string().contains("git_address"));
        assert!(missing.to_string().contains("cluster_proxy"));
    }

    #[test]
    fn converts_to_anchorage_error() {
        let err: AnchorageError = ConfigError::MissingVariable {
            name: "GITSERVER_REPO_URL".to_owned(),
        }
        .into();
        assert!(matches!(err, AnchorageError::Config(_)));
    }
}
