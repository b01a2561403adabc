//! Test-environment error type.
//!
//! [`TestEnvError`] covers failures raised by the installer and
//! cluster-API collaborators and by stage request construction.
//! `From<TestEnvError> for AnchorageError` lets stages propagate with
//! `?` into the top-level taxonomy.

use anchorage_core::error::{AnchorageError, StageError};

/// Test-environment domain error.
#[derive(Debug, thiserror::Error)]
pub enum TestEnvError {
    /// Chart repository registration or install invocation failed.
    #[error("installer error: {0}")]
    Installer(String),

    /// Cluster provisioning or deletion failed at the provider.
    #[error("cluster provider error: {0}")]
    Provider(String),

    /// Manifest application/removal failed.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A Kubernetes API call (secret, namespace, label) failed.
    #[error("cluster api error: {0}")]
    ClusterApi(String),

    /// A required configuration variable was missing or invalid.
    #[error("config error: {0}")]
    Config(#[from] anchorage_core::error::ConfigError),
}

impl TestEnvError {
    /// Wrap into a [`StageError`] attributed to `stage`.
    pub fn into_stage_error(self, stage: &str) -> StageError {
        StageError::new(stage, self.to_string())
    }
}

impl From<TestEnvError> for AnchorageError {
    fn from(err: TestEnvError) -> Self {
        match err {
            TestEnvError::Config(e) => AnchorageError::Config(e),
            other => AnchorageError::Stage(StageError::new("testenv", other.to_string())),
        }
    }
}
