//! Cleanup coordinator.
//!
//! Invoked exactly once per pipeline run, on every path: after
//! scenario success, scenario failure, and setup failure alike.
//! Failures are collected and reported as warnings; they never abort
//! the remaining teardown steps and never change the scenario's
//! pass/fail result.

use anchorage_core::envstate::EnvironmentState;
use anchorage_core::error::CleanupError;
use anchorage_core::stage::StagePipeline;
use tracing::{info, warn};

/// What cleanup did, for reporting.
#[derive(Debug)]
pub struct CleanupReport {
    /// Cleanup was skipped, resources left standing for inspection.
    pub skipped: bool,
    /// Teardown steps that failed.
    pub errors: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Tear down everything the completed stages provisioned, in strict
/// reverse setup order. `skip` leaves all resources in place.
pub async fn cleanup(
    pipeline: &StagePipeline,
    env: &EnvironmentState,
    skip: bool,
) -> CleanupReport {
    if skip {
        info!("cleanup skipped, provisioned resources left standing for inspection");
        return CleanupReport {
            skipped: true,
            errors: Vec::new(),
        };
    }

    info!(completed_stages = pipeline.completed(), "tearing down test environment");
    let errors = pipeline.teardown_completed(env).await;
    for error in &errors {
        warn!(stage = %error.stage, %error, "teardown step failed");
    }
    if errors.is_empty() {
        info!("test environment torn down");
    }
    CleanupReport {
        skipped: false,
        errors,
    }
}
