//! Shared foundation of the anchorage e2e pipeline.
//!
//! Provides the error taxonomy, the TOML configuration surface, the
//! named wait-profile registry, the bounded readiness waiter, the
//! write-once environment record, and the stage abstraction the
//! orchestrator folds over.

pub mod config;
pub mod envstate;
pub mod error;
pub mod intervals;
pub mod stage;
pub mod wait;

// --- Core type re-exports ---

pub use config::PipelineConfig;
pub use envstate::{
    ClusterProvider, ClusterProxy, EnvironmentState, GitAccess, IngressType, PlatformAccess,
};
pub use error::{
    AnchorageError, CleanupError, ConfigError, EnvStateError, ProbeError, ScenarioError,
    StageError, WaitError,
};
pub use intervals::{IntervalProfile, IntervalRegistry, IntervalSpec};
pub use stage::{BoxFuture, DynStage, Stage, StagePipeline};
pub use wait::wait_until_ready;
