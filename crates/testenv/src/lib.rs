//! Environment-provisioning stages of the anchorage e2e pipeline.
//!
//! Five [`Stage`](anchorage_core::Stage) implementations bring up the
//! test environment in order: bootstrap cluster, ingress, management
//! platform, lifecycle controller, git server. Each stage talks to the
//! outside world through the [`Installer`] and [`ClusterApi`] traits
//! and publishes its outputs into the shared
//! [`EnvironmentState`](anchorage_core::EnvironmentState).
//!
//! ```text
//! ClusterStage ─▶ IngressStage ─▶ PlatformStage ─▶ ControllerStage ─▶ GitServerStage
//!      │               │                │                 │                 │
//!      └───────────────┴────── EnvironmentState ──────────┴─────────────────┘
//! ```
//!
//! [`SetupHooks`] lets a deployment variant (e.g. a hosted-provider
//! run) adjust provisioning at fixed injection points without forking
//! the stages.

pub mod cluster;
pub mod context;
pub mod controller;
pub mod error;
pub mod gitserver;
pub mod hooks;
pub mod ingress;
pub mod installer;
pub mod manifests;
pub mod platform;
pub mod testing;

// --- Public API re-exports ---

pub use cluster::ClusterStage;
pub use context::StageContext;
pub use controller::ControllerStage;
pub use error::TestEnvError;
pub use gitserver::GitServerStage;
pub use hooks::{DefaultHooks, PreClusterOutput, PrePlatformOutput, SetupHooks};
pub use ingress::IngressStage;
pub use installer::{ChartRequest, ClusterApi, ClusterRequest, Installer};
pub use platform::PlatformStage;
