//! GitOps cluster-import scenario for the anchorage e2e pipeline.
//!
//! Runs after the five setup stages produced a complete environment:
//! renders a workload cluster manifest, applies it into an
//! auto-import-labeled namespace, and walks the state machine
//!
//! ```text
//! Created → Importing → Imported → [Reimporting → Reimported]
//!                                → [Deleting → Deleted]
//! ```
//!
//! against the platform's import status. Failures carry the last state
//! reached; cleanup is the caller's responsibility either way.

pub mod input;
pub mod manifest;
pub mod runner;
pub mod state;

// --- Public API re-exports ---

pub use input::ScenarioInput;
pub use manifest::RenderError;
pub use runner::{AUTO_IMPORT_LABEL, ScenarioReport, ScenarioRunner};
pub use state::ScenarioState;
