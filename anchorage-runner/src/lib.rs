//! Anchorage runner library.
//!
//! Exposes the runner's internals for integration testing. In
//! production, `anchorage-runner` is used as a binary (main.rs).

pub mod cleanup;
pub mod cli;
pub mod exec;
pub mod logging;
pub mod orchestrator;
