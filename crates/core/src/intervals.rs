//! Named wait-profile registry.
//!
//! Every readiness wait in the pipeline is governed by a named
//! `(timeout, poll period)` pair loaded from the `[intervals]` table
//! of the config file. The set of names is configuration-defined
//! (`wait-rancher`, `wait-controllers`, `wait-gitea`, ...), not fixed
//! in code; a stage asking for an absent name is a config error.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One `[intervals.<name>]` entry as it appears in TOML.
///
/// Durations are encoded as integer seconds, matching every other
/// duration field in the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSpec {
    /// Total wait budget in seconds.
    pub timeout_secs: u64,
    /// Fixed sleep between probe invocations, in seconds.
    pub poll_period_secs: u64,
}

/// A resolved wait profile. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalProfile {
    /// Profile name as referenced from stages and the scenario.
    pub name: String,
    /// Total wait budget.
    pub timeout: Duration,
    /// Fixed sleep between probe invocations.
    pub poll_period: Duration,
}

/// Registry mapping profile names to resolved profiles.
///
/// Built once at startup from the config's `[intervals]` table and
/// read-only for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct IntervalRegistry {
    profiles: HashMap<String, IntervalProfile>,
}

impl IntervalRegistry {
    /// Build the registry from the raw config table, validating every
    /// entry.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` when a timeout or poll period is
    /// zero, or the poll period exceeds the timeout.
    pub fn from_specs(specs: &HashMap<String, IntervalSpec>) -> Result<Self, ConfigError> {
        let mut profiles = HashMap::with_capacity(specs.len());
        for (name, spec) in specs {
            if spec.timeout_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("intervals.{name}.timeout_secs"),
                    reason: "must be greater than 0".to_owned(),
                });
            }
            if spec.poll_period_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("intervals.{name}.poll_period_secs"),
                    reason: "must be greater than 0".to_owned(),
                });
            }
            if spec.poll_period_secs > spec.timeout_secs {
                return Err(ConfigError::InvalidValue {
                    field: format!("intervals.{name}.poll_period_secs"),
                    reason: "must not exceed timeout_secs".to_owned(),
                });
            }
            profiles.insert(
                name.clone(),
                IntervalProfile {
                    name: name.clone(),
                    timeout: Duration::from_secs(spec.timeout_secs),
                    poll_period: Duration::from_secs(spec.poll_period_secs),
                },
            );
        }
        Ok(Self { profiles })
    }

    /// Look up a profile by name.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownIntervalProfile` when the name has no
    /// entry.
    pub fn resolve(&self, name: &str) -> Result<&IntervalProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownIntervalProfile {
                name: name.to_owned(),
            })
    }

    /// Number of registered profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
