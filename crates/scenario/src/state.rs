//! Scenario state machine states.

use std::fmt;

/// States the import scenario walks through, in order.
///
/// `Reimporting`/`Reimported` and `Deleting`/`Deleted` are optional
/// segments gated by the scenario input flags; a run that skips both
/// terminates in `Imported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    /// Workload cluster manifest applied.
    Created,
    /// Waiting for the platform to register the cluster.
    Importing,
    /// Platform reports the cluster imported and ready.
    Imported,
    /// Cluster deleted and recreated under the same identity.
    Reimporting,
    /// Second import confirmed.
    Reimported,
    /// Cluster resource deleted, infrastructure being reclaimed.
    Deleting,
    /// Backing infrastructure fully reclaimed.
    Deleted,
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Created => "created",
            ScenarioState::Importing => "importing",
            ScenarioState::Imported => "imported",
            ScenarioState::Reimporting => "reimporting",
            ScenarioState::Reimported => "reimported",
            ScenarioState::Deleting => "deleting",
            ScenarioState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_lowercase() {
        assert_eq!(ScenarioState::Created.to_string(), "created");
        assert_eq!(ScenarioState::Reimporting.to_string(), "reimporting");
        assert_eq!(ScenarioState::Deleted.to_string(), "deleted");
    }
}
