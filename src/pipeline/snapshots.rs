//! Restricts a model to its leading snapshots.
use super::ScenarioStep;
use crate::network::Network;
use anyhow::Result;
use log::info;

/// Keeps at most `max_snapshots` snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotLimit {
    /// Number of snapshots to keep
    pub max_snapshots: usize,
}

impl ScenarioStep for SnapshotLimit {
    fn name(&self) -> &'static str {
        "snapshot_limit"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        if self.max_snapshots < network.snapshot_count() {
            info!(
                "Restricting model to the first {} of {} snapshots",
                self.max_snapshots,
                network.snapshot_count()
            );
            network.truncate_snapshots(self.max_snapshots);
        }

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1)]
    #[case(3, 3)]
    #[case(4, 4)]
    #[case(100, 4)]
    fn test_snapshot_limit(
        network: Network,
        #[case] max_snapshots: usize,
        #[case] expected: usize,
    ) {
        let network = SnapshotLimit { max_snapshots }.apply(network).unwrap();
        assert_eq!(network.snapshot_count(), expected);
        assert_eq!(
            network.generators_t.p_max_pu.get("hydro_A").unwrap().len(),
            expected
        );
    }
}
