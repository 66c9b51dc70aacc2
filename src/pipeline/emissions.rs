//! Caps total CO2 emissions at a fraction of a baseline.
use super::ScenarioStep;
use crate::network::Network;
use crate::network::component::{ConstraintSense, GlobalConstraint};
use anyhow::Result;
use log::info;

/// Name of the global constraint holding the cap
pub const CO2_LIMIT: &str = "CO2Limit";

/// Adds (or replaces) the `CO2Limit` global constraint
#[derive(Debug, Clone, PartialEq)]
pub struct Co2Cap {
    /// Fraction of the baseline which may be emitted
    pub fraction: f64,
    /// Baseline emissions (t)
    pub baseline: f64,
}

impl ScenarioStep for Co2Cap {
    fn name(&self) -> &'static str {
        "co2_cap"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        let constant = self.fraction * self.baseline;
        network.global_constraints.upsert(GlobalConstraint {
            name: CO2_LIMIT.into(),
            kind: "primary_energy".into(),
            carrier_attribute: "co2_emissions".into(),
            sense: ConstraintSense::LessOrEqual,
            constant,
            mu: 0.0,
        });
        info!("Capped CO2 emissions at {constant} t");

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use rstest::rstest;

    #[rstest]
    fn test_co2_cap_is_idempotent(network: Network) {
        let cap = Co2Cap {
            fraction: 0.25,
            baseline: 1000.0,
        };
        let once = cap.apply(network).unwrap();
        let twice = cap.apply(once.clone()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.global_constraints.len(), 1);

        let constraint = twice.global_constraints.get(CO2_LIMIT).unwrap();
        assert_eq!(constraint.constant, 250.0);
        assert_eq!(constraint.sense, ConstraintSense::LessOrEqual);
        assert_eq!(constraint.carrier_attribute, "co2_emissions");
    }

    #[rstest]
    fn test_co2_cap_overwrites(network: Network) {
        let network = Co2Cap {
            fraction: 1.0,
            baseline: 1000.0,
        }
        .apply(network)
        .unwrap();
        let network = Co2Cap {
            fraction: 0.0,
            baseline: 1000.0,
        }
        .apply(network)
        .unwrap();
        assert_eq!(network.global_constraints.get(CO2_LIMIT).unwrap().constant, 0.0);
    }
}
