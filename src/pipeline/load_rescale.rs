//! Rescale demand so that each country's annual consumption matches an external target.
use super::ScenarioStep;
use crate::network::Network;
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;

define_param_default!(default_conversion_factor, f64, 11.630);
define_param_default!(default_model_energy_per_unit, f64, 1e6);

/// Scales the demand series of every load so that per-country totals hit a target
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadRescaler {
    /// Annual consumption per country code, in the unit of the source data
    #[serde(default)]
    pub targets: IndexMap<String, f64>,
    /// Converts target values into the reporting unit (Gtoe to TWh by default)
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
    /// How many units of model energy (MWh) make one reporting unit (TWh by default)
    #[serde(default = "default_model_energy_per_unit")]
    pub model_energy_per_unit: f64,
}

impl Default for LoadRescaler {
    fn default() -> Self {
        Self {
            targets: IndexMap::new(),
            conversion_factor: default_conversion_factor(),
            model_energy_per_unit: default_model_energy_per_unit(),
        }
    }
}

/// The outcome of rescaling
#[derive(Debug, Default, PartialEq)]
pub struct RescaleReport {
    /// Scaling factor applied to each country
    pub applied: IndexMap<String, f64>,
    /// Countries with a target which could not be scaled
    pub skipped: Vec<String>,
}

/// The country code of a bus: whatever follows the last underscore
pub fn country_code(bus: &str) -> &str {
    bus.rsplit('_').next().unwrap_or(bus)
}

/// Current demand per country in reporting units.
///
/// Only loads with a demand series are counted. Snapshot weightings are not applied.
pub fn demand_by_country(network: &Network, model_energy_per_unit: f64) -> IndexMap<String, f64> {
    let mut demand = IndexMap::new();
    for (id, values) in network.loads_t.p_set.iter() {
        let Some(load) = network.loads.get(id.as_str()) else {
            continue;
        };

        let total: f64 = values.iter().sum();
        *demand
            .entry(country_code(load.bus.as_str()).to_string())
            .or_insert(0.0) += total / model_energy_per_unit;
    }

    demand
}

impl LoadRescaler {
    /// Check the rescaling parameters
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.conversion_factor.is_finite() && self.conversion_factor > 0.0,
            "conversion_factor must be a finite number greater than zero"
        );
        ensure!(
            self.model_energy_per_unit.is_finite() && self.model_energy_per_unit > 0.0,
            "model_energy_per_unit must be a finite number greater than zero"
        );
        for (country, target) in &self.targets {
            ensure!(
                target.is_finite() && *target >= 0.0,
                "Invalid target for country '{country}': {target}"
            );
        }

        Ok(())
    }

    /// Rescale the demand series in place.
    ///
    /// Countries without a target are left untouched, as are loads without a demand series.
    pub fn rescale(&self, network: &mut Network) -> RescaleReport {
        let current = demand_by_country(network, self.model_energy_per_unit);
        let mut report = RescaleReport::default();
        for (country, target) in &self.targets {
            let Some(&demand) = current.get(country) else {
                warn!("No demand series found for country '{country}'; not rescaling");
                report.skipped.push(country.clone());
                continue;
            };

            let factor = target * self.conversion_factor / demand;
            if !factor.is_finite() {
                warn!("Cannot rescale demand for country '{country}' (current demand: {demand})");
                report.skipped.push(country.clone());
                continue;
            }

            report.applied.insert(country.clone(), factor);
        }

        let to_scale: Vec<_> = network
            .loads
            .iter()
            .filter_map(|load| {
                let factor = report.applied.get(country_code(load.bus.as_str()))?;
                Some((load.name.clone(), *factor))
            })
            .collect();
        for (id, factor) in to_scale {
            network.loads_t.p_set.scale(id.as_str(), factor);
        }

        report
    }
}

impl ScenarioStep for LoadRescaler {
    fn name(&self) -> &'static str {
        "load_rescaling"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        let report = self.rescale(&mut network);
        info!(
            "Rescaled demand for {} countries ({} skipped)",
            report.applied.len(),
            report.skipped.len()
        );

        Ok(network)
    }
}
