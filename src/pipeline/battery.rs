//! Adds an extendable battery to every bus.
use super::ScenarioStep;
use crate::finance::storage_capital_cost;
use crate::network::Network;
use crate::network::component::StorageUnit;
use crate::units::{Dimensionless, Hours, MoneyPerEnergy, MoneyPerPower};
use anyhow::{Result, ensure};
use log::info;
use serde::Deserialize;

define_param_default!(default_suffix, String, " battery".into());
define_param_default!(default_carrier, String, "batteries".into());
define_param_default!(default_max_hours, f64, 8.0);
define_param_default!(default_efficiency, f64, 0.92);
define_param_default!(default_lifetime, u32, 16);
define_param_default!(default_discount_rate, f64, 0.05);
define_param_default!(default_power_cost, f64, 81e3);
define_param_default!(default_fixed_om_fraction, f64, 0.021);
define_param_default!(default_energy_cost, f64, 236e3);

/// Creates one extendable battery storage unit per bus
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatteryInjector {
    /// Appended to the bus name to form the battery's name
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Carrier of the batteries
    #[serde(default = "default_carrier")]
    pub carrier: String,
    /// Hours of storage at full power
    #[serde(default = "default_max_hours")]
    pub max_hours: f64,
    /// Efficiency when charging
    #[serde(default = "default_efficiency")]
    pub efficiency_store: f64,
    /// Efficiency when discharging
    #[serde(default = "default_efficiency")]
    pub efficiency_dispatch: f64,
    /// Economic lifetime (years)
    #[serde(default = "default_lifetime")]
    pub lifetime: u32,
    /// Discount rate used to annualise investment
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,
    /// Investment cost per MW of inverter
    #[serde(default = "default_power_cost")]
    pub power_cost: f64,
    /// Fixed O&M as a fraction of the power investment
    #[serde(default = "default_fixed_om_fraction")]
    pub fixed_om_fraction: f64,
    /// Investment cost per MWh of storage
    #[serde(default = "default_energy_cost")]
    pub energy_cost: f64,
}

impl Default for BatteryInjector {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            carrier: default_carrier(),
            max_hours: default_max_hours(),
            efficiency_store: default_efficiency(),
            efficiency_dispatch: default_efficiency(),
            lifetime: default_lifetime(),
            discount_rate: default_discount_rate(),
            power_cost: default_power_cost(),
            fixed_om_fraction: default_fixed_om_fraction(),
            energy_cost: default_energy_cost(),
        }
    }
}

impl BatteryInjector {
    /// Check the battery parameters
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_hours.is_finite() && self.max_hours > 0.0,
            "max_hours must be a finite number greater than zero"
        );
        for (name, value) in [
            ("efficiency_store", self.efficiency_store),
            ("efficiency_dispatch", self.efficiency_dispatch),
        ] {
            ensure!(
                value > 0.0 && value <= 1.0,
                "{name} must be greater than zero and at most one"
            );
        }
        ensure!(self.lifetime > 0, "lifetime cannot be zero");
        ensure!(
            self.discount_rate.is_finite() && self.discount_rate >= 0.0,
            "discount_rate must be a finite number of at least zero"
        );

        Ok(())
    }

    /// Annualised investment cost per MW of battery, including the energy part
    pub fn capital_cost(&self) -> MoneyPerPower {
        storage_capital_cost(
            self.lifetime,
            Dimensionless(self.discount_rate),
            MoneyPerPower(self.power_cost),
            Dimensionless(self.fixed_om_fraction),
            MoneyPerEnergy(self.energy_cost),
            Hours(self.max_hours),
        )
    }
}

impl ScenarioStep for BatteryInjector {
    fn name(&self) -> &'static str {
        "batteries"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        let capital_cost = self.capital_cost().value();
        let buses: Vec<_> = network.buses.ids().cloned().collect();
        for bus in buses {
            network.add_storage_unit(StorageUnit {
                name: format!("{bus}{}", self.suffix).into(),
                bus,
                carrier: self.carrier.clone(),
                p_nom_extendable: true,
                max_hours: self.max_hours,
                efficiency_store: self.efficiency_store,
                efficiency_dispatch: self.efficiency_dispatch,
                cyclic_state_of_charge: true,
                capital_cost,
                ..StorageUnit::default()
            })?;
        }
        info!(
            "Added {} batteries costing {capital_cost:.2} per MW",
            network.buses.len()
        );

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::annuity;
    use crate::fixture::{assert_error, network};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_capital_cost() {
        let factor = annuity(16, Dimensionless(0.05)).value();
        assert_approx_eq!(
            f64,
            BatteryInjector::default().capital_cost().value(),
            factor * 81e3 * (1.0 + 0.021) + 8.0 * factor * 236e3,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_one_battery_per_bus(network: Network) {
        let storage_count = network.storage_units.len();
        let network = BatteryInjector::default().apply(network).unwrap();
        assert_eq!(network.storage_units.len(), storage_count + 3);

        for bus in ["bus_A", "bus_B", "bus_C"] {
            let battery = network
                .storage_units
                .get(&format!("{bus} battery"))
                .unwrap();
            assert_eq!(battery.bus.as_str(), bus);
            assert_eq!(battery.carrier, "batteries");
            assert_eq!(battery.max_hours, 8.0);
            assert_eq!(battery.efficiency_store, 0.92);
            assert_eq!(battery.efficiency_dispatch, 0.92);
            assert!(battery.p_nom_extendable);
            assert!(battery.cyclic_state_of_charge);
        }
    }

    #[rstest]
    fn test_twice_fails(network: Network) {
        let injector = BatteryInjector::default();
        let network = injector.apply(network).unwrap();
        assert_error!(
            injector.apply(network),
            "StorageUnit 'bus_A battery' already exists"
        );
    }

    #[test]
    fn test_validate_zero_lifetime() {
        let injector = BatteryInjector {
            lifetime: 0,
            ..BatteryInjector::default()
        };
        assert!(injector.validate().is_err());
    }
}
