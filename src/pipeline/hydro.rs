//! Steps which rework the hydro fleet: conversion to pumped hydro, inflow scaling and making
//! hydro capacity extendable.
use super::ScenarioStep;
use crate::network::Network;
use crate::network::component::{Generator, GeneratorID, Link, StorageUnit};
use crate::units::{Hours, MoneyPerEnergy, MoneyPerPower, Power};
use anyhow::{Result, ensure};
use log::{debug, info, warn};
use serde::Deserialize;
use unicase::UniCase;

const PHS_CARRIER: &str = "PHS";

define_param_default!(default_hydro_carrier, String, "hydro".into());
define_param_default!(default_phs_carrier, String, PHS_CARRIER.into());
define_param_default!(default_p_min_pu, f64, -1.0);
define_param_default!(default_efficiency_store, f64, 0.9);
define_param_default!(default_reservoir_hours, f64, 168.0);
define_param_default!(default_turbine_efficiency, f64, 0.9);
define_param_default!(default_pump_efficiency, f64, 0.85);
define_param_default!(default_power_capex, f64, 1e6);
define_param_default!(default_energy_capex, f64, 200e3);
define_param_default!(default_remove_old, bool, true);

/// How existing hydro plants are turned into pumped hydro
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum HydroConversion {
    /// Let existing hydro storage units pump
    InPlace(InPlaceConversion),
    /// Replace hydro generators with a reservoir, a turbine and a pump
    Synthesise(PumpedHydroSynthesis),
}

impl HydroConversion {
    /// Check the conversion parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::InPlace(conversion) => conversion.validate(),
            Self::Synthesise(synthesis) => synthesis.validate(),
        }
    }
}

impl ScenarioStep for HydroConversion {
    fn name(&self) -> &'static str {
        match self {
            Self::InPlace(conversion) => conversion.name(),
            Self::Synthesise(synthesis) => synthesis.name(),
        }
    }

    fn apply(&self, network: Network) -> Result<Network> {
        match self {
            Self::InPlace(conversion) => conversion.apply(network),
            Self::Synthesise(synthesis) => synthesis.apply(network),
        }
    }
}

/// Check that an efficiency lies in (0, 1]
fn check_efficiency(name: &str, value: f64) -> Result<()> {
    ensure!(
        value > 0.0 && value <= 1.0,
        "{name} must be greater than zero and at most one"
    );

    Ok(())
}

/// Check that a cost or duration is a finite, non-negative number
fn check_non_negative(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number of at least zero"
    );

    Ok(())
}

/// Variant A: hydro storage units are allowed to pump.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InPlaceConversion {
    /// Storage units with exactly this carrier are converted
    #[serde(default = "default_hydro_carrier")]
    pub carrier: String,
    /// New minimum power per unit (negative values allow pumping)
    #[serde(default = "default_p_min_pu")]
    pub p_min_pu: f64,
    /// New efficiency when storing
    #[serde(default = "default_efficiency_store")]
    pub efficiency_store: f64,
}

impl Default for InPlaceConversion {
    fn default() -> Self {
        Self {
            carrier: default_hydro_carrier(),
            p_min_pu: default_p_min_pu(),
            efficiency_store: default_efficiency_store(),
        }
    }
}

impl InPlaceConversion {
    fn validate(&self) -> Result<()> {
        ensure!(
            (-1.0..=0.0).contains(&self.p_min_pu),
            "p_min_pu must be between -1 and 0"
        );
        check_efficiency("efficiency_store", self.efficiency_store)
    }
}

impl ScenarioStep for InPlaceConversion {
    fn name(&self) -> &'static str {
        "hydro_in_place"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        let mut count = 0;
        for unit in network
            .storage_units
            .iter_mut()
            .filter(|unit| unit.carrier == self.carrier)
        {
            unit.p_min_pu = self.p_min_pu;
            unit.efficiency_store = self.efficiency_store;
            count += 1;
        }
        info!("Converted {count} hydro storage units to pumped hydro");

        Ok(network)
    }
}

/// Variant B: every hydro generator is replaced by a synthetic pumped-hydro plant.
///
/// For a generator `g` on bus `b` with capacity `P`, the plant consists of:
///
/// * `PHS_<g>_store`: a reservoir on `b` holding `P * reservoir_hours`, fed by the generator's
///   former availability (or, failing that, its historical dispatch)
/// * `PHS_<g>_turb`: a generator on `b` with capacity `P`
/// * `PHS_<g>_pump_link`: a link from `b` to itself with capacity `P`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PumpedHydroSynthesis {
    /// Generators with exactly this carrier are converted
    #[serde(default = "default_hydro_carrier")]
    pub carrier: String,
    /// Hours of storage given to each reservoir
    #[serde(default = "default_reservoir_hours")]
    pub reservoir_hours: f64,
    /// Efficiency of the turbine generator
    #[serde(default = "default_turbine_efficiency")]
    pub turbine_efficiency: f64,
    /// Efficiency of the pump link
    #[serde(default = "default_pump_efficiency")]
    pub pump_efficiency: f64,
    /// Investment cost of turbine and pump per MW
    #[serde(default = "default_power_capex")]
    pub power_capex: f64,
    /// Investment cost of the reservoir per MWh
    #[serde(default = "default_energy_capex")]
    pub energy_capex: f64,
    /// Whether to remove the source generators
    #[serde(default = "default_remove_old")]
    pub remove_old: bool,
}

impl Default for PumpedHydroSynthesis {
    fn default() -> Self {
        Self {
            carrier: default_hydro_carrier(),
            reservoir_hours: default_reservoir_hours(),
            turbine_efficiency: default_turbine_efficiency(),
            pump_efficiency: default_pump_efficiency(),
            power_capex: default_power_capex(),
            energy_capex: default_energy_capex(),
            remove_old: default_remove_old(),
        }
    }
}

/// The outcome of synthesising pumped-hydro plants
#[derive(Debug, Default, PartialEq)]
pub struct SynthesisReport {
    /// Names of every component created
    pub created: Vec<String>,
    /// Source generators which were skipped
    pub skipped: Vec<GeneratorID>,
    /// Whether the generator table lacked carrier information altogether
    pub missing_carrier_column: bool,
}

impl PumpedHydroSynthesis {
    fn validate(&self) -> Result<()> {
        check_non_negative("reservoir_hours", self.reservoir_hours)?;
        check_efficiency("turbine_efficiency", self.turbine_efficiency)?;
        check_efficiency("pump_efficiency", self.pump_efficiency)?;
        check_non_negative("power_capex", self.power_capex)?;
        check_non_negative("energy_capex", self.energy_capex)
    }

    /// The inflow fed into the reservoir replacing `source`
    fn derive_inflow(network: &Network, source: &Generator) -> Vec<f64> {
        let id = source.name.as_str();
        if let Some(p_max_pu) = network.generators_t.p_max_pu.get(id) {
            p_max_pu.iter().map(|pu| pu * source.p_nom).collect()
        } else if let Some(p) = network.generators_t.p.get(id) {
            p.to_vec()
        } else {
            vec![0.0; network.snapshot_count()]
        }
    }

    /// Replace one generator with a pumped-hydro plant, returning the names of new components
    fn replace(&self, network: &mut Network, source: &Generator) -> Result<[String; 3]> {
        let id = source.name.as_str();
        let p_nom = Power(source.p_nom);
        let energy = p_nom * Hours(self.reservoir_hours);
        let power_cost = MoneyPerPower(self.power_capex) * p_nom;
        let inflow = Self::derive_inflow(network, source);

        let store = StorageUnit {
            name: format!("PHS_{id}_store").into(),
            bus: source.bus.clone(),
            carrier: PHS_CARRIER.into(),
            max_hours: self.reservoir_hours,
            e_nom: energy.value(),
            efficiency_store: 1.0,
            standing_loss: 0.0,
            capital_cost: (MoneyPerEnergy(self.energy_capex) * energy).value(),
            ..StorageUnit::default()
        };
        let turbine = Generator {
            name: format!("PHS_{id}_turb").into(),
            bus: source.bus.clone(),
            carrier: PHS_CARRIER.into(),
            p_nom: p_nom.value(),
            p_nom_extendable: false,
            efficiency: self.turbine_efficiency,
            marginal_cost: 0.0,
            capital_cost: power_cost.value(),
            ..Generator::default()
        };
        let pump = Link {
            name: format!("PHS_{id}_pump_link").into(),
            bus0: source.bus.clone(),
            bus1: source.bus.clone(),
            carrier: PHS_CARRIER.into(),
            p_nom: p_nom.value(),
            efficiency: self.pump_efficiency,
            capital_cost: power_cost.value(),
            ..Link::default()
        };
        let names = [
            store.name.to_string(),
            turbine.name.to_string(),
            pump.name.to_string(),
        ];

        // Nothing is written unless all three components can be added
        ensure!(
            network.buses.contains(source.bus.as_str()),
            "Generator '{id}' refers to unknown bus '{}'",
            source.bus
        );
        ensure!(
            !network.storage_units.contains(store.name.as_str()),
            "StorageUnit '{}' already exists",
            store.name
        );
        ensure!(
            !network.generators.contains(turbine.name.as_str()),
            "Generator '{}' already exists",
            turbine.name
        );
        ensure!(
            !network.links.contains(pump.name.as_str()),
            "Link '{}' already exists",
            pump.name
        );

        let p_max_pu = network.generators_t.p_max_pu.get(id).map(<[f64]>::to_vec);
        let store_id = store.name.clone();
        let turbine_id = turbine.name.clone();
        network.add_storage_unit(store)?;
        network.add_generator(turbine)?;
        network.add_link(pump)?;
        network.storage_units_t.inflow.insert(store_id, inflow);
        if let Some(p_max_pu) = p_max_pu {
            network.generators_t.p_max_pu.insert(turbine_id, p_max_pu);
        }

        Ok(names)
    }

    /// Convert every matching generator in place
    pub fn synthesise(&self, network: &mut Network) -> Result<SynthesisReport> {
        let mut report = SynthesisReport::default();
        if !network.generators.is_empty()
            && network.generators.iter().all(|g| g.carrier.is_empty())
        {
            warn!("Generators have no carrier column; no hydro to convert");
            report.missing_carrier_column = true;
            return Ok(report);
        }

        let sources: Vec<Generator> = network
            .generators
            .iter()
            .filter(|g| g.carrier == self.carrier)
            .cloned()
            .collect();
        for source in sources {
            if source.p_nom <= 0.0 {
                warn!(
                    "Skipping generator '{}': capacity is {}",
                    source.name, source.p_nom
                );
                report.skipped.push(source.name);
                continue;
            }

            let names = self.replace(network, &source)?;
            debug!("Replaced generator '{}' with {names:?}", source.name);
            report.created.extend(names);

            if self.remove_old {
                network.remove_generator(source.name.as_str());
            }
        }

        Ok(report)
    }
}

impl ScenarioStep for PumpedHydroSynthesis {
    fn name(&self) -> &'static str {
        "hydro_synthesise"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        let report = self.synthesise(&mut network)?;
        info!(
            "Created {} pumped-hydro components ({} generators skipped)",
            report.created.len(),
            report.skipped.len()
        );

        Ok(network)
    }
}

/// Scales the natural inflow of hydro storage units
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InflowScaling {
    /// Multiplier for every inflow series
    pub factor: f64,
}

impl InflowScaling {
    /// Check the scaling factor
    pub fn validate(&self) -> Result<()> {
        check_non_negative("factor", self.factor)
    }
}

impl ScenarioStep for InflowScaling {
    fn name(&self) -> &'static str {
        "hydro_inflow"
    }

    /// Pumped-hydro units (carrier containing "phs") keep their inflow.
    fn apply(&self, mut network: Network) -> Result<Network> {
        let ids: Vec<_> = network
            .storage_units
            .iter()
            .filter(|unit| !unit.carrier.to_lowercase().contains("phs"))
            .map(|unit| unit.name.clone())
            .collect();

        let mut count = 0;
        for id in ids {
            if network.storage_units_t.inflow.scale(id.as_str(), self.factor) {
                count += 1;
            }
        }
        info!("Scaled inflow of {count} storage units by {}", self.factor);

        Ok(network)
    }
}

/// Lets the optimiser size hydro generators and pumped-hydro storage
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HydroExtendable {
    /// Generators with exactly this carrier become extendable
    #[serde(default = "default_hydro_carrier")]
    pub generator_carrier: String,
    /// Storage units with this carrier (ignoring case) become extendable
    #[serde(default = "default_phs_carrier")]
    pub storage_carrier: String,
}

impl Default for HydroExtendable {
    fn default() -> Self {
        Self {
            generator_carrier: default_hydro_carrier(),
            storage_carrier: default_phs_carrier(),
        }
    }
}

impl ScenarioStep for HydroExtendable {
    fn name(&self) -> &'static str {
        "hydro_extendable"
    }

    fn apply(&self, mut network: Network) -> Result<Network> {
        for generator in network
            .generators
            .iter_mut()
            .filter(|g| g.carrier == self.generator_carrier)
        {
            generator.p_nom_extendable = true;
        }

        let carrier = UniCase::new(self.storage_carrier.as_str());
        for unit in network
            .storage_units
            .iter_mut()
            .filter(|unit| UniCase::new(unit.carrier.as_str()) == carrier)
        {
            unit.p_nom_extendable = true;
        }

        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, network};
    use rstest::rstest;

    #[rstest]
    fn test_in_place_only_touches_hydro_storage(network: Network) {
        let mut expected = network.clone();
        let network = InPlaceConversion::default().apply(network).unwrap();

        let reservoir = network.storage_units.get("reservoir_C").unwrap();
        assert_eq!(reservoir.p_min_pu, -1.0);
        assert_eq!(reservoir.efficiency_store, 0.9);

        // Everything else is unchanged
        let unit = expected.storage_units.get_mut("reservoir_C").unwrap();
        unit.p_min_pu = -1.0;
        unit.efficiency_store = 0.9;
        assert_eq!(network, expected);
    }

    #[rstest]
    fn test_synthesise(mut network: Network) {
        let report = PumpedHydroSynthesis::default()
            .synthesise(&mut network)
            .unwrap();
        assert_eq!(
            report.created,
            ["PHS_hydro_A_store", "PHS_hydro_A_turb", "PHS_hydro_A_pump_link"]
        );
        assert!(report.skipped.is_empty());

        let store = network.storage_units.get("PHS_hydro_A_store").unwrap();
        assert_eq!(store.bus.as_str(), "bus_A");
        assert_eq!(store.energy_capacity(store.p_nom), 100.0 * 168.0);
        assert_eq!(store.capital_cost, 200e3 * 100.0 * 168.0);
        assert_eq!(
            network.storage_units_t.inflow.get("PHS_hydro_A_store").unwrap(),
            [50.0, 60.0, 70.0, 80.0]
        );

        let turbine = network.generators.get("PHS_hydro_A_turb").unwrap();
        assert_eq!(turbine.p_nom, 100.0);
        assert_eq!(turbine.efficiency, 0.9);
        assert!(!turbine.p_nom_extendable);
        assert_eq!(turbine.capital_cost, 1e6 * 100.0);
        assert!(network.generators_t.p_max_pu.contains("PHS_hydro_A_turb"));

        let pump = network.links.get("PHS_hydro_A_pump_link").unwrap();
        assert_eq!(pump.bus0, pump.bus1);
        assert_eq!(pump.efficiency, 0.85);

        assert!(!network.generators.contains("hydro_A"));
        assert!(!network.generators_t.p_max_pu.contains("hydro_A"));
        network.validate().unwrap();
    }

    #[rstest]
    fn test_synthesise_keep_old(mut network: Network) {
        let synthesis = PumpedHydroSynthesis {
            remove_old: false,
            ..PumpedHydroSynthesis::default()
        };
        let source = network.generators.get("hydro_A").unwrap().clone();
        let p_max_pu = network.generators_t.p_max_pu.get("hydro_A").unwrap().to_vec();
        synthesis.synthesise(&mut network).unwrap();

        // The source generator and its series are untouched
        assert_eq!(network.generators.get("hydro_A").unwrap(), &source);
        assert_eq!(
            network.generators_t.p_max_pu.get("hydro_A").unwrap(),
            p_max_pu
        );
        assert!(network.generators.contains("PHS_hydro_A_turb"));
    }

    #[rstest]
    fn test_synthesise_inflow_fallbacks(mut network: Network) {
        network.generators_t.p_max_pu.remove("hydro_A");
        network
            .generators_t
            .p
            .insert("hydro_A".into(), vec![1.0, 2.0, 3.0, 4.0]);
        PumpedHydroSynthesis::default()
            .synthesise(&mut network)
            .unwrap();
        assert_eq!(
            network.storage_units_t.inflow.get("PHS_hydro_A_store").unwrap(),
            [1.0, 2.0, 3.0, 4.0]
        );
    }

    #[rstest]
    fn test_synthesise_no_inflow_data(mut network: Network) {
        network.generators_t.p_max_pu.remove("hydro_A");
        PumpedHydroSynthesis::default()
            .synthesise(&mut network)
            .unwrap();
        assert_eq!(
            network.storage_units_t.inflow.get("PHS_hydro_A_store").unwrap(),
            [0.0; 4]
        );
    }

    #[rstest]
    fn test_synthesise_skips_empty_generator(mut network: Network) {
        network.generators.get_mut("hydro_A").unwrap().p_nom = 0.0;
        let report = PumpedHydroSynthesis::default()
            .synthesise(&mut network)
            .unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.skipped, [GeneratorID::new("hydro_A")]);
        assert!(network.generators.contains("hydro_A"));
    }

    #[rstest]
    fn test_synthesise_no_hydro(mut network: Network) {
        network.remove_generator("hydro_A");
        let before = network.clone();
        let report = PumpedHydroSynthesis::default()
            .synthesise(&mut network)
            .unwrap();
        assert_eq!(report, SynthesisReport::default());
        assert_eq!(network, before);
    }

    #[rstest]
    fn test_synthesise_missing_carrier_column(mut network: Network) {
        for generator in network.generators.iter_mut() {
            generator.carrier.clear();
        }
        let before = network.clone();
        let report = PumpedHydroSynthesis::default()
            .synthesise(&mut network)
            .unwrap();
        assert!(report.missing_carrier_column);
        assert_eq!(network, before);
    }

    #[rstest]
    fn test_synthesise_name_collision(mut network: Network) {
        network
            .add_generator(Generator {
                name: "PHS_hydro_A_turb".into(),
                bus: "bus_A".into(),
                carrier: "wind".into(),
                ..Generator::default()
            })
            .unwrap();
        let before = network.clone();
        assert_error!(
            PumpedHydroSynthesis::default().synthesise(&mut network),
            "Generator 'PHS_hydro_A_turb' already exists"
        );

        // The store is checked first, so a later collision must not leave it behind
        assert_eq!(network, before);
    }

    #[rstest]
    fn test_synthesise_collision_keeps_existing_series(mut network: Network) {
        network
            .add_storage_unit(StorageUnit {
                name: "PHS_hydro_A_store".into(),
                bus: "bus_C".into(),
                carrier: "hydro".into(),
                ..StorageUnit::default()
            })
            .unwrap();
        network
            .storage_units_t
            .inflow
            .insert("PHS_hydro_A_store".into(), vec![9.0; 4]);
        let before = network.clone();

        assert_error!(
            PumpedHydroSynthesis::default().synthesise(&mut network),
            "StorageUnit 'PHS_hydro_A_store' already exists"
        );
        assert_eq!(
            network.storage_units_t.inflow.get("PHS_hydro_A_store").unwrap(),
            [9.0; 4]
        );
        assert_eq!(network, before);
    }

    #[rstest]
    fn test_inflow_scaling_skips_phs(mut network: Network) {
        network
            .storage_units_t
            .inflow
            .insert("phs_B".into(), vec![1.0; 4]);
        let network = InflowScaling { factor: 1.5 }.apply(network).unwrap();
        assert_eq!(
            network.storage_units_t.inflow.get("reservoir_C").unwrap(),
            [7.5; 4]
        );
        assert_eq!(
            network.storage_units_t.inflow.get("phs_B").unwrap(),
            [1.0; 4]
        );
    }

    #[rstest]
    fn test_hydro_extendable(mut network: Network) {
        network.storage_units.get_mut("phs_B").unwrap().carrier = "phs".into();
        let network = HydroExtendable::default().apply(network).unwrap();

        assert!(network.generators.get("hydro_A").unwrap().p_nom_extendable);
        assert!(!network.generators.get("gas_B").unwrap().p_nom_extendable);
        assert!(network.storage_units.get("phs_B").unwrap().p_nom_extendable);
        assert!(!network.storage_units.get("reservoir_C").unwrap().p_nom_extendable);
    }

    #[test]
    fn test_deserialise_variant() {
        let conversion: HydroConversion = toml::from_str(
            r#"
            variant = "synthesise"
            reservoir_hours = 24.0
            "#,
        )
        .unwrap();
        assert_eq!(
            conversion,
            HydroConversion::Synthesise(PumpedHydroSynthesis {
                reservoir_hours: 24.0,
                ..PumpedHydroSynthesis::default()
            })
        );
        assert_eq!(conversion.name(), "hydro_synthesise");
    }

    #[rstest]
    #[case(InPlaceConversion { p_min_pu: -2.0, ..InPlaceConversion::default() })]
    #[case(InPlaceConversion { efficiency_store: 0.0, ..InPlaceConversion::default() })]
    fn test_in_place_invalid(#[case] conversion: InPlaceConversion) {
        assert!(HydroConversion::InPlace(conversion).validate().is_err());
    }
}
