//! Defines the `ScenarioConfig` struct, which represents the contents of a scenario file.
use crate::input::{input_err_msg, read_toml};
use crate::output::scenario_folder_name;
use crate::pipeline::battery::BatteryInjector;
use crate::pipeline::hydro::{HydroConversion, HydroExtendable, InflowScaling};
use crate::pipeline::load_rescale::LoadRescaler;
use crate::pipeline::transmission::TransmissionExpander;
use crate::solver::SolverOptions;
use anyhow::{Context, Result, ensure};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

define_param_default!(default_baseline_emissions, f64, 1_012_028_560.749_594_6);

/// A batch of scenarios sharing one base model
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// The base model: a container file or a CSV folder. Relative paths are resolved against the
    /// folder containing the scenario file.
    pub network: PathBuf,
    /// One scenario is run for each fraction of the baseline emissions, in order
    pub co2_fractions: Vec<f64>,
    /// Emissions (t) corresponding to a fraction of one
    #[serde(default = "default_baseline_emissions")]
    pub baseline_emissions: f64,
    /// If given, only this many leading snapshots are optimised
    #[serde(default)]
    pub max_snapshots: Option<usize>,
    /// Options passed verbatim to the solver
    #[serde(default)]
    pub solver: SolverOptions,
    /// Rescale demand to per-country targets
    #[serde(default)]
    pub load_rescaling: Option<LoadRescaler>,
    /// Scale the natural inflow of hydro storage
    #[serde(default)]
    pub hydro_inflow: Option<InflowScaling>,
    /// Convert hydro to pumped hydro
    #[serde(default)]
    pub hydro: Option<HydroConversion>,
    /// Make hydro and pumped-hydro capacity extendable
    #[serde(default)]
    pub hydro_extendable: Option<HydroExtendable>,
    /// Make transmission capacity extendable
    #[serde(default)]
    pub transmission: Option<TransmissionExpander>,
    /// Add batteries to every bus
    #[serde(default)]
    pub batteries: Option<BatteryInjector>,
}

/// Check that the `co2_fractions` parameter is valid
fn check_co2_fractions(fractions: &[f64]) -> Result<()> {
    ensure!(!fractions.is_empty(), "`co2_fractions` is empty");
    for fraction in fractions {
        ensure!(
            fraction.is_finite() && *fraction >= 0.0,
            "Invalid CO2 fraction {fraction}: must be a finite number of at least zero"
        );
    }

    // Each scenario writes to its own folder
    let mut folders = HashSet::new();
    for fraction in fractions {
        let folder = scenario_folder_name(*fraction);
        ensure!(
            folders.insert(folder.clone()),
            "CO2 fractions must map to distinct output folders (found '{folder}' twice)"
        );
    }

    Ok(())
}

/// Check that the `baseline_emissions` parameter is valid
fn check_baseline_emissions(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "baseline_emissions must be a finite number of at least zero"
    );

    Ok(())
}

/// Check that the `max_snapshots` parameter is valid
fn check_max_snapshots(value: Option<usize>) -> Result<()> {
    ensure!(value != Some(0), "max_snapshots cannot be zero");

    Ok(())
}

impl ScenarioConfig {
    /// Read a scenario file.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the scenario TOML file
    ///
    /// # Returns
    ///
    /// The scenario configuration, with the model path made relative to the working directory, or
    /// an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(file_path: P) -> Result<ScenarioConfig> {
        let file_path = file_path.as_ref();
        let mut config: ScenarioConfig = read_toml(file_path)?;
        config
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        if let Some(parent) = file_path.parent() {
            config.network = parent.join(&config.network);
        }

        Ok(config)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_co2_fractions(&self.co2_fractions)?;
        check_baseline_emissions(self.baseline_emissions)?;
        check_max_snapshots(self.max_snapshots)?;

        if let Some(rescaler) = &self.load_rescaling {
            rescaler.validate().context("Invalid [load_rescaling] section")?;
        }
        if let Some(scaling) = &self.hydro_inflow {
            scaling.validate().context("Invalid [hydro_inflow] section")?;
        }
        if let Some(conversion) = &self.hydro {
            conversion.validate().context("Invalid [hydro] section")?;
        }
        if let Some(injector) = &self.batteries {
            injector.validate().context("Invalid [batteries] section")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::pipeline::hydro::PumpedHydroSynthesis;
    use crate::solver::OptionValue;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn parse(toml: &str) -> ScenarioConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("network = \"model\"\nco2_fractions = [1.0]");
        assert_eq!(config.baseline_emissions, 1_012_028_560.749_594_6);
        assert_eq!(config.max_snapshots, None);
        assert!(config.solver.is_empty());
        assert!(config.hydro.is_none());
        assert!(config.batteries.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_full() {
        let config = parse(
            r#"
            network = "model.json"
            co2_fractions = [1.0, 0.5, 0.0]
            max_snapshots = 168

            [solver]
            presolve = "on"
            time_limit = 3600.0
            threads = 4

            [load_rescaling.targets]
            "DE0 0" = 89.121

            [hydro_inflow]
            factor = 1.5

            [hydro]
            variant = "synthesise"
            remove_old = false

            [hydro_extendable]

            [transmission]

            [batteries]
            max_hours = 4.0
            "#,
        );
        config.validate().unwrap();
        assert_eq!(config.solver["presolve"], OptionValue::Text("on".into()));
        assert_eq!(config.solver["threads"], OptionValue::Integer(4));
        assert_eq!(config.load_rescaling.unwrap().targets["DE0 0"], 89.121);
        assert_eq!(
            config.hydro,
            Some(HydroConversion::Synthesise(PumpedHydroSynthesis {
                remove_old: false,
                ..PumpedHydroSynthesis::default()
            }))
        );
        assert_eq!(config.hydro_extendable, Some(HydroExtendable::default()));
        assert_eq!(config.transmission, Some(TransmissionExpander::default()));
        assert_eq!(config.batteries.unwrap().max_hours, 4.0);
    }

    #[test]
    fn test_unknown_field() {
        let result: Result<ScenarioConfig, _> =
            toml::from_str("network = \"x\"\nco2_fractions = [1.0]\nco2_fraction = 1.0");
        assert!(result.is_err());
    }

    #[rstest]
    #[case(&[], "`co2_fractions` is empty")]
    #[case(&[-0.1], "Invalid CO2 fraction -0.1: must be a finite number of at least zero")]
    #[case(
        &[0.5, 0.501],
        "CO2 fractions must map to distinct output folders (found 'co2_50' twice)"
    )]
    fn test_check_co2_fractions_invalid(#[case] fractions: &[f64], #[case] msg: &str) {
        assert_error!(check_co2_fractions(fractions), msg);
    }

    #[test]
    fn test_check_max_snapshots() {
        check_max_snapshots(None).unwrap();
        check_max_snapshots(Some(1)).unwrap();
        assert_error!(check_max_snapshots(Some(0)), "max_snapshots cannot be zero");
    }

    #[test]
    fn test_from_path_resolves_network() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("scenario.toml");
        fs::write(&file_path, "network = \"model\"\nco2_fractions = [0.0]").unwrap();

        let config = ScenarioConfig::from_path(&file_path).unwrap();
        assert_eq!(config.network, dir.path().join("model"));
    }

    #[test]
    fn test_from_path_invalid() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("scenario.toml");
        fs::write(
            &file_path,
            "network = \"model\"\nco2_fractions = [0.0]\n[hydro_inflow]\nfactor = -1.0",
        )
        .unwrap();

        let err = ScenarioConfig::from_path(&file_path).unwrap_err();
        assert_eq!(err.to_string(), input_err_msg(&file_path));
        assert_eq!(
            err.root_cause().to_string(),
            "factor must be a finite number of at least zero"
        );
    }
}
