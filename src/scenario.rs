//! Runs a batch of scenarios, one per CO2-cap fraction.
//!
//! Each scenario starts from a freshly loaded base model, applies the [`Pipeline`], solves the
//! result and exports it. Scenarios run sequentially and a failing scenario does not stop the
//! batch.
use crate::input::load_network;
use crate::output::{export_network, scenario_folder_name, write_summary};
use crate::pipeline::Pipeline;
use crate::solver::Solver;
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod config;
use config::ScenarioConfig;

/// How a scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Solved and exported
    Solved,
    /// The solver failed; the pre-solve model was exported
    SolverFailed,
    /// The scenario could not be run (e.g. unreadable input)
    Failed,
}

/// The result of one scenario, as recorded in the batch summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Fraction of the baseline emissions allowed
    pub co2_fraction: f64,
    /// The output folder name for the scenario
    pub folder: String,
    /// How the scenario ended
    pub status: ScenarioStatus,
    /// The objective value, if solved
    pub objective: Option<f64>,
    /// Details of any failure
    pub message: String,
}

/// Run a single scenario.
///
/// # Returns
///
/// The outcome of the scenario, or an error if it could not be run or exported. A solver failure
/// is not an error: the pre-solve model is exported instead.
pub fn run_scenario(
    config: &ScenarioConfig,
    co2_fraction: f64,
    output_path: &Path,
    solver: &dyn Solver,
) -> Result<ScenarioOutcome> {
    let folder = scenario_folder_name(co2_fraction);
    let network = load_network(&config.network).context("Failed to load model")?;
    let pipeline = Pipeline::from_config(config, co2_fraction);
    debug!(
        "Scenario {folder} steps: {}",
        pipeline.step_names().join(", ")
    );
    let network = pipeline.run(network)?;

    let outcome = match solver.solve(&network, &config.solver) {
        Ok(solution) => {
            let network = network.with_solution(solution)?;
            let objective = network.objective;
            export_network(&network, output_path, co2_fraction)?;
            info!("Scenario {folder} solved (objective: {objective:?})");

            ScenarioOutcome {
                co2_fraction,
                folder,
                status: ScenarioStatus::Solved,
                objective,
                message: String::new(),
            }
        }
        Err(err) => {
            error!("Solver '{}' failed for scenario {folder}: {err}", solver.name());
            if err.is_configuration_error() {
                warn!("Check the [solver] section of the scenario file");
            }
            warn!("Exporting the pre-solve model for scenario {folder}");
            export_network(&network, output_path, co2_fraction)?;

            ScenarioOutcome {
                co2_fraction,
                folder,
                status: ScenarioStatus::SolverFailed,
                objective: None,
                message: err.to_string(),
            }
        }
    };

    Ok(outcome)
}

/// Run every scenario in the configuration and write the batch summary.
///
/// # Arguments
///
/// * `config` - The scenario configuration
/// * `output_path` - The folder to which output files will be written
/// * `solver` - The optimiser used for every scenario
pub fn run_scenarios(
    config: &ScenarioConfig,
    output_path: &Path,
    solver: &dyn Solver,
) -> Result<Vec<ScenarioOutcome>> {
    let mut outcomes = Vec::new();
    for &co2_fraction in &config.co2_fractions {
        info!("Running scenario with CO2 fraction {co2_fraction}");
        let outcome = match run_scenario(config, co2_fraction, output_path, solver) {
            Ok(outcome) => outcome,
            Err(err) => {
                let folder = scenario_folder_name(co2_fraction);
                error!("Scenario {folder} failed: {err:?}");
                ScenarioOutcome {
                    co2_fraction,
                    folder,
                    status: ScenarioStatus::Failed,
                    objective: None,
                    message: format!("{err:#}"),
                }
            }
        };
        outcomes.push(outcome);
    }

    write_summary(output_path, &outcomes).context("Failed to write summary")?;

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::network;
    use crate::input::container::write_container;
    use crate::network::Network;
    use crate::output::ExportPaths;
    use crate::solver::{SolveError, Solution, SolverOptions};
    use rstest::rstest;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    /// Solves with a fixed objective, or fails if the CO2 cap is zero
    struct FixedSolver;

    impl Solver for FixedSolver {
        fn name(&self) -> &str {
            "fixed"
        }

        fn solve(
            &self,
            network: &Network,
            _options: &SolverOptions,
        ) -> Result<Solution, SolveError> {
            let cap = network.global_constraints.get("CO2Limit").unwrap();
            if cap.constant == 0.0 {
                return Err(SolveError::Infeasible);
            }

            Ok(Solution {
                objective: 7.0,
                ..Solution::default()
            })
        }
    }

    fn setup(network: &Network, fractions: &[f64]) -> (TempDir, ScenarioConfig) {
        let dir = tempdir().unwrap();
        let network_path = dir.path().join("network.json");
        write_container(network, &network_path).unwrap();
        let mut config: ScenarioConfig =
            toml::from_str("network = \"network.json\"\nco2_fractions = [1.0]").unwrap();
        config.network = network_path;
        config.co2_fractions = fractions.to_vec();
        (dir, config)
    }

    #[rstest]
    fn test_run_scenarios(network: Network) {
        let (dir, config) = setup(&network, &[1.0, 0.0]);
        let output_path = dir.path().join("out");
        std::fs::create_dir(&output_path).unwrap();

        let outcomes = run_scenarios(&config, &output_path, &FixedSolver).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, ScenarioStatus::Solved);
        assert_eq!(outcomes[0].objective, Some(7.0));
        assert_eq!(outcomes[1].status, ScenarioStatus::SolverFailed);
        assert_eq!(outcomes[1].message, "the model is infeasible");

        // Both scenarios are exported; the failed one without a solution
        for (fraction, objective) in [(1.0, Some(7.0)), (0.0, None)] {
            let paths = ExportPaths::new(&output_path, fraction);
            let exported = load_network(&paths.container).unwrap();
            assert_eq!(exported.objective, objective);
            assert!(paths.csv.join("global_constraints.csv").is_file());
        }
        assert!(output_path.join("summary.csv").is_file());
    }

    #[rstest]
    fn test_missing_model_fails_only_that_scenario(network: Network) {
        let (dir, mut config) = setup(&network, &[0.5]);
        config.network = PathBuf::from("does/not/exist");

        let outcomes = run_scenarios(&config, dir.path(), &FixedSolver).unwrap();
        assert_eq!(outcomes[0].status, ScenarioStatus::Failed);
        assert!(outcomes[0].message.starts_with("Failed to load model"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ScenarioStatus::SolverFailed.to_string(), "solver_failed");
    }
}
