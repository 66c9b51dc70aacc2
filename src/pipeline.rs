//! The ordered chain of transformations applied to the base model of every scenario.
//!
//! Each step takes ownership of a model and returns the transformed model, so a step never sees a
//! half-modified model from an earlier failure.
use crate::network::Network;
use crate::scenario::config::ScenarioConfig;
use anyhow::{Context, Result};
use log::debug;

pub mod battery;
pub mod emissions;
pub mod hydro;
pub mod load_rescale;
pub mod snapshots;
pub mod transmission;

use emissions::Co2Cap;
use snapshots::SnapshotLimit;

/// A single transformation of a grid model
pub trait ScenarioStep {
    /// A short name for the step, used in logs and error messages
    fn name(&self) -> &'static str;

    /// Apply the step, returning the transformed model
    fn apply(&self, network: Network) -> Result<Network>;
}

/// The steps to run for one scenario, in execution order
pub struct Pipeline {
    steps: Vec<Box<dyn ScenarioStep>>,
}

impl Pipeline {
    /// Build the pipeline for one CO2-cap fraction.
    ///
    /// The order is fixed: load rescaling, hydro inflow scaling, hydro conversion, hydro/PHS
    /// extendability, transmission expansion, battery injection, CO2 cap and finally the snapshot
    /// limit. Optional steps without a configuration section are left out.
    ///
    /// # Arguments
    ///
    /// * `config` - The scenario configuration
    /// * `co2_fraction` - Fraction of the baseline emissions allowed in this scenario
    pub fn from_config(config: &ScenarioConfig, co2_fraction: f64) -> Self {
        let mut steps: Vec<Box<dyn ScenarioStep>> = Vec::new();
        if let Some(step) = &config.load_rescaling {
            steps.push(Box::new(step.clone()));
        }
        if let Some(step) = &config.hydro_inflow {
            steps.push(Box::new(step.clone()));
        }
        if let Some(step) = &config.hydro {
            steps.push(Box::new(step.clone()));
        }
        if let Some(step) = &config.hydro_extendable {
            steps.push(Box::new(step.clone()));
        }
        if let Some(step) = &config.transmission {
            steps.push(Box::new(step.clone()));
        }
        if let Some(step) = &config.batteries {
            steps.push(Box::new(step.clone()));
        }
        steps.push(Box::new(Co2Cap {
            fraction: co2_fraction,
            baseline: config.baseline_emissions,
        }));
        if let Some(max_snapshots) = config.max_snapshots {
            steps.push(Box::new(SnapshotLimit { max_snapshots }));
        }

        Self { steps }
    }

    /// Names of the steps, in execution order
    pub fn step_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|step| step.name())
    }

    /// Run every step in turn on the given model
    pub fn run(&self, network: Network) -> Result<Network> {
        let mut network = network;
        for step in &self.steps {
            debug!("Applying step '{}'", step.name());
            network = step
                .apply(network)
                .with_context(|| format!("Step '{}' failed", step.name()))?;
        }

        Ok(network)
    }
}
