//! The module responsible for writing scenario results to disk.
use crate::input::container::write_container;
use crate::input::csv_folder::write_csv_folder;
use crate::network::Network;
use crate::scenario::ScenarioOutcome;
use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which scenario-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "store2hydro_results";

/// The folder holding one container file per scenario
const CONTAINER_DIRECTORY: &str = "container";

/// The folder holding one CSV folder per scenario
const CSV_DIRECTORY: &str = "csv";

/// The file name for exported container files
const CONTAINER_FILE_NAME: &str = "network.json";

/// The output file name for the batch summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The name of the folder for a scenario: `co2_<p>` where `p` is the fraction as a truncated
/// percentage
pub fn scenario_folder_name(co2_fraction: f64) -> String {
    format!("co2_{}", (co2_fraction * 100.0).trunc() as i64)
}

/// Get the default output folder for the specified scenario file
pub fn get_output_dir(config_path: &Path) -> Result<PathBuf> {
    let name = config_path
        .file_stem()
        .context("Scenario file has no name")?
        .to_str()
        .context("Invalid chars in scenario file name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, name].iter().collect())
}

/// Create a new output directory.
///
/// An existing, non-empty directory is only replaced if `overwrite` is set.
///
/// # Returns
///
/// Whether an existing directory was overwritten
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        if fs::read_dir(output_dir)?.next().is_none() {
            // already exists, but empty
            return Ok(false);
        }

        ensure!(
            overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Where a scenario's model was written
#[derive(Debug, PartialEq)]
pub struct ExportPaths {
    /// The container file
    pub container: PathBuf,
    /// The CSV folder
    pub csv: PathBuf,
}

impl ExportPaths {
    /// The export locations for the scenario with the given CO2 fraction
    pub fn new(output_dir: &Path, co2_fraction: f64) -> Self {
        let folder = scenario_folder_name(co2_fraction);
        Self {
            container: output_dir
                .join(CONTAINER_DIRECTORY)
                .join(&folder)
                .join(CONTAINER_FILE_NAME),
            csv: output_dir.join(CSV_DIRECTORY).join(folder),
        }
    }
}

/// Write a scenario's model both as a container file and as a CSV folder
pub fn export_network(
    network: &Network,
    output_dir: &Path,
    co2_fraction: f64,
) -> Result<ExportPaths> {
    let paths = ExportPaths::new(output_dir, co2_fraction);

    if let Some(parent) = paths.container.parent() {
        fs::create_dir_all(parent)?;
    }
    write_container(network, &paths.container)
        .with_context(|| format!("Failed to write {}", paths.container.display()))?;
    write_csv_folder(network, &paths.csv)
        .with_context(|| format!("Failed to write {}", paths.csv.display()))?;

    Ok(paths)
}

/// Write one row per scenario to the summary CSV file
pub fn write_summary(output_dir: &Path, outcomes: &[ScenarioOutcome]) -> Result<()> {
    let file_path = output_dir.join(SUMMARY_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)?;
    for outcome in outcomes {
        writer.serialize(outcome)?;
    }
    writer.flush()?;

    Ok(())
}
