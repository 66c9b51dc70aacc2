//! The command line interface for the program.
use crate::input::load_network;
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir, scenario_folder_name};
use crate::pipeline::Pipeline;
use crate::pipeline::load_rescale::demand_by_country;
use crate::scenario::config::ScenarioConfig;
use crate::scenario::{ScenarioStatus, run_scenarios};
use crate::settings::Settings;
use crate::solver::HighsSolver;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod demo;
use demo::DemoSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run every scenario in a scenario file.
    Run {
        /// Path to the scenario file.
        config: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check a scenario file, its model and every transformation step without solving.
    Validate {
        /// Path to the scenario file.
        config: PathBuf,
    },
    /// Summarise a model.
    Info {
        /// Path to a container file or a CSV folder.
        network: PathBuf,
    },
    /// Manage the bundled demo scenarios.
    Demo {
        /// The available subcommands for managing demos.
        #[command(subcommand)]
        subcommand: DemoSubcommands,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { config, opts } => handle_run_command(&config, &opts, None),
            Self::Validate { config } => handle_validate_command(&config, None),
            Self::Info { network } => handle_info_command(&network),
            Self::Demo { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ store2hydro --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help in markdown format
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(
    config_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(config_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;

    // Load the scenario file
    let config = ScenarioConfig::from_path(config_path).context("Failed to load scenario.")?;
    info!("Loaded scenario from {}", config_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder was overwritten");
    }

    write_metadata(
        output_path,
        config_path,
        &config.network,
        &config.co2_fractions,
    )
    .context("Failed to save metadata.")?;

    // Run the scenarios
    let outcomes = run_scenarios(&config, output_path, &HighsSolver)?;
    let unsolved = outcomes
        .iter()
        .filter(|outcome| outcome.status != ScenarioStatus::Solved)
        .count();
    ensure!(
        unsolved == 0,
        "{unsolved} of {} scenarios were not solved. See the summary in {}.",
        outcomes.len(),
        output_path.display()
    );
    info!("All scenarios solved!");

    Ok(())
}

/// Handle the `validate` command.
///
/// Every scenario's transformations are applied to a copy of the model, so that errors in later
/// steps are found without running the solver.
pub fn handle_validate_command(config_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let config = ScenarioConfig::from_path(config_path).context("Failed to load scenario.")?;
    let network = load_network(&config.network).context("Failed to load model.")?;
    for &co2_fraction in &config.co2_fractions {
        let folder = scenario_folder_name(co2_fraction);
        let transformed = Pipeline::from_config(&config, co2_fraction)
            .run(network.clone())
            .with_context(|| format!("Scenario {folder} is invalid."))?;
        transformed
            .validate()
            .with_context(|| format!("Scenario {folder} produces an invalid model."))?;
    }
    info!("Scenario validation successful!");

    Ok(())
}

/// Handle the `info` command.
pub fn handle_info_command(network_path: &Path) -> Result<()> {
    let network = load_network(network_path).context("Failed to load model.")?;

    println!("Model: {}", network.name);
    println!("Snapshots: {}", network.snapshot_count());
    for (kind, count) in [
        ("Buses", network.buses.len()),
        ("Carriers", network.carriers.len()),
        ("Generators", network.generators.len()),
        ("Storage units", network.storage_units.len()),
        ("Links", network.links.len()),
        ("Lines", network.lines.len()),
        ("Loads", network.loads.len()),
        ("Global constraints", network.global_constraints.len()),
    ] {
        println!("{kind}: {count}");
    }

    println!("Demand by country (MWh):");
    for (country, demand) in demand_by_country(&network, 1.0) {
        println!("  {country}: {demand:.1}");
    }
    if let Some(objective) = network.objective {
        println!("Objective: {objective}");
    }

    Ok(())
}
