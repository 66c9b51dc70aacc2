//! Integration tests for the `run` command.
use std::fs;
use std::path::PathBuf;
use store2hydro::cli::{RunOpts, handle_run_command};
use store2hydro::input::load_network;
use store2hydro::settings::Settings;
use tempfile::tempdir;

/// Get the path to the demo scenario file.
fn get_scenario_path() -> PathBuf {
    PathBuf::from("demos/three_bus/scenario.toml")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("STORE2HYDRO_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
    };
    handle_run_command(&get_scenario_path(), &opts, Some(Settings::default())).unwrap();

    assert!(output_dir.join("metadata.toml").is_file());
    let summary = fs::read_to_string(output_dir.join("summary.csv")).unwrap();
    assert_eq!(summary.lines().count(), 4);
    for folder in ["co2_100", "co2_50", "co2_0"] {
        let container = output_dir.join("container").join(folder).join("network.json");
        let network = load_network(&container).unwrap();
        assert!(network.objective.is_some());
        assert_eq!(network.snapshot_count(), 12);
        assert!(network.generators.get("hydro_NO").is_none());
        assert!(network.storage_units.get("PHS_hydro_NO_store").is_some());
        assert!(output_dir.join("csv").join(folder).join("buses.csv").is_file());
    }

    // Second run into the same folder is refused without --overwrite
    assert_eq!(
        handle_run_command(&get_scenario_path(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        format!("Failed to create output directory: {}", output_dir.display())
    );
}
