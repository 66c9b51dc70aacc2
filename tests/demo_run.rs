//! Integration tests for the `demo run` command.
use itertools::Itertools;
use store2hydro::cli::RunOpts;
use store2hydro::cli::demo::handle_demo_run_command;
use store2hydro::scenario::{ScenarioOutcome, ScenarioStatus};
use store2hydro::settings::Settings;
use tempfile::tempdir;

/// Run the bundled demo and check that every scenario was solved
#[test]
fn test_handle_demo_run_command() {
    unsafe { std::env::set_var("STORE2HYDRO_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        overwrite: false,
    };
    handle_demo_run_command("three_bus", &opts, Some(Settings::default())).unwrap();

    let outcomes: Vec<ScenarioOutcome> =
        csv::Reader::from_path(tempdir.path().join("summary.csv"))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
    assert_eq!(
        outcomes.iter().map(|o| o.folder.as_str()).collect_vec(),
        ["co2_100", "co2_50", "co2_0"]
    );
    assert!(
        outcomes
            .iter()
            .all(|o| o.status == ScenarioStatus::Solved && o.objective.is_some())
    );

    // A tighter cap can never make the system cheaper
    let objectives = outcomes.iter().map(|o| o.objective.unwrap()).collect_vec();
    assert!(objectives[0] <= objectives[1] + 1e-6);
    assert!(objectives[1] <= objectives[2] + 1e-6);
}
