//! End-to-end test of a single scenario, from base model to solver input.
use float_cmp::approx_eq;
use std::cell::RefCell;
use store2hydro::input::container::write_container;
use store2hydro::network::component::{Bus, Carrier, Generator, Load};
use store2hydro::network::{Network, Snapshot};
use store2hydro::output::ExportPaths;
use store2hydro::pipeline::load_rescale::demand_by_country;
use store2hydro::scenario::config::ScenarioConfig;
use store2hydro::scenario::{ScenarioStatus, run_scenario};
use store2hydro::solver::{SolveError, Solution, Solver, SolverOptions};
use tempfile::tempdir;

/// Keeps a copy of the last model it was asked to solve
#[derive(Default)]
struct RecordingSolver {
    received: RefCell<Option<Network>>,
}

impl Solver for RecordingSolver {
    fn name(&self) -> &str {
        "recording"
    }

    fn solve(&self, network: &Network, _options: &SolverOptions) -> Result<Solution, SolveError> {
        *self.received.borrow_mut() = Some(network.clone());
        Ok(Solution {
            objective: 1.0,
            ..Solution::default()
        })
    }
}

/// Three buses with a 100 MW hydro plant and a demand series on the first
fn base_network() -> Network {
    let mut network = Network {
        snapshots: (0..3)
            .map(|hour| Snapshot {
                snapshot: format!("2013-01-01 {hour:02}:00:00"),
                weighting: 1.0,
            })
            .collect(),
        ..Network::default()
    };
    for name in ["bus_A", "bus_B", "bus_C"] {
        network
            .buses
            .try_insert(Bus {
                name: name.into(),
                ..Bus::default()
            })
            .unwrap();
    }
    network
        .carriers
        .try_insert(Carrier {
            name: "hydro".into(),
            co2_emissions: 0.0,
        })
        .unwrap();
    network
        .add_generator(Generator {
            name: "hydro_A".into(),
            bus: "bus_A".into(),
            carrier: "hydro".into(),
            p_nom: 100.0,
            ..Generator::default()
        })
        .unwrap();
    for (name, bus) in [("load_A", "bus_A"), ("load_B", "bus_B")] {
        network
            .loads
            .try_insert(Load {
                name: name.into(),
                bus: bus.into(),
                ..Load::default()
            })
            .unwrap();
    }
    network
        .loads_t
        .p_set
        .insert("load_A".into(), vec![10.0, 20.0, 30.0]);
    network
        .loads_t
        .p_set
        .insert("load_B".into(), vec![20.0; 3]);

    network
}

#[test]
fn test_zero_cap_with_rescaled_demand_and_pumped_hydro() {
    let dir = tempdir().unwrap();
    let network_path = dir.path().join("base.json");
    write_container(&base_network(), &network_path).unwrap();

    let mut config: ScenarioConfig = toml::from_str(
        r#"
        network = "base.json"
        co2_fractions = [0.0]

        [load_rescaling]
        conversion_factor = 0.5
        model_energy_per_unit = 1.0

        [load_rescaling.targets]
        A = 1000.0

        [hydro]
        variant = "synthesise"
        "#,
    )
    .unwrap();
    config.network = network_path;

    let solver = RecordingSolver::default();
    let outcome = run_scenario(&config, 0.0, dir.path(), &solver).unwrap();
    assert_eq!(outcome.status, ScenarioStatus::Solved);
    assert_eq!(outcome.folder, "co2_0");

    let received = solver.received.into_inner().unwrap();
    assert_eq!(received.global_constraints.len(), 1);
    let cap = received.global_constraints.get("CO2Limit").unwrap();
    assert_eq!(cap.constant, 0.0);
    assert_eq!(cap.carrier_attribute, "co2_emissions");

    assert!(received.generators.get("hydro_A").is_none());
    let store = received.storage_units.get("PHS_hydro_A_store").unwrap();
    assert_eq!(store.e_nom, 100.0 * 168.0);
    assert_eq!(store.bus.as_str(), "bus_A");
    assert!(received.generators.get("PHS_hydro_A_turb").is_some());
    assert!(received.links.get("PHS_hydro_A_pump_link").is_some());

    // Demand in country A is rescaled to the target; country B is untouched
    let demand = demand_by_country(&received, 1.0);
    assert!(approx_eq!(f64, demand["A"], 500.0, epsilon = 1e-9));
    assert_eq!(
        received.loads_t.p_set.get("load_B").unwrap(),
        [20.0; 3]
    );

    assert!(ExportPaths::new(dir.path(), 0.0).container.is_file());
}
