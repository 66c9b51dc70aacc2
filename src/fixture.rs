//! Fixtures for tests
use crate::network::component::*;
use crate::network::{Network, Snapshot};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn snapshots() -> Vec<Snapshot> {
    (0..4)
        .map(|hour| Snapshot {
            snapshot: format!("2013-01-01 {hour:02}:00:00"),
            weighting: 1.0,
        })
        .collect()
}

/// A three-bus model: hydro on bus A, gas on bus B, a hydro reservoir and a PHS unit, two links
#[fixture]
pub fn network(snapshots: Vec<Snapshot>) -> Network {
    let mut network = Network {
        snapshots,
        ..Network::default()
    };

    for (name, x) in [("bus_A", 10.0), ("bus_B", 11.0), ("bus_C", 12.0)] {
        network
            .buses
            .try_insert(Bus {
                name: name.into(),
                x,
                y: 50.0,
                ..Bus::default()
            })
            .unwrap();
    }

    for (name, co2_emissions) in [("hydro", 0.0), ("gas", 0.2), ("PHS", 0.0)] {
        network
            .carriers
            .try_insert(Carrier {
                name: name.into(),
                co2_emissions,
            })
            .unwrap();
    }

    network
        .add_generator(Generator {
            name: "hydro_A".into(),
            bus: "bus_A".into(),
            carrier: "hydro".into(),
            p_nom: 100.0,
            ..Generator::default()
        })
        .unwrap();
    network
        .generators_t
        .p_max_pu
        .insert("hydro_A".into(), vec![0.5, 0.6, 0.7, 0.8]);
    network
        .add_generator(Generator {
            name: "gas_B".into(),
            bus: "bus_B".into(),
            carrier: "gas".into(),
            p_nom: 300.0,
            efficiency: 0.5,
            marginal_cost: 60.0,
            ..Generator::default()
        })
        .unwrap();

    network
        .add_storage_unit(StorageUnit {
            name: "reservoir_C".into(),
            bus: "bus_C".into(),
            carrier: "hydro".into(),
            p_nom: 20.0,
            p_min_pu: 0.0,
            max_hours: 10.0,
            ..StorageUnit::default()
        })
        .unwrap();
    network
        .storage_units_t
        .inflow
        .insert("reservoir_C".into(), vec![5.0; 4]);
    network
        .add_storage_unit(StorageUnit {
            name: "phs_B".into(),
            bus: "bus_B".into(),
            carrier: "PHS".into(),
            p_nom: 10.0,
            max_hours: 6.0,
            efficiency_store: 0.87,
            efficiency_dispatch: 0.87,
            ..StorageUnit::default()
        })
        .unwrap();

    for (name, bus0, bus1) in [("link_A_B", "bus_A", "bus_B"), ("link_B_C", "bus_B", "bus_C")] {
        network
            .add_link(Link {
                name: name.into(),
                bus0: bus0.into(),
                bus1: bus1.into(),
                carrier: "DC".into(),
                p_nom: 100.0,
                p_min_pu: -1.0,
                ..Link::default()
            })
            .unwrap();
    }

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
        .loads
        .try_insert(Load {
            name: "load_C".into(),
            bus: "bus_C".into(),
            p_set: 10.0,
            ..Load::default()
        })
        .unwrap();
    network.loads_t.p_set.insert("load_A".into(), vec![50.0; 4]);
    network.loads_t.p_set.insert("load_B".into(), vec![100.0; 4]);

    network
}
