//! The in-memory grid model: component tables plus per-snapshot time series.
use crate::solver::Solution;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

pub mod component;
use component::*;
pub mod registry;
use registry::{Component, ComponentMap};
pub mod series;
use series::SeriesTable;

/// One discrete timestep of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Label of the snapshot (usually a timestamp)
    pub snapshot: String,
    /// Weight of the snapshot in the objective and in energy sums (hours)
    #[serde(default = "default_weighting")]
    pub weighting: f64,
}

fn default_weighting() -> f64 {
    1.0
}

/// Time series for loads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSeries {
    /// Demand (MW)
    pub p_set: SeriesTable<LoadID>,
}

/// Time series for generators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSeries {
    /// Availability per unit of capacity
    pub p_max_pu: SeriesTable<GeneratorID>,
    /// Dispatch (historical on input, optimised after solving)
    pub p: SeriesTable<GeneratorID>,
}

/// Time series for storage units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageUnitSeries {
    /// Natural inflow into the store (MW)
    pub inflow: SeriesTable<StorageUnitID>,
    /// Net dispatch (negative when storing)
    pub p: SeriesTable<StorageUnitID>,
    /// Energy level at the end of each snapshot (MWh)
    pub state_of_charge: SeriesTable<StorageUnitID>,
    /// Spilled inflow (MW)
    pub spill: SeriesTable<StorageUnitID>,
}

/// Time series for links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSeries {
    /// Power withdrawn at `bus0`
    pub p0: SeriesTable<LinkID>,
    /// Power delivered at `bus1` (negative by convention)
    pub p1: SeriesTable<LinkID>,
}

/// Time series for lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSeries {
    /// Flow from `bus0` to `bus1`
    pub p0: SeriesTable<LineID>,
}

/// Time series for buses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSeries {
    /// Shadow price of the nodal power balance
    pub marginal_price: SeriesTable<BusID>,
}

/// A grid model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    /// Name of the model
    pub name: String,
    /// The shared time index of every series
    pub snapshots: Vec<Snapshot>,
    /// Grid nodes
    pub buses: ComponentMap<Bus>,
    /// Energy carriers
    pub carriers: ComponentMap<Carrier>,
    /// Power sources
    pub generators: ComponentMap<Generator>,
    /// Energy stores
    pub storage_units: ComponentMap<StorageUnit>,
    /// Controllable converters between buses
    pub links: ComponentMap<Link>,
    /// AC lines
    pub lines: ComponentMap<Line>,
    /// Demand sinks
    pub loads: ComponentMap<Load>,
    /// Model-wide constraints
    pub global_constraints: ComponentMap<GlobalConstraint>,
    /// Load time series
    pub loads_t: LoadSeries,
    /// Generator time series
    pub generators_t: GeneratorSeries,
    /// Storage unit time series
    pub storage_units_t: StorageUnitSeries,
    /// Link time series
    pub links_t: LinkSeries,
    /// Line time series
    pub lines_t: LineSeries,
    /// Bus time series
    pub buses_t: BusSeries,
    /// Objective value of the last solve
    pub objective: Option<f64>,
}

/// Check that every component in a table has a non-empty name
fn check_names<T: Component>(components: &ComponentMap<T>) -> Result<()> {
    for id in components.ids() {
        ensure!(
            !<T::ID as Borrow<str>>::borrow(id).is_empty(),
            "{} with empty name found",
            T::KIND
        );
    }

    Ok(())
}

impl Network {
    /// Number of snapshots
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Snapshot weightings, in snapshot order
    pub fn weightings(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.weighting).collect()
    }

    /// Check that a bus exists
    fn check_bus(&self, bus: &BusID, kind: &str, name: &str) -> Result<()> {
        ensure!(
            self.buses.contains(bus.as_str()),
            "{kind} '{name}' refers to unknown bus '{bus}'"
        );
        Ok(())
    }

    /// Check the internal consistency of the model.
    ///
    /// Bus references must resolve, every series must have one finite value per snapshot and refer
    /// to an existing component, and parameters which appear as divisors must be positive.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.snapshots.is_empty(), "Model has no snapshots");
        for snapshot in &self.snapshots {
            ensure!(
                snapshot.weighting.is_finite() && snapshot.weighting >= 0.0,
                "Invalid weighting for snapshot '{}'",
                snapshot.snapshot
            );
        }

        check_names(&self.buses)?;
        check_names(&self.carriers)?;
        check_names(&self.generators)?;
        check_names(&self.storage_units)?;
        check_names(&self.links)?;
        check_names(&self.lines)?;
        check_names(&self.loads)?;
        check_names(&self.global_constraints)?;

        for generator in self.generators.iter() {
            self.check_bus(&generator.bus, Generator::KIND, generator.name.as_str())?;
            ensure!(
                generator.efficiency > 0.0,
                "Generator '{}' must have a positive efficiency",
                generator.name
            );
        }
        for unit in self.storage_units.iter() {
            self.check_bus(&unit.bus, StorageUnit::KIND, unit.name.as_str())?;
            ensure!(
                unit.efficiency_dispatch > 0.0,
                "StorageUnit '{}' must have a positive dispatch efficiency",
                unit.name
            );
            ensure!(
                (0.0..=1.0).contains(&unit.standing_loss),
                "StorageUnit '{}' must have a standing loss between 0 and 1",
                unit.name
            );
        }
        for link in self.links.iter() {
            self.check_bus(&link.bus0, Link::KIND, link.name.as_str())?;
            self.check_bus(&link.bus1, Link::KIND, link.name.as_str())?;
        }
        for line in self.lines.iter() {
            self.check_bus(&line.bus0, Line::KIND, line.name.as_str())?;
            self.check_bus(&line.bus1, Line::KIND, line.name.as_str())?;
        }
        for load in self.loads.iter() {
            self.check_bus(&load.bus, Load::KIND, load.name.as_str())?;
        }

        let n = self.snapshot_count();
        self.loads_t.p_set.validate("loads-p_set", &self.loads, n)?;
        self.generators_t
            .p_max_pu
            .validate("generators-p_max_pu", &self.generators, n)?;
        self.generators_t.p.validate("generators-p", &self.generators, n)?;
        self.storage_units_t
            .inflow
            .validate("storage_units-inflow", &self.storage_units, n)?;
        self.storage_units_t
            .p
            .validate("storage_units-p", &self.storage_units, n)?;
        self.storage_units_t.state_of_charge.validate(
            "storage_units-state_of_charge",
            &self.storage_units,
            n,
        )?;
        self.storage_units_t
            .spill
            .validate("storage_units-spill", &self.storage_units, n)?;
        self.links_t.p0.validate("links-p0", &self.links, n)?;
        self.links_t.p1.validate("links-p1", &self.links, n)?;
        self.lines_t.p0.validate("lines-p0", &self.lines, n)?;
        self.buses_t
            .marginal_price
            .validate("buses-marginal_price", &self.buses, n)?;

        Ok(())
    }

    /// Add a new generator, failing if its bus is unknown or its name is taken
    pub fn add_generator(&mut self, generator: Generator) -> Result<()> {
        self.check_bus(&generator.bus, Generator::KIND, generator.name.as_str())?;
        self.generators.try_insert(generator)
    }

    /// Add a new storage unit, failing if its bus is unknown or its name is taken
    pub fn add_storage_unit(&mut self, unit: StorageUnit) -> Result<()> {
        self.check_bus(&unit.bus, StorageUnit::KIND, unit.name.as_str())?;
        self.storage_units.try_insert(unit)
    }

    /// Add a new link, failing if either bus is unknown or its name is taken
    pub fn add_link(&mut self, link: Link) -> Result<()> {
        self.check_bus(&link.bus0, Link::KIND, link.name.as_str())?;
        self.check_bus(&link.bus1, Link::KIND, link.name.as_str())?;
        self.links.try_insert(link)
    }

    /// Remove a generator along with all of its time series
    pub fn remove_generator(&mut self, id: &str) -> Option<Generator> {
        self.generators_t.p_max_pu.remove(id);
        self.generators_t.p.remove(id);
        self.generators.remove(id)
    }

    /// Restrict the model to its first `len` snapshots
    pub fn truncate_snapshots(&mut self, len: usize) {
        if len >= self.snapshot_count() {
            return;
        }

        self.snapshots.truncate(len);
        self.loads_t.p_set.truncate(len);
        self.generators_t.p_max_pu.truncate(len);
        self.generators_t.p.truncate(len);
        self.storage_units_t.inflow.truncate(len);
        self.storage_units_t.p.truncate(len);
        self.storage_units_t.state_of_charge.truncate(len);
        self.storage_units_t.spill.truncate(len);
        self.links_t.p0.truncate(len);
        self.links_t.p1.truncate(len);
        self.lines_t.p0.truncate(len);
        self.buses_t.marginal_price.truncate(len);
    }

    /// Annotate the model with the results of a successful solve
    pub fn with_solution(mut self, solution: Solution) -> Result<Network> {
        for (id, value) in &solution.generator_capacities {
            self.generators
                .get_mut(id.as_str())
                .with_context(|| format!("Solution refers to unknown generator '{id}'"))?
                .p_nom_opt = *value;
        }
        for (id, value) in &solution.storage_unit_capacities {
            self.storage_units
                .get_mut(id.as_str())
                .with_context(|| format!("Solution refers to unknown storage unit '{id}'"))?
                .p_nom_opt = *value;
        }
        for (id, value) in &solution.link_capacities {
            self.links
                .get_mut(id.as_str())
                .with_context(|| format!("Solution refers to unknown link '{id}'"))?
                .p_nom_opt = *value;
        }
        for (id, value) in &solution.line_capacities {
            self.lines
                .get_mut(id.as_str())
                .with_context(|| format!("Solution refers to unknown line '{id}'"))?
                .s_nom_opt = *value;
        }
        for (id, value) in &solution.constraint_duals {
            self.global_constraints
                .get_mut(id.as_str())
                .with_context(|| format!("Solution refers to unknown constraint '{id}'"))?
                .mu = *value;
        }

        let n = self.snapshot_count();
        let context = "Solution does not match the model";
        solution
            .generator_dispatch
            .validate("generators-p", &self.generators, n)
            .context(context)?;
        for (name, table) in [
            ("storage_units-p", &solution.storage_unit_dispatch),
            ("storage_units-state_of_charge", &solution.state_of_charge),
            ("storage_units-spill", &solution.spill),
        ] {
            table.validate(name, &self.storage_units, n).context(context)?;
        }
        for (name, table) in [
            ("links-p0", &solution.link_flows_p0),
            ("links-p1", &solution.link_flows_p1),
        ] {
            table.validate(name, &self.links, n).context(context)?;
        }
        solution
            .line_flows
            .validate("lines-p0", &self.lines, n)
            .context(context)?;
        solution
            .marginal_prices
            .validate("buses-marginal_price", &self.buses, n)
            .context(context)?;

        self.generators_t.p = solution.generator_dispatch;
        self.storage_units_t.p = solution.storage_unit_dispatch;
        self.storage_units_t.state_of_charge = solution.state_of_charge;
        self.storage_units_t.spill = solution.spill;
        self.links_t.p0 = solution.link_flows_p0;
        self.links_t.p1 = solution.link_flows_p1;
        self.lines_t.p0 = solution.line_flows;
        self.buses_t.marginal_price = solution.marginal_prices;
        self.objective = Some(solution.objective);

        Ok(self)
    }
}
