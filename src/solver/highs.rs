//! A linear capacity-expansion formulation solved with HiGHS.
//!
//! The formulation is a transport model: power balances at each bus and snapshot, with lines and
//! links as controllable flows (no Kirchhoff voltage law and no line losses).
//!
//! Variables:
//!
//! * the optimal capacity of every extendable generator, storage unit, link and line
//! * generator dispatch, link and line flows per snapshot
//! * storage dispatch, store, state of charge and spillage per snapshot
//!
//! The objective is the annualised capital cost of the optimised capacities plus the
//! snapshot-weighted marginal cost of dispatch.
use super::{OptionValue, Solution, SolveError, Solver, SolverOptions};
use crate::network::Network;
use crate::network::component::{BusID, ConstraintSense, GlobalConstraintID, StorageUnit};
use crate::network::series::SeriesTable;
use ::highs::{HighsModelStatus, RowProblem as Problem, Sense};
use log::debug;

/// A decision variable, along with its column index in the solution
#[derive(Clone, Copy)]
struct Variable {
    col: ::highs::Col,
    index: usize,
}

/// The carrier attribute which global constraints may bound
const CO2_ATTRIBUTE: &str = "co2_emissions";

/// The only kind of global constraint supported
const PRIMARY_ENERGY: &str = "primary_energy";

/// The problem under construction, tracking column costs and the number of rows
#[derive(Default)]
struct Formulation {
    problem: Problem,
    costs: Vec<f64>,
    rows: usize,
}

impl Formulation {
    fn add_column(&mut self, cost: f64, lower: f64, upper: f64) -> Variable {
        let col = self.problem.add_column(cost, lower..=upper);
        self.costs.push(cost);
        Variable {
            col,
            index: self.costs.len() - 1,
        }
    }

    fn add_row(&mut self, lower: f64, upper: f64, terms: &[(Variable, f64)]) {
        self.problem.add_row(
            lower..=upper,
            terms.iter().map(|(var, coeff)| (var.col, *coeff)),
        );
        self.rows += 1;
    }

    /// Add a flow bounded by `[min_pu, max_pu]` times the capacity
    fn add_bounded_flow(
        &mut self,
        capacity: Capacity,
        min_pu: f64,
        max_pu: f64,
        cost: f64,
    ) -> Variable {
        match capacity {
            Capacity::Fixed(p_nom) => self.add_column(cost, min_pu * p_nom, max_pu * p_nom),
            Capacity::Variable(cap) => {
                let var = self.add_column(cost, f64::NEG_INFINITY, f64::INFINITY);
                self.add_row(f64::NEG_INFINITY, 0.0, &[(var, 1.0), (cap, -max_pu)]);
                self.add_row(0.0, f64::INFINITY, &[(var, 1.0), (cap, -min_pu)]);
                var
            }
        }
    }
}

/// Corresponding keys for a block of rows along with the row offset in the solution
struct KeysWithOffset<T> {
    offset: usize,
    keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }
}

/// The capacity of a component: fixed, or a decision variable
#[derive(Clone, Copy)]
enum Capacity {
    Fixed(f64),
    Variable(Variable),
}

impl Capacity {
    fn new(
        formulation: &mut Formulation,
        extendable: bool,
        nominal: f64,
        min: f64,
        max: f64,
        capital_cost: f64,
    ) -> Self {
        if extendable {
            Self::Variable(formulation.add_column(capital_cost, min, max))
        } else {
            Self::Fixed(nominal)
        }
    }

    fn value(self, columns: &[f64]) -> f64 {
        match self {
            Self::Fixed(value) => value,
            Self::Variable(var) => columns[var.index],
        }
    }
}

struct GeneratorVariables {
    capacity: Capacity,
    dispatch: Vec<Variable>,
}

struct StorageVariables {
    capacity: Capacity,
    dispatch: Vec<Variable>,
    store: Vec<Variable>,
    state_of_charge: Vec<Variable>,
    spill: Option<Vec<Variable>>,
}

struct LinkVariables {
    capacity: Capacity,
    flow: Vec<Variable>,
}

struct LineVariables {
    capacity: Capacity,
    flow: Vec<Variable>,
}

/// All decision variables, in component order
struct Variables {
    generators: Vec<GeneratorVariables>,
    storage_units: Vec<StorageVariables>,
    links: Vec<LinkVariables>,
    lines: Vec<LineVariables>,
}

/// Keys for the rows whose duals are reported
struct ConstraintKeys {
    /// One key per bus and snapshot
    balance: KeysWithOffset<(usize, usize)>,
    /// One key per global constraint
    global: KeysWithOffset<GlobalConstraintID>,
}

/// The default solver backend
#[derive(Debug, Default, Clone, Copy)]
pub struct HighsSolver;

impl Solver for HighsSolver {
    fn name(&self) -> &str {
        "highs"
    }

    fn solve(&self, network: &Network, options: &SolverOptions) -> Result<Solution, SolveError> {
        network
            .validate()
            .map_err(|err| SolveError::InvalidModel(format!("{err:#}")))?;

        let mut formulation = Formulation::default();
        let variables = add_variables(&mut formulation, network);
        let keys = add_constraints(&mut formulation, &variables, network)?;
        debug!(
            "Formulated problem with {} columns and {} rows",
            formulation.costs.len(),
            formulation.rows
        );

        let Formulation { problem, costs, .. } = formulation;
        let mut model = problem.optimise(Sense::Minimise);
        model
            .try_set_option("output_flag", false)
            .map_err(|status| SolveError::Unavailable(format!("{status:?}")))?;
        apply_options(&mut model, options)?;

        let solved = model
            .try_solve()
            .map_err(|status| SolveError::Numerical(format!("{status:?}")))?;
        match solved.status() {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => {}
            HighsModelStatus::Infeasible => return Err(SolveError::Infeasible),
            HighsModelStatus::Unbounded => return Err(SolveError::Unbounded),
            HighsModelStatus::UnboundedOrInfeasible => {
                return Err(SolveError::InfeasibleOrUnbounded);
            }
            status => return Err(SolveError::Numerical(format!("{status:?}"))),
        }

        let solution = solved.get_solution();
        Ok(read_solution(
            network,
            &variables,
            &keys,
            &costs,
            solution.columns(),
            solution.dual_rows(),
        ))
    }
}

/// Pass the options bundle through to HiGHS
fn apply_options(model: &mut ::highs::Model, options: &SolverOptions) -> Result<(), SolveError> {
    for (name, value) in options {
        let invalid = || SolveError::InvalidOption {
            name: name.clone(),
            value: value.to_string(),
        };
        let result = match value {
            OptionValue::Bool(value) => model.try_set_option(name.as_str(), *value),
            OptionValue::Integer(value) => {
                let value = i32::try_from(*value).map_err(|_| invalid())?;
                model.try_set_option(name.as_str(), value)
            }
            OptionValue::Float(value) => model.try_set_option(name.as_str(), *value),
            OptionValue::Text(value) => model.try_set_option(name.as_str(), value.as_str()),
        };
        result.map_err(|_| invalid())?;
        debug!("Set solver option {name} = {value}");
    }

    Ok(())
}

/// Add columns for every component, along with their capacity and storage constraints
fn add_variables(formulation: &mut Formulation, network: &Network) -> Variables {
    let weightings = network.weightings();

    let generators = network
        .generators
        .iter()
        .map(|generator| {
            let capacity = Capacity::new(
                formulation,
                generator.p_nom_extendable,
                generator.p_nom,
                generator.p_nom_min,
                generator.p_nom_max,
                generator.capital_cost,
            );
            let max_pu = network.generators_t.p_max_pu.get(generator.name.as_str());
            let dispatch = weightings
                .iter()
                .enumerate()
                .map(|(t, weighting)| {
                    let max_pu = max_pu.map_or(generator.p_max_pu, |series| series[t]);
                    formulation.add_bounded_flow(
                        capacity,
                        generator.p_min_pu,
                        max_pu,
                        weighting * generator.marginal_cost,
                    )
                })
                .collect();

            GeneratorVariables { capacity, dispatch }
        })
        .collect();

    let storage_units = network
        .storage_units
        .iter()
        .map(|unit| {
            let capacity = Capacity::new(
                formulation,
                unit.p_nom_extendable,
                unit.p_nom,
                unit.p_nom_min,
                unit.p_nom_max,
                unit.capital_cost,
            );
            let inflow = network.storage_units_t.inflow.get(unit.name.as_str());
            let store_pu = (-unit.p_min_pu).max(0.0);

            let mut variables = StorageVariables {
                capacity,
                dispatch: Vec::with_capacity(weightings.len()),
                store: Vec::with_capacity(weightings.len()),
                state_of_charge: Vec::with_capacity(weightings.len()),
                spill: inflow.map(|_| Vec::with_capacity(weightings.len())),
            };
            for (t, weighting) in weightings.iter().enumerate() {
                variables.dispatch.push(formulation.add_bounded_flow(
                    capacity,
                    0.0,
                    unit.p_max_pu,
                    weighting * unit.marginal_cost,
                ));
                variables
                    .store
                    .push(formulation.add_bounded_flow(capacity, 0.0, store_pu, 0.0));

                let soc = match capacity {
                    Capacity::Variable(cap) if unit.e_nom <= 0.0 => {
                        let soc = formulation.add_column(0.0, 0.0, f64::INFINITY);
                        formulation.add_row(
                            f64::NEG_INFINITY,
                            0.0,
                            &[(soc, 1.0), (cap, -unit.max_hours)],
                        );
                        soc
                    }
                    _ => formulation.add_column(0.0, 0.0, unit.energy_capacity(unit.p_nom)),
                };
                variables.state_of_charge.push(soc);

                if let (Some(spill), Some(inflow)) = (variables.spill.as_mut(), inflow) {
                    spill.push(formulation.add_column(0.0, 0.0, inflow[t].max(0.0)));
                }
            }

            add_storage_balance(formulation, network, unit, &variables, &weightings);
            variables
        })
        .collect();

    let links = network
        .links
        .iter()
        .map(|link| {
            let capacity = Capacity::new(
                formulation,
                link.p_nom_extendable,
                link.p_nom,
                link.p_nom_min,
                link.p_nom_max,
                link.capital_cost,
            );
            let flow = weightings
                .iter()
                .map(|weighting| {
                    formulation.add_bounded_flow(
                        capacity,
                        link.p_min_pu,
                        link.p_max_pu,
                        weighting * link.marginal_cost,
                    )
                })
                .collect();

            LinkVariables { capacity, flow }
        })
        .collect();

    let lines = network
        .lines
        .iter()
        .map(|line| {
            let capacity = Capacity::new(
                formulation,
                line.s_nom_extendable,
                line.s_nom,
                line.s_nom_min,
                line.s_nom_max,
                line.capital_cost,
            );
            let flow = weightings
                .iter()
                .map(|_| {
                    formulation.add_bounded_flow(capacity, -line.s_max_pu, line.s_max_pu, 0.0)
                })
                .collect();

            LineVariables { capacity, flow }
        })
        .collect();

    Variables {
        generators,
        storage_units,
        links,
        lines,
    }
}

/// Add the energy balance of a storage unit for every snapshot.
///
/// `soc[t] = (1 - standing_loss)^w * soc[t-1] + w * (eff_store * store[t] - dispatch[t] /
/// eff_dispatch + inflow[t] - spill[t])`, where `soc[-1]` is the final state of charge for cyclic
/// units and the initial state of charge otherwise.
fn add_storage_balance(
    formulation: &mut Formulation,
    network: &Network,
    unit: &StorageUnit,
    variables: &StorageVariables,
    weightings: &[f64],
) {
    let inflow = network.storage_units_t.inflow.get(unit.name.as_str());
    let n = weightings.len();
    for (t, &weighting) in weightings.iter().enumerate() {
        let retained = (1.0 - unit.standing_loss).powf(weighting);
        let mut rhs = weighting * inflow.map_or(0.0, |inflow| inflow[t]);

        let mut terms = vec![
            (variables.dispatch[t], weighting / unit.efficiency_dispatch),
            (variables.store[t], -weighting * unit.efficiency_store),
        ];
        if let Some(spill) = &variables.spill {
            terms.push((spill[t], weighting));
        }

        if t > 0 {
            terms.push((variables.state_of_charge[t], 1.0));
            terms.push((variables.state_of_charge[t - 1], -retained));
        } else if !unit.cyclic_state_of_charge {
            terms.push((variables.state_of_charge[t], 1.0));
            rhs += retained * unit.state_of_charge_initial;
        } else if n == 1 {
            terms.push((variables.state_of_charge[t], 1.0 - retained));
        } else {
            terms.push((variables.state_of_charge[t], 1.0));
            terms.push((variables.state_of_charge[n - 1], -retained));
        }

        formulation.add_row(rhs, rhs, &terms);
    }
}

/// Add nodal balances and global constraints.
///
/// Note: each block of rows is contiguous, as the dual values of the constraints are later
/// retrieved by offset.
fn add_constraints(
    formulation: &mut Formulation,
    variables: &Variables,
    network: &Network,
) -> Result<ConstraintKeys, SolveError> {
    let balance = add_balance_constraints(formulation, variables, network)?;
    let global = add_global_constraints(formulation, variables, network)?;

    Ok(ConstraintKeys { balance, global })
}

/// Find the position of a bus
fn bus_index(network: &Network, bus: &BusID) -> Result<usize, SolveError> {
    network
        .buses
        .index_of(bus.as_str())
        .ok_or_else(|| SolveError::InvalidModel(format!("Unknown bus '{bus}'")))
}

/// Add a power balance for every bus and snapshot: supply minus withdrawals equals demand
fn add_balance_constraints(
    formulation: &mut Formulation,
    variables: &Variables,
    network: &Network,
) -> Result<KeysWithOffset<(usize, usize)>, SolveError> {
    let n = network.snapshot_count();
    let mut terms: Vec<Vec<(Variable, f64)>> = vec![Vec::new(); network.buses.len() * n];
    let mut demand = vec![0.0; network.buses.len() * n];

    for (generator, vars) in network.generators.iter().zip(&variables.generators) {
        let bus = bus_index(network, &generator.bus)?;
        for (t, var) in vars.dispatch.iter().enumerate() {
            terms[bus * n + t].push((*var, 1.0));
        }
    }

    for (unit, vars) in network.storage_units.iter().zip(&variables.storage_units) {
        let bus = bus_index(network, &unit.bus)?;
        for t in 0..n {
            terms[bus * n + t].push((vars.dispatch[t], 1.0));
            terms[bus * n + t].push((vars.store[t], -1.0));
        }
    }

    for (link, vars) in network.links.iter().zip(&variables.links) {
        let bus0 = bus_index(network, &link.bus0)?;
        let bus1 = bus_index(network, &link.bus1)?;
        for (t, var) in vars.flow.iter().enumerate() {
            if bus0 == bus1 {
                // Withdrawal and delivery at the same bus leave only the conversion loss
                terms[bus0 * n + t].push((*var, link.efficiency - 1.0));
            } else {
                terms[bus0 * n + t].push((*var, -1.0));
                terms[bus1 * n + t].push((*var, link.efficiency));
            }
        }
    }

    for (line, vars) in network.lines.iter().zip(&variables.lines) {
        let bus0 = bus_index(network, &line.bus0)?;
        let bus1 = bus_index(network, &line.bus1)?;
        if bus0 == bus1 {
            continue;
        }
        for (t, var) in vars.flow.iter().enumerate() {
            terms[bus0 * n + t].push((*var, -1.0));
            terms[bus1 * n + t].push((*var, 1.0));
        }
    }

    for load in network.loads.iter() {
        let bus = bus_index(network, &load.bus)?;
        let p_set = network.loads_t.p_set.get(load.name.as_str());
        for t in 0..n {
            demand[bus * n + t] += p_set.map_or(load.p_set, |series| series[t]);
        }
    }

    let offset = formulation.rows;
    let mut keys = Vec::with_capacity(terms.len());
    for (i, (terms, demand)) in terms.iter().zip(demand).enumerate() {
        formulation.add_row(demand, demand, terms);
        keys.push((i / n, i % n));
    }

    Ok(KeysWithOffset { offset, keys })
}

/// Add a row for each global constraint, bounding the emissions of generators.
///
/// Emissions are `w * dispatch / efficiency * co2_emissions` of the generator's carrier.
fn add_global_constraints(
    formulation: &mut Formulation,
    variables: &Variables,
    network: &Network,
) -> Result<KeysWithOffset<GlobalConstraintID>, SolveError> {
    let weightings = network.weightings();

    let mut emissions = Vec::new();
    for (generator, vars) in network.generators.iter().zip(&variables.generators) {
        let intensity = network
            .carriers
            .get(&generator.carrier)
            .map_or(0.0, |carrier| carrier.co2_emissions);
        if intensity == 0.0 {
            continue;
        }
        for (var, weighting) in vars.dispatch.iter().zip(&weightings) {
            emissions.push((*var, weighting * intensity / generator.efficiency));
        }
    }

    let offset = formulation.rows;
    let mut keys = Vec::new();
    for constraint in network.global_constraints.iter() {
        if constraint.kind != PRIMARY_ENERGY {
            return Err(SolveError::InvalidModel(format!(
                "Unsupported type '{}' for global constraint '{}'",
                constraint.kind, constraint.name
            )));
        }
        if constraint.carrier_attribute != CO2_ATTRIBUTE {
            return Err(SolveError::InvalidModel(format!(
                "Unsupported carrier attribute '{}' for global constraint '{}'",
                constraint.carrier_attribute, constraint.name
            )));
        }

        let (lower, upper) = match constraint.sense {
            ConstraintSense::LessOrEqual => (f64::NEG_INFINITY, constraint.constant),
            ConstraintSense::GreaterOrEqual => (constraint.constant, f64::INFINITY),
            ConstraintSense::Equal => (constraint.constant, constraint.constant),
        };
        formulation.add_row(lower, upper, &emissions);
        keys.push(constraint.name.clone());
    }

    Ok(KeysWithOffset { offset, keys })
}

/// Convert the raw solution into capacities, series and prices
fn read_solution(
    network: &Network,
    variables: &Variables,
    keys: &ConstraintKeys,
    costs: &[f64],
    columns: &[f64],
    duals: &[f64],
) -> Solution {
    let value = |var: &Variable| columns[var.index];
    let values = |vars: &[Variable]| vars.iter().map(value).collect::<Vec<_>>();

    let mut solution = Solution {
        objective: costs.iter().zip(columns).map(|(cost, x)| cost * x).sum(),
        ..Solution::default()
    };

    for (generator, vars) in network.generators.iter().zip(&variables.generators) {
        let id = generator.name.clone();
        solution
            .generator_capacities
            .insert(id.clone(), vars.capacity.value(columns));
        solution.generator_dispatch.insert(id, values(&vars.dispatch));
    }

    for (unit, vars) in network.storage_units.iter().zip(&variables.storage_units) {
        let id = unit.name.clone();
        solution
            .storage_unit_capacities
            .insert(id.clone(), vars.capacity.value(columns));
        let net = vars
            .dispatch
            .iter()
            .zip(&vars.store)
            .map(|(dispatch, store)| value(dispatch) - value(store))
            .collect();
        solution.storage_unit_dispatch.insert(id.clone(), net);
        solution
            .state_of_charge
            .insert(id.clone(), values(&vars.state_of_charge));
        if let Some(spill) = &vars.spill {
            solution.spill.insert(id, values(spill));
        }
    }

    for (link, vars) in network.links.iter().zip(&variables.links) {
        let id = link.name.clone();
        let p0 = values(&vars.flow);
        let p1 = p0.iter().map(|p| -link.efficiency * p).collect();
        solution
            .link_capacities
            .insert(id.clone(), vars.capacity.value(columns));
        solution.link_flows_p0.insert(id.clone(), p0);
        solution.link_flows_p1.insert(id, p1);
    }

    for (line, vars) in network.lines.iter().zip(&variables.lines) {
        let id = line.name.clone();
        solution
            .line_capacities
            .insert(id.clone(), vars.capacity.value(columns));
        solution.line_flows.insert(id, values(&vars.flow));
    }

    // Duals of the balance rows are costs per snapshot, so divide by the weighting to get prices
    let weightings = network.weightings();
    let mut prices: Vec<Vec<f64>> =
        vec![Vec::with_capacity(weightings.len()); network.buses.len()];
    for (&(bus, t), dual) in keys.balance.zip_duals(duals) {
        let weighting = weightings[t];
        prices[bus].push(if weighting > 0.0 { dual / weighting } else { dual });
    }
    solution.marginal_prices = network
        .buses
        .ids()
        .cloned()
        .zip(prices)
        .collect::<SeriesTable<_>>();

    for (id, dual) in keys.global.zip_duals(duals) {
        solution.constraint_duals.insert(id.clone(), dual);
    }

    solution
}
