//! The interface to the optimiser which sizes and dispatches a transformed model.
//!
//! The pipeline only depends on the [`Solver`] trait. A solve either succeeds completely, returning
//! a [`Solution`] which can be applied with [`Network::with_solution`], or fails with a
//! [`SolveError`]. The model itself is only borrowed, so a failed solve leaves it untouched.
use crate::network::Network;
use crate::network::component::{
    BusID, GeneratorID, GlobalConstraintID, LineID, LinkID, StorageUnitID,
};
use crate::network::series::SeriesTable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod highs;
pub use highs::HighsSolver;

/// A value in the solver options bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A switch
    Bool(bool),
    /// An integer option
    Integer(i64),
    /// A numeric option (e.g. a tolerance)
    Float(f64),
    /// A string option (e.g. the algorithm to use)
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

/// Named options passed through to the solver verbatim
pub type SolverOptions = IndexMap<String, OptionValue>;

/// The reasons a solve can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// No solution satisfies the constraints
    #[error("the model is infeasible")]
    Infeasible,
    /// The objective can be decreased without limit
    #[error("the model is unbounded")]
    Unbounded,
    /// The solver could only determine that the model is infeasible or unbounded
    #[error("the model is infeasible or unbounded")]
    InfeasibleOrUnbounded,
    /// The solver stopped without an optimal solution
    #[error("the solver stopped with status {0}")]
    Numerical(String),
    /// An option in the options bundle was rejected
    #[error("invalid solver option '{name}' = {value}")]
    InvalidOption {
        /// Option name
        name: String,
        /// The rejected value
        value: String,
    },
    /// The model can't be expressed in the solver's formulation
    #[error("the model cannot be formulated: {0}")]
    InvalidModel(String),
    /// The solver could not be run at all
    #[error("the solver is unavailable: {0}")]
    Unavailable(String),
}

impl SolveError {
    /// Whether the failure was caused by the configuration rather than by the model's data
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidOption { .. } | Self::InvalidModel(_))
    }
}

/// Optimal capacities, dispatch and prices for a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    /// Objective value (annualised capital cost plus weighted operating cost)
    pub objective: f64,
    /// Optimal capacity of each generator
    pub generator_capacities: IndexMap<GeneratorID, f64>,
    /// Optimal capacity of each storage unit
    pub storage_unit_capacities: IndexMap<StorageUnitID, f64>,
    /// Optimal capacity of each link
    pub link_capacities: IndexMap<LinkID, f64>,
    /// Optimal capacity of each line
    pub line_capacities: IndexMap<LineID, f64>,
    /// Generator dispatch
    pub generator_dispatch: SeriesTable<GeneratorID>,
    /// Net storage dispatch (negative when storing)
    pub storage_unit_dispatch: SeriesTable<StorageUnitID>,
    /// Storage energy levels
    pub state_of_charge: SeriesTable<StorageUnitID>,
    /// Spilled storage inflow
    pub spill: SeriesTable<StorageUnitID>,
    /// Power withdrawn by links at `bus0`
    pub link_flows_p0: SeriesTable<LinkID>,
    /// Power delivered by links at `bus1` (negative)
    pub link_flows_p1: SeriesTable<LinkID>,
    /// Line flows from `bus0` to `bus1`
    pub line_flows: SeriesTable<LineID>,
    /// Nodal prices per unit of energy
    pub marginal_prices: SeriesTable<BusID>,
    /// Shadow prices of global constraints
    pub constraint_duals: IndexMap<GlobalConstraintID, f64>,
}

/// An optimiser which can solve a capacity-expansion model
pub trait Solver {
    /// Name of the solver, for diagnostics
    fn name(&self) -> &str;

    /// Solve the model, leaving it unchanged
    fn solve(&self, network: &Network, options: &SolverOptions) -> Result<Solution, SolveError>;
}
