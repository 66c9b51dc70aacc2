//! The component tables of a grid model.
//!
//! Field names and defaults follow the PyPSA conventions, so that tables can be exchanged with
//! PyPSA-style CSV folders. Missing columns take the defaults given by each type's `Default` impl.
use super::registry::Component;
use crate::id::{define_id_getter, define_id_type};
use crate::input::{deserialise_bool, deserialise_limit};
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

define_id_type! {BusID}
define_id_type! {CarrierID}
define_id_type! {GeneratorID}
define_id_type! {StorageUnitID}
define_id_type! {LinkID}
define_id_type! {LineID}
define_id_type! {LoadID}
define_id_type! {GlobalConstraintID}

/// Implement [`Component`] and [`HasID`](crate::id::HasID) for a component type
macro_rules! define_component {
    ($t:ty, $id_ty:ty, $kind:literal) => {
        define_id_getter! {$t, $id_ty}

        impl Component for $t {
            type ID = $id_ty;
            const KIND: &'static str = $kind;
        }
    };
}

/// A grid node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bus {
    /// Unique name of the bus
    pub name: BusID,
    /// Longitude (or other x coordinate)
    pub x: f64,
    /// Latitude (or other y coordinate)
    pub y: f64,
    /// Energy carrier of the bus (usually `AC`)
    pub carrier: String,
    /// Nominal voltage (kV)
    pub v_nom: f64,
}
define_component!(Bus, BusID, "Bus");

impl Default for Bus {
    fn default() -> Self {
        Self {
            name: "".into(),
            x: 0.0,
            y: 0.0,
            carrier: "AC".into(),
            v_nom: 1.0,
        }
    }
}

/// An energy carrier (technology tag) with its emission intensity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Carrier {
    /// Name of the carrier (e.g. `hydro`)
    pub name: CarrierID,
    /// Emissions per unit of primary energy (t/MWh_th)
    pub co2_emissions: f64,
}
define_component!(Carrier, CarrierID, "Carrier");

impl Default for Carrier {
    fn default() -> Self {
        Self {
            name: "".into(),
            co2_emissions: 0.0,
        }
    }
}

/// A power source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generator {
    /// Unique name of the generator
    pub name: GeneratorID,
    /// The bus the generator feeds into
    pub bus: BusID,
    /// Technology tag (e.g. `hydro`, `gas`)
    pub carrier: String,
    /// Nominal power (MW)
    pub p_nom: f64,
    /// Whether the optimiser may size the generator
    #[serde(deserialize_with = "deserialise_bool")]
    pub p_nom_extendable: bool,
    /// Lower bound on optimised capacity
    pub p_nom_min: f64,
    /// Upper bound on optimised capacity
    #[serde(deserialize_with = "deserialise_limit")]
    pub p_nom_max: f64,
    /// Minimum output per unit of capacity
    pub p_min_pu: f64,
    /// Static maximum output per unit of capacity (overridden by a time series)
    pub p_max_pu: f64,
    /// Conversion efficiency from primary energy to electricity
    pub efficiency: f64,
    /// Cost per MWh produced
    pub marginal_cost: f64,
    /// Annualised investment cost per MW
    pub capital_cost: f64,
    /// Optimised capacity (set by the solver)
    pub p_nom_opt: f64,
}
define_component!(Generator, GeneratorID, "Generator");

impl Default for Generator {
    fn default() -> Self {
        Self {
            name: "".into(),
            bus: "".into(),
            carrier: String::new(),
            p_nom: 0.0,
            p_nom_extendable: false,
            p_nom_min: 0.0,
            p_nom_max: f64::INFINITY,
            p_min_pu: 0.0,
            p_max_pu: 1.0,
            efficiency: 1.0,
            marginal_cost: 0.0,
            capital_cost: 0.0,
            p_nom_opt: 0.0,
        }
    }
}

/// A single-bus energy store with charge and discharge legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageUnit {
    /// Unique name of the storage unit
    pub name: StorageUnitID,
    /// The bus the unit is attached to
    pub bus: BusID,
    /// Technology tag (e.g. `hydro`, `PHS`, `batteries`)
    pub carrier: String,
    /// Nominal power (MW)
    pub p_nom: f64,
    /// Whether the optimiser may size the unit
    #[serde(deserialize_with = "deserialise_bool")]
    pub p_nom_extendable: bool,
    /// Lower bound on optimised capacity
    pub p_nom_min: f64,
    /// Upper bound on optimised capacity
    #[serde(deserialize_with = "deserialise_limit")]
    pub p_nom_max: f64,
    /// Minimum power per unit of capacity. Negative values allow storing (pumping).
    pub p_min_pu: f64,
    /// Maximum power per unit of capacity
    pub p_max_pu: f64,
    /// Hours of storage at full power
    pub max_hours: f64,
    /// Explicit energy capacity (MWh). Zero means `max_hours * p_nom`.
    pub e_nom: f64,
    /// Efficiency when storing
    pub efficiency_store: f64,
    /// Efficiency when dispatching
    pub efficiency_dispatch: f64,
    /// Fraction of the state of charge lost per hour
    pub standing_loss: f64,
    /// Whether the final state of charge must equal the initial one
    #[serde(deserialize_with = "deserialise_bool")]
    pub cyclic_state_of_charge: bool,
    /// State of charge before the first snapshot (ignored if cyclic)
    pub state_of_charge_initial: f64,
    /// Cost per MWh dispatched
    pub marginal_cost: f64,
    /// Annualised investment cost per MW
    pub capital_cost: f64,
    /// Optimised capacity (set by the solver)
    pub p_nom_opt: f64,
}
define_component!(StorageUnit, StorageUnitID, "StorageUnit");

impl Default for StorageUnit {
    fn default() -> Self {
        Self {
            name: "".into(),
            bus: "".into(),
            carrier: String::new(),
            p_nom: 0.0,
            p_nom_extendable: false,
            p_nom_min: 0.0,
            p_nom_max: f64::INFINITY,
            p_min_pu: -1.0,
            p_max_pu: 1.0,
            max_hours: 1.0,
            e_nom: 0.0,
            efficiency_store: 1.0,
            efficiency_dispatch: 1.0,
            standing_loss: 0.0,
            cyclic_state_of_charge: false,
            state_of_charge_initial: 0.0,
            marginal_cost: 0.0,
            capital_cost: 0.0,
            p_nom_opt: 0.0,
        }
    }
}

impl StorageUnit {
    /// Energy capacity (MWh) for a given power capacity
    pub fn energy_capacity(&self, p_nom: f64) -> f64 {
        if self.e_nom > 0.0 {
            self.e_nom
        } else {
            self.max_hours * p_nom
        }
    }
}

/// A directional power converter between two buses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    /// Unique name of the link
    pub name: LinkID,
    /// The bus power is drawn from
    pub bus0: BusID,
    /// The bus power is delivered to
    pub bus1: BusID,
    /// Technology tag (e.g. `DC`)
    pub carrier: String,
    /// Nominal power (MW)
    pub p_nom: f64,
    /// Whether the optimiser may size the link
    #[serde(deserialize_with = "deserialise_bool")]
    pub p_nom_extendable: bool,
    /// Lower bound on optimised capacity
    pub p_nom_min: f64,
    /// Upper bound on optimised capacity
    #[serde(deserialize_with = "deserialise_limit")]
    pub p_nom_max: f64,
    /// Minimum flow per unit of capacity. `-1` makes the link bidirectional.
    pub p_min_pu: f64,
    /// Maximum flow per unit of capacity
    pub p_max_pu: f64,
    /// Fraction of the power withdrawn at `bus0` which arrives at `bus1`
    pub efficiency: f64,
    /// Cost per MWh transferred
    pub marginal_cost: f64,
    /// Annualised investment cost per MW
    pub capital_cost: f64,
    /// Optimised capacity (set by the solver)
    pub p_nom_opt: f64,
}
define_component!(Link, LinkID, "Link");

impl Default for Link {
    fn default() -> Self {
        Self {
            name: "".into(),
            bus0: "".into(),
            bus1: "".into(),
            carrier: String::new(),
            p_nom: 0.0,
            p_nom_extendable: false,
            p_nom_min: 0.0,
            p_nom_max: f64::INFINITY,
            p_min_pu: 0.0,
            p_max_pu: 1.0,
            efficiency: 1.0,
            marginal_cost: 0.0,
            capital_cost: 0.0,
            p_nom_opt: 0.0,
        }
    }
}

/// An AC transmission line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Line {
    /// Unique name of the line
    pub name: LineID,
    /// First bus
    pub bus0: BusID,
    /// Second bus
    pub bus1: BusID,
    /// Technology tag
    pub carrier: String,
    /// Nominal apparent power (MVA)
    pub s_nom: f64,
    /// Whether the optimiser may size the line
    #[serde(deserialize_with = "deserialise_bool")]
    pub s_nom_extendable: bool,
    /// Lower bound on optimised capacity
    pub s_nom_min: f64,
    /// Upper bound on optimised capacity
    #[serde(deserialize_with = "deserialise_limit")]
    pub s_nom_max: f64,
    /// Usable fraction of the nominal capacity
    pub s_max_pu: f64,
    /// Annualised investment cost per MVA
    pub capital_cost: f64,
    /// Optimised capacity (set by the solver)
    pub s_nom_opt: f64,
}
define_component!(Line, LineID, "Line");

impl Default for Line {
    fn default() -> Self {
        Self {
            name: "".into(),
            bus0: "".into(),
            bus1: "".into(),
            carrier: "AC".into(),
            s_nom: 0.0,
            s_nom_extendable: false,
            s_nom_min: 0.0,
            s_nom_max: f64::INFINITY,
            s_max_pu: 1.0,
            capital_cost: 0.0,
            s_nom_opt: 0.0,
        }
    }
}

/// A demand sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Load {
    /// Unique name of the load
    pub name: LoadID,
    /// The bus the load draws from
    pub bus: BusID,
    /// Technology tag
    pub carrier: String,
    /// Static demand (MW), used when there is no time series
    pub p_set: f64,
}
define_component!(Load, LoadID, "Load");

impl Default for Load {
    fn default() -> Self {
        Self {
            name: "".into(),
            bus: "".into(),
            carrier: String::new(),
            p_set: 0.0,
        }
    }
}

/// The comparison used by a [`GlobalConstraint`]
#[derive(Debug, Clone, Copy, PartialEq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum ConstraintSense {
    /// The summed attribute may not exceed the constant
    #[string = "<="]
    LessOrEqual,
    /// The summed attribute must be at least the constant
    #[string = ">="]
    GreaterOrEqual,
    /// The summed attribute must equal the constant
    #[string = "=="]
    Equal,
}

/// A model-wide bound on a summed carrier attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConstraint {
    /// Unique name of the constraint
    pub name: GlobalConstraintID,
    /// The kind of constraint
    #[serde(rename = "type")]
    pub kind: String,
    /// The carrier attribute which is summed (e.g. `co2_emissions`)
    pub carrier_attribute: String,
    /// The comparison sense
    pub sense: ConstraintSense,
    /// The bound
    pub constant: f64,
    /// Shadow price of the constraint (set by the solver)
    pub mu: f64,
}
define_component!(GlobalConstraint, GlobalConstraintID, "GlobalConstraint");

impl Default for GlobalConstraint {
    fn default() -> Self {
        Self {
            name: "".into(),
            kind: "primary_energy".into(),
            carrier_attribute: String::new(),
            sense: ConstraintSense::LessOrEqual,
            constant: 0.0,
            mu: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_capacity() {
        let unit = StorageUnit {
            max_hours: 8.0,
            ..StorageUnit::default()
        };
        assert_eq!(unit.energy_capacity(10.0), 80.0);

        let reservoir = StorageUnit {
            e_nom: 16800.0,
            ..StorageUnit::default()
        };
        assert_eq!(reservoir.energy_capacity(0.0), 16800.0);
    }

    #[test]
    fn test_read_generator_with_python_bools() {
        let data = "name,bus,carrier,p_nom,p_nom_extendable\nG1,A,hydro,100,True\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let generator: Generator = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(generator.name, GeneratorID::new("G1"));
        assert!(generator.p_nom_extendable);
        assert_eq!(generator.p_max_pu, 1.0);
        assert_eq!(generator.p_nom_max, f64::INFINITY);
    }

    #[test]
    fn test_constraint_sense_round_trip() {
        let constraint = GlobalConstraint {
            name: "CO2Limit".into(),
            ..GlobalConstraint::default()
        };
        let json = serde_json::to_string(&constraint).unwrap();
        assert!(json.contains(r#""sense":"<=""#));
        let parsed: GlobalConstraint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, constraint);
    }
}
