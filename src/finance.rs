//! General functions related to finance.
use crate::units::{Dimensionless, Hours, MoneyPerEnergy, MoneyPerPower};

/// Calculates the annuity factor for a given lifetime and discount rate.
///
/// The annuity factor spreads a one-off capital cost over the lifetime of an asset:
///
/// * `r / (1 - (1 + r)^-n)` for a positive discount rate `r`
/// * `1 / n` otherwise
pub fn annuity(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    let lifetime = Dimensionless(lifetime as f64);
    if discount_rate > Dimensionless(0.0) {
        let discount = (Dimensionless(1.0) + discount_rate).powf(-lifetime.value());
        discount_rate / (Dimensionless(1.0) - discount)
    } else {
        Dimensionless(1.0) / lifetime
    }
}

/// Annualised capital cost of a storage technology per unit of power capacity.
///
/// The power-related part carries a fixed O&M surcharge (as a fraction of the investment); the
/// energy-related part is scaled by the storage duration.
pub fn storage_capital_cost(
    lifetime: u32,
    discount_rate: Dimensionless,
    power_cost: MoneyPerPower,
    fixed_om_fraction: Dimensionless,
    energy_cost: MoneyPerEnergy,
    max_hours: Hours,
) -> MoneyPerPower {
    let factor = annuity(lifetime, discount_rate);
    factor * power_cost * (Dimensionless(1.0) + fixed_om_fraction)
        + factor * (energy_cost * max_hours)
}
