use serde::{Deserialize, Serialize};

/// Two-decimal half-up rounding used for every figure on a bulletin:
/// `Int(100*(x + eps) + 0.5) / 100`
pub fn round2(x: f64) -> f64 {
    (((x + f64::EPSILON) * 100.0) + 0.5).floor() / 100.0
}

/// Negative coefficients are tolerated while a row is being edited but carry no weight.
pub fn effective_coefficient(coefficient: i64) -> i64 {
    coefficient.max(0)
}

pub fn weighted_contribution(mark: f64, coefficient: i64) -> f64 {
    round2(mark * effective_coefficient(coefficient) as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedMark {
    pub mark: f64,
    pub coefficient: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedTotals {
    pub total_coefficient: i64,
    pub weighted_sum: f64,
    /// The integer coefficient sum hit `i64::MAX` and stopped growing.
    pub saturated: bool,
    // Divisor for the average; keeps growing when the integer sum saturates.
    coefficient_mass: f64,
}

impl WeightedTotals {
    pub fn average(&self) -> f64 {
        if self.coefficient_mass > 0.0 {
            round2(self.weighted_sum / self.coefficient_mass)
        } else {
            0.0
        }
    }
}

pub fn weighted_totals<I>(entries: I) -> WeightedTotals
where
    I: IntoIterator<Item = WeightedMark>,
{
    let mut total_coefficient: i64 = 0;
    let mut weighted_sum: f64 = 0.0;
    let mut saturated = false;
    let mut coefficient_mass: f64 = 0.0;
    for e in entries {
        let coef = effective_coefficient(e.coefficient);
        total_coefficient = match total_coefficient.checked_add(coef) {
            Some(sum) => sum,
            None => {
                saturated = true;
                i64::MAX
            }
        };
        coefficient_mass += coef as f64;
        weighted_sum += e.mark * coef as f64;
    }
    WeightedTotals {
        total_coefficient,
        weighted_sum,
        saturated,
        coefficient_mass,
    }
}

pub fn weighted_average<I>(entries: I) -> f64
where
    I: IntoIterator<Item = WeightedMark>,
{
    weighted_totals(entries).average()
}
