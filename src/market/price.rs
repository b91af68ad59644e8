//! The default cost model.
//!
//! Absorbing an impurity costs more the farther it lies from the inside impurity
//! it is priced against, and less the more anomalous both of them are:
//!
//! ```text
//! score_term    = (1 - (s_out * f)^0.5 * (s_in * f)^0.5)^1.6
//! distance_term = exp(sqrt(d))^1.7
//! price         = distance_term * score_term
//! ```
//!
//! When the outside impurity is the core of another cluster the price is further
//! multiplied by a merge discount `(1 - (s_out * f)^0.05 * (s_in * f)^0.05)^2.5`
//! and a score-gap penalty `(2 - |s_out - s_in|)^8`.
//!
//! The exponents fix the order in which the auction converges; changing any of
//! them changes which clusters win.

use super::impurity::Impurity;
use super::traits::Pricing;

/// Score damping factor `f`.
const DAMPING: f64 = 0.95;
const SCORE_EXPONENT: f64 = 1.6;
const DISTANCE_EXPONENT: f64 = 1.7;
const MERGE_ROOT: f64 = 0.05;
const MERGE_DISCOUNT_EXPONENT: f64 = 2.5;
const MERGE_PENALTY_EXPONENT: i32 = 8;
/// Wallet of a seed: `exp(sqrt(score * 100))^2.8`.
const ENDOWMENT_SCALE: f64 = 1e2;
const ENDOWMENT_EXPONENT: f64 = 2.8;

/// Distance- and score-based price of absorbing one impurity.
#[derive(Clone, Copy, Debug, Default)]
pub struct PriceModel;

impl Pricing for PriceModel {
    fn price(&self, outside: &Impurity, inside: &Impurity, outside_is_core: bool) -> f64 {
        let s_out = outside.score * DAMPING;
        let s_in = inside.score * DAMPING;
        let d = outside.region.distance(&inside.region);

        let score_term = (1.0 - s_out.sqrt() * s_in.sqrt()).powf(SCORE_EXPONENT);
        let distance_term = d.sqrt().exp().powf(DISTANCE_EXPONENT);
        let mut price = distance_term * score_term;

        if outside_is_core {
            let discount =
                (1.0 - s_out.powf(MERGE_ROOT) * s_in.powf(MERGE_ROOT)).powf(MERGE_DISCOUNT_EXPONENT);
            let penalty = (2.0 - (outside.score - inside.score).abs()).powi(MERGE_PENALTY_EXPONENT);
            price *= discount * penalty;
        }
        price
    }

    fn endowment(&self, core: &Impurity) -> f64 {
        (core.score * ENDOWMENT_SCALE).sqrt().exp().powf(ENDOWMENT_EXPONENT)
    }
}
