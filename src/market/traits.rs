use super::impurity::Impurity;

/// Cost model driving the auction.
///
/// Implementations are shared read-only between evaluator workers.
pub trait Pricing: Sync {
    /// Price a cluster pays to absorb `outside`, given the inside impurity it is priced against.
    ///
    /// `outside_is_core` is true when `outside` seeds another cluster. Lower is cheaper;
    /// non-finite prices are never bid on.
    fn price(&self, outside: &Impurity, inside: &Impurity, outside_is_core: bool) -> f64;

    /// Initial wallet of a cluster seeded with `core`.
    fn endowment(&self, core: &Impurity) -> f64;
}
