use std::collections::HashMap;

use super::impurity::ImpurityId;

/// Auction ledger: which wallet last claimed the bidding right over an impurity.
///
/// A cluster may only bid on an impurity whose recorded claim is strictly below
/// its own wallet, so a poorer cluster cannot take back what a richer one bought.
/// One ledger lives for exactly one auction run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuctionState {
    claims: HashMap<ImpurityId, f64>,
}

impl AuctionState {
    /// Empty ledger for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a cluster holding `wallet` may bid on `id`.
    #[inline]
    pub fn is_eligible(&self, id: ImpurityId, wallet: f64) -> bool {
        self.claims.get(&id).map_or(true, |&claim| claim < wallet)
    }

    /// Record that a cluster holding `wallet` claimed `id`.
    pub fn stamp(&mut self, id: ImpurityId, wallet: f64) {
        self.claims.insert(id, wallet);
    }

    /// Wallet that last claimed `id`, if any.
    pub fn claim(&self, id: ImpurityId) -> Option<f64> {
        self.claims.get(&id).copied()
    }

    /// Number of claimed impurities.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
