use super::impurity::ImpurityId;
use crate::rank::RankingKey;

/// A group of impurities bought together with a shared wallet.
///
/// `core` holds the seed impurity plus the seeds of every cluster this one has
/// absorbed; `core` is always a subset of `members`.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    core: Vec<ImpurityId>,
    members: Vec<ImpurityId>,
    wallet: f64,
    order_keys: Vec<RankingKey>,
}

impl Cluster {
    /// A fresh cluster seeded with a single core impurity.
    pub fn seeded(core: ImpurityId, wallet: f64) -> Self {
        Self {
            core: vec![core],
            members: vec![core],
            wallet,
            order_keys: Vec::new(),
        }
    }

    /// Seed impurities: one, plus one per absorbed cluster.
    pub fn core(&self) -> &[ImpurityId] {
        &self.core
    }

    /// Members in acquisition order; the seed comes first.
    pub fn members(&self) -> &[ImpurityId] {
        &self.members
    }

    /// Budget left for purchases.
    pub fn wallet(&self) -> f64 {
        self.wallet
    }

    /// Ranking keys from the last scoring pass (empty before scoring).
    pub fn order_keys(&self) -> &[RankingKey] {
        &self.order_keys
    }

    /// Look up a ranking key by name.
    pub fn order_key(&self, name: &str) -> Option<f64> {
        self.order_keys
            .iter()
            .find(|k| k.name == name)
            .map(|k| k.score)
    }

    pub fn contains(&self, id: ImpurityId) -> bool {
        self.members.contains(&id)
    }

    pub fn is_core(&self, id: ImpurityId) -> bool {
        self.core.contains(&id)
    }

    pub(crate) fn buy(&mut self, id: ImpurityId, price: f64) {
        debug_assert!(self.wallet >= price);
        self.wallet -= price;
        self.members.push(id);
    }

    pub(crate) fn release(&mut self, id: ImpurityId) {
        self.members.retain(|&m| m != id);
    }

    /// Take over `other`'s cores, members and wallet.
    pub(crate) fn absorb(&mut self, other: Cluster) {
        self.wallet += other.wallet;
        self.core.extend(other.core);
        self.members.extend(other.members);
    }

    pub(crate) fn set_order_keys(&mut self, keys: Vec<RankingKey>) {
        self.order_keys = keys;
    }
}
