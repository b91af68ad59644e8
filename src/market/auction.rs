//! The auction loop.
//!
//! Every sweep sorts the clusters by wallet, richest first, and lets each one
//! place its cheapest bid:
//!
//! - a bid on another cluster's core impurity merges the two clusters and ends
//!   the sweep early, since the cluster order is stale;
//! - an affordable bid on anything else moves the impurity into the bidder;
//! - an unaffordable bid changes nothing.
//!
//! A sweep in which no cluster expanded or merged means the market has converged.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::cluster::Cluster;
use super::evaluator::{Bid, InsideSearch, ParallelEvaluator};
use super::impurity::ImpuritySet;
use super::ledger::AuctionState;
use super::price::PriceModel;
use super::traits::Pricing;
use crate::error::{Error, Result};

/// Auction configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionParams {
    /// Number of clusters seeded from the highest-scored impurities.
    pub clusters: usize,
    /// Inside-member search used when pricing a candidate.
    pub search: InsideSearch,
    /// Chunks per evaluation; 0 means one per rayon thread.
    pub chunks: usize,
    /// Evaluate chunks on the rayon pool.
    pub parallel: bool,
    /// Give up with [`Error::NotConverged`] after this many sweeps.
    pub max_sweeps: Option<usize>,
}

impl Default for AuctionParams {
    fn default() -> Self {
        Self {
            clusters: 10,
            search: InsideSearch::FirstOnly,
            chunks: 0,
            parallel: true,
            max_sweeps: None,
        }
    }
}

/// Engine state after a sweep step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Mid-sweep; nothing has changed yet.
    Sweeping,
    /// At least one cluster bought an impurity during the sweep.
    Expanded,
    /// Two clusters merged; the sweep was cut short.
    Merged,
    /// A full sweep went by without any purchase or merge.
    Converged,
}

/// Result of one sweep. The ledger is handed back to be threaded into the next one.
#[derive(Clone, Debug)]
pub struct Round {
    /// Clusters after the sweep, in wallet order.
    pub clusters: Vec<Cluster>,
    pub state: AuctionState,
    /// How the sweep ended: `Expanded`, `Merged` or `Converged`.
    pub phase: Phase,
    /// Purchases made during the sweep.
    pub expansions: usize,
}

/// Final clusters of a converged auction.
#[derive(Clone, Debug)]
pub struct AuctionOutcome {
    pub clusters: Vec<Cluster>,
    /// Ledger as left by the last sweep.
    pub ledger: AuctionState,
    /// Sweeps run, including the converged one.
    pub sweeps: usize,
    /// Purchases over the whole run.
    pub expansions: usize,
    pub merges: usize,
}

/// Auction-based clustering of scored impurities.
#[derive(Clone, Debug)]
pub struct AuctionEngine<P: Pricing = PriceModel> {
    params: AuctionParams,
    pricing: P,
}

impl AuctionEngine<PriceModel> {
    /// Engine seeding `clusters` clusters with the default price model.
    pub fn new(clusters: usize) -> Self {
        Self::from_params(AuctionParams {
            clusters,
            ..AuctionParams::default()
        })
    }

    /// Engine with the default price model and explicit parameters.
    pub fn from_params(params: AuctionParams) -> Self {
        Self {
            params,
            pricing: PriceModel,
        }
    }
}

impl Default for AuctionEngine<PriceModel> {
    fn default() -> Self {
        Self::from_params(AuctionParams::default())
    }
}

impl<P: Pricing> AuctionEngine<P> {
    /// Swap the cost model.
    pub fn with_pricing<Q: Pricing>(self, pricing: Q) -> AuctionEngine<Q> {
        AuctionEngine {
            params: self.params,
            pricing,
        }
    }

    pub fn with_search(mut self, search: InsideSearch) -> Self {
        self.params.search = search;
        self
    }

    /// Chunks per bid evaluation; 0 means one per rayon thread.
    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.params.chunks = chunks;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.params.parallel = parallel;
        self
    }

    /// Fail with [`Error::NotConverged`] after `max_sweeps` sweeps.
    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.params.max_sweeps = Some(max_sweeps);
        self
    }

    /// Parameters the engine runs with.
    pub fn params(&self) -> &AuctionParams {
        &self.params
    }

    /// Seed one cluster per top-scored impurity.
    ///
    /// Cluster `i` is seeded with the `i`-th highest score and endowed by the
    /// price model.
    pub fn seed(&self, impurities: &ImpuritySet) -> Result<Vec<Cluster>> {
        if self.params.clusters == 0 {
            return Err(Error::InvalidParameter {
                name: "clusters",
                message: "must be at least 1",
            });
        }
        let ranked = impurities.ranked();
        if ranked.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.params.clusters > ranked.len() {
            return Err(Error::InvalidClusterCount {
                requested: self.params.clusters,
                n_items: ranked.len(),
            });
        }

        ranked
            .iter()
            .rev()
            .take(self.params.clusters)
            .map(|&id| {
                let core = impurities.get(id)?;
                Ok(Cluster::seeded(id, self.pricing.endowment(core)))
            })
            .collect()
    }

    /// Run the auction to convergence.
    pub fn run(&self, impurities: &ImpuritySet) -> Result<AuctionOutcome> {
        let mut clusters = self.seed(impurities)?;
        let mut state = AuctionState::new();
        let mut sweeps = 0;
        let mut expansions = 0;
        let mut merges = 0;

        loop {
            if let Some(max) = self.params.max_sweeps {
                if sweeps >= max {
                    return Err(Error::NotConverged { sweeps });
                }
            }
            sweeps += 1;

            let round = self.sweep(clusters, state, impurities)?;
            clusters = round.clusters;
            state = round.state;
            expansions += round.expansions;

            match round.phase {
                Phase::Converged => break,
                Phase::Merged => merges += 1,
                Phase::Expanded | Phase::Sweeping => {}
            }
        }

        info!(
            sweeps,
            expansions,
            merges,
            clusters = clusters.len(),
            "auction converged"
        );
        Ok(AuctionOutcome {
            clusters,
            ledger: state,
            sweeps,
            expansions,
            merges,
        })
    }

    /// One sweep over the clusters, richest first.
    pub fn sweep(
        &self,
        mut clusters: Vec<Cluster>,
        mut state: AuctionState,
        impurities: &ImpuritySet,
    ) -> Result<Round> {
        clusters.sort_by(|a, b| b.wallet().total_cmp(&a.wallet()));

        let evaluator = ParallelEvaluator::new(&self.pricing, impurities)
            .with_search(self.params.search)
            .with_chunks(self.params.chunks)
            .with_parallel(self.params.parallel);

        let mut expansions = 0;
        for bidder in 0..clusters.len() {
            let Some(bid) = evaluator.best_bid(&clusters, bidder, &state)? else {
                continue;
            };

            match settle(&mut clusters, bidder, bid, &mut state) {
                Phase::Merged => {
                    return Ok(Round {
                        clusters,
                        state,
                        phase: Phase::Merged,
                        expansions,
                    });
                }
                Phase::Expanded => expansions += 1,
                Phase::Sweeping | Phase::Converged => {}
            }
        }

        let phase = if expansions > 0 {
            Phase::Expanded
        } else {
            Phase::Converged
        };
        Ok(Round {
            clusters,
            state,
            phase,
            expansions,
        })
    }
}

/// Apply `bid` for cluster `bidder`: merge, buy, or do nothing.
fn settle(clusters: &mut Vec<Cluster>, bidder: usize, bid: Bid, state: &mut AuctionState) -> Phase {
    if let Some(holder) = bid.holder.filter(|h| h.is_core) {
        state.stamp(bid.outside, clusters[bidder].wallet());

        let absorbed = clusters.remove(holder.cluster);
        let winner = if holder.cluster < bidder {
            bidder - 1
        } else {
            bidder
        };
        debug!(
            impurity = bid.outside,
            price = bid.price,
            absorbed_wallet = absorbed.wallet(),
            absorbed_members = absorbed.members().len(),
            "clusters merged"
        );
        clusters[winner].absorb(absorbed);
        return Phase::Merged;
    }

    let wallet = clusters[bidder].wallet();
    if wallet < bid.price {
        return Phase::Sweeping;
    }

    state.stamp(bid.outside, wallet);
    clusters[bidder].buy(bid.outside, bid.price);
    if let Some(holder) = bid.holder {
        clusters[holder.cluster].release(bid.outside);
    }
    debug!(
        impurity = bid.outside,
        anchor = bid.inside,
        price = bid.price,
        wallet = clusters[bidder].wallet(),
        "cluster expanded"
    );
    Phase::Expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::impurity::{BoundingBox, Impurity};
    use std::collections::HashSet;

    fn imp(id: usize, score: f64, x: f64) -> Impurity {
        Impurity::new(id, score, BoundingBox::new(x, 0.0, x + 1.0, 1.0), 1.0)
    }

    /// Scores [0.9, 0.1, 0.5]: impurity 1 sits next to the 0.9 seed, the 0.5
    /// seed is far enough that neither seed can price the other.
    fn scenario() -> ImpuritySet {
        ImpuritySet::new(vec![imp(0, 0.9, 0.0), imp(1, 0.1, 2.0), imp(2, 0.5, 1.0e6)]).unwrap()
    }

    fn assert_partition(clusters: &[Cluster], set: &ImpuritySet) {
        let mut seen = HashSet::new();
        for cluster in clusters {
            for &id in cluster.members() {
                assert!(seen.insert(id), "impurity {id} held twice");
                assert!(set.get(id).unwrap().score > 0.0);
            }
            for id in cluster.core() {
                assert!(cluster.contains(*id));
            }
            assert!(cluster.wallet() >= 0.0);
        }
    }

    #[test]
    fn builders_set_params() {
        let engine = AuctionEngine::new(3)
            .with_search(InsideSearch::Exhaustive)
            .with_chunks(4)
            .with_parallel(false)
            .with_max_sweeps(20);
        let expected = AuctionParams {
            clusters: 3,
            search: InsideSearch::Exhaustive,
            chunks: 4,
            parallel: false,
            max_sweeps: Some(20),
        };
        assert_eq!(engine.params(), &expected);
        assert_eq!(AuctionEngine::from_params(expected.clone()).params(), &expected);
        assert_eq!(AuctionEngine::<PriceModel>::default().params(), &AuctionParams::default());
    }

    #[test]
    fn seeds_top_scores_richest_first() {
        let set = scenario();
        let clusters = AuctionEngine::new(2).seed(&set).unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].core(), &[0]);
        assert_eq!(clusters[1].core(), &[2]);
        assert!(clusters[0].wallet() > clusters[1].wallet());
    }

    #[test]
    fn seeding_rejects_bad_cluster_counts() {
        let set = scenario();
        assert!(matches!(
            AuctionEngine::new(0).seed(&set),
            Err(Error::InvalidParameter { name: "clusters", .. })
        ));
        assert!(matches!(
            AuctionEngine::new(4).seed(&set),
            Err(Error::InvalidClusterCount {
                requested: 4,
                n_items: 3
            })
        ));

        let cold = ImpuritySet::new(vec![imp(0, 0.0, 0.0)]).unwrap();
        assert!(matches!(AuctionEngine::new(1).run(&cold), Err(Error::EmptyInput)));
    }

    #[test]
    fn richer_cluster_absorbs_the_lone_impurity_first_only() {
        let set = scenario();
        let engine = AuctionEngine::new(2).with_search(InsideSearch::FirstOnly);

        let clusters = engine.seed(&set).unwrap();
        let first = engine.sweep(clusters, AuctionState::new(), &set).unwrap();
        assert_eq!(first.phase, Phase::Expanded);
        assert_eq!(first.expansions, 1);
        assert_eq!(first.clusters[0].members(), &[0, 1]);

        let second = engine.sweep(first.clusters, first.state, &set).unwrap();
        assert_eq!(second.phase, Phase::Converged);

        let outcome = engine.run(&set).unwrap();
        assert_eq!(outcome.sweeps, 2);
        assert_eq!(outcome.merges, 0);
        assert_eq!(outcome.clusters.len(), 2);
        let mut sizes: Vec<usize> = outcome.clusters.iter().map(|c| c.members().len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
        assert_partition(&outcome.clusters, &set);
    }

    #[test]
    fn scenario_is_identical_in_exhaustive_mode() {
        let set = scenario();
        let faithful = AuctionEngine::new(2).run(&set).unwrap();
        let exhaustive = AuctionEngine::new(2)
            .with_search(InsideSearch::Exhaustive)
            .run(&set)
            .unwrap();
        assert_eq!(faithful.clusters, exhaustive.clusters);
    }

    #[test]
    fn ledger_is_stamped_with_the_pre_debit_wallet() {
        let set = scenario();
        let engine = AuctionEngine::new(2);
        let seeded = engine.seed(&set).unwrap();
        let wallet = seeded[0].wallet();

        let round = engine.sweep(seeded, AuctionState::new(), &set).unwrap();
        assert_eq!(round.state.claim(1), Some(wallet));
        assert!(round.clusters[0].wallet() < wallet);
    }

    #[test]
    fn nearby_seeds_merge_and_conserve_wallets() {
        let set = ImpuritySet::new(vec![imp(0, 0.9, 0.0), imp(1, 0.8, 3.0)]).unwrap();
        let engine = AuctionEngine::new(2);
        let seeded = engine.seed(&set).unwrap();
        let total: f64 = seeded.iter().map(Cluster::wallet).sum();

        let round = engine.sweep(seeded, AuctionState::new(), &set).unwrap();
        assert_eq!(round.phase, Phase::Merged);
        assert_eq!(round.clusters.len(), 1);

        let merged = &round.clusters[0];
        assert_eq!(merged.wallet(), total);
        assert_eq!(merged.core(), &[0, 1]);
        assert_eq!(merged.members(), &[0, 1]);

        let outcome = engine.run(&set).unwrap();
        assert_eq!(outcome.merges, 1);
        assert_eq!(outcome.clusters.len(), 1);
    }

    #[test]
    fn poor_clusters_cannot_buy() {
        struct Expensive;
        impl Pricing for Expensive {
            fn price(&self, _: &Impurity, _: &Impurity, _: bool) -> f64 {
                100.0
            }
            fn endowment(&self, _: &Impurity) -> f64 {
                1.0
            }
        }

        let set = ImpuritySet::new(vec![imp(0, 0.9, 0.0), imp(1, 0.4, 2.0)]).unwrap();
        let outcome = AuctionEngine::new(1).with_pricing(Expensive).run(&set).unwrap();
        assert_eq!(outcome.sweeps, 1);
        assert_eq!(outcome.clusters[0].members(), &[0]);
        assert_eq!(outcome.clusters[0].wallet(), 1.0);
    }

    #[test]
    fn everything_affordable_is_partitioned() {
        let impurities: Vec<Impurity> = (0..24)
            .map(|i| imp(i, 0.05 + (i % 9) as f64 * 0.1, (i % 6) as f64 * 2.0))
            .collect();
        let set = ImpuritySet::new(impurities).unwrap();

        for search in [InsideSearch::FirstOnly, InsideSearch::Exhaustive] {
            let outcome = AuctionEngine::new(3).with_search(search).run(&set).unwrap();
            assert_partition(&outcome.clusters, &set);
            let held: usize = outcome.clusters.iter().map(|c| c.members().len()).sum();
            assert_eq!(held, set.ranked().len(), "{search:?}");
            assert!(outcome.clusters.len() <= 3);
        }
    }

    #[test]
    fn sweep_limit_is_enforced() {
        let set = scenario();
        let err = AuctionEngine::new(2).with_max_sweeps(1).run(&set).unwrap_err();
        assert!(matches!(err, Error::NotConverged { sweeps: 1 }));
    }
}
