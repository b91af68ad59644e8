//! Fan-out/fan-in search for a cluster's cheapest purchase.
//!
//! The candidate impurities (every positively scored impurity outside the bidding
//! cluster) are split into chunks that are priced independently, on the rayon
//! pool or on the calling thread. Each chunk reports its local best bid; the
//! coordinator keeps the global minimum, preferring earlier chunks on ties.
//!
//! Workers only see immutable snapshots of the clusters and the ledger. Nothing
//! is mutated until every chunk has returned.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::cluster::Cluster;
use super::impurity::{Impurity, ImpurityId, ImpuritySet};
use super::ledger::AuctionState;
use super::traits::Pricing;
use crate::error::{Error, Result};

/// How a cluster searches its own members for the cheapest anchor of an outside impurity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsideSearch {
    /// Price only the first member in acquisition order (the seed).
    ///
    /// This reproduces the historical ranking behavior, which never looked past
    /// the first member.
    #[default]
    FirstOnly,
    /// Price every member and keep the true minimum.
    Exhaustive,
}

/// The cluster currently holding an impurity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Holder {
    /// Index into the cluster slice the bid was computed against.
    pub cluster: usize,
    /// Whether the impurity is one of that cluster's cores.
    pub is_core: bool,
}

/// The cheapest purchase found for one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bid {
    /// Member of the bidding cluster the price was computed against.
    pub inside: ImpurityId,
    /// Impurity to acquire.
    pub outside: ImpurityId,
    /// Current holder of `outside`, if any.
    pub holder: Option<Holder>,
    /// Price quoted by the pricing model.
    pub price: f64,
}

/// Impurity → holder index for one snapshot of the cluster set.
#[derive(Debug, Default)]
pub(crate) struct Ownership(HashMap<ImpurityId, Holder>);

impl Ownership {
    pub(crate) fn snapshot(clusters: &[Cluster]) -> Self {
        let mut map = HashMap::new();
        for (idx, cluster) in clusters.iter().enumerate() {
            for &id in cluster.members() {
                map.entry(id).or_insert(Holder {
                    cluster: idx,
                    is_core: cluster.is_core(id),
                });
            }
        }
        Self(map)
    }

    #[inline]
    pub(crate) fn get(&self, id: ImpurityId) -> Option<Holder> {
        self.0.get(&id).copied()
    }
}

/// Computes best bids for one cluster at a time.
#[derive(Debug)]
pub struct ParallelEvaluator<'a, P: Pricing> {
    pricing: &'a P,
    impurities: &'a ImpuritySet,
    search: InsideSearch,
    chunks: usize,
    parallel: bool,
}

impl<'a, P: Pricing> ParallelEvaluator<'a, P> {
    /// Evaluator with one chunk per rayon thread and the default search mode.
    pub fn new(pricing: &'a P, impurities: &'a ImpuritySet) -> Self {
        Self {
            pricing,
            impurities,
            search: InsideSearch::default(),
            chunks: rayon::current_num_threads(),
            parallel: true,
        }
    }

    /// Set the inside-member search.
    pub fn with_search(mut self, search: InsideSearch) -> Self {
        self.search = search;
        self
    }

    /// Number of chunks the candidates are split into; 0 means one per rayon thread.
    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.chunks = if chunks == 0 {
            rayon::current_num_threads()
        } else {
            chunks
        };
        self
    }

    /// Evaluate chunks on the rayon pool (`true`) or on the calling thread.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Cheapest bid cluster `bidder` may place, or `None` if nothing is eligible.
    pub fn best_bid(
        &self,
        clusters: &[Cluster],
        bidder: usize,
        ledger: &AuctionState,
    ) -> Result<Option<Bid>> {
        let cluster = clusters.get(bidder).ok_or(Error::InvalidParameter {
            name: "bidder",
            message: "cluster index out of range",
        })?;
        let owners = Ownership::snapshot(clusters);

        let inside: Vec<&Impurity> = cluster
            .members()
            .iter()
            .map(|&id| self.impurities.get(id))
            .collect::<Result<_>>()?;

        let candidates: Vec<ImpurityId> = self
            .impurities
            .ranked()
            .iter()
            .copied()
            .filter(|&id| owners.get(id).map_or(true, |h| h.cluster != bidder))
            .collect();
        if candidates.is_empty() || inside.is_empty() {
            return Ok(None);
        }

        let chunk_len = candidates.len().div_ceil(self.chunks.max(1)).max(1);
        let wallet = cluster.wallet();
        let partials: Vec<Option<Bid>> = if self.parallel {
            candidates
                .par_chunks(chunk_len)
                .map(|chunk| self.evaluate_chunk(chunk, &inside, wallet, &owners, ledger))
                .collect::<Result<_>>()?
        } else {
            candidates
                .chunks(chunk_len)
                .map(|chunk| self.evaluate_chunk(chunk, &inside, wallet, &owners, ledger))
                .collect::<Result<_>>()?
        };

        let mut best: Option<Bid> = None;
        for bid in partials.into_iter().flatten() {
            if best.map_or(true, |b| bid.price < b.price) {
                best = Some(bid);
            }
        }
        Ok(best)
    }

    fn evaluate_chunk(
        &self,
        chunk: &[ImpurityId],
        inside: &[&Impurity],
        wallet: f64,
        owners: &Ownership,
        ledger: &AuctionState,
    ) -> Result<Option<Bid>> {
        let mut best: Option<Bid> = None;
        for &id in chunk {
            if !ledger.is_eligible(id, wallet) {
                continue;
            }
            let outside = self.impurities.get(id)?;
            let holder = owners.get(id);
            let outside_is_core = holder.is_some_and(|h| h.is_core);

            let Some((anchor, price)) = self.cheapest_inside(outside, inside, outside_is_core)
            else {
                continue;
            };
            if best.map_or(true, |b| price < b.price) {
                best = Some(Bid {
                    inside: anchor,
                    outside: id,
                    holder,
                    price,
                });
            }
        }
        Ok(best)
    }

    fn cheapest_inside(
        &self,
        outside: &Impurity,
        inside: &[&Impurity],
        outside_is_core: bool,
    ) -> Option<(ImpurityId, f64)> {
        let scanned = match self.search {
            InsideSearch::FirstOnly => &inside[..inside.len().min(1)],
            InsideSearch::Exhaustive => inside,
        };

        let mut best: Option<(ImpurityId, f64)> = None;
        for anchor in scanned {
            let price = self.pricing.price(outside, anchor, outside_is_core);
            if price.is_finite() && best.map_or(true, |(_, b)| price < b) {
                best = Some((anchor.id, price));
            }
        }
        best
    }
}
