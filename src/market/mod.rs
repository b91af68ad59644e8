//! Auction-based clustering of scored impurities.
//!
//! Every impurity arrives with an anomaly score in `[0, 1]`, a bounding box and
//! an area. Impurities scored 0 are ignored. The `k` highest-scored impurities
//! seed `k` clusters, each with a wallet that grows steeply with its seed's
//! score.
//!
//! ## The market
//!
//! Clusters take turns, richest first, buying the cheapest impurity they do not
//! own yet. The price (see [`PriceModel`]) grows exponentially with the gap to
//! the cluster member it is priced against and shrinks with both scores:
//!
//! ```text
//! price = exp(sqrt(d))^1.7 * (1 - sqrt(s_out * f) * sqrt(s_in * f))^1.6
//! ```
//!
//! Buying an impurity owned by another cluster moves it over. Buying another
//! cluster's *core* impurity merges the two clusters: the buyer takes all cores,
//! members and the wallet. The [`AuctionState`] ledger remembers which wallet
//! claimed each impurity so that poorer clusters cannot buy it back.
//!
//! The market has converged once a full sweep goes by without a purchase or merge.
//!
//! **Properties**:
//! - the number of clusters never grows
//! - no impurity is held by two clusters
//! - wallets never go negative
//! - a merge conserves wallets, cores and members
//!
//! ## Usage
//!
//! ```rust
//! use impurity_market::market::{AuctionEngine, BoundingBox, Impurity, ImpuritySet};
//!
//! let boxed = |x: f64| BoundingBox::new(x, 0.0, x + 1.0, 1.0);
//! let impurities = ImpuritySet::new(vec![
//!     Impurity::new(0, 0.9, boxed(0.0), 4.0),
//!     Impurity::new(1, 0.1, boxed(2.0), 1.0),
//!     Impurity::new(2, 0.5, boxed(1.0e6), 2.0),
//! ])
//! .unwrap();
//!
//! let outcome = AuctionEngine::new(2).run(&impurities).unwrap();
//! assert_eq!(outcome.clusters.len(), 2);
//! assert_eq!(outcome.clusters[0].members(), &[0, 1]);
//! ```

mod auction;
mod cluster;
mod evaluator;
mod impurity;
mod ledger;
mod price;
mod traits;
pub(crate) mod util;

pub use auction::{AuctionEngine, AuctionOutcome, AuctionParams, Phase, Round};
pub use cluster::Cluster;
pub use evaluator::{Bid, Holder, InsideSearch, ParallelEvaluator};
pub use impurity::{BoundingBox, Impurity, ImpurityId, ImpuritySet};
pub use ledger::AuctionState;
pub use price::PriceModel;
pub use traits::Pricing;
