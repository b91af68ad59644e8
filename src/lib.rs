//! Auction-based clustering and ranking of surface impurities.
//!
//! `impurity_market` groups the scored impurities of a scanned image into a
//! fixed number of spatially coherent clusters and ranks clusters within a scan
//! and across a batch of scans.
//!
//! - [`market`]: the auction engine (price model, parallel bid evaluation, ledger)
//! - [`rank`]: per-cluster ranking keys and cross-scan ranking
//! - [`store`]: the JSON cluster and ranking logs
//! - [`pipeline`]: record a scan, rank a batch, through a [`render::Renderer`]

#![forbid(unsafe_code)]

pub mod error;
pub mod market;
pub mod pipeline;
pub mod rank;
pub mod render;
pub mod store;

pub use error::{Error, Result};
pub use market::{
    AuctionEngine, AuctionOutcome, AuctionParams, AuctionState, BoundingBox, Cluster, Impurity,
    ImpurityId, ImpuritySet, InsideSearch, PriceModel, Pricing,
};
pub use rank::{CrossScanRanker, DegeneratePolicy, KeyName, RankedKey, RankingKey, ScoreAggregator};
