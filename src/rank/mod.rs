//! Ranking converged clusters.
//!
//! Ranking happens at two levels:
//!
//! - **Within a scan**, [`ScoreAggregator`] attaches every [`KeyName`] to each
//!   cluster and orders the clusters by ascending
//!   `weighted_area2_sum_mult_diameter_mult_amount`.
//! - **Across scans**, [`CrossScanRanker`] collects one key from every cluster of
//!   every scan record, sorts descending and min-max normalizes, so the most
//!   anomalous regions of the whole batch come first.
//!
//! The two directions differ; both are kept as the cluster and ranking logs
//! have always been written.

mod cross_scan;
mod keys;

pub use cross_scan::{min_max_normalize, CrossScanRanker, DegeneratePolicy, RankedCluster, RankedKey};
pub use keys::{ranking_keys, KeyName, RankingKey, ScoreAggregator};
