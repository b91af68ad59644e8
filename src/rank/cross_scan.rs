//! Ranking clusters across a batch of scans.
//!
//! For every ranking key, all clusters of all scans are sorted by that key,
//! most anomalous first, and their scores are min-max normalized into `[0, 1]`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::ScanRecord;

/// What to do with a key whose scores are all equal, so that min-max
/// normalization would divide by zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Keep the key and give every cluster a normalized score of 0.
    #[default]
    Zero,
    /// Leave the key out of the ranking.
    Skip,
}

/// One cluster's place in a key's ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCluster {
    /// Plot of the scan the cluster belongs to.
    pub path: String,
    /// Name of the cluster within its scan.
    pub cluster_name: String,
    /// Raw key score.
    pub score: f64,
    /// Score min-max normalized over the whole batch.
    pub norm_score: f64,
}

/// All clusters of a batch, ordered by one key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedKey {
    /// Ranking key the clusters are ordered by.
    pub key_name: String,
    /// Every cluster carrying the key, highest score first.
    pub sorted_clusters: Vec<RankedCluster>,
}

/// Min-max normalize `scores` into `[0, 1]`.
///
/// Returns `None` when the key should be skipped: no scores at all, or equal
/// scores under [`DegeneratePolicy::Skip`].
pub fn min_max_normalize(scores: &[f64], policy: DegeneratePolicy) -> Option<Vec<f64>> {
    if scores.is_empty() {
        return None;
    }
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    // NaN range: every score is the same infinity.
    if !(range > 0.0) {
        return match policy {
            DegeneratePolicy::Zero => Some(vec![0.0; scores.len()]),
            DegeneratePolicy::Skip => None,
        };
    }
    Some(scores.iter().map(|&s| scale(s, min, max, range)).collect())
}

fn scale(s: f64, min: f64, max: f64, range: f64) -> f64 {
    if s == max {
        1.0
    } else if s == min {
        0.0
    } else if range.is_finite() {
        (s - min) / range
    } else if min.is_infinite() && max.is_infinite() {
        0.5
    } else if min.is_infinite() {
        // Limit of (s - min) / (max - min) as min goes to -inf.
        1.0
    } else {
        0.0
    }
}

/// Ranks clusters of many scans key by key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossScanRanker {
    /// Keys to rank; every key found in the records when unset.
    pub order_keys: Option<Vec<String>>,
    /// Handling of keys whose scores are all equal.
    pub degenerate: DegeneratePolicy,
}

impl CrossScanRanker {
    /// Ranker over every key, zeroing equal-score keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank only `keys`, in this order. Keys no cluster carries are left out.
    pub fn with_order_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Set the equal-score policy.
    pub fn with_degenerate(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate = policy;
        self
    }

    /// Rank every selected key across `scans`.
    pub fn rank(&self, scans: &[ScanRecord]) -> Vec<RankedKey> {
        self.key_names(scans)
            .into_iter()
            .filter_map(|key| self.rank_key(scans, key))
            .collect()
    }

    fn key_names(&self, scans: &[ScanRecord]) -> Vec<String> {
        if let Some(keys) = &self.order_keys {
            return keys.clone();
        }
        let mut names: Vec<String> = Vec::new();
        for key in scans
            .iter()
            .flat_map(|s| &s.clusters)
            .flat_map(|c| &c.order_keys)
        {
            if !names.contains(&key.name) {
                names.push(key.name.clone());
            }
        }
        names
    }

    fn rank_key(&self, scans: &[ScanRecord], key: String) -> Option<RankedKey> {
        let mut entries: Vec<RankedCluster> = scans
            .iter()
            .flat_map(|scan| {
                scan.clusters.iter().filter_map(|cluster| {
                    cluster.score(&key).map(|score| RankedCluster {
                        path: scan.plot_path.clone(),
                        cluster_name: cluster.cluster_name.clone(),
                        score,
                        norm_score: 0.0,
                    })
                })
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));

        let scores: Vec<f64> = entries.iter().map(|e| e.score).collect();
        let Some(normalized) = min_max_normalize(&scores, self.degenerate) else {
            warn!(key = %key, clusters = entries.len(), "skipping key with a degenerate score range");
            return None;
        };
        for (entry, norm) in entries.iter_mut().zip(normalized) {
            entry.norm_score = norm;
        }

        info!(key = %key, clusters = entries.len(), "ranked key across scans");
        Some(RankedKey {
            key_name: key,
            sorted_clusters: entries,
        })
    }
}
