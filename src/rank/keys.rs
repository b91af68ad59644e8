//! Per-cluster ranking keys and the in-scan cluster order.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::market::util;
use crate::market::{Cluster, Impurity, ImpuritySet};

/// A named composite score attached to a cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingKey {
    /// Key name, one of [`KeyName::as_str`].
    pub name: String,
    pub score: f64,
}

impl RankingKey {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Every ranking key, in the order they are computed and persisted.
///
/// With `S` the member scores, `A` the member areas and `diam` the cluster diameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyName {
    Median,
    Mean,
    Sum,
    /// Number of members.
    Amount,
    AreasSum,
    Diameter,
    /// `amount / diam`, or -1 when `diam` is 0.
    AmountDivDiameter,
    /// `sum(S) / diam`, or -1 when `diam` is 0.
    SumDivDiameter,
    /// `sum(A) / diam`, or -1 when `diam` is 0.
    AreaSumDivDiameter,
    AreaSumMultDiameter,
    /// `sum(S*A) * diam`
    WeightedAreaSumMultDiameter,
    /// `sum(S^2*A) * diam`
    Weighted2AreaSumMultDiameter,
    /// `sum(S*A^2) * diam`
    WeightedArea2SumMultDiameter,
    /// `sum(S*A^2) * diam * amount`
    WeightedArea2SumMultDiameterMultAmount,
    /// `sum((S*A)^2) * diam`
    Weighted2Area2SumMultDiameter,
    /// `sum(S*A)^2 * diam`
    WeightedAreaSum2MultDiameter,
    /// `sum(S*A) * diam^2`
    WeightedAreaSumMultDiameter2,
}

impl KeyName {
    /// Every key, in the order clusters carry them.
    pub const ALL: [KeyName; 17] = [
        KeyName::Median,
        KeyName::Mean,
        KeyName::Sum,
        KeyName::Amount,
        KeyName::AreasSum,
        KeyName::Diameter,
        KeyName::AmountDivDiameter,
        KeyName::SumDivDiameter,
        KeyName::AreaSumDivDiameter,
        KeyName::AreaSumMultDiameter,
        KeyName::WeightedAreaSumMultDiameter,
        KeyName::Weighted2AreaSumMultDiameter,
        KeyName::WeightedArea2SumMultDiameter,
        KeyName::WeightedArea2SumMultDiameterMultAmount,
        KeyName::Weighted2Area2SumMultDiameter,
        KeyName::WeightedAreaSum2MultDiameter,
        KeyName::WeightedAreaSumMultDiameter2,
    ];

    /// Name used in the logs.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyName::Median => "median",
            KeyName::Mean => "mean",
            KeyName::Sum => "sum",
            KeyName::Amount => "amount",
            KeyName::AreasSum => "areas_sum",
            KeyName::Diameter => "diameter",
            KeyName::AmountDivDiameter => "amount_div_diameter",
            KeyName::SumDivDiameter => "sum_div_diameter",
            KeyName::AreaSumDivDiameter => "area_sum_div_diameter",
            KeyName::AreaSumMultDiameter => "area_sum_mult_diameter",
            KeyName::WeightedAreaSumMultDiameter => "weighted_area_sum_mult_diameter",
            KeyName::Weighted2AreaSumMultDiameter => "weighted2_area_sum_mult_diameter",
            KeyName::WeightedArea2SumMultDiameter => "weighted_area2_sum_mult_diameter",
            KeyName::WeightedArea2SumMultDiameterMultAmount => {
                "weighted_area2_sum_mult_diameter_mult_amount"
            }
            KeyName::Weighted2Area2SumMultDiameter => "weighted2_area2_sum_mult_diameter",
            KeyName::WeightedAreaSum2MultDiameter => "weighted_area_sum2_mult_diameter",
            KeyName::WeightedAreaSumMultDiameter2 => "weighted_area_sum_mult_diameter2",
        }
    }

    /// Inverse of [`KeyName::as_str`].
    pub fn parse(name: &str) -> Option<KeyName> {
        KeyName::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Sentinel for ratio keys of clusters whose diameter is 0.
const ZERO_DIAMETER: f64 = -1.0;

/// Compute every ranking key over a cluster's member impurities, in [`KeyName::ALL`] order.
///
/// Returns no keys for an empty member list.
pub fn ranking_keys(members: &[&Impurity]) -> Vec<RankingKey> {
    if members.is_empty() {
        return Vec::new();
    }

    let scores: Vec<f64> = members.iter().map(|i| i.score).collect();
    let amount = members.len() as f64;
    let sum: f64 = scores.iter().sum();
    let areas_sum: f64 = members.iter().map(|i| i.area).sum();
    let diam = util::diameter(members.iter().map(|i| &i.region));

    let weighted: f64 = members.iter().map(|i| i.score * i.area).sum();
    let weighted2: f64 = members.iter().map(|i| i.score * i.score * i.area).sum();
    let weighted_area2: f64 = members.iter().map(|i| i.score * i.area * i.area).sum();
    let weighted2_area2: f64 = members.iter().map(|i| (i.score * i.area).powi(2)).sum();

    let per_diameter = |x: f64| if diam != 0.0 { x / diam } else { ZERO_DIAMETER };

    KeyName::ALL
        .into_iter()
        .map(|key| {
            let score = match key {
                KeyName::Median => util::median(&scores),
                KeyName::Mean => sum / amount,
                KeyName::Sum => sum,
                KeyName::Amount => amount,
                KeyName::AreasSum => areas_sum,
                KeyName::Diameter => diam,
                KeyName::AmountDivDiameter => per_diameter(amount),
                KeyName::SumDivDiameter => per_diameter(sum),
                KeyName::AreaSumDivDiameter => per_diameter(areas_sum),
                KeyName::AreaSumMultDiameter => areas_sum * diam,
                KeyName::WeightedAreaSumMultDiameter => weighted * diam,
                KeyName::Weighted2AreaSumMultDiameter => weighted2 * diam,
                KeyName::WeightedArea2SumMultDiameter => weighted_area2 * diam,
                KeyName::WeightedArea2SumMultDiameterMultAmount => weighted_area2 * diam * amount,
                KeyName::Weighted2Area2SumMultDiameter => weighted2_area2 * diam,
                KeyName::WeightedAreaSum2MultDiameter => weighted * weighted * diam,
                KeyName::WeightedAreaSumMultDiameter2 => weighted * diam * diam,
            };
            RankingKey::new(key.as_str(), score)
        })
        .collect()
}

/// Scores converged clusters and orders them within their scan.
#[derive(Clone, Copy, Debug)]
pub struct ScoreAggregator {
    scan_order: KeyName,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self {
            scan_order: KeyName::WeightedArea2SumMultDiameterMultAmount,
        }
    }
}

impl ScoreAggregator {
    /// Aggregator sorting by `weighted_area2_sum_mult_diameter_mult_amount`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Key the clusters of one scan are sorted by.
    pub fn with_scan_order(mut self, key: KeyName) -> Self {
        self.scan_order = key;
        self
    }

    /// Attach fresh ranking keys to every cluster, then sort the clusters by
    /// ascending scan-order key.
    ///
    /// Ascending order here is deliberate: it is the in-scan order the cluster
    /// log has always carried, even though the cross-scan ranking is descending.
    pub fn score(&self, clusters: Vec<Cluster>, impurities: &ImpuritySet) -> Result<Vec<Cluster>> {
        let mut scored: Vec<(f64, Cluster)> = clusters
            .into_iter()
            .map(|mut cluster| {
                let members: Vec<&Impurity> = cluster
                    .members()
                    .iter()
                    .map(|&id| impurities.get(id))
                    .collect::<Result<_>>()?;
                cluster.set_order_keys(ranking_keys(&members));
                let order = cluster
                    .order_key(self.scan_order.as_str())
                    .unwrap_or(f64::NEG_INFINITY);
                Ok((order, cluster))
            })
            .collect::<Result<_>>()?;

        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(scored.into_iter().map(|(_, cluster)| cluster).collect())
    }
}
