//! Impurity records and the per-scan impurity set.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::util;
use crate::error::{Error, Result};

/// Identifier of an impurity, stable for the whole run.
pub type ImpurityId = usize;

/// Axis-aligned bounding box of an impurity region, in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x_min: f64,
    /// Top edge.
    pub y_min: f64,
    /// Right edge.
    pub x_max: f64,
    /// Bottom edge.
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Euclidean gap to `other` (0 when the boxes touch or overlap).
    pub fn distance(&self, other: &BoundingBox) -> f64 {
        util::box_gap(self, other)
    }

    fn is_well_formed(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }
}

/// A detected surface defect with its anomaly score.
#[derive(Clone, Debug, PartialEq)]
pub struct Impurity {
    /// Id assigned by the extractor.
    pub id: ImpurityId,
    /// Anomaly score in `[0, 1]`. Impurities scored 0 never join a cluster.
    pub score: f64,
    /// Bounding box of the impurity region.
    pub region: BoundingBox,
    /// Area of the region in pixels.
    pub area: f64,
}

impl Impurity {
    pub fn new(id: ImpurityId, score: f64, region: BoundingBox, area: f64) -> Self {
        Self {
            id,
            score,
            region,
            area,
        }
    }

    fn validate(&self) -> Result<()> {
        let malformed = |reason| Error::MalformedImpurity {
            id: self.id,
            reason,
        };
        if !self.score.is_finite() || self.score < 0.0 || self.score > 1.0 {
            return Err(malformed("score must be a finite value in [0, 1]"));
        }
        if !self.area.is_finite() || self.area < 0.0 {
            return Err(malformed("area must be finite and non-negative"));
        }
        if !self.region.is_well_formed() {
            return Err(malformed("region must be a finite box with min <= max"));
        }
        Ok(())
    }
}

/// All impurities of one scan, validated and indexed by id.
#[derive(Clone, Debug, Default)]
pub struct ImpuritySet {
    impurities: Vec<Impurity>,
    index: HashMap<ImpurityId, usize>,
    /// Ids with a positive score, ascending by score (ties by id).
    ranked: Vec<ImpurityId>,
}

impl ImpuritySet {
    /// Validate and index `impurities`.
    ///
    /// Fails on the first malformed record or duplicated id.
    pub fn new(impurities: Vec<Impurity>) -> Result<Self> {
        let mut index = HashMap::with_capacity(impurities.len());
        for (pos, imp) in impurities.iter().enumerate() {
            imp.validate()?;
            if index.insert(imp.id, pos).is_some() {
                return Err(Error::MalformedImpurity {
                    id: imp.id,
                    reason: "duplicate id",
                });
            }
        }

        let mut positive: Vec<&Impurity> = impurities.iter().filter(|i| i.score > 0.0).collect();
        positive.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.id.cmp(&b.id)));
        let ranked = positive.iter().map(|i| i.id).collect();

        Ok(Self {
            impurities,
            index,
            ranked,
        })
    }

    /// Build the set from the extractor's per-impurity arrays.
    ///
    /// `regions`, `areas` and `scores` are indexed by impurity id; only the ids
    /// listed in `valid_ids` become impurities.
    pub fn from_extraction(
        regions: &[BoundingBox],
        areas: &[f64],
        scores: &[f64],
        valid_ids: &[ImpurityId],
    ) -> Result<Self> {
        let impurities = valid_ids
            .iter()
            .map(|&id| {
                match (regions.get(id), areas.get(id), scores.get(id)) {
                    (Some(region), Some(&area), Some(&score)) => {
                        Ok(Impurity::new(id, score, *region, area))
                    }
                    _ => Err(Error::UnknownImpurity(id)),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(impurities)
    }

    /// Impurity with id `id`, or [`Error::UnknownImpurity`].
    pub fn get(&self, id: ImpurityId) -> Result<&Impurity> {
        self.index
            .get(&id)
            .map(|&pos| &self.impurities[pos])
            .ok_or(Error::UnknownImpurity(id))
    }

    /// Ids of impurities with a positive score, ascending by score.
    pub fn ranked(&self) -> &[ImpurityId] {
        &self.ranked
    }

    /// All impurities, zero scores included, in input order.
    pub fn iter(&self) -> impl Iterator<Item = &Impurity> {
        self.impurities.iter()
    }

    /// Number of impurities, zero scores included.
    pub fn len(&self) -> usize {
        self.impurities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impurities.is_empty()
    }
}
