//! JSON logs shared between scans.
//!
//! The cluster log is an append-only JSON array with one [`ScanRecord`] per
//! processed scan. The ranking log is a JSON array of [`RankedKey`]s rewritten
//! whenever a batch is ranked.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::market::{Cluster, ImpurityId, ImpuritySet};
use crate::rank::{RankedKey, RankingKey};

/// An impurity id with the score it was clustered with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpurityScore {
    pub id: ImpurityId,
    pub score: f64,
}

/// A finished cluster as persisted in the cluster log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    /// `color_<fraction>`, see [`cluster_name`].
    pub cluster_name: String,
    /// Every ranking key, in [`crate::rank::KeyName::ALL`] order.
    pub order_keys: Vec<RankingKey>,
    /// Seeds of every cluster merged into this one.
    pub core_impurities: Vec<ImpurityId>,
    /// All members, in acquisition order.
    pub impurities: Vec<ImpurityScore>,
}

impl ClusterRecord {
    /// Score of the named ranking key, if the cluster carries it.
    pub fn score(&self, key: &str) -> Option<f64> {
        self.order_keys
            .iter()
            .find(|k| k.name == key)
            .map(|k| k.score)
    }
}

/// All ranked clusters of one scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Name of the scanned image.
    pub scan_name: String,
    /// Where the renderer painted the scan.
    pub plot_path: String,
    /// Clusters in ascending scan order.
    pub clusters: Vec<ClusterRecord>,
}

impl ScanRecord {
    /// Snapshot scored clusters, keeping their in-scan order.
    pub fn from_clusters(
        scan_name: impl Into<String>,
        plot_path: impl Into<String>,
        clusters: &[Cluster],
        impurities: &ImpuritySet,
    ) -> Result<Self> {
        let clusters = clusters
            .iter()
            .enumerate()
            .map(|(pos, cluster)| {
                let members = cluster
                    .members()
                    .iter()
                    .map(|&id| {
                        impurities.get(id).map(|imp| ImpurityScore {
                            id,
                            score: imp.score,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ClusterRecord {
                    cluster_name: cluster_name(pos, clusters.len()),
                    order_keys: cluster.order_keys().to_vec(),
                    core_impurities: cluster.core().to_vec(),
                    impurities: members,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            scan_name: scan_name.into(),
            plot_path: plot_path.into(),
            clusters,
        })
    }
}

/// Position of the cluster on the color scale, in `[0, 1]`.
///
/// A scan with a single cluster uses the top of the scale.
pub fn color_fraction(position: usize, count: usize) -> f64 {
    if count <= 1 {
        1.0
    } else {
        position as f64 / (count - 1) as f64
    }
}

/// Name of the cluster at `position` among `count`: `color_<fraction>`.
///
/// The fraction is rounded to three decimals, exact halves to the even digit
/// (`color_0.062` for 1/16), and always printed with a decimal point
/// (`color_0.0`, `color_0.333`), except for a lone cluster, named `color_1`.
pub fn cluster_name(position: usize, count: usize) -> String {
    if count <= 1 {
        return "color_1".to_string();
    }
    let fraction = (color_fraction(position, count) * 1000.0).round_ties_even() / 1000.0;
    if fraction.fract() == 0.0 {
        format!("color_{fraction:.1}")
    } else {
        format!("color_{fraction}")
    }
}

/// Read the cluster log.
///
/// A missing, empty or unparsable log reads as no scans.
pub fn read_cluster_log(path: &Path) -> Result<Vec<ScanRecord>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(&text) {
        Ok(scans) => Ok(scans),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cluster log is corrupt, starting a new one");
            Ok(Vec::new())
        }
    }
}

/// Append one scan to the cluster log, creating the log and its directory if needed.
pub fn append_scan(path: &Path, record: ScanRecord) -> Result<()> {
    let mut scans = read_cluster_log(path)?;
    scans.push(record);
    write_json(path, &scans)?;
    debug!(path = %path.display(), scans = scans.len(), "cluster log updated");
    Ok(())
}

/// Write the ranking log, replacing any previous one.
pub fn write_ranking(path: &Path, ranked: &[RankedKey]) -> Result<()> {
    write_json(path, ranked)
}

/// Read a ranking log written by [`write_ranking`].
pub fn read_ranking(path: &Path) -> Result<Vec<RankedKey>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
