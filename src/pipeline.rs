//! End-to-end flow over the logs: cluster and record one scan, rank a batch.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::market::{AuctionEngine, Cluster, ImpuritySet, Pricing};
use crate::rank::{CrossScanRanker, RankedKey, ScoreAggregator};
use crate::render::Renderer;
use crate::store::{self, ScanRecord};

/// Number of top clusters exported per key unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 150;

/// Where and how a batch ranking is rendered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankOptions {
    /// Keys to rank and the equal-score policy.
    pub ranker: CrossScanRanker,
    /// One histogram per key is written here, named after the key.
    pub histograms_dir: Option<PathBuf>,
    /// Top clusters of each key are exported to `<ordered_dir>/<key>`.
    pub ordered_dir: Option<PathBuf>,
    /// Clusters exported per key.
    pub top_n: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            ranker: CrossScanRanker::default(),
            histograms_dir: None,
            ordered_dir: None,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Score converged clusters, render them and append the scan to the cluster log.
///
/// The plot goes to `<plots_dir>/<scan_name>`.
pub fn record_scan<R: Renderer + ?Sized>(
    scan_name: &str,
    clusters: Vec<Cluster>,
    impurities: &ImpuritySet,
    log_path: &Path,
    plots_dir: &Path,
    renderer: &R,
) -> Result<ScanRecord> {
    let clusters = ScoreAggregator::new().score(clusters, impurities)?;

    fs::create_dir_all(plots_dir)?;
    let plot_path = plots_dir.join(scan_name);
    renderer.paint_scan(scan_name, &clusters, impurities, &plot_path)?;

    let record = ScanRecord::from_clusters(
        scan_name,
        plot_path.to_string_lossy(),
        &clusters,
        impurities,
    )?;
    store::append_scan(log_path, record.clone())?;
    info!(scan = scan_name, clusters = clusters.len(), "scan recorded");
    Ok(record)
}

/// Run the auction on one scan and record the result.
pub fn process_scan<P: Pricing, R: Renderer + ?Sized>(
    engine: &AuctionEngine<P>,
    scan_name: &str,
    impurities: &ImpuritySet,
    log_path: &Path,
    plots_dir: &Path,
    renderer: &R,
) -> Result<ScanRecord> {
    debug!(
        scan = scan_name,
        impurities = impurities.len(),
        clusters = engine.params().clusters,
        "clustering scan"
    );
    let outcome = engine.run(impurities)?;
    record_scan(
        scan_name,
        outcome.clusters,
        impurities,
        log_path,
        plots_dir,
        renderer,
    )
}

/// Rank every scan of the cluster log and write the ranking log.
///
/// Nothing is written when the log holds no clusters.
pub fn rank_logs<R: Renderer + ?Sized>(
    cluster_log: &Path,
    ranking_log: &Path,
    options: &RankOptions,
    renderer: &R,
) -> Result<Vec<RankedKey>> {
    let scans = store::read_cluster_log(cluster_log)?;
    if scans.iter().all(|s| s.clusters.is_empty()) {
        info!(path = %cluster_log.display(), "no clusters to rank");
        return Ok(Vec::new());
    }

    let ranked = options.ranker.rank(&scans);

    if let Some(dir) = &options.histograms_dir {
        fs::create_dir_all(dir)?;
        for key in &ranked {
            renderer.histogram(key, &dir.join(&key.key_name))?;
        }
    }
    if let Some(dir) = &options.ordered_dir {
        for key in &ranked {
            let key_dir = dir.join(&key.key_name);
            fs::create_dir_all(&key_dir)?;
            renderer.export_top(key, options.top_n, &key_dir)?;
        }
    }

    store::write_ranking(ranking_log, &ranked)?;
    info!(
        scans = scans.len(),
        keys = ranked.len(),
        path = %ranking_log.display(),
        "ranking written"
    );
    Ok(ranked)
}
