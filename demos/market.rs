//! Cluster two synthetic scans, record them and rank the batch.
//!
//! Set `IMPURITY_MARKET_LOG=debug` to follow every purchase and merge.

use impurity_market::market::{AuctionEngine, BoundingBox, Impurity, ImpuritySet};
use impurity_market::pipeline::{self, RankOptions};
use impurity_market::render::NullRenderer;
use tracing_subscriber::EnvFilter;

fn blob(first_id: usize, cx: f64, cy: f64, scores: &[f64]) -> Vec<Impurity> {
    scores
        .iter()
        .enumerate()
        .map(|(i, &score)| {
            let x = cx + (i % 3) as f64 * 4.0;
            let y = cy + (i / 3) as f64 * 4.0;
            Impurity::new(first_id + i, score, BoundingBox::new(x, y, x + 2.0, y + 2.0), 4.0 + i as f64)
        })
        .collect()
}

fn scan(spread: f64) -> impurity_market::Result<ImpuritySet> {
    let mut impurities = blob(0, 0.0, 0.0, &[0.95, 0.4, 0.3, 0.2, 0.35]);
    impurities.extend(blob(5, spread, 0.0, &[0.8, 0.25, 0.1, 0.15]));
    impurities.extend(blob(9, 0.0, spread, &[0.6, 0.05, 0.0, 0.2]));
    ImpuritySet::new(impurities)
}

fn main() -> impurity_market::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("IMPURITY_MARKET_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let workdir = std::env::temp_dir().join("impurity-market-demo");
    let cluster_log = workdir.join("clusters.json");
    let ranking_log = workdir.join("ranking.json");
    let plots = workdir.join("plots");
    if cluster_log.exists() {
        std::fs::remove_file(&cluster_log)?;
    }

    let engine = AuctionEngine::new(3);
    for (name, spread) in [("scan_near", 60.0), ("scan_far", 400.0)] {
        let impurities = scan(spread)?;
        let record = pipeline::process_scan(&engine, name, &impurities, &cluster_log, &plots, &NullRenderer)?;
        let ignored = impurities.iter().filter(|i| i.score == 0.0).count();
        println!("=== {name} ({} impurities, {ignored} unscored) ===", impurities.len());
        for cluster in &record.clusters {
            let ids: Vec<_> = cluster.impurities.iter().map(|i| i.id).collect();
            println!(
                "  {:<12} cores {:?} members {:?}",
                cluster.cluster_name, cluster.core_impurities, ids
            );
        }
    }

    let ranked = pipeline::rank_logs(&cluster_log, &ranking_log, &RankOptions::default(), &NullRenderer)?;
    println!("\n=== ranking ({} keys) ===", ranked.len());
    for key in ranked.iter().take(3) {
        let top = &key.sorted_clusters[0];
        println!(
            "  {:<45} top {} / {} ({:.3})",
            key.key_name, top.path, top.cluster_name, top.score
        );
    }
    println!("\nlogs written to {}", workdir.display());
    Ok(())
}
