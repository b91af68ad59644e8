use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use impurity_market::market::{AuctionEngine, BoundingBox, Cluster, Impurity, ImpuritySet};
use impurity_market::pipeline::{self, RankOptions};
use impurity_market::rank::{KeyName, RankedKey};
use impurity_market::render::{NullRenderer, Renderer};
use impurity_market::store;
use impurity_market::{Error, Result};

#[derive(Default)]
struct RecordingRenderer {
    calls: RefCell<Vec<String>>,
}

impl Renderer for RecordingRenderer {
    fn paint_scan(
        &self,
        scan_name: &str,
        clusters: &[Cluster],
        impurities: &ImpuritySet,
        _: &Path,
    ) -> Result<()> {
        let mut painted = 0.0;
        for cluster in clusters {
            for &id in cluster.members() {
                painted += impurities.get(id)?.region.x_max;
            }
        }
        self.calls
            .borrow_mut()
            .push(format!("paint {scan_name} {} {painted}", clusters.len()));
        Ok(())
    }

    fn histogram(&self, ranked: &RankedKey, path: &Path) -> Result<()> {
        assert!(path.ends_with(&ranked.key_name));
        self.calls
            .borrow_mut()
            .push(format!("histogram {}", ranked.key_name));
        Ok(())
    }

    fn export_top(&self, ranked: &RankedKey, top_n: usize, dir: &Path) -> Result<()> {
        assert!(dir.is_dir());
        self.calls
            .borrow_mut()
            .push(format!("export {} {top_n}", ranked.key_name));
        Ok(())
    }
}

fn boxed(x: f64) -> BoundingBox {
    BoundingBox::new(x, 0.0, x + 1.0, 1.0)
}

fn scan(offset: f64) -> ImpuritySet {
    ImpuritySet::new(vec![
        Impurity::new(0, 0.9, boxed(0.0), 4.0),
        Impurity::new(1, 0.1 + offset, boxed(2.0), 1.0),
        Impurity::new(2, 0.5, boxed(1.0e6), 2.0),
        Impurity::new(3, 0.0, boxed(3.0), 9.0),
    ])
    .unwrap()
}

fn paths(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (
        dir.join("logs").join("clusters.json"),
        dir.join("logs").join("ranking.json"),
        dir.join("plots"),
    )
}

#[test]
fn recorded_scans_accumulate_in_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _, plots) = paths(dir.path());
    let engine = AuctionEngine::new(2);
    let renderer = RecordingRenderer::default();

    let first = pipeline::process_scan(&engine, "scan_a", &scan(0.0), &log, &plots, &renderer).unwrap();
    pipeline::process_scan(&engine, "scan_b", &scan(0.2), &log, &plots, &renderer).unwrap();

    let scans = store::read_cluster_log(&log).unwrap();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0], first);
    assert_eq!(scans[1].scan_name, "scan_b");
    assert!(plots.is_dir());
    assert_eq!(
        *renderer.calls.borrow(),
        vec!["paint scan_a 2 1000005".to_string(), "paint scan_b 2 1000005".to_string()]
    );

    for record in &scans {
        let names: Vec<_> = record.clusters.iter().map(|c| c.cluster_name.as_str()).collect();
        assert_eq!(names, ["color_0.0", "color_1.0"]);
        for cluster in &record.clusters {
            assert_eq!(cluster.order_keys.len(), KeyName::ALL.len());
        }
        assert!(record.plot_path.ends_with(&record.scan_name));
    }

    // Ascending scan order: the lone 0.5 seed ranks below the 0.9 seed and its neighbour.
    let key = KeyName::WeightedArea2SumMultDiameterMultAmount.as_str();
    let low = scans[0].clusters[0].score(key).unwrap();
    let high = scans[0].clusters[1].score(key).unwrap();
    assert!(low <= high);
    assert_eq!(scans[0].clusters[1].core_impurities, vec![0]);
}

#[test]
fn corrupt_log_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _, plots) = paths(dir.path());
    fs::create_dir_all(log.parent().unwrap()).unwrap();
    fs::write(&log, "[{\"scan_name\": ").unwrap();

    assert!(store::read_cluster_log(&log).unwrap().is_empty());

    let engine = AuctionEngine::new(1);
    pipeline::process_scan(&engine, "scan_a", &scan(0.0), &log, &plots, &NullRenderer).unwrap();
    let scans = store::read_cluster_log(&log).unwrap();
    assert_eq!(scans.len(), 1);
    assert_eq!(scans[0].clusters[0].cluster_name, "color_1");
}

#[test]
fn ranking_is_written_and_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let (log, ranking, plots) = paths(dir.path());
    let engine = AuctionEngine::new(2);
    for (i, offset) in [0.0, 0.2, 0.3].into_iter().enumerate() {
        pipeline::process_scan(&engine, &format!("scan_{i}"), &scan(offset), &log, &plots, &NullRenderer)
            .unwrap();
    }

    let key = KeyName::Sum.as_str();
    let options = RankOptions {
        ranker: RankOptions::default().ranker.with_order_keys([key]),
        histograms_dir: Some(dir.path().join("histograms")),
        ordered_dir: Some(dir.path().join("ordered")),
        top_n: 5,
    };
    let renderer = RecordingRenderer::default();
    let ranked = pipeline::rank_logs(&log, &ranking, &options, &renderer).unwrap();

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].key_name, key);
    assert_eq!(ranked[0].sorted_clusters.len(), 6);
    assert_eq!(ranked[0].sorted_clusters[0].norm_score, 1.0);
    assert_eq!(ranked[0].sorted_clusters[5].norm_score, 0.0);
    assert!(dir.path().join("ordered").join(key).is_dir());
    assert_eq!(
        *renderer.calls.borrow(),
        vec![format!("histogram {key}"), format!("export {key} 5")]
    );

    assert_eq!(store::read_ranking(&ranking).unwrap(), ranked);
}

#[test]
fn empty_log_writes_no_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let (log, ranking, _) = paths(dir.path());

    let ranked = pipeline::rank_logs(&log, &ranking, &RankOptions::default(), &NullRenderer).unwrap();

    assert!(ranked.is_empty());
    assert!(!ranking.exists());
}

#[test]
fn unwritable_log_location_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    fs::write(&blocker, "").unwrap();
    let log = blocker.join("clusters.json");

    let err = pipeline::process_scan(
        &AuctionEngine::new(2),
        "scan_a",
        &scan(0.0),
        &log,
        &dir.path().join("plots"),
        &NullRenderer,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Io(_)), "unexpected error: {err:?}");
    assert!(fs::metadata(&blocker).unwrap().is_file());
}

#[test]
fn unreadable_log_is_an_error_not_an_empty_log() {
    let dir = tempfile::tempdir().unwrap();
    let err = store::read_cluster_log(dir.path()).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "unexpected error: {err:?}");
}

#[test]
fn corrupt_ranking_log_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let ranking = dir.path().join("ranking.json");
    fs::write(&ranking, "{\"key_name\": 3").unwrap();
    let err = store::read_ranking(&ranking).unwrap_err();
    assert!(matches!(err, Error::Json(_)), "unexpected error: {err:?}");
}
