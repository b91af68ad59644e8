//! Seam to the rendering collaborator.
//!
//! Painting clusters onto the region labels of a scan, drawing histograms and
//! cropping top-ranked clusters all live outside this crate. The pipeline only
//! tells a [`Renderer`] what to draw and where.

use std::path::Path;

use crate::error::Result;
use crate::market::{Cluster, ImpuritySet};
use crate::rank::RankedKey;

/// Produces visual artifacts for scans and rankings.
pub trait Renderer {
    /// Paint every cluster of a scan, in order, to `plot_path`.
    ///
    /// Member regions are looked up in `impurities`. Cluster `i` of `n` is
    /// expected to use [`crate::store::color_fraction`]`(i, n)` on its color
    /// scale, matching the cluster's persisted name.
    fn paint_scan(
        &self,
        scan_name: &str,
        clusters: &[Cluster],
        impurities: &ImpuritySet,
        plot_path: &Path,
    ) -> Result<()>;

    /// Histogram of the normalized scores of one key, written to `path`.
    fn histogram(&self, ranked: &RankedKey, path: &Path) -> Result<()>;

    /// Export the first `top_n` clusters of one key into `dir`.
    fn export_top(&self, ranked: &RankedKey, top_n: usize, dir: &Path) -> Result<()>;
}

/// Renderer that draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn paint_scan(&self, _: &str, _: &[Cluster], _: &ImpuritySet, _: &Path) -> Result<()> {
        Ok(())
    }

    fn histogram(&self, _: &RankedKey, _: &Path) -> Result<()> {
        Ok(())
    }

    fn export_top(&self, _: &RankedKey, _: usize, _: &Path) -> Result<()> {
        Ok(())
    }
}
