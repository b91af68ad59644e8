use super::impurity::BoundingBox;

/// Euclidean gap between two axis-aligned boxes; 0 when they touch or overlap.
#[inline]
pub(crate) fn box_gap(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let dx = (a.x_min - b.x_max).max(b.x_min - a.x_max).max(0.0);
    let dy = (a.y_min - b.y_max).max(b.y_min - a.y_max).max(0.0);
    (dx * dx + dy * dy).sqrt()
}

/// Maximum pairwise gap among `boxes`. Fewer than two boxes have diameter 0.
pub(crate) fn diameter<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> f64 {
    let boxes: Vec<&BoundingBox> = boxes.into_iter().collect();
    let mut best = 0.0f64;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            best = best.max(box_gap(boxes[i], boxes[j]));
        }
    }
    best
}

/// Median of a non-empty slice; the mean of the two middle values for even lengths.
pub(crate) fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
