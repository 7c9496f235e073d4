use dog_core::FeaturePoint;
use tracing::debug;

/// Spatially balanced cap on the number of feature points.
///
/// Below or at `max_points` the input is returned untouched. Otherwise the
/// base image is split into a `buckets x buckets` grid and each cell keeps at
/// most `max_points / buckets^2` points, strongest `|score|` first. Cells are
/// emitted row by row.
///
/// A cell holding more than its share is trimmed even when the global count
/// would allow it.
pub fn prune_features(
    points: Vec<FeaturePoint>,
    width: usize,
    height: usize,
    max_points: usize,
    buckets: usize,
) -> Vec<FeaturePoint> {
    if points.len() <= max_points {
        return points;
    }

    let n_buckets = buckets * buckets;
    let per_bucket = max_points / n_buckets;

    let dx = width.div_ceil(buckets) as f64;
    let dy = height.div_ceil(buckets) as f64;

    let mut grid: Vec<Vec<FeaturePoint>> = vec![Vec::new(); n_buckets];
    let before = points.len();
    for fp in points {
        let bx = ((fp.x / dx).floor() as usize).min(buckets - 1);
        let by = ((fp.y / dy).floor() as usize).min(buckets - 1);
        grid[by * buckets + bx].push(fp);
    }

    let mut result = Vec::with_capacity(max_points.min(before));
    for mut bucket in grid {
        if bucket.len() > per_bucket {
            bucket.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
            bucket.truncate(per_bucket);
        }
        result.extend(bucket);
    }

    debug!(before, after = result.len(), per_bucket, "pruned feature points");
    result
}
