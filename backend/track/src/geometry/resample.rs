use super::Point;

/// Keeps a point only once it is more than `min_distance` from the last kept
/// one. The first point always survives; order is preserved.
pub fn resample(
    points: &[Point],
    min_distance: f64,
    close: bool,
    closure_threshold: f64,
) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };

    let mut retained = vec![first];
    let mut last = first;
    for &point in &points[1..] {
        if point.distance(&last) > min_distance {
            retained.push(point);
            last = point;
        }
    }

    if close {
        close_loop(&mut retained, closure_threshold);
    }

    retained
}

/// Appends a copy of the first point when the path ends further than
/// `threshold` from where it started. Returns whether a point was appended.
pub fn close_loop(points: &mut Vec<Point>, threshold: f64) -> bool {
    let (Some(&first), Some(last)) = (points.first(), points.last()) else {
        return false;
    };

    if points.len() < 2 || first.distance(last) <= threshold {
        return false;
    }

    points.push(first);
    true
}

/// Every `len / target_count`-th point starting at index 0. A `target_count`
/// of zero leaves the input as is.
pub fn downsample(points: &[Point], target_count: usize) -> Vec<Point> {
    if target_count == 0 {
        return points.to_vec();
    }

    let stride = (points.len() / target_count).max(1);

    points.iter().step_by(stride).copied().collect()
}
