use tracing::debug;

use super::{GeometryConfig, Point};

/// Upstream reports a lost GPS lock as a fix at (or next to) the origin.
pub fn is_sentinel(point: &Point, epsilon: f64) -> bool {
    point.x.abs() < epsilon && point.y.abs() < epsilon
}

/// Drops sentinel fixes, non-finite samples and jitter, then gross outliers.
///
/// A sample is jitter when its squared distance to the last *retained* sample
/// is below `jitter_min_distance_sq`, so a parked car collapses to one point.
pub fn clean(samples: &[Point], config: &GeometryConfig) -> Vec<Point> {
    let mut retained: Vec<Point> = Vec::with_capacity(samples.len());

    for sample in samples {
        if !sample.is_finite() || is_sentinel(sample, config.zero_point_epsilon) {
            continue;
        }

        if let Some(last) = retained.last() {
            if sample.distance_sq(last) < config.jitter_min_distance_sq {
                continue;
            }
        }

        retained.push(*sample);
    }

    match config.outlier_max_deviation {
        Some(limit) => reject_outliers(retained, limit, config.outlier_min_surviving_count),
        None => retained,
    }
}

/// Removes points further than `limit` from the mean on either axis.
///
/// Fails open: when fewer than `min_surviving` points would remain, the input
/// is returned untouched.
pub fn reject_outliers(points: Vec<Point>, limit: f64, min_surviving: usize) -> Vec<Point> {
    if points.is_empty() {
        return points;
    }

    let count = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let mean = Point::new(sum_x / count, sum_y / count);

    let filtered: Vec<Point> = points
        .iter()
        .filter(|p| (p.x - mean.x).abs() <= limit && (p.y - mean.y).abs() <= limit)
        .copied()
        .collect();

    if filtered.len() < min_surviving {
        debug!(
            "Outlier filter kept {} of {} points, below {min_surviving}; skipping",
            filtered.len(),
            points.len()
        );

        return points;
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(count: usize, radius: f64) -> Vec<Point> {
        (0..count)
            .map(|i| {
                let angle = i as f64 / count as f64 * std::f64::consts::TAU;
                Point::new(5000.0 + radius * angle.cos(), 3000.0 + radius * angle.sin())
            })
            .collect()
    }

    #[test]
    fn test_zero_point_rejection() {
        let samples = vec![
            Point::new(500.0, 300.0),
            Point::new(0.05, -0.05),
            Point::new(900.0, 700.0),
        ];

        let cleaned = clean(&samples, &GeometryConfig::default());

        assert_eq!(cleaned, vec![Point::new(500.0, 300.0), Point::new(900.0, 700.0)]);
    }

    #[test]
    fn test_sentinel_needs_both_axes() {
        assert!(is_sentinel(&Point::new(0.0, 0.0), 0.1));
        assert!(!is_sentinel(&Point::new(0.0, 250.0), 0.1));
    }

    #[test]
    fn test_jitter_collapse() {
        let samples: Vec<Point> = (0..10)
            .map(|i| Point::new(1000.0 + (i % 2) as f64 * 0.5, 500.0 + (i % 3) as f64 * 0.3))
            .collect();

        let cleaned = clean(&samples, &GeometryConfig::default());

        assert_eq!(cleaned, vec![Point::new(1000.0, 500.0)]);
    }

    #[test]
    fn test_jitter_measured_from_retained() {
        // each step is 30 units, under the 50 unit threshold, but they add up
        let samples: Vec<Point> = (0..5).map(|i| Point::new(100.0 + i as f64 * 30.0, 100.0)).collect();

        let cleaned = clean(&samples, &GeometryConfig::default());

        assert_eq!(
            cleaned,
            vec![
                Point::new(100.0, 100.0),
                Point::new(160.0, 100.0),
                Point::new(220.0, 100.0)
            ]
        );
    }

    #[test]
    fn test_non_finite_skipped() {
        let samples = vec![
            Point::new(f64::NAN, 300.0),
            Point::new(500.0, 300.0),
            Point::new(f64::INFINITY, 0.0),
        ];

        assert_eq!(clean(&samples, &GeometryConfig::default()), vec![Point::new(500.0, 300.0)]);
    }

    #[test]
    fn test_outlier_removed() {
        let mut samples = ring(120, 2000.0);
        samples.insert(60, Point::new(90_000.0, 90_000.0));

        let cleaned = clean(&samples, &GeometryConfig::default());

        assert_eq!(cleaned.len(), 120);
        assert!(!cleaned.contains(&Point::new(90_000.0, 90_000.0)));
    }

    #[test]
    fn test_outlier_filter_fails_open() {
        let mut samples = ring(30, 2000.0);
        samples.push(Point::new(90_000.0, 90_000.0));

        let cleaned = clean(&samples, &GeometryConfig::default());

        assert_eq!(cleaned.len(), 31);
    }

    #[test]
    fn test_outlier_filter_disabled() {
        let mut samples = ring(120, 2000.0);
        samples.push(Point::new(90_000.0, 90_000.0));
        let config = GeometryConfig {
            outlier_max_deviation: None,
            ..GeometryConfig::default()
        };

        assert_eq!(clean(&samples, &config).len(), 121);
    }

    #[test]
    fn test_empty_input() {
        assert!(clean(&[], &GeometryConfig::default()).is_empty());
    }
}
