use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GeometryResult, Point, Projection, clean, close_loop, downsample, resample};

/// Fewer cleaned samples than this cannot be normalized or resampled.
pub const MIN_USABLE_POINTS: usize = 2;

/// Tunables for [`extract_track_geometry`].
///
/// Raw thresholds are in sensor units; `resample_min_distance` and
/// `loop_closure_threshold` are in normalized units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub zero_point_epsilon: f64,
    /// Squared distance; 2500 keeps only moves longer than 50 units.
    pub jitter_min_distance_sq: f64,
    /// `None` disables the outlier filter.
    pub outlier_max_deviation: Option<f64>,
    pub outlier_min_surviving_count: usize,
    pub center: bool,
    pub resample_min_distance: f64,
    pub close_loop: bool,
    pub loop_closure_threshold: f64,
    /// `None` keeps every resampled point.
    pub downsample_target_count: Option<usize>,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            zero_point_epsilon: 0.1,
            jitter_min_distance_sq: 2500.0,
            outlier_max_deviation: Some(20_000.0),
            outlier_min_surviving_count: 50,
            center: true,
            resample_min_distance: 0.005,
            close_loop: true,
            loop_closure_threshold: 0.02,
            downsample_target_count: Some(200),
        }
    }
}

/// Clean → normalize → resample → downsample, one complete sample set at a time.
///
/// Returns an empty result when fewer than [`MIN_USABLE_POINTS`] samples
/// survive cleaning. Output coordinates are rounded to four decimals.
pub fn extract_track_geometry<I>(source: &str, samples: I, config: &GeometryConfig) -> GeometryResult
where
    I: IntoIterator<Item = Point>,
{
    let raw: Vec<Point> = samples.into_iter().collect();
    let cleaned = clean(&raw, config);

    if cleaned.len() < MIN_USABLE_POINTS {
        debug!(
            "{source}: {} of {} samples usable, geometry unavailable",
            cleaned.len(),
            raw.len()
        );

        return GeometryResult::unavailable(source, raw.len(), cleaned.len());
    }

    let Some(projection) = Projection::fit(&cleaned, config.center) else {
        return GeometryResult::unavailable(source, raw.len(), cleaned.len());
    };

    let normalized: Vec<Point> = cleaned.iter().map(|&p| projection.apply(p)).collect();

    let mut path = resample(
        &normalized,
        config.resample_min_distance,
        config.close_loop,
        config.loop_closure_threshold,
    );

    if let Some(target) = config.downsample_target_count {
        path = downsample(&path, target);

        // the stride may have skipped the closing point
        if config.close_loop {
            close_loop(&mut path, config.loop_closure_threshold);
        }
    }

    debug!(
        "{source}: {} raw, {} cleaned, {} published",
        raw.len(),
        cleaned.len(),
        path.len()
    );

    GeometryResult {
        source: source.to_string(),
        points: path.into_iter().map(Point::published).collect(),
        raw_count: raw.len(),
        cleaned_count: cleaned.len(),
        projection: Some(projection),
    }
}
