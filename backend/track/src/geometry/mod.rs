//! # Track Geometry
//!
//! Turns a noisy stream of car position samples into a clean, closed outline
//! in the unit square, ready for vector rendering on the dashboard.
//!
//! ## Stages
//!
//! 1. [`clean`]: drop sentinel fixes (no GPS lock reported as `(0, 0)`),
//!    collapse jitter runs, reject teleported outliers.
//! 2. [`Projection::fit`] / [`normalize`]: scale both axes by the **same**
//!    factor into `[0, 1]`, then center the minor axis.
//! 3. [`resample`]: keep points at least `min_distance` apart and close the loop.
//! 4. [`downsample`]: uniform stride down to a target count for rendering.
//!
//! [`extract_track_geometry`] runs all of them with a [`GeometryConfig`].
//!
//! ## Unavailable geometry
//!
//! Nothing in here returns an error. Too few samples produce an empty
//! [`GeometryResult`]; callers branch on [`GeometryResult::check`] and fall
//! back to a stored or seeded outline.
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod clean;
mod normalize;
mod pipeline;
mod resample;

pub use clean::{clean, is_sentinel, reject_outliers};
pub use normalize::{Projection, normalize};
pub use pipeline::{GeometryConfig, MIN_USABLE_POINTS, extract_track_geometry};
pub use resample::{close_loop, downsample, resample};

/// Extent below which an outline is considered a single point.
pub const DEGENERATE_EXTENT: f64 = 1e-6;

/// Decimal places kept in published coordinates.
pub const OUTPUT_PRECISION: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Rounds to [`OUTPUT_PRECISION`] places and clamps into the unit square.
    pub fn published(self) -> Self {
        let factor = 10f64.powi(OUTPUT_PRECISION);
        let round = |v: f64| ((v * factor).round() / factor).clamp(0.0, 1.0);

        Self::new(round(self.x), round(self.y))
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Axis-aligned bounding box of a point sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn of(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let seed = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };

        Some(points.iter().fold(seed, |bounds, p| Self {
            min_x: bounds.min_x.min(p.x),
            max_x: bounds.max_x.max(p.x),
            min_y: bounds.min_y.min(p.y),
            max_y: bounds.max_y.max(p.y),
        }))
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Larger of the two extents, or `1.0` when every point coincides.
    pub fn scale(&self) -> f64 {
        let scale = self.width().max(self.height());

        if scale > 0.0 && scale.is_finite() {
            scale
        } else {
            1.0
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defect {
    #[error("Insufficient data: {found} usable samples, {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error("Degenerate geometry: outline has no extent")]
    DegenerateGeometry,
}

/// Output of one pipeline run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryResult {
    pub source: String,
    pub points: Vec<Point>,
    pub raw_count: usize,
    pub cleaned_count: usize,
    pub projection: Option<Projection>,
}

impl GeometryResult {
    pub fn unavailable(source: &str, raw_count: usize, cleaned_count: usize) -> Self {
        Self {
            source: source.to_string(),
            points: Vec::new(),
            raw_count,
            cleaned_count,
            projection: None,
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `min_points` is the cleaned-sample floor, never less than [`MIN_USABLE_POINTS`].
    pub fn check(&self, min_points: usize) -> Result<(), Defect> {
        let required = min_points.max(MIN_USABLE_POINTS);

        if self.cleaned_count < required {
            return Err(Defect::InsufficientData {
                found: self.cleaned_count,
                required,
            });
        }

        if self.points.len() < MIN_USABLE_POINTS {
            return Err(Defect::InsufficientData {
                found: self.points.len(),
                required: MIN_USABLE_POINTS,
            });
        }

        match Bounds::of(&self.points) {
            Some(bounds) if bounds.width().max(bounds.height()) >= DEGENERATE_EXTENT => Ok(()),
            _ => Err(Defect::DegenerateGeometry),
        }
    }
}
