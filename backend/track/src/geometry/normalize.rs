use serde::{Deserialize, Serialize};

use super::{Bounds, Point};

/// Affine map from raw sensor units into the unit square.
///
/// Both axes share one `scale`, so the outline keeps its aspect ratio. The
/// offsets only translate the minor axis toward the middle of the square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub min_x: f64,
    pub min_y: f64,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Projection {
    /// `None` on empty input.
    pub fn fit(points: &[Point], center: bool) -> Option<Self> {
        let bounds = Bounds::of(points)?;
        let scale = bounds.scale();

        let (offset_x, offset_y) = if center {
            (
                centering_offset(bounds.width(), scale),
                centering_offset(bounds.height(), scale),
            )
        } else {
            (0.0, 0.0)
        };

        Some(Self {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            scale,
            offset_x,
            offset_y,
        })
    }

    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.min_x) / self.scale + self.offset_x,
            (point.y - self.min_y) / self.scale + self.offset_y,
        )
    }
}

fn centering_offset(extent: f64, scale: f64) -> f64 {
    if extent < scale {
        (1.0 - extent / scale) / 2.0
    } else {
        0.0
    }
}

/// Rescales into `[0, 1]` by the larger extent. Empty input yields empty output.
pub fn normalize(points: &[Point], center: bool) -> Vec<Point> {
    match Projection::fit(points, center) {
        Some(projection) => points.iter().map(|&p| projection.apply(p)).collect(),
        None => Vec::new(),
    }
}
