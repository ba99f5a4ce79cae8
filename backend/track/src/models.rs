use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// One `/location` record. Coordinates go missing when the car has no fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub driver_number: Option<u32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    /// ISO-8601 with a fixed offset, so lexical order is time order.
    pub date: Option<String>,
}

impl Location {
    pub fn point(&self) -> Option<Point> {
        Some(Point::new(self.x?, self.y?))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    pub session_key: u32,
    pub circuit_key: Option<u32>,
    pub circuit_short_name: Option<String>,
    pub session_name: Option<String>,
    pub meeting_name: Option<String>,
    pub country_name: Option<String>,
    pub date_end: Option<String>,
}

impl Session {
    pub fn is_live(&self) -> bool {
        self.date_end.is_none()
    }

    /// Live, or ended less than `grace` before `now`. An unparseable end
    /// time counts as ended.
    pub fn is_current(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        match &self.date_end {
            None => true,
            Some(end) => DateTime::parse_from_rfc3339(end)
                .map(|end| now - end.with_timezone(&Utc) < grace)
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Driver {
    pub driver_number: u32,
    pub name_acronym: Option<String>,
    pub full_name: Option<String>,
    pub team_name: Option<String>,
    pub team_colour: Option<String>,
}

/// Stored circuit outline, keyed by `circuit_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub circuit_key: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub points: Vec<Point>,
    #[serde(default)]
    pub source: String,
}
