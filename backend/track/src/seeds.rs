//! Representative outlines, already normalized, so the dashboard always has
//! something to draw. Live sessions replace them in the store as they are learned.
use crate::{geometry::Point, models::Track};

pub const SEEDED_SOURCE: &str = "seeded";

struct Seed {
    circuit_key: &'static str,
    name: &'static str,
    location: &'static str,
    country: &'static str,
    outline: &'static [(f64, f64)],
}

const SEEDS: &[Seed] = &[
    Seed {
        circuit_key: "yas_marina",
        name: "Yas Marina Circuit",
        location: "Abu Dhabi",
        country: "UAE",
        outline: &[
            (0.5, 0.1),
            (0.7, 0.2),
            (0.8, 0.4),
            (0.7, 0.6),
            (0.5, 0.8),
            (0.3, 0.6),
            (0.2, 0.4),
            (0.3, 0.2),
        ],
    },
    Seed {
        circuit_key: "monza",
        name: "Autodromo Nazionale Monza",
        location: "Monza",
        country: "Italy",
        outline: &[
            (0.1, 0.5),
            (0.9, 0.5),
            (0.95, 0.4),
            (0.8, 0.1),
            (0.2, 0.1),
            (0.05, 0.4),
        ],
    },
    Seed {
        circuit_key: "monaco",
        name: "Circuit de Monaco",
        location: "Monte Carlo",
        country: "Monaco",
        outline: &[
            (0.3, 0.7),
            (0.5, 0.8),
            (0.7, 0.7),
            (0.8, 0.5),
            (0.6, 0.3),
            (0.4, 0.4),
        ],
    },
];

impl Seed {
    fn track(&self) -> Track {
        Track {
            circuit_key: self.circuit_key.to_string(),
            name: self.name.to_string(),
            location: Some(self.location.to_string()),
            country: Some(self.country.to_string()),
            points: self.outline.iter().copied().map(Point::from).collect(),
            source: SEEDED_SOURCE.to_string(),
        }
    }
}

pub fn seeded_tracks() -> Vec<Track> {
    SEEDS.iter().map(Seed::track).collect()
}

pub fn seeded(circuit_key: &str) -> Option<Track> {
    SEEDS
        .iter()
        .find(|seed| seed.circuit_key == circuit_key)
        .map(Seed::track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_in_unit_square() {
        for track in seeded_tracks() {
            assert!(track.points.len() >= 6, "{} too short", track.circuit_key);
            assert!(
                track
                    .points
                    .iter()
                    .all(|p| (0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y))
            );
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(seeded("monza").unwrap().name, "Autodromo Nazionale Monza");
        assert!(seeded("silverstone").is_none());
    }
}
