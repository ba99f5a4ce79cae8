//! # Offline Track Processing
//!
//! Batch jobs run by hand against OpenF1 and the store.
//!
//! ## Extract
//! 1. Pick a clean lap: session key, driver and lap start from OpenF1 `/laps`.
//!
//! 2. Fetch that car's `/location` samples between lap start and lap end.
//!
//! 3. Run them through the geometry pipeline, same config as the live relay
//!    apart from the target count.
//!
//! 4. Print the JSON points, write them to a file, or upsert them under a
//!    circuit key so the relay serves them as the stored outline.
//!
//! ## Seed
//! Upserts the compiled-in outlines. Safe to rerun; last write wins, so run
//! it before extracting or it will overwrite learned outlines.
use std::{fs, path::PathBuf, time::Duration as StdDuration};

use anyhow::{Context, Result, bail, ensure};
use chrono::{DateTime, Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use track::{
    GeometryConfig, GeometryResult, OpenF1, Track, TrackStore, extract_track_geometry,
    geometry::Point, models::Location, seeds::seeded_tracks,
};

pub const EXTRACT_SOURCE: &str = "openf1_lap";

/// A lap with fewer cleaned samples than this is not worth publishing.
pub const MIN_LAP_POINTS: usize = 20;

const STYLE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

#[derive(Debug, Clone, PartialEq)]
pub struct LapWindow {
    pub session_key: u32,
    pub driver_number: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LapWindow {
    pub fn new(session_key: u32, driver_number: u32, start: DateTime<Utc>, seconds: f64) -> Result<Self> {
        ensure!(
            seconds.is_finite() && seconds > 0.0,
            "Lap duration must be positive, got {seconds}"
        );

        let millis = (seconds * 1000.0).round() as i64;
        let end = Duration::try_milliseconds(millis)
            .and_then(|length| start.checked_add_signed(length))
            .context("Lap duration out of range")?;

        Ok(Self {
            session_key,
            driver_number,
            start,
            end,
        })
    }
}

/// Where an extracted outline goes besides stdout.
#[derive(Debug, Default)]
pub struct Publish {
    pub output: Option<PathBuf>,
    pub circuit: Option<String>,
    pub name: Option<String>,
    pub redis_url: Option<String>,
}

pub async fn extract_lap(
    openf1_url: &str,
    window: &LapWindow,
    config: &GeometryConfig,
    publish: &Publish,
) -> Result<()> {
    let openf1 = OpenF1::new(openf1_url)?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(StdDuration::from_millis(120));
    spinner.set_message(format!(
        "Fetching session {} driver {} from {} to {}",
        window.session_key, window.driver_number, window.start, window.end
    ));

    let samples = openf1
        .locations(
            &window.session_key.to_string(),
            window.driver_number,
            Some((window.start, window.end)),
        )
        .await
        .context("Failed to fetch location samples")?;

    spinner.finish_with_message(format!("Fetched {} samples", samples.len()));

    let geometry = lap_geometry(&samples, config);

    println!("Raw points: {}", geometry.raw_count);
    println!("Cleaned points: {}", geometry.cleaned_count);
    println!("Published points: {}\n", geometry.point_count());

    if let Err(defect) = geometry.check(MIN_LAP_POINTS) {
        bail!("No usable geometry for this lap: {defect}");
    }

    let json = serde_json::to_string(&geometry.points)?;

    match &publish.output {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} points to {}", geometry.point_count(), path.display());
        }
        None => println!("{json}"),
    }

    if let (Some(circuit), Some(redis_url)) = (&publish.circuit, &publish.redis_url) {
        let store = TrackStore::connect(redis_url).await?;
        let track = lap_track(circuit, publish.name.as_deref(), geometry.points);

        store.save(&track).await?;
        println!("Upserted {} into the {} store", track.circuit_key, store.kind());
    }

    Ok(())
}

pub fn lap_geometry(samples: &[Location], config: &GeometryConfig) -> GeometryResult {
    extract_track_geometry(
        EXTRACT_SOURCE,
        samples.iter().filter_map(Location::point),
        config,
    )
}

pub fn lap_track(circuit: &str, name: Option<&str>, points: Vec<Point>) -> Track {
    Track {
        circuit_key: circuit.to_string(),
        name: name.unwrap_or(circuit).to_string(),
        location: None,
        country: None,
        points,
        source: EXTRACT_SOURCE.to_string(),
    }
}

pub async fn seed(redis_url: &str) -> Result<()> {
    let store = TrackStore::connect(redis_url).await?;
    let (seeded, failed) = seed_tracks(&store).await;

    println!("Seeded: {seeded}");
    println!("Failed: {failed}");

    if failed > 0 {
        bail!("{failed} track(s) failed to seed");
    }

    Ok(())
}

/// Upserts every seeded outline, carrying on past failures. Returns
/// `(seeded, failed)`.
pub async fn seed_tracks(store: &TrackStore) -> (usize, usize) {
    let tracks = seeded_tracks();

    let pb = ProgressBar::new(tracks.len() as u64);
    if let Ok(style) = ProgressStyle::with_template(STYLE) {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut seeded = 0;
    let mut failed = 0;

    for track in &tracks {
        pb.set_message(format!("Seeding {}", track.name));

        match store.save(track).await {
            Ok(()) => seeded += 1,
            Err(e) => {
                pb.println(format!("Failed to seed {}: {e}", track.name));
                failed += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    (seeded, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-12-08T13:19:16.288Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_lap_window_end() {
        let window = LapWindow::new(9662, 1, start(), 90.395).unwrap();

        assert_eq!(window.end - window.start, Duration::milliseconds(90_395));
    }

    #[test]
    fn test_lap_window_rejects_bad_duration() {
        assert!(LapWindow::new(9662, 1, start(), 0.0).is_err());
        assert!(LapWindow::new(9662, 1, start(), f64::NAN).is_err());
    }

    #[test]
    fn test_lap_window_rejects_huge_duration() {
        assert!(LapWindow::new(9662, 1, start(), 1e15).is_err());
        assert!(LapWindow::new(9662, 1, start(), f64::MAX).is_err());
    }

    #[test]
    fn test_lap_geometry_skips_missing_coordinates() {
        let samples: Vec<Location> = (0..10)
            .map(|i| Location {
                driver_number: Some(1),
                x: (i % 3 != 0).then_some(1000.0 + i as f64 * 100.0),
                y: Some(200.0 + i as f64 * 60.0),
                z: None,
                date: None,
            })
            .collect();

        let geometry = lap_geometry(&samples, &GeometryConfig::default());

        assert_eq!(geometry.raw_count, 6);
        assert!(!geometry.is_empty());
    }

    #[test]
    fn test_lap_track_name_defaults_to_key() {
        let track = lap_track("yas_marina", None, vec![Point::new(0.5, 0.5)]);

        assert_eq!(track.name, "yas_marina");
        assert_eq!(track.source, EXTRACT_SOURCE);
    }

    #[tokio::test]
    async fn test_seed_tracks_memory() {
        let store = TrackStore::memory();

        let (seeded, failed) = seed_tracks(&store).await;

        assert_eq!((seeded, failed), (3, 0));
        assert!(store.get("monaco").await.unwrap().is_some());
    }
}
