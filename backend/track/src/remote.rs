//! # OpenF1
//!
//! Thin client over the public OpenF1 REST API. Every call either returns the
//! decoded payload or a [`TrackError`]; turning failures into "no data" is left
//! to the caller, which knows what to fall back to.
//!
//! Session keys are passed as strings so `"latest"` works wherever a number does.
use std::{
    collections::{HashMap, hash_map::Entry},
    time::Duration,
};

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::{
    error::TrackError,
    models::{Driver, Location, Session},
};

pub const OPENF1_URL: &str = "https://api.openf1.org/v1";
pub const LATEST: &str = "latest";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenF1 {
    client: Client,
    base_url: String,
}

impl OpenF1 {
    pub fn new(base_url: &str) -> Result<Self, TrackError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, TrackError> {
        let response = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackError::Status(status));
        }

        Ok(response.json().await?)
    }

    pub async fn session(&self, session_key: &str) -> Result<Option<Session>, TrackError> {
        let sessions: Vec<Session> = self
            .get_json("sessions", &[("session_key", session_key.to_string())])
            .await?;

        Ok(sessions.into_iter().next())
    }

    pub async fn latest_session(&self) -> Result<Option<Session>, TrackError> {
        self.session(LATEST).await
    }

    /// Position samples for one car, optionally bounded to `(after, before)`.
    pub async fn locations(
        &self,
        session_key: &str,
        driver_number: u32,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Location>, TrackError> {
        let mut params = vec![
            ("session_key", session_key.to_string()),
            ("driver_number", driver_number.to_string()),
        ];

        if let Some((after, before)) = window {
            params.push(("date>", timestamp(after)));
            params.push(("date<", timestamp(before)));
        }

        self.get_json("location", &params).await
    }

    pub async fn drivers(&self, session_key: &str) -> Result<HashMap<u32, Driver>, TrackError> {
        let drivers: Vec<Driver> = self
            .get_json("drivers", &[("session_key", session_key.to_string())])
            .await?;

        Ok(drivers
            .into_iter()
            .map(|driver| (driver.driver_number, driver))
            .collect())
    }

    /// Latest position of every car, looking back no further than `since`.
    pub async fn car_positions(
        &self,
        session_key: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Location>, TrackError> {
        let mut params = vec![("session_key", session_key.to_string())];

        if let Some(since) = since {
            params.push(("date>", timestamp(since)));
        }

        let samples: Vec<Location> = self.get_json("location", &params).await?;

        Ok(latest_per_driver(samples))
    }
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Keeps the newest sample per driver, ordered by driver number.
pub fn latest_per_driver(samples: Vec<Location>) -> Vec<Location> {
    let mut latest: HashMap<u32, Location> = HashMap::new();

    for sample in samples {
        let Some(driver_number) = sample.driver_number else {
            continue;
        };

        match latest.entry(driver_number) {
            Entry::Vacant(entry) => {
                entry.insert(sample);
            }
            Entry::Occupied(mut entry) => {
                if sample.date > entry.get().date {
                    entry.insert(sample);
                }
            }
        }
    }

    let mut cars: Vec<Location> = latest.into_values().collect();
    cars.sort_by_key(|car| car.driver_number);

    cars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(driver_number: Option<u32>, x: f64, date: &str) -> Location {
        Location {
            driver_number,
            x: Some(x),
            y: Some(0.0),
            z: None,
            date: Some(date.to_string()),
        }
    }

    #[test]
    fn test_latest_per_driver() {
        let samples = vec![
            sample(Some(44), 1.0, "2024-12-08T13:19:16.100000+00:00"),
            sample(Some(1), 2.0, "2024-12-08T13:19:16.300000+00:00"),
            sample(Some(44), 3.0, "2024-12-08T13:19:16.900000+00:00"),
            sample(Some(1), 4.0, "2024-12-08T13:19:16.200000+00:00"),
            sample(None, 5.0, "2024-12-08T13:19:17.000000+00:00"),
        ];

        let latest = latest_per_driver(samples);

        assert_eq!(latest.len(), 2);
        assert_eq!((latest[0].driver_number, latest[0].x), (Some(1), Some(2.0)));
        assert_eq!((latest[1].driver_number, latest[1].x), (Some(44), Some(3.0)));
    }

    #[test]
    fn test_timestamp_format() {
        let time = DateTime::parse_from_rfc3339("2024-03-22T01:40:53.989Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(timestamp(time), "2024-03-22T01:40:53.989Z");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let openf1 = OpenF1::new("http://localhost:1234/v1/").unwrap();

        assert_eq!(openf1.base_url(), "http://localhost:1234/v1");
    }
}
