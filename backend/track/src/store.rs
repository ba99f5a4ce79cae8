//! # Geometry Store
//!
//! Circuit outlines keyed by circuit key. Upsert only, last write wins.
//!
//! ## Redis
//! - One hash, [`TRACKS_KEY`], field per circuit key
//! - Value is the [`Track`] as JSON
//!
//! ## Memory
//! Used when no Redis URL is configured. Lost on restart, which is fine: live
//! sessions relearn the outline and the seeded set covers the gap.
use std::{collections::HashMap, time::Duration};

use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::RwLock;

use crate::{error::TrackError, models::Track};

pub const TRACKS_KEY: &str = "tracks";

pub enum TrackStore {
    Redis(ConnectionManager),
    Memory(RwLock<HashMap<String, Track>>),
}

impl TrackStore {
    pub async fn connect(redis_url: &str) -> Result<Self, TrackError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let connection_manager = client.get_connection_manager_with_config(config).await?;

        Ok(Self::Redis(connection_manager))
    }

    pub fn memory() -> Self {
        Self::Memory(RwLock::new(HashMap::new()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }

    pub async fn get(&self, circuit_key: &str) -> Result<Option<Track>, TrackError> {
        match self {
            Self::Redis(connection_manager) => {
                let mut connection = connection_manager.clone();
                let raw: Option<String> = connection.hget(TRACKS_KEY, circuit_key).await?;

                Ok(raw.map(|raw| serde_json::from_str(&raw)).transpose()?)
            }
            Self::Memory(tracks) => Ok(tracks.read().await.get(circuit_key).cloned()),
        }
    }

    pub async fn save(&self, track: &Track) -> Result<(), TrackError> {
        match self {
            Self::Redis(connection_manager) => {
                let mut connection = connection_manager.clone();
                let payload = serde_json::to_string(track)?;

                let _: () = connection
                    .hset(TRACKS_KEY, &track.circuit_key, payload)
                    .await?;
            }
            Self::Memory(tracks) => {
                tracks
                    .write()
                    .await
                    .insert(track.circuit_key.clone(), track.clone());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn track(circuit_key: &str, x: f64) -> Track {
        Track {
            circuit_key: circuit_key.to_string(),
            name: "Test Circuit".to_string(),
            location: None,
            country: None,
            points: vec![Point::new(x, 0.5)],
            source: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_miss() {
        let store = TrackStore::memory();

        assert_eq!(store.get("monza").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_upsert_last_write_wins() {
        let store = TrackStore::memory();

        store.save(&track("monza", 0.1)).await.unwrap();
        store.save(&track("monza", 0.9)).await.unwrap();

        let stored = store.get("monza").await.unwrap().unwrap();
        assert_eq!(stored.points, vec![Point::new(0.9, 0.5)]);
    }
}
