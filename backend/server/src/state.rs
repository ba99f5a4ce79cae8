use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use tracing::{info, warn};
use track::{
    OpenF1, TrackError, TrackStore, geometry::Projection, models::Track,
};

use super::{cache::TtlCache, config::Config, live::LiveFrame};

/// Outline learned from the live session, with the projection needed to
/// place raw car positions on it.
#[derive(Debug, Clone)]
pub struct LiveTrack {
    pub track: Track,
    pub projection: Option<Projection>,
}

pub struct State {
    pub config: Config,
    pub openf1: OpenF1,
    pub store: TrackStore,
    pub track_cache: RwLock<TtlCache<String, LiveTrack>>,
    pub last_circuit: RwLock<Option<String>>,
    pub frames: watch::Sender<LiveFrame>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, TrackError> {
        let store = match &config.redis_url {
            Some(redis_url) => match TrackStore::connect(redis_url).await {
                Ok(store) => store,
                Err(e) => {
                    warn!("Redis unavailable ({e}), falling back to in-memory track store");
                    TrackStore::memory()
                }
            },
            None => TrackStore::memory(),
        };

        info!("Track store: {}", store.kind());

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: TrackStore) -> Result<Arc<Self>, TrackError> {
        let openf1 = OpenF1::new(&config.openf1_url)?;
        let track_cache = RwLock::new(TtlCache::new(config.track_cache_ttl));
        let (frames, _) = watch::channel(LiveFrame::offline("Telemetry feed starting"));

        Ok(Arc::new(Self {
            config,
            openf1,
            store,
            track_cache,
            last_circuit: RwLock::new(None),
            frames,
        }))
    }

    pub async fn cached_track(&self, key: &str) -> Option<LiveTrack> {
        self.track_cache.write().await.get(&key.to_string()).cloned()
    }
}

#[cfg(test)]
impl State {
    /// Memory store and an OpenF1 URL that refuses connections.
    pub fn offline() -> Arc<Self> {
        let mut config = Config::load();
        config.openf1_url = "http://127.0.0.1:1".to_string();

        Self::with_store(config, TrackStore::memory()).unwrap()
    }
}
