//! # Geometry Sources
//!
//! Where an outline can come from, in the order callers try them. Each
//! [`Strategy`] either produces a [`Track`] or reports nothing; failures are
//! logged here and never reach the handler.
//!
//! - [`Strategy::Live`]: OpenF1 samples of the representative car, run
//!   through the geometry pipeline and cached per session
//! - [`Strategy::Stored`]: whatever the store learned or was seeded with
//! - [`Strategy::Seeded`]: compiled-in outlines, the last resort
use tracing::{debug, info, warn};
use track::{
    extract_track_geometry,
    geometry::MIN_USABLE_POINTS,
    models::{Location, Track},
    seeds::seeded,
};

use crate::{
    state::{LiveTrack, State},
    utils::{cache_key, slugify},
};

pub const LIVE_SOURCE: &str = "openf1_live";
pub const STORED_SOURCE: &str = "database";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Live,
    Stored,
    Seeded,
}

/// What a strategy is asked for. `Live` reads `session_key`, the others
/// `circuit`.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    pub circuit: Option<&'a str>,
    pub session_key: &'a str,
}

impl Strategy {
    pub async fn attempt(self, state: &State, lookup: Lookup<'_>) -> Option<LiveTrack> {
        match self {
            Strategy::Live => live(state, lookup.session_key).await,
            Strategy::Stored => stored(state, lookup.circuit?).await.map(|track| LiveTrack {
                track,
                projection: None,
            }),
            Strategy::Seeded => seeded(lookup.circuit?).map(|track| LiveTrack {
                track,
                projection: None,
            }),
        }
    }
}

/// First strategy in `chain` that yields an outline.
pub async fn resolve(state: &State, chain: &[Strategy], lookup: Lookup<'_>) -> Option<LiveTrack> {
    for strategy in chain {
        if let Some(found) = strategy.attempt(state, lookup).await {
            debug!("{strategy:?} supplied {}", found.track.circuit_key);
            return Some(found);
        }

        debug!("{strategy:?} had nothing for {lookup:?}");
    }

    None
}

async fn live(state: &State, session_key: &str) -> Option<LiveTrack> {
    let session = match state.openf1.session(session_key).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            info!("OpenF1 knows no session {session_key}");
            return None;
        }
        Err(e) => {
            warn!("Failed to fetch session {session_key}: {e}");
            return None;
        }
    };

    let key = cache_key(session.session_key);
    if let Some(cached) = state.cached_track(&key).await {
        return Some(cached);
    }

    let samples = match state
        .openf1
        .locations(
            &session.session_key.to_string(),
            state.config.representative_driver,
            None,
        )
        .await
    {
        Ok(samples) => samples,
        Err(e) => {
            warn!("Failed to fetch locations for session {}: {e}", session.session_key);
            return None;
        }
    };

    let geometry = extract_track_geometry(
        LIVE_SOURCE,
        samples.iter().filter_map(Location::point),
        &state.config.geometry,
    );

    if let Err(defect) = geometry.check(MIN_USABLE_POINTS) {
        info!("Session {} geometry unavailable: {defect}", session.session_key);
        return None;
    }

    let circuit_name = session
        .circuit_short_name
        .clone()
        .unwrap_or_else(|| format!("session {}", session.session_key));

    let learned = LiveTrack {
        track: Track {
            circuit_key: slugify(&circuit_name),
            name: session
                .meeting_name
                .clone()
                .unwrap_or_else(|| "Current Circuit".to_string()),
            location: session.country_name.clone(),
            country: session.country_name.clone(),
            points: geometry.points.clone(),
            source: LIVE_SOURCE.to_string(),
        },
        projection: geometry.projection,
    };

    if geometry.check(state.config.min_learned_points).is_ok() {
        learn(state, &learned.track).await;
    }

    state
        .track_cache
        .write()
        .await
        .insert(key, learned.clone());

    Some(learned)
}

/// Persists a live outline so later countdowns have it without OpenF1.
async fn learn(state: &State, track: &Track) {
    match state.store.save(track).await {
        Ok(()) => {
            info!("Learned {} ({} points)", track.circuit_key, track.points.len());
            *state.last_circuit.write().await = Some(track.circuit_key.clone());
        }
        Err(e) => warn!("Failed to save learned track {}: {e}", track.circuit_key),
    }
}

async fn stored(state: &State, circuit: &str) -> Option<Track> {
    match state.store.get(circuit).await {
        Ok(Some(track)) => Some(Track {
            source: STORED_SOURCE.to_string(),
            ..track
        }),
        Ok(None) => None,
        Err(e) => {
            warn!("Store lookup for {circuit} failed: {e}");
            None
        }
    }
}
