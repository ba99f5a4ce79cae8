use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State as AxumState},
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use track::{
    models::{Session, Track},
    remote::LATEST,
};

use crate::{
    error::AppError,
    live::LiveFrame,
    sources::{Lookup, Strategy, resolve},
    state::State,
    utils::{circuit_key, display_name},
};

pub const SERVICE: &str = "silverwall-backend";

const LIVE_OVERRIDE_SOURCE: &str = "openf1_live_override";
const AUTOGEN_SOURCE: &str = "openf1_autogen";

/// A session that ended this recently still reports as live.
const RECENT_SESSION_GRACE_MINS: i64 = 30;

#[derive(Deserialize)]
pub struct TrackQuery {
    #[serde(default)]
    use_openf1: bool,
    #[serde(default = "latest")]
    session_key: String,
}

fn latest() -> String {
    LATEST.to_string()
}

pub async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "status": "SilverWall relay running",
        "openf1_proxy": "active",
    }))
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Live outline of the running session, else the last learned or default
/// circuit from the store, else its seeded outline.
pub async fn current_track_handler(
    AxumState(state): AxumState<Arc<State>>,
) -> Result<Json<Track>, AppError> {
    let live = Lookup {
        circuit: None,
        session_key: LATEST,
    };

    if let Some(found) = Strategy::Live.attempt(&state, live).await {
        return Ok(Json(found.track));
    }

    let circuit = state
        .last_circuit
        .read()
        .await
        .clone()
        .unwrap_or_else(|| state.config.default_circuit.clone());

    info!("No live geometry, falling back to {circuit}");

    let fallback = Lookup {
        circuit: Some(&circuit),
        session_key: LATEST,
    };

    resolve(&state, &[Strategy::Stored, Strategy::Seeded], fallback)
        .await
        .map(|found| Json(found.track))
        .ok_or(AppError::TrackNotFound(circuit))
}

/// Stored outline first; OpenF1 only when asked to override or when nothing
/// is stored, then the seeded outline.
pub async fn track_handler(
    AxumState(state): AxumState<Arc<State>>,
    Path(circuit): Path<String>,
    Query(query): Query<TrackQuery>,
) -> Result<Json<Track>, AppError> {
    let circuit = circuit_key(&circuit)?;
    let lookup = Lookup {
        circuit: Some(&circuit),
        session_key: &query.session_key,
    };

    if let Some(found) = Strategy::Stored.attempt(&state, lookup).await {
        let mut track = found.track;

        if query.use_openf1 {
            if let Some(live) = Strategy::Live.attempt(&state, lookup).await {
                track = with_live_points(track, live.track);
            }
        }

        return Ok(Json(track));
    }

    if let Some(live) = Strategy::Live.attempt(&state, lookup).await {
        return Ok(Json(autogenerated(circuit, live.track)));
    }

    Strategy::Seeded
        .attempt(&state, lookup)
        .await
        .map(|found| Json(found.track))
        .ok_or(AppError::TrackNotFound(circuit))
}

/// Stored metadata, live points.
fn with_live_points(stored: Track, live: Track) -> Track {
    Track {
        points: live.points,
        source: LIVE_OVERRIDE_SOURCE.to_string(),
        ..stored
    }
}

/// Live outline served under a circuit key nothing was stored for.
fn autogenerated(circuit: String, live: Track) -> Track {
    Track {
        name: display_name(&circuit),
        location: Some("Dynamic".to_string()),
        circuit_key: circuit,
        source: AUTOGEN_SOURCE.to_string(),
        ..live
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RaceStatus {
    Live {
        session_name: Option<String>,
        meeting_name: Option<String>,
        circuit: Option<String>,
    },
    /// Nothing running; `circuit` is what `/api/track/current` would draw.
    Waiting { circuit: String },
}

pub fn race_status(session: Option<Session>, now: DateTime<Utc>, fallback_circuit: &str) -> RaceStatus {
    let grace = Duration::minutes(RECENT_SESSION_GRACE_MINS);

    match session {
        Some(session) if session.is_current(now, grace) => RaceStatus::Live {
            session_name: session.session_name,
            meeting_name: session.meeting_name,
            circuit: session.circuit_short_name,
        },
        _ => RaceStatus::Waiting {
            circuit: fallback_circuit.to_string(),
        },
    }
}

pub async fn status_handler(AxumState(state): AxumState<Arc<State>>) -> Json<RaceStatus> {
    let session = state.openf1.latest_session().await.unwrap_or_else(|e| {
        warn!("Failed to fetch latest session: {e}");
        None
    });

    let fallback = state
        .last_circuit
        .read()
        .await
        .clone()
        .unwrap_or_else(|| state.config.default_circuit.clone());

    Json(race_status(session, Utc::now(), &fallback))
}

pub async fn live_frame_handler(AxumState(state): AxumState<Arc<State>>) -> Json<LiveFrame> {
    Json(state.frames.borrow().clone())
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode};
    use track::{geometry::Point, seeds::SEEDED_SOURCE};

    use super::*;
    use crate::sources::{LIVE_SOURCE, STORED_SOURCE};

    fn query(use_openf1: bool) -> Query<TrackQuery> {
        Query(TrackQuery {
            use_openf1,
            session_key: LATEST.to_string(),
        })
    }

    fn track(circuit_key: &str, source: &str) -> Track {
        Track {
            circuit_key: circuit_key.to_string(),
            name: "Autodromo Nazionale Monza".to_string(),
            location: Some("Monza".to_string()),
            country: Some("Italy".to_string()),
            points: vec![Point::new(0.2, 0.2), Point::new(0.8, 0.3)],
            source: source.to_string(),
        }
    }

    fn session(date_end: Option<&str>) -> Session {
        Session {
            session_key: 9662,
            circuit_key: Some(70),
            circuit_short_name: Some("Yas Marina Circuit".to_string()),
            session_name: Some("Race".to_string()),
            meeting_name: Some("Abu Dhabi Grand Prix".to_string()),
            country_name: Some("United Arab Emirates".to_string()),
            date_end: date_end.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_malformed_circuit() {
        let state = State::offline();

        let error = track_handler(AxumState(state), Path("!!!".to_string()), query(false))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::MalformedCircuit(_)));

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_circuit() {
        let state = State::offline();

        let error = track_handler(AxumState(state), Path("silverstone".to_string()), query(false))
            .await
            .unwrap_err();

        assert!(matches!(&error, AppError::TrackNotFound(circuit) if circuit == "silverstone"));
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_seeded_when_nothing_stored_or_live() {
        let state = State::offline();

        let Json(found) = track_handler(AxumState(state), Path("Monza".to_string()), query(false))
            .await
            .unwrap();

        assert_eq!(found.circuit_key, "monza");
        assert_eq!(found.source, SEEDED_SOURCE);
    }

    #[tokio::test]
    async fn test_stored_before_seeded() {
        let state = State::offline();
        state.store.save(&track("monza", LIVE_SOURCE)).await.unwrap();

        let Json(found) = track_handler(AxumState(state), Path("Monza".to_string()), query(true))
            .await
            .unwrap();

        assert_eq!(found.source, STORED_SOURCE);
        assert_eq!(found.points.len(), 2);
    }

    #[tokio::test]
    async fn test_current_falls_back_to_default_circuit() {
        let state = State::offline();
        let default_circuit = state.config.default_circuit.clone();

        let Json(found) = current_track_handler(AxumState(state)).await.unwrap();

        assert_eq!(found.circuit_key, default_circuit);
        assert_eq!(found.source, SEEDED_SOURCE);
    }

    #[tokio::test]
    async fn test_current_prefers_last_learned() {
        let state = State::offline();
        *state.last_circuit.write().await = Some("monaco".to_string());

        let Json(found) = current_track_handler(AxumState(state)).await.unwrap();

        assert_eq!(found.circuit_key, "monaco");
    }

    #[test]
    fn test_live_points_override() {
        let mut live = track("yas_marina_circuit", LIVE_SOURCE);
        live.points = vec![Point::new(0.0, 0.5), Point::new(1.0, 0.5), Point::new(0.5, 0.9)];

        let merged = with_live_points(track("monza", STORED_SOURCE), live);

        assert_eq!(merged.circuit_key, "monza");
        assert_eq!(merged.country.as_deref(), Some("Italy"));
        assert_eq!(merged.points.len(), 3);
        assert_eq!(merged.source, LIVE_OVERRIDE_SOURCE);
    }

    #[test]
    fn test_autogenerated_relabel() {
        let generated = autogenerated("las_vegas".to_string(), track("yas_marina_circuit", LIVE_SOURCE));

        assert_eq!(generated.circuit_key, "las_vegas");
        assert_eq!(generated.name, "Las Vegas");
        assert_eq!(generated.location.as_deref(), Some("Dynamic"));
        assert_eq!(generated.source, AUTOGEN_SOURCE);
        assert_eq!(generated.points.len(), 2);
    }

    #[test]
    fn test_race_status() {
        let now = DateTime::parse_from_rfc3339("2024-12-08T14:45:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(
            race_status(Some(session(Some("2024-12-08T14:30:00+00:00"))), now, "yas_marina"),
            RaceStatus::Live {
                session_name: Some("Race".to_string()),
                meeting_name: Some("Abu Dhabi Grand Prix".to_string()),
                circuit: Some("Yas Marina Circuit".to_string()),
            }
        );
        assert_eq!(
            race_status(Some(session(Some("2024-12-08T12:00:00+00:00"))), now, "yas_marina"),
            RaceStatus::Waiting {
                circuit: "yas_marina".to_string()
            }
        );
        assert!(matches!(race_status(Some(session(None)), now, "monza"), RaceStatus::Live { .. }));
    }

    #[test]
    fn test_race_status_json() {
        let waiting = serde_json::to_value(race_status(None, Utc::now(), "monza")).unwrap();

        assert_eq!(waiting, json!({"status": "waiting", "circuit": "monza"}));
    }

    #[tokio::test]
    async fn test_status_offline_upstream() {
        let state = State::offline();

        let Json(status) = status_handler(AxumState(state)).await;

        assert!(matches!(status, RaceStatus::Waiting { .. }));
    }
}
