//! # Live Telemetry
//!
//! One poller talks to OpenF1; every dashboard socket reads the latest frame
//! from a `watch` channel, so client count never multiplies upstream traffic.
//!
//! ## Frame
//! - `status`: `offline` (no live session or OpenF1 down), `waiting` (session
//!   live, no positions yet), `live`
//! - `cars`: latest sample per driver, raw `x`/`y`/`z` plus `track`, the same
//!   position mapped into the outline's unit square when the outline is cached
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        State as AxumState, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use track::{
    geometry::{Point, Projection},
    models::{Driver, Location},
};

use crate::{state::State, utils::cache_key};

/// How far back a position sample may be and still count as current.
const POSITION_WINDOW_SECS: i64 = 10;

const MIN_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

const UNKNOWN_TEAM: &str = "Unknown";
const UNKNOWN_COLOR: &str = "#555555";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Offline,
    Waiting,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Car {
    pub driver_number: u32,
    pub code: String,
    pub team: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub track: Option<Point>,
}

impl Car {
    fn new(location: &Location, driver: Option<&Driver>, projection: Option<Projection>) -> Option<Self> {
        let driver_number = location.driver_number?;
        let position = location.point();

        Some(Self {
            driver_number,
            code: driver
                .and_then(|d| d.name_acronym.clone())
                .unwrap_or_else(|| format!("#{driver_number}")),
            team: driver
                .and_then(|d| d.team_name.clone())
                .unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
            color: driver
                .and_then(|d| d.team_colour.as_deref())
                .map(team_color)
                .unwrap_or_else(|| UNKNOWN_COLOR.to_string()),
            x: location.x.unwrap_or_default(),
            y: location.y.unwrap_or_default(),
            z: location.z.unwrap_or_default(),
            track: projection
                .zip(position)
                .map(|(projection, position)| projection.apply(position).published()),
        })
    }
}

/// OpenF1 sends team colours without the leading `#`.
fn team_color(raw: &str) -> String {
    if raw.starts_with('#') {
        raw.to_string()
    } else {
        format!("#{raw}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveFrame {
    pub status: FeedStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_key: Option<u32>,
    pub cars: Vec<Car>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LiveFrame {
    pub fn offline(message: &str) -> Self {
        Self {
            status: FeedStatus::Offline,
            session_key: None,
            cars: Vec::new(),
            message: Some(message.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn waiting(session_key: u32) -> Self {
        Self {
            status: FeedStatus::Waiting,
            session_key: Some(session_key),
            cars: Vec::new(),
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn live(session_key: u32, cars: Vec<Car>) -> Self {
        Self {
            status: FeedStatus::Live,
            session_key: Some(session_key),
            cars,
            message: None,
            timestamp: Utc::now(),
        }
    }
}

pub fn build_cars(
    positions: &[Location],
    drivers: &HashMap<u32, Driver>,
    projection: Option<Projection>,
) -> Vec<Car> {
    positions
        .iter()
        .filter_map(|location| {
            let driver = location.driver_number.and_then(|n| drivers.get(&n));
            Car::new(location, driver, projection)
        })
        .collect()
}

/// Runs for the life of the server; errors only ever produce an offline frame.
pub async fn poll_telemetry(state: Arc<State>) {
    let period = state.config.telemetry_poll.max(MIN_POLL_INTERVAL);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Polling OpenF1 every {period:?}");

    loop {
        ticker.tick().await;

        let frame = next_frame(&state).await;
        state.frames.send_replace(frame);

        let purged = state.track_cache.write().await.purge_expired();
        if purged > 0 {
            debug!("Purged {purged} expired track(s)");
        }
    }
}

async fn next_frame(state: &State) -> LiveFrame {
    let session = match state.openf1.latest_session().await {
        Ok(Some(session)) if session.is_live() => session,
        Ok(_) => return LiveFrame::offline("No active session"),
        Err(e) => {
            warn!("Telemetry poll failed: {e}");
            return LiveFrame::offline("Telemetry source unavailable");
        }
    };

    let session_key = session.session_key.to_string();
    let since = Utc::now() - Duration::seconds(POSITION_WINDOW_SECS);

    let (positions, drivers) = tokio::join!(
        state.openf1.car_positions(&session_key, Some(since)),
        state.openf1.drivers(&session_key),
    );

    let positions = positions.unwrap_or_else(|e| {
        warn!("Failed to fetch car positions: {e}");
        Vec::new()
    });

    if positions.is_empty() {
        return LiveFrame::waiting(session.session_key);
    }

    let drivers = drivers.unwrap_or_else(|e| {
        warn!("Failed to fetch drivers: {e}");
        HashMap::new()
    });

    let projection = state
        .cached_track(&cache_key(session.session_key))
        .await
        .and_then(|cached| cached.projection);

    LiveFrame::live(
        session.session_key,
        build_cars(&positions, &drivers, projection),
    )
}

pub async fn telemetry_ws_handler(
    ws: WebSocketUpgrade,
    AxumState(state): AxumState<Arc<State>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_frames(socket, state))
}

fn encode(frame: &LiveFrame) -> Option<String> {
    serde_json::to_string(frame)
        .map_err(|e| warn!("Failed to encode frame: {e}"))
        .ok()
}

async fn stream_frames(mut socket: WebSocket, state: Arc<State>) {
    let mut frames = state.frames.subscribe();

    let Some(initial) = encode(&frames.borrow_and_update()) else {
        return;
    };
    if socket.send(Message::Text(initial.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }

                let Some(payload) = encode(&frames.borrow_and_update()) else {
                    break;
                };

                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Telemetry client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(driver_number: u32, x: f64, y: f64) -> Location {
        Location {
            driver_number: Some(driver_number),
            x: Some(x),
            y: Some(y),
            z: Some(4.0),
            date: Some("2024-12-08T13:19:16.288000+00:00".to_string()),
        }
    }

    fn driver(driver_number: u32) -> Driver {
        Driver {
            driver_number,
            name_acronym: Some("VER".to_string()),
            full_name: Some("Max VERSTAPPEN".to_string()),
            team_name: Some("Red Bull Racing".to_string()),
            team_colour: Some("3671C6".to_string()),
        }
    }

    #[test]
    fn test_unknown_driver_defaults() {
        let cars = build_cars(&[location(81, 10.0, 20.0)], &HashMap::new(), None);

        assert_eq!(cars[0].code, "#81");
        assert_eq!(cars[0].team, UNKNOWN_TEAM);
        assert_eq!(cars[0].color, UNKNOWN_COLOR);
        assert_eq!(cars[0].track, None);
    }

    #[test]
    fn test_known_driver() {
        let drivers = HashMap::from([(1, driver(1))]);

        let cars = build_cars(&[location(1, 10.0, 20.0)], &drivers, None);

        assert_eq!(cars[0].code, "VER");
        assert_eq!(cars[0].color, "#3671C6");
    }

    #[test]
    fn test_projected_onto_outline() {
        let projection = Projection::fit(&[Point::new(1000.0, 500.0), Point::new(1400.0, 600.0)], true);

        let cars = build_cars(&[location(1, 1200.0, 550.0)], &HashMap::new(), projection);

        assert_eq!(cars[0].track, Some(Point::new(0.5, 0.5)));
        assert_eq!(cars[0].x, 1200.0);
    }

    #[test]
    fn test_missing_driver_number_skipped() {
        let mut anonymous = location(1, 10.0, 20.0);
        anonymous.driver_number = None;

        assert!(build_cars(&[anonymous], &HashMap::new(), None).is_empty());
    }

    #[test]
    fn test_frame_json() {
        let frame = serde_json::to_value(LiveFrame::offline("No active session")).unwrap();

        assert_eq!(frame["status"], "offline");
        assert_eq!(frame["cars"], serde_json::json!([]));
        assert!(frame.get("session_key").is_none());
    }
}
