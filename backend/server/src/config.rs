use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};
use track::{GeometryConfig, remote::OPENF1_URL};

const DEFAULT_ORIGINS: [&str; 3] = [
    "https://silverwall.vercel.app",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

pub struct Config {
    pub port: u16,
    pub openf1_url: String,
    pub redis_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub track_cache_ttl: Duration,
    pub telemetry_poll: Duration,
    pub representative_driver: u32,
    pub min_learned_points: usize,
    pub default_circuit: String,
    pub geometry: GeometryConfig,
}

impl Config {
    pub fn load() -> Self {
        let redis_url: String = try_load("REDIS_URL", "");
        let extra_origins: String = try_load("ALLOWED_ORIGINS", "");

        Self {
            port: try_load("RUST_PORT", "8000"),
            openf1_url: try_load("OPENF1_URL", OPENF1_URL),
            redis_url: (!redis_url.trim().is_empty()).then(|| redis_url.trim().to_string()),
            allowed_origins: origins(&extra_origins),
            track_cache_ttl: Duration::from_secs(try_load("TRACK_CACHE_TTL_SECS", "600")),
            telemetry_poll: Duration::from_millis(try_load("TELEMETRY_POLL_MS", "1000")),
            representative_driver: try_load("REPRESENTATIVE_DRIVER", "1"),
            min_learned_points: try_load("MIN_LEARNED_POINTS", "50"),
            default_circuit: try_load("DEFAULT_CIRCUIT", "yas_marina"),
            geometry: load_geometry(),
        }
    }
}

fn load_geometry() -> GeometryConfig {
    let outlier_max_deviation: f64 = try_load("GEOMETRY_OUTLIER_MAX_DEVIATION", "20000");
    let downsample_target_count: usize = try_load("GEOMETRY_DOWNSAMPLE_TARGET_COUNT", "200");

    GeometryConfig {
        zero_point_epsilon: try_load("GEOMETRY_ZERO_POINT_EPSILON", "0.1"),
        jitter_min_distance_sq: try_load("GEOMETRY_JITTER_MIN_DISTANCE_SQ", "2500"),
        outlier_max_deviation: (outlier_max_deviation > 0.0).then_some(outlier_max_deviation),
        outlier_min_surviving_count: try_load("GEOMETRY_OUTLIER_MIN_SURVIVING_COUNT", "50"),
        center: try_load("GEOMETRY_CENTER", "true"),
        resample_min_distance: try_load("GEOMETRY_RESAMPLE_MIN_DISTANCE", "0.005"),
        close_loop: try_load("GEOMETRY_CLOSE_LOOP", "true"),
        loop_closure_threshold: try_load("GEOMETRY_LOOP_CLOSURE_THRESHOLD", "0.02"),
        downsample_target_count: (downsample_target_count > 0).then_some(downsample_target_count),
    }
}

fn origins(extra: &str) -> Vec<String> {
    DEFAULT_ORIGINS
        .iter()
        .map(|origin| origin.to_string())
        .chain(
            extra
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string),
        )
        .collect()
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
