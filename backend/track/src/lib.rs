//! # Track
//!
//! Shared pieces of the SilverWall relay: the geometry pipeline that turns raw
//! car positions into a circuit outline, the OpenF1 client that supplies those
//! positions, and the store that remembers learned outlines.
//!
//!
//!
//! # Data Flow
//! - OpenF1 `/location` samples for one car over one session or lap window
//! - [`geometry::extract_track_geometry`] cleans, normalizes and resamples them
//! - The outline is published by the server and upserted into [`store::TrackStore`]
//! - When OpenF1 has nothing, the store and then [`seeds`] stand in
//!
//!
//!
//! # Coordinates
//! OpenF1 reports `x`/`y` in its own sensor units, usually 5000 to 10000
//! across a circuit. Everything published is in the unit square, rounded to
//! four decimals, with `y` untouched (the frontend flips for SVG).
pub mod error;
pub mod geometry;
pub mod models;
pub mod remote;
pub mod seeds;
pub mod store;

pub use error::TrackError;
pub use geometry::{GeometryConfig, GeometryResult, Point, extract_track_geometry};
pub use models::Track;
pub use remote::OpenF1;
pub use store::TrackStore;
