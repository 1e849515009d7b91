// src/lib.rs
//! GPS Tracker Library
//!
//! Reads NMEA sentences from a serial GPS receiver on a background task and
//! publishes validated fixes through a callback, a bounded history buffer,
//! CSV export and circular geofence checks.

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod geofence;
pub mod gps;
pub mod history;
pub mod logging;
pub mod stats;
pub mod tracker;
pub mod transport;

// Re-export main types for convenience
pub use config::TrackerConfig;
pub use error::{GpsError, Rejection, Result};
pub use geofence::{distance_m, inside_circle, Geofence};
pub use gps::{GeoPoint, Position};
pub use history::PositionStore;
pub use stats::StatsSnapshot;
pub use tracker::{Tracker, TrackerState};
pub use transport::{Connector, SerialConnector};
