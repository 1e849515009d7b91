// src/error.rs
//! Error types for the GPS tracker

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GpsError>;

#[derive(Debug, Error)]
pub enum GpsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The reader lost its transport (read error or end of stream).
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid geofence region: {0}")]
    InvalidRegion(String),

    #[error("Tracker is already running")]
    AlreadyRunning,

    #[error("Tracker is still stopping its previous reader")]
    Stopping,

    #[error("Tracker was never started")]
    NotStarted,

    #[error("No tokio runtime available to run the reader task")]
    NoRuntime,

    #[error("Error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for GpsError {
    fn from(error: anyhow::Error) -> Self {
        GpsError::Other(error.to_string())
    }
}

/// Why a single candidate line did not produce a position.
///
/// None of these are fatal: the reader logs them and moves on to the next line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("malformed sentence: {0}")]
    Malformed(&'static str),

    #[error("checksum mismatch: sentence says {expected:02X}, payload gives {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("unsupported sentence type {0}")]
    Unsupported(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("malformed field: {0}")]
    MalformedField(&'static str),

    #[error("coordinates out of range")]
    OutOfRange,

    #[error("receiver reports no fix")]
    NoFix,
}

impl Rejection {
    /// Sentence types we do not decode are an ordinary part of the stream.
    pub fn is_silent(&self) -> bool {
        matches!(self, Rejection::Unsupported(_))
    }
}
