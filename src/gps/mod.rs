// src/gps/mod.rs
//! GPS data handling and parsing

pub mod data;
pub mod framing;
pub mod nmea;

pub use data::{GeoPoint, Position};
pub use framing::FrameAssembler;
pub use nmea::SentenceParser;
