// src/export.rs
//! CSV export of position history

use crate::{error::Result, gps::Position};
use std::{fs::File, io::Write, path::Path};

pub const CSV_HEADER: [&str; 4] = ["lat", "lon", "alt", "timestamp"];

/// Write a header followed by one row per position.
///
/// Unknown altitudes become empty fields. Floats use Rust's shortest
/// round-trip formatting, so the same history always yields the same bytes.
pub fn write_csv<W: Write>(writer: W, positions: &[Position]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    csv.write_record(CSV_HEADER)?;
    for pos in positions {
        csv.write_record([
            pos.latitude().to_string(),
            pos.longitude().to_string(),
            pos.altitude().map_or(String::new(), |alt| alt.to_string()),
            pos.timestamp().to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write the positions to it.
pub fn save_csv(path: &Path, positions: &[Position]) -> Result<()> {
    let file = File::create(path)?;
    write_csv(file, positions)
}
