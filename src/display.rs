// src/display.rs
//! Terminal output for fixes and run summaries

use crate::{error::Result, geofence::Geofence, gps::Position, stats::StatsSnapshot};
use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct FixRecord<'a> {
    #[serde(flatten)]
    position: &'a Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    inside: Option<bool>,
}

/// Prints one line per fix, coloured or as JSON.
#[derive(Debug, Clone)]
pub struct FixPrinter {
    json: bool,
    geofence: Option<Geofence>,
}

impl FixPrinter {
    pub fn new(json: bool, geofence: Option<Geofence>) -> Self {
        Self { json, geofence }
    }

    pub fn print(&self, out: &mut impl Write, position: &Position) -> Result<()> {
        let inside = self.geofence.map(|fence| fence.contains(position.point()));

        if self.json {
            let record = FixRecord { position, inside };
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
            return Ok(out.flush()?);
        }

        let time = position
            .datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| position.timestamp().to_string());
        let altitude = position
            .altitude()
            .map_or("-".to_string(), |alt| format!("{:.1} m", alt));

        queue!(
            out,
            SetForegroundColor(Color::Cyan),
            Print(format!("[{}] ", time)),
            ResetColor,
            Print(format!(
                "{:>11.6} {:>12.6}  alt {:>9}",
                position.latitude(),
                position.longitude(),
                altitude
            )),
        )?;

        match inside {
            Some(true) => queue!(out, SetForegroundColor(Color::Green), Print("  INSIDE"), ResetColor)?,
            Some(false) => queue!(out, SetForegroundColor(Color::Red), Print("  OUTSIDE"), ResetColor)?,
            None => {}
        }

        queue!(out, Print("\n"))?;
        Ok(out.flush()?)
    }
}

/// Counters printed when the tracker shuts down
pub fn print_summary(out: &mut impl Write, stats: &StatsSnapshot) -> Result<()> {
    queue!(
        out,
        SetForegroundColor(Color::Green),
        Print("=".repeat(40)),
        Print("\nGPS Tracker session summary\n"),
        Print("=".repeat(40)),
        Print("\n"),
        ResetColor
    )?;

    for (label, value) in [
        ("Lines read", stats.lines),
        ("Fixes", stats.fixes),
        ("Skipped sentences", stats.skipped),
        ("Rejected sentences", stats.rejected),
        ("Oversized frames", stats.oversized),
        ("Callback failures", stats.callback_failures),
    ] {
        queue!(out, Print(format!("{:<20}{:>10}\n", label, value)))?;
    }

    Ok(out.flush()?)
}
