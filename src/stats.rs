// src/stats.rs
//! Counters kept by the reader task

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct TrackerStats {
    lines: AtomicU64,
    fixes: AtomicU64,
    skipped: AtomicU64,
    rejected: AtomicU64,
    oversized: AtomicU64,
    callback_failures: AtomicU64,
}

/// Point-in-time copy of [`TrackerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Complete lines handed to the parser
    pub lines: u64,
    pub fixes: u64,
    /// Well-formed sentences of a type we do not decode
    pub skipped: u64,
    /// Checksum failures, malformed fields, no-fix reports
    pub rejected: u64,
    /// Frames dropped for running past the maximum sentence length
    pub oversized: u64,
    pub callback_failures: u64,
}

impl TrackerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_line(&self) {
        self.lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fix(&self) {
        self.fixes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self, count: u64) {
        self.oversized.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_callback_failure(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines: self.lines.load(Ordering::Relaxed),
            fixes: self.fixes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            oversized: self.oversized.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
        }
    }
}
