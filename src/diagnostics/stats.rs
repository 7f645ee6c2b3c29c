use serde::Serialize;
use std::time::Instant;

use crate::capture::bridge::FrameKind;

/// Collects delivery statistics for one capture bridge.
pub struct DiagnosticStats {
    preview_frames: u64,
    still_frames: u64,
    drop_count: u64,
    total_bytes: u64,
    start_time: Instant,
    last_timestamp_us: Option<u64>,
    last_drop_reason: Option<String>,
}

/// Snapshot of diagnostic stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSnapshot {
    pub fps: f64,
    pub preview_frames: u64,
    pub still_frames: u64,
    pub drop_count: u64,
    pub drop_rate: f64,
    pub bandwidth_bps: u64,
    pub last_timestamp_us: Option<u64>,
    pub last_drop_reason: Option<String>,
}

impl DiagnosticStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            preview_frames: 0,
            still_frames: 0,
            drop_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            last_timestamp_us: None,
            last_drop_reason: None,
        }
    }

    /// Record a frame that was built and delivered.
    pub fn record_frame(&mut self, kind: FrameKind, bytes: usize, capture_timestamp_us: u64) {
        match kind {
            FrameKind::Preview => self.preview_frames += 1,
            FrameKind::Still => self.still_frames += 1,
        }
        self.total_bytes += bytes as u64;
        self.last_timestamp_us = Some(capture_timestamp_us);
    }

    /// Record a frame that was rejected.
    pub fn record_drop(&mut self, reason: &str) {
        self.drop_count += 1;
        self.last_drop_reason = Some(reason.to_string());
    }

    /// Total frames delivered, previews and stills together.
    pub fn frame_count(&self) -> u64 {
        self.preview_frames + self.still_frames
    }

    /// Preview frames per second since the stats were created or reset.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.preview_frames as f64 / elapsed
    }

    /// Drop rate as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.frame_count() + self.drop_count;
        if total == 0 {
            return 0.0;
        }
        (self.drop_count as f64 / total as f64) * 100.0
    }

    /// Bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            fps: self.fps(),
            preview_frames: self.preview_frames,
            still_frames: self.still_frames,
            drop_count: self.drop_count,
            drop_rate: self.drop_rate(),
            bandwidth_bps: self.bandwidth_bps(),
            last_timestamp_us: self.last_timestamp_us,
            last_drop_reason: self.last_drop_reason.clone(),
        }
    }
}

impl Default for DiagnosticStats {
    fn default() -> Self {
        Self::new()
    }
}
