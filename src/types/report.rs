//! Session report types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::ExpressionTag;

/// One confirmed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Frame on which the new state was confirmed
    pub frame: u64,
    pub from: ExpressionTag,
    pub to: ExpressionTag,
}

/// Summary of a frame-processing session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Report ID: rep_<timestamp>_<digest prefix>
    pub id: String,
    /// Unix timestamp (seconds)
    pub timestamp_unix: i64,
    /// Frames ingested
    pub frames: u64,
    /// Frames where the classifier reported nothing
    pub no_signal_frames: u64,
    /// Frames spent in each confirmed state
    pub frames_per_state: BTreeMap<ExpressionTag, u64>,
    /// Every confirmed change, in order
    pub transitions: Vec<Transition>,
    /// State when the session ended
    pub final_state: ExpressionTag,
    /// SHA-256 over the confirmed-state sequence (hex)
    pub trace_digest: String,
}

impl SessionReport {
    /// Share of frames with no signal (0.0-1.0)
    pub fn dropout_ratio(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.no_signal_frames as f64 / self.frames as f64
    }
}
