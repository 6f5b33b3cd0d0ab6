//! Session reports: what the engine confirmed over a run
//!
//! The digest covers the confirmed state of every frame in order, so two runs
//! over the same input and configuration produce the same digest.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::types::{ExpressionTag, SessionReport, StateOutput, Transition};
use crate::Result;

/// Accumulates per-frame outputs into a SessionReport
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    frames: u64,
    no_signal_frames: u64,
    frames_per_state: BTreeMap<ExpressionTag, u64>,
    transitions: Vec<Transition>,
    final_state: ExpressionTag,
    hasher: Sha256,
}

impl ReportBuilder {
    /// Start a report for a session beginning in `initial`
    pub fn new(initial: ExpressionTag) -> Self {
        Self {
            frames: 0,
            no_signal_frames: 0,
            frames_per_state: BTreeMap::new(),
            transitions: Vec::new(),
            final_state: initial,
            hasher: Sha256::new(),
        }
    }

    /// Record one frame
    pub fn record(&mut self, output: &StateOutput) {
        self.frames += 1;
        if output.candidate.is_no_signal() {
            self.no_signal_frames += 1;
        }
        *self.frames_per_state.entry(output.state.clone()).or_insert(0) += 1;
        if output.changed {
            self.transitions.push(Transition {
                frame: output.frame,
                from: output.previous.clone(),
                to: output.state.clone(),
            });
        }
        self.hasher.update(output.state.as_str().as_bytes());
        self.hasher.update(b"\n");
        self.final_state = output.state.clone();
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Hex digest of the confirmed-state sequence so far
    pub fn trace_digest(&self) -> String {
        let digest: [u8; 32] = self.hasher.clone().finalize().into();
        to_hex(&digest)
    }

    /// Build the report
    pub fn finish(&self) -> SessionReport {
        let trace_digest = self.trace_digest();
        let now = chrono::Utc::now();
        SessionReport {
            id: format!("rep_{}_{}", now.format("%Y%m%d_%H%M%S"), &trace_digest[..8]),
            timestamp_unix: now.timestamp(),
            frames: self.frames,
            no_signal_frames: self.no_signal_frames,
            frames_per_state: self.frames_per_state.clone(),
            transitions: self.transitions.clone(),
            final_state: self.final_state.clone(),
            trace_digest,
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Save report to `<dir>/<id>.json`, returning the path
pub fn save_report(report: &SessionReport, dir: impl AsRef<Path>) -> Result<String> {
    let dir = dir.as_ref();
    let json = serde_json::to_string_pretty(report)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", report.id));
    std::fs::write(&path, json)?;
    Ok(path.display().to_string())
}

/// Load report from JSON file
pub fn load_report(path: impl AsRef<Path>) -> Result<SessionReport> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
