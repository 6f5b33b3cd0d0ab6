//! Per-frame output records

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{Candidate, ExpressionTag, ReasonCode};

/// Counter value for one tag at the end of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterValue {
    pub tag: ExpressionTag,
    pub count: u64,
    pub threshold: u32,
}

/// Output structure for each ingested frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateOutput {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// 1-based frame number within the session
    pub frame: u64,
    /// What the classifier reported
    pub candidate: Candidate,
    /// Confirmed state after this frame
    pub state: ExpressionTag,
    /// Confirmed state before this frame
    pub previous: ExpressionTag,
    /// Did the confirmed state change?
    pub changed: bool,
    /// Reason for the outcome
    pub reason: ReasonCode,
    /// Counters in known-tag order
    pub counters: Vec<CounterValue>,
}

impl StateOutput {
    /// Create new output
    pub fn new(
        frame: u64,
        candidate: Candidate,
        previous: ExpressionTag,
        state: ExpressionTag,
        reason: ReasonCode,
        counters: Vec<CounterValue>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            frame,
            candidate,
            changed: previous != state,
            state,
            previous,
            reason,
            counters,
        }
    }

    /// Streak for the given tag, 0 if unknown
    pub fn count_of(&self, tag: &ExpressionTag) -> u64 {
        self.counters
            .iter()
            .find(|c| &c.tag == tag)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = format!(
            "{} #{} in={} | state={} | {}",
            self.state.emoji(),
            self.frame,
            self.candidate,
            self.state,
            self.reason.code()
        );
        let line = line.color(self.state.color());
        if self.changed {
            line.bold().to_string()
        } else {
            line.to_string()
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "frame={} | in={} | state={} | changed={} | reason={}",
            self.frame,
            self.candidate,
            self.state,
            self.changed,
            self.reason.code()
        )
    }

    /// Counter breakdown, e.g. `smile=3/5 think=0/3`
    pub fn counters_string(&self) -> String {
        self.counters
            .iter()
            .map(|c| format!("{}={}/{}", c.tag, c.count, c.threshold))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
