//! Reason codes explaining each frame's outcome

use serde::{Deserialize, Serialize};

/// Why the engine produced the state it did on a given frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R001: Dropout
    // =========================================================================
    /// No signal this frame, counters and state held
    R001_NO_SIGNAL_HOLD,

    // =========================================================================
    // R002: Agreement
    // =========================================================================
    /// Evidence matches the confirmed state
    R002_STATE_HELD,

    // =========================================================================
    // R003: Streaks
    // =========================================================================
    /// A different tag is building toward its threshold
    R003_STREAK_ACCUMULATING,
    /// This candidate zeroed another tag's streak
    R003_STREAK_RESET,

    // =========================================================================
    // R005: Transitions
    // =========================================================================
    /// Confirmed state changed this frame
    R005_TRANSITION_CONFIRMED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R001_NO_SIGNAL_HOLD => "R001_NO_SIGNAL_HOLD",
            Self::R002_STATE_HELD => "R002_STATE_HELD",
            Self::R003_STREAK_ACCUMULATING => "R003_STREAK_ACCUMULATING",
            Self::R003_STREAK_RESET => "R003_STREAK_RESET",
            Self::R005_TRANSITION_CONFIRMED => "R005_TRANSITION_CONFIRMED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R001_NO_SIGNAL_HOLD => "No signal - holding last state",
            Self::R002_STATE_HELD => "Evidence agrees with current state",
            Self::R003_STREAK_ACCUMULATING => "Building evidence for a new state",
            Self::R003_STREAK_RESET => "Competing streak discarded",
            Self::R005_TRANSITION_CONFIRMED => "New state confirmed",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
