//! Facestate: temporal stabilizer for avatar expressions
//!
//! Per-frame detections → SignalClassifier → StabilityEngine → confirmed state
//! → asset lookup by the caller.

pub mod core;
pub mod error;
pub mod types;

pub use error::{Result, StabilityError};

// =============================================================================
// DEFAULT TAGS
// =============================================================================

pub const TAG_NEUTRAL: &str = "neutral";
pub const TAG_SMILE: &str = "smile";
pub const TAG_THINK: &str = "think";
pub const TAG_TURNED_HEAD: &str = "turned_head";

/// Known tag set, in asset order
pub const DEFAULT_TAGS: [&str; 4] = [TAG_NEUTRAL, TAG_SMILE, TAG_THINK, TAG_TURNED_HEAD];

/// Commit-scan order: first tag above its threshold wins
pub const DEFAULT_PRIORITY: [&str; 4] = [TAG_SMILE, TAG_THINK, TAG_TURNED_HEAD, TAG_NEUTRAL];

/// State shown before any expression has been confirmed
pub const DEFAULT_INITIAL_STATE: &str = TAG_NEUTRAL;

// =============================================================================
// CONFIRMATION THRESHOLDS - consecutive frames that must be strictly exceeded
// =============================================================================

pub const THRESHOLD_SMILE: u32 = 5;
pub const THRESHOLD_THINK: u32 = 3;
pub const THRESHOLD_TURNED_HEAD: u32 = 6;
pub const THRESHOLD_NEUTRAL: u32 = 2;

// =============================================================================
// PIPELINE / ASSETS
// =============================================================================

/// Frames buffered between capture and processing
pub const PIPELINE_QUEUE_CAPACITY: usize = 32;

/// Asset file extension used when none is given
pub const DEFAULT_ASSET_EXT: &str = "png";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
