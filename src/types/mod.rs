//! Core types for facestate

mod detections;
mod expression;
mod output;
mod reason;
mod report;

pub use detections::{FrameDetections, Region};
pub use expression::{Candidate, ExpressionTag};
pub use output::{CounterValue, StateOutput};
pub use reason::ReasonCode;
pub use report::{SessionReport, Transition};
