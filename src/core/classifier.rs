//! Signal classifier: one frame's detections → at most one candidate
//!
//! Priority:
//! - frontal face: smile → smile, no eyes → think, both eyes → neutral,
//!   anything else → no signal
//! - no frontal face but a profile → turned_head
//! - nothing → no signal

use serde::{Deserialize, Serialize};

use crate::types::{Candidate, ExpressionTag, FrameDetections};
use crate::{TAG_NEUTRAL, TAG_SMILE, TAG_THINK, TAG_TURNED_HEAD};

/// Anything that can reduce a frame's detections to a single candidate
pub trait SignalClassifier {
    fn classify(&self, detections: &FrameDetections) -> Candidate;
}

/// Output labels for each classifier outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierLabels {
    pub smile: ExpressionTag,
    pub eyes_closed: ExpressionTag,
    pub eyes_open: ExpressionTag,
    pub profile: ExpressionTag,
}

impl Default for ClassifierLabels {
    fn default() -> Self {
        Self {
            smile: TAG_SMILE.into(),
            eyes_closed: TAG_THINK.into(),
            eyes_open: TAG_NEUTRAL.into(),
            profile: TAG_TURNED_HEAD.into(),
        }
    }
}

impl ClassifierLabels {
    /// All labels this classifier can emit
    pub fn all(&self) -> [&ExpressionTag; 4] {
        [&self.smile, &self.eyes_closed, &self.eyes_open, &self.profile]
    }
}

/// First-match classifier over frontal/profile/smile/eye detections
#[derive(Debug, Clone, Default)]
pub struct PriorityClassifier {
    labels: ClassifierLabels,
}

impl PriorityClassifier {
    /// Create new classifier with the built-in labels
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: ClassifierLabels) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &ClassifierLabels {
        &self.labels
    }
}

impl SignalClassifier for PriorityClassifier {
    fn classify(&self, detections: &FrameDetections) -> Candidate {
        // Feature regions are relative to the primary face
        if detections.primary_face().is_some() {
            if detections.has_smile() {
                Candidate::Tag(self.labels.smile.clone())
            } else if detections.has_no_eyes() {
                Candidate::Tag(self.labels.eyes_closed.clone())
            } else if detections.has_both_eyes() {
                Candidate::Tag(self.labels.eyes_open.clone())
            } else {
                // Exactly one eye visible: ambiguous
                Candidate::NoSignal
            }
        } else if !detections.profile_faces.is_empty() {
            Candidate::Tag(self.labels.profile.clone())
        } else {
            Candidate::NoSignal
        }
    }
}
