//! Raw detector output for one frame

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding region in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }
}

/// Everything the detectors found in one frame
///
/// Smile and eye regions are searched inside the primary frontal face, so
/// they are only meaningful when `frontal_faces` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameDetections {
    pub frontal_faces: Vec<Region>,
    pub profile_faces: Vec<Region>,
    pub smiles: Vec<Region>,
    pub left_eyes: Vec<Region>,
    pub right_eyes: Vec<Region>,
}

impl FrameDetections {
    /// Empty frame: nothing detected
    pub fn empty() -> Self {
        Self::default()
    }

    /// Largest frontal face by area
    ///
    /// The detector runs its smile and eye searches inside this face, so the
    /// feature lists already belong to it; classification only needs to know
    /// that a frontal face exists.
    pub fn primary_face(&self) -> Option<&Region> {
        // max_by_key keeps the last maximum; rev() keeps the first on ties
        self.frontal_faces.iter().rev().max_by_key(|r| r.area())
    }

    pub fn has_smile(&self) -> bool {
        !self.smiles.is_empty()
    }

    pub fn has_no_eyes(&self) -> bool {
        self.left_eyes.is_empty() && self.right_eyes.is_empty()
    }

    pub fn has_both_eyes(&self) -> bool {
        !self.left_eyes.is_empty() && !self.right_eyes.is_empty()
    }
}
