//! Engine configuration: known tags, thresholds, priority and initial state
//!
//! Loaded from JSON or built from the defaults in the crate root. Validation
//! happens once, before an engine exists.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::ExpressionTag;
use crate::{
    Result, StabilityError, DEFAULT_INITIAL_STATE, DEFAULT_PRIORITY, DEFAULT_TAGS, TAG_NEUTRAL,
    TAG_SMILE, TAG_THINK, TAG_TURNED_HEAD, THRESHOLD_NEUTRAL, THRESHOLD_SMILE, THRESHOLD_THINK,
    THRESHOLD_TURNED_HEAD,
};

/// Configuration surface of the stability engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Known tag set, in display order
    pub tags: Vec<ExpressionTag>,
    /// Consecutive frames each tag must strictly exceed
    ///
    /// Signed so that zero and negative values in a file are reported as
    /// configuration errors instead of parse errors.
    pub thresholds: BTreeMap<ExpressionTag, i64>,
    /// Commit-scan order
    pub priority: Vec<ExpressionTag>,
    /// State before anything is confirmed
    pub initial_state: ExpressionTag,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let thresholds = [
            (TAG_SMILE, THRESHOLD_SMILE),
            (TAG_THINK, THRESHOLD_THINK),
            (TAG_TURNED_HEAD, THRESHOLD_TURNED_HEAD),
            (TAG_NEUTRAL, THRESHOLD_NEUTRAL),
        ]
        .into_iter()
        .map(|(tag, n)| (ExpressionTag::from(tag), i64::from(n)))
        .collect();

        Self {
            tags: DEFAULT_TAGS.iter().map(|t| ExpressionTag::from(*t)).collect(),
            thresholds,
            priority: DEFAULT_PRIORITY.iter().map(|t| ExpressionTag::from(*t)).collect(),
            initial_state: ExpressionTag::from(DEFAULT_INITIAL_STATE),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder: replace one tag's threshold
    pub fn with_threshold(mut self, tag: impl Into<ExpressionTag>, frames: i64) -> Self {
        self.thresholds.insert(tag.into(), frames);
        self
    }

    /// Builder: replace the priority order
    pub fn with_priority<T: Into<ExpressionTag>>(mut self, order: impl IntoIterator<Item = T>) -> Self {
        self.priority = order.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: replace the initial state
    pub fn with_initial_state(mut self, tag: impl Into<ExpressionTag>) -> Self {
        self.initial_state = tag.into();
        self
    }

    /// Is this tag part of the known set?
    pub fn knows(&self, tag: &ExpressionTag) -> bool {
        self.tags.contains(tag)
    }

    /// Check every structural rule; the first violation is reported
    pub fn validate(&self) -> Result<()> {
        if self.tags.is_empty() {
            return Err(StabilityError::config("tag set is empty"));
        }

        let mut known = HashSet::with_capacity(self.tags.len());
        for tag in &self.tags {
            if !known.insert(tag) {
                return Err(StabilityError::config(format!("duplicate tag '{}'", tag)));
            }
        }

        for tag in &self.tags {
            match self.thresholds.get(tag) {
                None => {
                    return Err(StabilityError::config(format!("no threshold for tag '{}'", tag)));
                }
                Some(&n) if n <= 0 => {
                    return Err(StabilityError::config(format!(
                        "threshold for '{}' must be positive, got {}",
                        tag, n
                    )));
                }
                Some(&n) if n > i64::from(u32::MAX) => {
                    return Err(StabilityError::config(format!(
                        "threshold for '{}' is too large: {}",
                        tag, n
                    )));
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = self.thresholds.keys().find(|t| !known.contains(t)) {
            return Err(StabilityError::config(format!(
                "threshold given for unknown tag '{}'",
                extra
            )));
        }

        let mut seen = HashSet::with_capacity(self.priority.len());
        for tag in &self.priority {
            if !known.contains(tag) {
                return Err(StabilityError::config(format!("priority names unknown tag '{}'", tag)));
            }
            if !seen.insert(tag) {
                return Err(StabilityError::config(format!("priority repeats tag '{}'", tag)));
            }
        }
        if seen.len() != known.len() {
            let missing: Vec<&str> = self
                .tags
                .iter()
                .filter(|t| !seen.contains(t))
                .map(|t| t.as_str())
                .collect();
            return Err(StabilityError::config(format!(
                "priority is missing tags: {}",
                missing.join(", ")
            )));
        }

        if !known.contains(&self.initial_state) {
            return Err(StabilityError::config(format!(
                "initial state '{}' is not a known tag",
                self.initial_state
            )));
        }

        Ok(())
    }
}
