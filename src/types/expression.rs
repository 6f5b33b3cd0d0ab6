//! Expression tags and per-frame candidates

use colored::Color;
use serde::{Deserialize, Serialize};

use crate::{TAG_NEUTRAL, TAG_SMILE, TAG_THINK, TAG_TURNED_HEAD};

/// One member of the configured expression set
///
/// Tags are plain names so the set and its order live in configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionTag(String);

impl ExpressionTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Terminal color for the built-in tags, white otherwise
    pub fn color(&self) -> Color {
        match self.0.as_str() {
            TAG_NEUTRAL => Color::BrightBlack,
            TAG_SMILE => Color::Green,
            TAG_THINK => Color::Yellow,
            TAG_TURNED_HEAD => Color::Cyan,
            _ => Color::White,
        }
    }

    /// Emoji for the built-in tags
    pub fn emoji(&self) -> &'static str {
        match self.0.as_str() {
            TAG_NEUTRAL => "😐",
            TAG_SMILE => "😄",
            TAG_THINK => "🤔",
            TAG_TURNED_HEAD => "↪️",
            _ => "•",
        }
    }
}

impl From<&str> for ExpressionTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ExpressionTag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for ExpressionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One frame's classification output
///
/// Serialized as the tag name, or `null` for no signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<ExpressionTag>", into = "Option<ExpressionTag>")]
pub enum Candidate {
    /// The classifier saw this expression
    Tag(ExpressionTag),
    /// No face or feature was visible this frame
    NoSignal,
}

impl Candidate {
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(ExpressionTag::new(name))
    }

    pub fn as_tag(&self) -> Option<&ExpressionTag> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::NoSignal => None,
        }
    }

    pub fn is_no_signal(&self) -> bool {
        matches!(self, Self::NoSignal)
    }
}

impl From<Option<ExpressionTag>> for Candidate {
    fn from(value: Option<ExpressionTag>) -> Self {
        value.map_or(Self::NoSignal, Self::Tag)
    }
}

impl From<Candidate> for Option<ExpressionTag> {
    fn from(value: Candidate) -> Self {
        match value {
            Candidate::Tag(tag) => Some(tag),
            Candidate::NoSignal => None,
        }
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{}", tag),
            Self::NoSignal => f.write_str("-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_json_is_tag_or_null() {
        let smile = Candidate::tag("smile");
        assert_eq!(serde_json::to_string(&smile).unwrap(), "\"smile\"");
        assert_eq!(serde_json::to_string(&Candidate::NoSignal).unwrap(), "null");

        let back: Candidate = serde_json::from_str("null").unwrap();
        assert!(back.is_no_signal());
        let back: Candidate = serde_json::from_str("\"think\"").unwrap();
        assert_eq!(back.as_tag(), Some(&ExpressionTag::from("think")));
    }

    #[test]
    fn test_unknown_tag_has_fallback_presentation() {
        let tag = ExpressionTag::from("wink");
        assert_eq!(tag.color(), Color::White);
        assert_eq!(tag.emoji(), "•");
        assert_eq!(tag.to_string(), "wink");
    }
}
