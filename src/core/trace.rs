//! Trace scripts: replayable candidate streams
//!
//! One entry per line:
//!
//! ```text
//!   smile          one frame of `smile`
//!   smile x6       six frames (`smile*6` also works)
//!   -              one frame with no signal (`none`, `no_signal` too)
//!   # comment      ignored, as are blank lines
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::EngineConfig;
use crate::types::{Candidate, ExpressionTag};
use crate::{Result, StabilityError};

/// Largest repeat count accepted on one line
pub const MAX_TRACE_REPEAT: usize = 100_000;

lazy_static! {
    static ref RE_ENTRY: Regex = Regex::new(
        r"^(?P<tag>-|[A-Za-z_][A-Za-z0-9_\-]*)(?:(?:\s+[xX]|\s*\*)\s*(?P<n>\d+))?$"
    ).unwrap();
}

/// Parser for trace scripts
#[derive(Debug, Default)]
pub struct TraceParser;

impl TraceParser {
    /// Create new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a whole script into one candidate per frame
    pub fn parse(&self, text: &str) -> Result<Vec<Candidate>> {
        let mut frames = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if let Some((candidate, repeat)) = self.parse_line(line, i + 1)? {
                frames.extend(std::iter::repeat(candidate).take(repeat));
            }
        }
        Ok(frames)
    }

    /// Parse and check every tag against a configuration
    pub fn parse_for(&self, text: &str, config: &EngineConfig) -> Result<Vec<Candidate>> {
        for (i, line) in text.lines().enumerate() {
            if let Some((Candidate::Tag(tag), _)) = self.parse_line(line, i + 1)? {
                if !config.knows(&tag) {
                    return Err(StabilityError::InvalidTrace {
                        line: i + 1,
                        reason: format!("unknown tag '{}'", tag),
                    });
                }
            }
        }
        self.parse(text)
    }

    /// Parse one line; `None` for blank lines and comments
    pub fn parse_line(&self, line: &str, line_no: usize) -> Result<Option<(Candidate, usize)>> {
        let entry = line.split('#').next().unwrap_or("").trim();
        if entry.is_empty() {
            return Ok(None);
        }

        let caps = RE_ENTRY.captures(entry).ok_or_else(|| StabilityError::InvalidTrace {
            line: line_no,
            reason: format!("cannot parse '{}'", entry),
        })?;

        let repeat = match caps.name("n") {
            Some(n) => n
                .as_str()
                .parse::<usize>()
                .ok()
                .filter(|count| (1..=MAX_TRACE_REPEAT).contains(count))
                .ok_or_else(|| StabilityError::InvalidTrace {
                    line: line_no,
                    reason: format!("repeat must be 1..={}, got '{}'", MAX_TRACE_REPEAT, n.as_str()),
                })?,
            None => 1,
        };

        Ok(Some((candidate_from_name(&caps["tag"]), repeat)))
    }
}

/// Map a name to a candidate, honoring the no-signal spellings
pub fn candidate_from_name(name: &str) -> Candidate {
    let name = name.trim();
    if name == "-" || name.eq_ignore_ascii_case("none") || name.eq_ignore_ascii_case("no_signal") {
        Candidate::NoSignal
    } else {
        Candidate::Tag(ExpressionTag::from(name))
    }
}
