//! Stability Engine: debounced expression state machine
//!
//! Per frame:
//! - NoSignal: counters untouched (hold last known state)
//! - Tag T: counters[T] += 1, every other counter → 0
//! - Commit scan in priority order: first tag with counter > threshold wins,
//!   otherwise the confirmed state is unchanged

use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::EngineConfig;
use crate::types::{Candidate, CounterValue, ExpressionTag, ReasonCode, StateOutput};
use crate::{Result, StabilityError};

/// Debounce state machine owning counters and the confirmed state
#[derive(Debug, Clone)]
pub struct StabilityEngine {
    /// Validated configuration
    config: EngineConfig,
    /// Known tags, dense index order
    tags: Vec<ExpressionTag>,
    /// Tag → dense index
    index: HashMap<ExpressionTag, usize>,
    /// Threshold per dense index
    thresholds: Vec<u32>,
    /// Commit-scan order as dense indices
    priority: Vec<usize>,
    /// Consecutive-evidence counters per dense index
    counters: Vec<u64>,
    /// Confirmed state (dense index)
    current: usize,
    /// Frames ingested
    frame_count: u64,
    /// Frames with no signal
    no_signal_count: u64,
    /// Last frame's candidate, state before it and reason, for current_output()
    last_candidate: Candidate,
    last_previous: usize,
    last_reason: ReasonCode,
}

impl StabilityEngine {
    /// Create new engine; fails if the configuration is invalid
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let tags = config.tags.clone();
        let index: HashMap<ExpressionTag, usize> =
            tags.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();

        let thresholds = tags
            .iter()
            .map(|t| {
                u32::try_from(config.thresholds[t])
                    .map_err(|_| StabilityError::config(format!("threshold for '{}' out of range", t)))
            })
            .collect::<Result<Vec<u32>>>()?;

        let priority = config.priority.iter().map(|t| index[t]).collect();
        let current = index[&config.initial_state];

        debug!(tags = tags.len(), initial = %config.initial_state, "stability engine created");

        Ok(Self {
            counters: vec![0; tags.len()],
            config,
            tags,
            index,
            thresholds,
            priority,
            current,
            frame_count: 0,
            no_signal_count: 0,
            last_candidate: Candidate::NoSignal,
            last_previous: current,
            last_reason: ReasonCode::R001_NO_SIGNAL_HOLD,
        })
    }

    /// Engine with the built-in tuning
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default()).expect("default configuration is valid")
    }

    /// Ingest one candidate and return the confirmed state
    pub fn ingest(&mut self, candidate: &Candidate) -> Result<ExpressionTag> {
        self.update(candidate).map(|output| output.state)
    }

    /// Ingest one candidate and return the full per-frame record
    ///
    /// An unknown tag is rejected before any state is touched.
    pub fn update(&mut self, candidate: &Candidate) -> Result<StateOutput> {
        let observed = match candidate {
            Candidate::Tag(tag) => Some(self.resolve(tag)?),
            Candidate::NoSignal => None,
        };

        let previous = self.current;
        // Did this frame end another tag's streak?
        let mut broken = false;

        match observed {
            Some(t) => {
                for (i, count) in self.counters.iter_mut().enumerate() {
                    if i == t {
                        *count = count.saturating_add(1);
                    } else {
                        broken |= *count > 0;
                        *count = 0;
                    }
                }
            }
            None => self.no_signal_count += 1,
        }

        if let Some(winner) = self.commit_scan() {
            self.current = winner;
        }

        self.frame_count += 1;

        let reason = if self.current != previous {
            ReasonCode::R005_TRANSITION_CONFIRMED
        } else {
            match observed {
                None => ReasonCode::R001_NO_SIGNAL_HOLD,
                Some(_) if broken => ReasonCode::R003_STREAK_RESET,
                Some(t) if t == self.current => ReasonCode::R002_STATE_HELD,
                Some(_) => ReasonCode::R003_STREAK_ACCUMULATING,
            }
        };

        if self.current != previous {
            info!(
                frame = self.frame_count,
                from = %self.tags[previous],
                to = %self.tags[self.current],
                "expression confirmed"
            );
        } else {
            debug!(frame = self.frame_count, candidate = %candidate, reason = reason.code(), "frame ingested");
        }

        self.last_candidate = candidate.clone();
        self.last_previous = previous;
        self.last_reason = reason;

        Ok(StateOutput::new(
            self.frame_count,
            candidate.clone(),
            self.tags[previous].clone(),
            self.tags[self.current].clone(),
            reason,
            self.counter_values(),
        ))
    }

    /// First tag in priority order whose counter strictly exceeds its threshold
    fn commit_scan(&self) -> Option<usize> {
        self.priority
            .iter()
            .copied()
            .find(|&i| self.counters[i] > u64::from(self.thresholds[i]))
    }

    fn resolve(&self, tag: &ExpressionTag) -> Result<usize> {
        self.index
            .get(tag)
            .copied()
            .ok_or_else(|| StabilityError::InvalidInput { tag: tag.clone() })
    }

    /// Overwrite counters, e.g. to restore a session
    ///
    /// All tags are checked first; on error nothing changes. The confirmed
    /// state is only re-evaluated on the next ingested frame.
    pub fn seed_counters(&mut self, values: &[(ExpressionTag, u64)]) -> Result<()> {
        let resolved = values
            .iter()
            .map(|(tag, n)| self.resolve(tag).map(|i| (i, *n)))
            .collect::<Result<Vec<_>>>()?;
        for (i, n) in resolved {
            self.counters[i] = n;
        }
        Ok(())
    }

    /// Get confirmed state
    pub fn state(&self) -> &ExpressionTag {
        &self.tags[self.current]
    }

    /// Counter for one tag, None if unknown
    pub fn counter(&self, tag: &ExpressionTag) -> Option<u64> {
        self.index.get(tag).map(|&i| self.counters[i])
    }

    /// Counters in known-tag order
    pub fn counters(&self) -> Vec<(ExpressionTag, u64)> {
        self.tags.iter().cloned().zip(self.counters.iter().copied()).collect()
    }

    /// Get frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames that carried no signal
    pub fn no_signal_count(&self) -> u64 {
        self.no_signal_count
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Known tags in configured order
    pub fn tags(&self) -> &[ExpressionTag] {
        &self.tags
    }

    fn counter_values(&self) -> Vec<CounterValue> {
        self.tags
            .iter()
            .zip(self.counters.iter().zip(&self.thresholds))
            .map(|(tag, (&count, &threshold))| CounterValue {
                tag: tag.clone(),
                count,
                threshold,
            })
            .collect()
    }

    /// Get current output without ingesting
    ///
    /// Repeats the last frame's record (fresh timestamp, current counters).
    pub fn current_output(&self) -> StateOutput {
        StateOutput::new(
            self.frame_count,
            self.last_candidate.clone(),
            self.tags[self.last_previous].clone(),
            self.state().clone(),
            self.last_reason,
            self.counter_values(),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> ExpressionTag {
        ExpressionTag::from(name)
    }

    fn feed(engine: &mut StabilityEngine, name: &str, times: usize) -> ExpressionTag {
        let mut last = engine.state().clone();
        for _ in 0..times {
            last = engine.ingest(&Candidate::tag(name)).unwrap();
        }
        last
    }

    #[test]
    fn test_initial_state_is_configured_default() {
        let engine = StabilityEngine::with_defaults();
        assert_eq!(engine.state(), &tag("neutral"));
        assert!(engine.counters().iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_threshold_must_be_strictly_exceeded() {
        let mut engine = StabilityEngine::with_defaults();
        assert_eq!(feed(&mut engine, "smile", 5), tag("neutral"));
        assert_eq!(engine.counter(&tag("smile")), Some(5));

        let output = engine.update(&Candidate::tag("smile")).unwrap();
        assert_eq!(output.state, tag("smile"));
        assert!(output.changed);
        assert_eq!(output.reason, ReasonCode::R005_TRANSITION_CONFIRMED);
    }

    #[test]
    fn test_mismatch_resets_other_counters() {
        let mut engine = StabilityEngine::with_defaults();
        feed(&mut engine, "smile", 4);

        let output = engine.update(&Candidate::tag("think")).unwrap();
        assert_eq!(output.reason, ReasonCode::R003_STREAK_RESET);
        assert_eq!(engine.counter(&tag("smile")), Some(0));
        assert_eq!(engine.counter(&tag("think")), Some(1));
    }

    #[test]
    fn test_no_signal_leaves_counters_alone() {
        let mut engine = StabilityEngine::with_defaults();
        feed(&mut engine, "think", 2);

        let output = engine.update(&Candidate::NoSignal).unwrap();
        assert_eq!(output.reason, ReasonCode::R001_NO_SIGNAL_HOLD);
        assert_eq!(output.count_of(&tag("think")), 2);
        assert_eq!(engine.no_signal_count(), 1);
        assert_eq!(engine.frame_count(), 3);
    }

    #[test]
    fn test_unknown_tag_rejected_without_mutation() {
        let mut engine = StabilityEngine::with_defaults();
        feed(&mut engine, "smile", 3);
        let before = engine.counters();
        let frames = engine.frame_count();

        let err = engine.ingest(&Candidate::tag("wink")).unwrap_err();
        assert!(matches!(err, StabilityError::InvalidInput { ref tag } if tag.as_str() == "wink"));
        assert_eq!(engine.counters(), before);
        assert_eq!(engine.frame_count(), frames);
        assert_eq!(engine.state(), &tag("neutral"));
    }

    #[test]
    fn test_priority_beats_longest_streak() {
        let mut engine = StabilityEngine::with_defaults();
        engine
            .seed_counters(&[(tag("neutral"), 50), (tag("think"), 4)])
            .unwrap();

        // think precedes neutral in the scan even though neutral's streak is longer
        assert_eq!(engine.ingest(&Candidate::NoSignal).unwrap(), tag("think"));
    }

    #[test]
    fn test_seed_is_all_or_nothing() {
        let mut engine = StabilityEngine::with_defaults();
        let result = engine.seed_counters(&[(tag("smile"), 9), (tag("wink"), 1)]);
        assert!(result.is_err());
        assert_eq!(engine.counter(&tag("smile")), Some(0));
    }

    #[test]
    fn test_agreeing_evidence_reports_held() {
        let mut engine = StabilityEngine::with_defaults();
        let output = engine.update(&Candidate::tag("neutral")).unwrap();
        assert_eq!(output.reason, ReasonCode::R002_STATE_HELD);
        assert!(!output.changed);

        let output = engine.update(&Candidate::tag("neutral")).unwrap();
        assert_eq!(output.reason, ReasonCode::R002_STATE_HELD);
    }

    #[test]
    fn test_accumulating_reason_while_building() {
        let mut engine = StabilityEngine::with_defaults();
        let output = engine.update(&Candidate::tag("turned_head")).unwrap();
        assert_eq!(output.reason, ReasonCode::R003_STREAK_ACCUMULATING);
        assert_eq!(output.counters_string(), "neutral=0/2 smile=0/5 think=0/3 turned_head=1/6");
    }

    #[test]
    fn test_counter_saturates() {
        let mut engine = StabilityEngine::with_defaults();
        engine.seed_counters(&[(tag("smile"), u64::MAX)]).unwrap();
        engine.ingest(&Candidate::tag("smile")).unwrap();
        assert_eq!(engine.counter(&tag("smile")), Some(u64::MAX));
        assert_eq!(engine.state(), &tag("smile"));
    }

    #[test]
    fn test_invalid_config_produces_no_engine() {
        let config = EngineConfig::default().with_threshold("think", 0);
        assert!(matches!(
            StabilityEngine::new(config),
            Err(StabilityError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_current_output_does_not_ingest() {
        let mut engine = StabilityEngine::with_defaults();
        feed(&mut engine, "think", 4);
        let output = engine.current_output();
        assert_eq!(output.state, tag("think"));
        assert_eq!(output.frame, 4);
        assert_eq!(engine.frame_count(), 4);
    }

    #[test]
    fn test_current_output_repeats_last_frame() {
        let mut engine = StabilityEngine::with_defaults();
        feed(&mut engine, "think", 3);

        let confirmed = engine.update(&Candidate::tag("think")).unwrap();
        let again = engine.current_output();
        assert_eq!(again.reason, ReasonCode::R005_TRANSITION_CONFIRMED);
        assert_eq!(again.previous, confirmed.previous);
        assert!(again.changed);

        let reset = engine.update(&Candidate::tag("smile")).unwrap();
        assert_eq!(reset.reason, ReasonCode::R003_STREAK_RESET);
        assert_eq!(engine.current_output().reason, ReasonCode::R003_STREAK_RESET);
        assert!(!engine.current_output().changed);
    }

    #[test]
    fn test_current_output_before_any_frame() {
        let engine = StabilityEngine::with_defaults();
        let output = engine.current_output();
        assert_eq!(output.frame, 0);
        assert_eq!(output.candidate, Candidate::NoSignal);
        assert!(!output.changed);
    }
}
