//! Integration tests for the stability engine
//!
//! Debounce, reset-on-mismatch, hold-on-dropout, priority tie-break and the
//! tuned default scenario.

use facestate::core::{EngineConfig, ReportBuilder, StabilityEngine, TraceParser};
use facestate::types::{Candidate, ExpressionTag, ReasonCode};
use facestate::StabilityError;
use pretty_assertions::assert_eq;

fn tag(name: &str) -> ExpressionTag {
    ExpressionTag::from(name)
}

fn states(engine: &mut StabilityEngine, frames: &[Candidate]) -> Vec<String> {
    frames
        .iter()
        .map(|c| engine.ingest(c).unwrap().to_string())
        .collect()
}

/// Two-tag engine with a single configurable threshold
fn pair_engine(k: i64) -> StabilityEngine {
    let config = EngineConfig {
        tags: vec![tag("calm"), tag("excited")],
        thresholds: [(tag("calm"), k), (tag("excited"), k)].into_iter().collect(),
        priority: vec![tag("excited"), tag("calm")],
        initial_state: tag("calm"),
    };
    StabilityEngine::new(config).unwrap()
}

// =============================================================================
// CONCRETE SCENARIO
// =============================================================================

#[test]
fn test_default_scenario_smile_then_think() {
    let mut engine = StabilityEngine::with_defaults();

    for i in 1..=5 {
        let state = engine.ingest(&Candidate::tag("smile")).unwrap();
        assert_eq!(state, tag("neutral"), "smile must not confirm on call {}", i);
    }
    assert_eq!(engine.ingest(&Candidate::tag("smile")).unwrap(), tag("smile"));

    assert_eq!(engine.ingest(&Candidate::NoSignal).unwrap(), tag("smile"));

    for i in 1..=3 {
        let state = engine.ingest(&Candidate::tag("think")).unwrap();
        assert_eq!(state, tag("smile"), "think must not confirm on call {}", i);
    }
    assert_eq!(engine.ingest(&Candidate::tag("think")).unwrap(), tag("think"));
}

#[test]
fn test_default_scenario_from_trace_script() {
    let frames = TraceParser::new()
        .parse("smile x6\n-\nthink x4\n")
        .unwrap();
    let mut engine = StabilityEngine::with_defaults();
    let out = states(&mut engine, &frames);

    assert_eq!(
        out,
        vec![
            "neutral", "neutral", "neutral", "neutral", "neutral", "smile", "smile", "smile",
            "smile", "smile", "think",
        ]
    );
}

// =============================================================================
// DEBOUNCE
// =============================================================================

#[test]
fn test_debounce_exactly_k_does_not_confirm() {
    for k in 1..=7 {
        let mut engine = pair_engine(k);
        let frames = vec![Candidate::tag("excited"); k as usize];
        let out = states(&mut engine, &frames);
        assert_eq!(out.last().unwrap(), "calm", "k={}", k);

        assert_eq!(engine.ingest(&Candidate::tag("excited")).unwrap(), tag("excited"), "k={}", k);
    }
}

// =============================================================================
// RESET ON MISMATCH
// =============================================================================

#[test]
fn test_mismatch_restarts_streak_from_zero() {
    let mut engine = StabilityEngine::with_defaults();
    states(&mut engine, &vec![Candidate::tag("turned_head"); 5]);
    assert_eq!(engine.counter(&tag("turned_head")), Some(5));

    engine.ingest(&Candidate::tag("smile")).unwrap();
    assert_eq!(engine.counter(&tag("turned_head")), Some(0));

    // Needs the full 7 again
    let out = states(&mut engine, &vec![Candidate::tag("turned_head"); 6]);
    assert!(out.iter().all(|s| s == "neutral"));
    assert_eq!(engine.ingest(&Candidate::tag("turned_head")).unwrap(), tag("turned_head"));
}

#[test]
fn test_single_frame_flicker_never_changes_state() {
    let mut engine = StabilityEngine::with_defaults();
    let noisy: Vec<Candidate> = ["smile", "think", "smile", "turned_head", "think", "smile"]
        .iter()
        .cycle()
        .take(60)
        .map(|t| Candidate::tag(*t))
        .collect();

    let out = states(&mut engine, &noisy);
    assert!(out.iter().all(|s| s == "neutral"));
}

// =============================================================================
// HOLD ON DROPOUT
// =============================================================================

#[test]
fn test_streak_survives_interleaved_dropout() {
    let mut engine = StabilityEngine::with_defaults();
    let frames = TraceParser::new()
        .parse("think\nthink\n-\nthink\n-\n-\nthink\n")
        .unwrap();
    let out = states(&mut engine, &frames);

    // Confirmed on the 4th think, i.e. the 7th frame
    assert_eq!(out[5], "neutral");
    assert_eq!(out[6], "think");
}

#[test]
fn test_no_signal_never_decreases_counters() {
    let mut engine = StabilityEngine::with_defaults();
    states(&mut engine, &vec![Candidate::tag("smile"); 3]);
    let before = engine.counters();

    for _ in 0..10 {
        let output = engine.update(&Candidate::NoSignal).unwrap();
        assert!(!output.changed);
        assert_eq!(output.reason, ReasonCode::R001_NO_SIGNAL_HOLD);
    }
    assert_eq!(engine.counters(), before);
}

#[test]
fn test_confirmed_state_holds_through_endless_dropout() {
    let mut engine = StabilityEngine::with_defaults();
    states(&mut engine, &vec![Candidate::tag("think"); 4]);
    assert_eq!(engine.state(), &tag("think"));

    let out = states(&mut engine, &vec![Candidate::NoSignal; 1000]);
    assert!(out.iter().all(|s| s == "think"));
}

// =============================================================================
// PRIORITY TIE-BREAK
// =============================================================================

#[test]
fn test_tie_break_follows_priority_not_streak_length() {
    let seeds = vec![(tag("turned_head"), 7), (tag("neutral"), 40), (tag("smile"), 6)];

    let mut results = Vec::new();
    for _ in 0..5 {
        let mut engine = StabilityEngine::with_defaults();
        engine.seed_counters(&seeds).unwrap();
        results.push(engine.ingest(&Candidate::NoSignal).unwrap());
    }
    assert!(results.iter().all(|s| s == &tag("smile")));
}

#[test]
fn test_tie_break_respects_custom_priority() {
    let config = EngineConfig::default().with_priority(["neutral", "turned_head", "think", "smile"]);
    let mut engine = StabilityEngine::new(config).unwrap();
    engine
        .seed_counters(&[(tag("smile"), 9), (tag("turned_head"), 9)])
        .unwrap();

    assert_eq!(engine.ingest(&Candidate::NoSignal).unwrap(), tag("turned_head"));
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_rejected_input_leaves_engine_untouched() {
    let mut engine = StabilityEngine::with_defaults();
    states(&mut engine, &vec![Candidate::tag("smile"); 4]);
    let counters = engine.counters();
    let output = engine.current_output();

    let err = engine.ingest(&Candidate::tag("Smile")).unwrap_err();
    assert!(matches!(err, StabilityError::InvalidInput { .. }));
    assert_eq!(engine.counters(), counters);
    assert_eq!(engine.frame_count(), output.frame);
    assert_eq!(engine.state(), &output.state);
}

#[test]
fn test_construction_fails_on_bad_priority() {
    let config = EngineConfig::default().with_priority(["smile", "think"]);
    let err = StabilityEngine::new(config).unwrap_err();
    assert!(err.to_string().starts_with("Invalid configuration"));
}

// =============================================================================
// REPORTS
// =============================================================================

#[test]
fn test_report_digest_is_reproducible_across_runs() {
    let frames = TraceParser::new()
        .parse("smile x6\n- x3\nthink x2\nneutral x3\n")
        .unwrap();

    let digest = || {
        let mut engine = StabilityEngine::with_defaults();
        let mut report = ReportBuilder::new(engine.state().clone());
        for c in &frames {
            report.record(&engine.update(c).unwrap());
        }
        report.finish()
    };

    let a = digest();
    let b = digest();
    assert_eq!(a.trace_digest, b.trace_digest);
    assert_eq!(a.transitions.len(), 2);
    assert_eq!(a.transitions[1].to, tag("neutral"));
    assert_eq!(a.no_signal_frames, 3);
}
