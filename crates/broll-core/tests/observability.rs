//! Observability tests for pipeline tracing.
//!
//! These verify that the structured events named in `broll_core::obs` are
//! emitted at the points where the resolver, conflict pass and driver make
//! their decisions.

use std::collections::HashSet;
use std::sync::Arc;

use broll_core::fakes::{FailingRetrieval, ScriptedOracle, ScriptedRetrieval};
use broll_core::metrics::METRICS;
use broll_core::obs::{
    emit_bid_exhausted, emit_pipeline_cancelled, emit_segment_rejected, PipelineSpan,
};
use broll_core::{
    parse_segments, resolve_conflicts, Candidate, Judgment, Pipeline, PipelineConfig,
    RankedCandidate, Segment, SegmentResolver, SegmentResult,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn result(index: usize, cands: &[(&str, f64)]) -> SegmentResult {
    let segment = Segment::new(index, index as f64, index as f64 + 1.0, "t", "").unwrap();
    let ranked = cands
        .iter()
        .map(|(f, s)| RankedCandidate::new(*f, *s, "r"))
        .collect();
    SegmentResult::new(segment, ranked).unwrap()
}

#[traced_test]
#[test]
fn test_pipeline_span_enter_creates_span() {
    let span = PipelineSpan::enter("test-span-run");
    drop(span);
}

#[traced_test]
#[test]
fn test_emit_segment_rejected_logs_warning() {
    emit_segment_rejected(3, &"missing end_time");
    assert!(logs_contain("segment.rejected"));
    assert!(logs_contain("missing end_time"));
}

#[traced_test]
#[test]
fn test_emit_cancelled_names_stage() {
    emit_pipeline_cancelled("run-c", "persist", 4);
    assert!(logs_contain("pipeline.cancelled"));
    assert!(logs_contain("persist"));
}

#[traced_test]
#[test]
fn test_emit_bid_exhausted() {
    emit_bid_exhausted(1, "x.jpg");
    assert!(logs_contain("bid.exhausted"));
}

#[traced_test]
#[test]
fn test_conflict_pass_emits_bid_events() {
    resolve_conflicts(&[
        result(0, &[("x.jpg", 0.9)]),
        result(1, &[("x.jpg", 0.8), ("y.jpg", 0.4)]),
        result(2, &[("x.jpg", 0.7)]),
    ]);
    assert!(logs_contain("bid.confirmed"));
    assert!(logs_contain("bid.fallback"));
    assert!(logs_contain("bid.exhausted"));
}

#[traced_test]
#[tokio::test]
async fn test_resolver_emits_round_and_resolution() {
    let resolver = SegmentResolver::new(
        Arc::new(ScriptedRetrieval::new(vec![vec![Candidate::new("a.jpg", "", 0.5)]])),
        Arc::new(ScriptedOracle::always(Judgment::select("a.jpg", "good fit"))),
    );
    let segment = Segment::new(0, 0.0, 1.0, "text", "ctx").unwrap();
    resolver.resolve(&segment, &HashSet::new()).await;

    assert!(logs_contain("segment.round"));
    assert!(logs_contain("segment.resolved"));
    assert!(logs_contain("SELECT"));
}

#[traced_test]
#[tokio::test]
async fn test_port_failure_logs_warning() {
    let resolver = SegmentResolver::new(
        Arc::new(FailingRetrieval::new("index offline")),
        Arc::new(ScriptedOracle::failing("unused")),
    );
    let segment = Segment::new(0, 0.0, 1.0, "text", "ctx").unwrap();
    resolver.resolve(&segment, &HashSet::new()).await;

    assert!(logs_contain("segment resolution failed"));
    assert!(logs_contain("index offline"));
}

#[traced_test]
#[tokio::test]
async fn test_pipeline_run_emits_lifecycle_and_metrics_flush() {
    let dir = tempfile::tempdir().unwrap();
    let batch = parse_segments(&json!([
        {"start_time": 0.0, "end_time": 1.0, "text": "one"},
        {"start_time": 1.0, "end_time": 0.5, "text": "backwards"},
    ]))
    .unwrap();
    let mut pipeline = Pipeline::new(
        PipelineConfig::new(dir.path().join("edl.json")),
        Arc::new(ScriptedRetrieval::new(vec![vec![Candidate::new("a.jpg", "", 0.5)]])),
        Arc::new(ScriptedOracle::always(Judgment::select("a.jpg", "ok"))),
    )
    .unwrap();

    pipeline.run(batch, &CancellationToken::new()).await.unwrap();

    assert!(logs_contain("pipeline.started"));
    assert!(logs_contain("pipeline.stage"));
    assert!(logs_contain("segment.rejected"));
    assert!(logs_contain("pipeline.finished"));
    assert!(logs_contain("flush"));
}

#[test]
fn test_metrics_count_rounds() {
    // Counters are global and shared with concurrently running tests, so
    // only monotonic growth is checked.
    let before = METRICS.snapshot().rounds;
    METRICS.inc_rounds();
    assert!(METRICS.snapshot().rounds > before);
}
