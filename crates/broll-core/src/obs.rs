//! Structured observability hooks for pipeline runs.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `PipelineSpan` RAII guard
//! - Emission functions for pipeline stages, segment rounds and bid outcomes
//!
//! Events are emitted at `info!` level with an `event` field naming them.
//! For JSON output, pass `--json` to the CLI.

use tracing::{info, warn};

use crate::ports::Verdict;

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// # Example
///
/// ```ignore
/// let _span = PipelineSpan::enter("4b8e...");
/// // every event below now carries run_id
/// ```
pub struct PipelineSpan {
    _span: tracing::span::EnteredSpan,
}

impl PipelineSpan {
    /// Create and enter a span tagged with the run_id.
    ///
    /// The guard must not be held across an `.await`; async stages attach
    /// [`pipeline_span`] with `Instrument` instead.
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: pipeline_span(run_id).entered(),
        }
    }
}

/// The run-scoped span, unentered.
pub fn pipeline_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("broll.pipeline", run_id = %run_id)
}

/// Emit event: pipeline started.
pub fn emit_pipeline_started(run_id: &str, segments: usize, rejected: usize, concurrency: usize) {
    info!(
        event = "pipeline.started",
        run_id = %run_id,
        segments = segments,
        rejected = rejected,
        concurrency = concurrency,
    );
}

/// Emit event: a pipeline stage is about to begin.
pub fn emit_pipeline_stage(run_id: &str, stage: &str) {
    info!(event = "pipeline.stage", run_id = %run_id, stage = %stage);
}

/// Emit event: pipeline finished with edit count and duration.
pub fn emit_pipeline_finished(run_id: &str, duration_ms: u64, edits: usize, digest: &str) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        edits = edits,
        digest = %digest,
    );
}

/// Emit event: cancellation observed before `stage` (warning level).
pub fn emit_pipeline_cancelled(run_id: &str, stage: &str, completed_segments: usize) {
    warn!(
        event = "pipeline.cancelled",
        run_id = %run_id,
        stage = %stage,
        completed_segments = completed_segments,
    );
}

/// Emit event: one search round of a segment ran.
pub fn emit_segment_round(
    segment: usize,
    round: u32,
    fetched: usize,
    added: usize,
    visible: usize,
) {
    info!(
        event = "segment.round",
        segment = segment,
        round = round,
        fetched = fetched,
        added = added,
        visible = visible,
    );
}

/// Emit event: a segment reached its terminal verdict.
pub fn emit_segment_resolved(segment: usize, verdict: Verdict, rounds: u32, reasoning: &str) {
    info!(
        event = "segment.resolved",
        segment = segment,
        verdict = %verdict,
        rounds = rounds,
        reasoning = %reasoning,
    );
}

/// Emit event: an upstream segment record was rejected (warning level).
pub fn emit_segment_rejected(segment: usize, error: &dyn std::fmt::Display) {
    warn!(event = "segment.rejected", segment = segment, error = %error);
}

pub fn emit_bid_confirmed(segment: usize, image: &str, score: f64) {
    info!(event = "bid.confirmed", segment = segment, image = %image, score = score);
}

pub fn emit_bid_fallback(segment: usize, lost: &str, image: &str, score: f64) {
    info!(
        event = "bid.fallback",
        segment = segment,
        lost = %lost,
        image = %image,
        score = score,
    );
}

pub fn emit_bid_exhausted(segment: usize, lost: &str) {
    info!(event = "bid.exhausted", segment = segment, lost = %lost);
}
