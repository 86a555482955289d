//! Pipeline driver: resolve every segment, then resolve conflicts once, then
//! persist the EDL.
//!
//! Stages run in order and cancellation is checked between them:
//!
//! 1. `resolve_segments`: per-segment state machines, up to
//!    `concurrency` at a time. Results keep segment order.
//! 2. `resolve_conflicts`: the global greedy assignment. Starts only after
//!    every segment reached SELECT or SKIP.
//! 3. `persist`: atomic write of the EDL.
//!
//! A cancelled run is not an error: the report carries status
//! [`PipelineStatus::Cancelled`] plus every outcome completed so far, and the
//! driver accepts a new run afterwards.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::conflict::resolve_assignments;
use crate::domain::{
    Assignment, BrollError, EditDecisionList, EdlDigest, SchemaViolation, SegmentBatch,
    SegmentResult,
};
use crate::metrics::METRICS;
use crate::obs;
use crate::persist;
use crate::ports::{JudgmentOracle, RetrievalPort};
use crate::resolver::{SegmentOutcome, SegmentResolver};

const STAGE_SEGMENTS: &str = "resolve_segments";
const STAGE_CONFLICTS: &str = "resolve_conflicts";
const STAGE_PERSIST: &str = "persist";

/// Lifecycle of the driver and of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineStatus::Idle => "idle",
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub status: PipelineStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Upstream records excluded before resolution.
    pub rejected: Vec<SchemaViolation>,
    /// One per resolved segment, in segment order.
    pub outcomes: Vec<SegmentOutcome>,
    pub assignments: Vec<Assignment>,
    pub edl: EditDecisionList,
    pub edl_digest: Option<EdlDigest>,
    /// Set once the EDL is on disk.
    pub edl_path: Option<PathBuf>,
    /// Stage at which cancellation was observed.
    pub cancelled_at: Option<String>,
}

impl PipelineReport {
    fn new(run_id: Uuid, rejected: Vec<SchemaViolation>) -> Self {
        Self {
            run_id,
            status: PipelineStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            rejected,
            outcomes: Vec::new(),
            assignments: Vec::new(),
            edl: EditDecisionList::default(),
            edl_digest: None,
            edl_path: None,
            cancelled_at: None,
        }
    }

    pub fn selected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_selected()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Selected segments that lost every candidate in conflict resolution.
    pub fn exhausted(&self) -> usize {
        self.selected().saturating_sub(self.assignments.len())
    }

    pub fn fallbacks(&self) -> usize {
        self.assignments.iter().filter(|a| a.fallback).count()
    }
}

/// Sequences segment resolution, conflict resolution and persistence.
pub struct Pipeline {
    config: PipelineConfig,
    resolver: SegmentResolver,
    status: PipelineStatus,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        retrieval: Arc<dyn RetrievalPort>,
        oracle: Arc<dyn JudgmentOracle>,
    ) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: SegmentResolver::new(retrieval, oracle),
            status: PipelineStatus::Idle,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Status of the most recent run, or `Idle` before the first.
    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Run the pipeline over a validated segment batch.
    ///
    /// # Errors
    ///
    /// Only persistence can fail a run; the status is then
    /// [`PipelineStatus::Failed`]. Segment-level failures are recorded in
    /// the outcomes and never abort the run.
    pub async fn run(
        &mut self,
        batch: SegmentBatch,
        cancel: &CancellationToken,
    ) -> crate::Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let run_id_str = run_id.to_string();
        let started = Instant::now();
        self.status = PipelineStatus::Running;

        for violation in &batch.rejected {
            obs::emit_segment_rejected(violation.index, violation);
        }
        obs::emit_pipeline_started(
            &run_id_str,
            batch.accepted.len(),
            batch.rejected.len(),
            self.config.concurrency,
        );

        let mut report = PipelineReport::new(run_id, batch.rejected);
        let result = self
            .execute(&run_id_str, &batch.accepted, &mut report, cancel)
            .instrument(obs::pipeline_span(&run_id_str))
            .await;

        report.completed_at = Some(Utc::now());
        METRICS.flush();
        match result {
            Ok(status) => {
                report.status = status;
                self.status = status;
                if status == PipelineStatus::Completed {
                    let digest = report
                        .edl_digest
                        .as_ref()
                        .map(|d| d.short().to_string())
                        .unwrap_or_default();
                    obs::emit_pipeline_finished(
                        &run_id_str,
                        started.elapsed().as_millis() as u64,
                        report.edl.len(),
                        &digest,
                    );
                }
                Ok(report)
            }
            Err(err) => {
                self.status = PipelineStatus::Failed;
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        segments: &[crate::domain::Segment],
        report: &mut PipelineReport,
        cancel: &CancellationToken,
    ) -> crate::Result<PipelineStatus> {
        if cancelled(run_id, STAGE_SEGMENTS, report, cancel) {
            return Ok(PipelineStatus::Cancelled);
        }
        obs::emit_pipeline_stage(run_id, STAGE_SEGMENTS);

        // Global dedup happens only in conflict resolution.
        let exclusions: HashSet<String> = HashSet::new();
        let mut outcomes = stream::iter(segments)
            .map(|segment| self.resolver.resolve(segment, &exclusions))
            .buffered(self.config.concurrency);
        while let Some(outcome) = outcomes.next().await {
            report.outcomes.push(outcome);
            if cancel.is_cancelled() && report.outcomes.len() < segments.len() {
                report.cancelled_at = Some(STAGE_SEGMENTS.to_string());
                obs::emit_pipeline_cancelled(run_id, STAGE_SEGMENTS, report.outcomes.len());
                return Ok(PipelineStatus::Cancelled);
            }
        }
        drop(outcomes);

        if cancelled(run_id, STAGE_CONFLICTS, report, cancel) {
            return Ok(PipelineStatus::Cancelled);
        }
        obs::emit_pipeline_stage(run_id, STAGE_CONFLICTS);
        let results: Vec<SegmentResult> = report
            .outcomes
            .iter()
            .filter_map(|o| o.result.clone())
            .collect();
        let (assignments, edl) = resolve_assignments(&results);
        report.edl_digest = Some(edl.digest()?);
        report.assignments = assignments;
        report.edl = edl;

        if cancelled(run_id, STAGE_PERSIST, report, cancel) {
            return Ok(PipelineStatus::Cancelled);
        }
        obs::emit_pipeline_stage(run_id, STAGE_PERSIST);
        let path = self.config.edl_path.clone();
        let edl = report.edl.clone();
        tokio::task::spawn_blocking(move || persist::write_edl(&path, &edl))
            .await
            .map_err(|e| BrollError::Persist(e.to_string()))?
            .map_err(|e| BrollError::Persist(format!("{e:#}")))?;
        report.edl_path = Some(self.config.edl_path.clone());
        info!(
            path = %self.config.edl_path.display(),
            edits = report.edl.len(),
            "edit decision list saved"
        );

        Ok(PipelineStatus::Completed)
    }
}

fn cancelled(
    run_id: &str,
    stage: &str,
    report: &mut PipelineReport,
    cancel: &CancellationToken,
) -> bool {
    if !cancel.is_cancelled() {
        return false;
    }
    report.cancelled_at = Some(stage.to_string());
    obs::emit_pipeline_cancelled(run_id, stage, report.outcomes.len());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedOracle, ScriptedRetrieval};

    #[test]
    fn test_zero_concurrency_rejected_at_construction() {
        let cfg = PipelineConfig::new("edl.json").with_concurrency(0);
        let result = Pipeline::new(
            cfg,
            Arc::new(ScriptedRetrieval::empty()),
            Arc::new(ScriptedOracle::failing("unused")),
        );
        assert!(matches!(result, Err(BrollError::InvalidConfig(_))));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PipelineStatus::Cancelled.to_string(), "cancelled");
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[tokio::test]
    async fn test_new_pipeline_is_idle_and_empty_run_completes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::new(dir.path().join("edl.json"));
        let mut pipeline = Pipeline::new(
            cfg,
            Arc::new(ScriptedRetrieval::empty()),
            Arc::new(ScriptedOracle::failing("unused")),
        )
        .unwrap();
        assert_eq!(pipeline.status(), PipelineStatus::Idle);

        let report = pipeline
            .run(SegmentBatch::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.status, PipelineStatus::Completed);
        assert!(report.edl.is_empty());
        assert!(dir.path().join("edl.json").exists());
    }
}
