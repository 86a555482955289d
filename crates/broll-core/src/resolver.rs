//! Segment Resolver: bounded retrieve-and-judge loop for one segment.
//!
//! ```text
//! SEARCH ──► EVALUATE ──► SELECT (terminal)
//!   ▲            │
//!   │            ├──────► SKIP   (terminal)
//!   └── REFINE ◄─┘
//! ```
//!
//! Each round builds a query, retrieves [`RETRIEVAL_TOP_K`] candidates,
//! merges them into the accumulated set and asks the oracle for a verdict.
//! At most [`MAX_REFINEMENT_ROUNDS`] rounds run; a REFINE on the last round is
//! forced to SKIP. Any port failure ends the segment with SKIP and the error
//! text as reasoning. Failures are never retried here.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::candidate::by_score_desc;
use crate::domain::{Candidate, PortError, RankedCandidate, Segment, SegmentResult, MAX_TOP_CANDIDATES};
use crate::metrics::METRICS;
use crate::obs;
use crate::ports::{JudgmentOracle, JudgmentRequest, RetrievalPort, Verdict};

/// Candidates requested from retrieval per round.
pub const RETRIEVAL_TOP_K: usize = 5;

/// Accumulated candidates shown to the oracle per round.
pub const JUDGE_WINDOW: usize = 10;

/// Rounds permitted per segment (round indices 0, 1, 2).
pub const MAX_REFINEMENT_ROUNDS: u32 = 3;

pub const NO_CANDIDATES_REASONING: &str = "no candidates found";

const FORCED_SKIP_PREFIX: &str =
    "Max rounds reached without a confident match. Skipping to avoid forced insertion.";

/// Build the retrieval query for `round` (0-indexed).
///
/// Round 0 combines text and context. Later rounds use the oracle's
/// suggestion with the context, or text and context verbatim when the oracle
/// suggested nothing.
pub fn build_query(segment: &Segment, round: u32, suggested: Option<&str>) -> String {
    let suggested = suggested.map(str::trim).filter(|s| !s.is_empty());
    match (round, suggested) {
        (0, _) => format!("{} context: {}", segment.text(), segment.context()),
        (_, Some(s)) => format!("{} context: {}", s, segment.context()),
        (_, None) => format!("{} {}", segment.text(), segment.context()),
    }
}

/// Terminal summary of one segment's resolution.
///
/// Kept for auditing and reporting only; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentOutcome {
    pub segment_index: usize,
    /// Always terminal: SELECT or SKIP.
    pub verdict: Verdict,
    /// Rounds started, 1..=MAX_REFINEMENT_ROUNDS.
    pub rounds: u32,
    pub reasoning: String,
    /// Informational only; `result` carries the authoritative ranking.
    pub selected_image: Option<String>,
    pub final_query: String,
    /// Set when a port call failed and the SKIP was forced by the error.
    pub error: Option<String>,
    pub result: Option<SegmentResult>,
}

impl SegmentOutcome {
    pub fn is_selected(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Mutable state owned by a single in-flight resolution.
struct ResolutionState<'a> {
    segment: &'a Segment,
    round: u32,
    rounds_started: u32,
    current_query: String,
    accumulated: Vec<Candidate>,
    seen: HashSet<String>,
    verdict: Verdict,
    selected_image: Option<String>,
    reasoning: String,
    suggested_query: Option<String>,
    top_candidates: Vec<RankedCandidate>,
}

impl<'a> ResolutionState<'a> {
    fn new(segment: &'a Segment) -> Self {
        Self {
            segment,
            round: 0,
            rounds_started: 0,
            current_query: String::new(),
            accumulated: Vec::new(),
            seen: HashSet::new(),
            verdict: Verdict::Refine,
            selected_image: None,
            reasoning: String::new(),
            suggested_query: None,
            top_candidates: Vec::new(),
        }
    }

    /// Merge fresh results; first occurrence of a filename wins.
    fn accumulate(&mut self, fresh: Vec<Candidate>) -> usize {
        let before = self.accumulated.len();
        for cand in fresh {
            if self.seen.insert(cand.filename.clone()) {
                self.accumulated.push(cand);
            }
        }
        self.accumulated
            .sort_by(|a, b| by_score_desc(a.score, b.score));
        self.accumulated.len() - before
    }

    fn visible(&self, exclusions: &HashSet<String>) -> Vec<Candidate> {
        self.accumulated
            .iter()
            .filter(|c| !exclusions.contains(&c.filename))
            .cloned()
            .collect()
    }

    fn finish(self) -> SegmentOutcome {
        let result = match self.verdict {
            Verdict::Select => SegmentResult::new(self.segment.clone(), self.top_candidates),
            _ => None,
        };
        SegmentOutcome {
            segment_index: self.segment.index(),
            verdict: self.verdict,
            rounds: self.rounds_started,
            reasoning: self.reasoning,
            selected_image: self.selected_image,
            final_query: self.current_query,
            error: None,
            result,
        }
    }

    fn fail(self, err: PortError) -> SegmentOutcome {
        SegmentOutcome {
            segment_index: self.segment.index(),
            verdict: Verdict::Skip,
            rounds: self.rounds_started,
            reasoning: format!("Error: {err}"),
            selected_image: None,
            final_query: self.current_query,
            error: Some(err.to_string()),
            result: None,
        }
    }
}

/// Drives the per-segment state machine against the two ports.
#[derive(Clone)]
pub struct SegmentResolver {
    retrieval: Arc<dyn RetrievalPort>,
    oracle: Arc<dyn JudgmentOracle>,
}

impl SegmentResolver {
    pub fn new(retrieval: Arc<dyn RetrievalPort>, oracle: Arc<dyn JudgmentOracle>) -> Self {
        Self { retrieval, oracle }
    }

    /// Resolve one segment to a terminal verdict.
    ///
    /// `exclusions` lists filenames hidden from the oracle. Never fails:
    /// port errors become a SKIP outcome carrying the error text.
    #[instrument(skip_all, fields(segment = segment.index()))]
    pub async fn resolve(&self, segment: &Segment, exclusions: &HashSet<String>) -> SegmentOutcome {
        let mut state = ResolutionState::new(segment);
        let outcome = match self.drive(&mut state, exclusions).await {
            Ok(()) => state.finish(),
            Err(err) => {
                warn!(error = %err, "segment resolution failed, skipping");
                METRICS.inc_segments_failed();
                state.fail(err)
            }
        };

        match outcome.verdict {
            Verdict::Select if outcome.is_selected() => METRICS.inc_segments_selected(),
            _ => METRICS.inc_segments_skipped(),
        }
        obs::emit_segment_resolved(
            outcome.segment_index,
            outcome.verdict,
            outcome.rounds,
            &outcome.reasoning,
        );
        outcome
    }

    async fn drive(
        &self,
        state: &mut ResolutionState<'_>,
        exclusions: &HashSet<String>,
    ) -> Result<(), PortError> {
        let segment = state.segment;
        loop {
            // SEARCH
            state.rounds_started += 1;
            METRICS.inc_rounds();
            state.current_query =
                build_query(segment, state.round, state.suggested_query.as_deref());

            METRICS.inc_retrieval_calls();
            let fresh = self
                .retrieval
                .query(&state.current_query, RETRIEVAL_TOP_K)
                .await?;
            let fetched = fresh.len();
            let added = state.accumulate(fresh);
            let visible = state.visible(exclusions);
            obs::emit_segment_round(segment.index(), state.round, fetched, added, visible.len());

            if visible.is_empty() {
                state.verdict = Verdict::Skip;
                state.selected_image = None;
                state.reasoning = NO_CANDIDATES_REASONING.to_string();
                return Ok(());
            }

            // EVALUATE
            let window = &visible[..visible.len().min(JUDGE_WINDOW)];
            let request = JudgmentRequest {
                segment_text: segment.text(),
                context: segment.context(),
                round: state.round + 1,
                max_rounds: MAX_REFINEMENT_ROUNDS,
                candidates: window,
            };
            METRICS.inc_oracle_calls();
            let judgment = self.oracle.evaluate(&request).await?;

            let reasoning = judgment.reasoning.unwrap_or_default();
            let mut verdict = judgment.verdict;
            if verdict == Verdict::Refine && state.round + 1 >= MAX_REFINEMENT_ROUNDS {
                debug!(round = state.round, "refinement budget exhausted, forcing skip");
                verdict = Verdict::Skip;
                state.reasoning = format!("{FORCED_SKIP_PREFIX} {reasoning}")
                    .trim_end()
                    .to_string();
                state.selected_image = None;
            } else {
                state.reasoning = reasoning;
                state.selected_image = judgment.selected_image;
            }
            state.verdict = verdict;

            match verdict {
                Verdict::Select => {
                    state.top_candidates = window
                        .iter()
                        .take(MAX_TOP_CANDIDATES)
                        .map(|c| RankedCandidate::new(&c.filename, c.score, &state.reasoning))
                        .collect();
                    return Ok(());
                }
                Verdict::Skip => return Ok(()),
                Verdict::Refine => {
                    // REFINE → SEARCH
                    state.suggested_query = judgment.suggested_query;
                    state.round += 1;
                }
            }
        }
    }
}
