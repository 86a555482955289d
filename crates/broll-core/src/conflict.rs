//! Global Conflict Resolver: greedy score-prioritized image assignment.
//!
//! Runs in two pure phases:
//! 1. [`build_bids`]: one primary bid per segment, ordered by score
//!    descending with ties broken by ascending segment index.
//! 2. [`assign`]: a single pass over the bids with an empty used set. A bid
//!    whose image is taken falls back to the segment's own lower-ranked
//!    candidates; if all are taken the segment produces no edit.
//!
//! [`resolve_conflicts`] composes both and sorts the result into an EDL.

use std::collections::HashSet;

use crate::domain::candidate::by_score_desc;
use crate::domain::{Assignment, Edit, EditDecisionList, RankedCandidate, SegmentResult};
use crate::metrics::METRICS;
use crate::obs;

/// Reasoning prefix for edits confirmed from a fallback candidate.
pub const FALLBACK_PREFIX: &str = "(Fallback) ";

/// A segment's claim on its highest-ranked image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid<'a> {
    pub image: &'a str,
    pub score: f64,
    pub segment_index: usize,
    /// The bidding segment's result; its candidates are the fallback list.
    pub result: &'a SegmentResult,
}

impl<'a> Bid<'a> {
    fn primary(result: &'a SegmentResult) -> Self {
        let top = result.primary();
        Self {
            image: &top.filename,
            score: top.score,
            segment_index: result.segment_index(),
            result,
        }
    }

    /// Candidates after the primary, in rank order.
    pub fn fallbacks(&self) -> &'a [RankedCandidate] {
        &self.result.top_candidates()[1..]
    }
}

/// Build the global bid list: one primary bid per segment result.
pub fn build_bids(results: &[SegmentResult]) -> Vec<Bid<'_>> {
    let mut bids: Vec<Bid<'_>> = results.iter().map(Bid::primary).collect();
    bids.sort_by(|a, b| {
        by_score_desc(a.score, b.score).then_with(|| a.segment_index.cmp(&b.segment_index))
    });
    bids
}

fn edit_for(result: &SegmentResult, image: &str, reasoning: String) -> Edit {
    let segment = result.segment();
    Edit {
        start_time: segment.start_time(),
        end_time: segment.end_time(),
        image: image.to_string(),
        reasoning,
        text_context: segment.text().to_string(),
    }
}

/// Walk `bids` once, confirming at most one image per segment and never
/// reusing an image. Output is in confirmation order.
pub fn assign(bids: &[Bid<'_>]) -> Vec<Assignment> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut satisfied: HashSet<usize> = HashSet::new();
    let mut assignments = Vec::new();

    for bid in bids {
        if satisfied.contains(&bid.segment_index) {
            continue;
        }

        if used.insert(bid.image) {
            let reasoning = bid.result.primary().reasoning.clone();
            obs::emit_bid_confirmed(bid.segment_index, bid.image, bid.score);
            satisfied.insert(bid.segment_index);
            assignments.push(Assignment {
                segment_index: bid.segment_index,
                fallback: false,
                edit: edit_for(bid.result, bid.image, reasoning),
            });
            continue;
        }

        let fallback = bid
            .fallbacks()
            .iter()
            .find(|cand| !used.contains(cand.filename.as_str()));
        match fallback {
            Some(cand) => {
                used.insert(cand.filename.as_str());
                satisfied.insert(bid.segment_index);
                METRICS.inc_fallbacks();
                obs::emit_bid_fallback(bid.segment_index, bid.image, &cand.filename, cand.score);
                assignments.push(Assignment {
                    segment_index: bid.segment_index,
                    fallback: true,
                    edit: edit_for(
                        bid.result,
                        &cand.filename,
                        format!("{FALLBACK_PREFIX}{}", cand.reasoning),
                    ),
                });
            }
            None => {
                METRICS.inc_exhausted();
                obs::emit_bid_exhausted(bid.segment_index, bid.image);
            }
        }
    }

    assignments
}

/// Resolve all segment results into confirmed assignments and the EDL.
pub fn resolve_assignments(results: &[SegmentResult]) -> (Vec<Assignment>, EditDecisionList) {
    let bids = build_bids(results);
    let assignments = assign(&bids);
    let edl = EditDecisionList::from_assignments(&assignments);
    (assignments, edl)
}

/// Resolve all segment results into a conflict-free, time-ordered EDL.
pub fn resolve_conflicts(results: &[SegmentResult]) -> EditDecisionList {
    resolve_assignments(results).1
}
