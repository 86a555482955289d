//! Candidate images and the per-segment result handed to global resolution.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::segment::Segment;

/// Maximum number of ranked candidates a segment carries into global resolution.
pub const MAX_TOP_CANDIDATES: usize = 3;

/// A corpus image scored against one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique corpus key.
    pub filename: String,
    pub description: String,
    /// Relevance, higher is better. Conventionally in [0, 1].
    pub score: f64,
}

impl Candidate {
    pub fn new(filename: impl Into<String>, description: impl Into<String>, score: f64) -> Self {
        Self {
            filename: filename.into(),
            description: description.into(),
            score,
        }
    }
}

/// A candidate annotated with the oracle's (shared) reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub filename: String,
    pub score: f64,
    pub reasoning: String,
}

impl RankedCandidate {
    pub fn new(filename: impl Into<String>, score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            score,
            reasoning: reasoning.into(),
        }
    }
}

/// Terminal output of a segment whose verdict was SELECT.
///
/// Never empty: [`SegmentResult::new`] returns `None` when there is nothing
/// to bid with, which is how "no SegmentResult" is represented.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentResult {
    segment: Segment,
    top_candidates: Vec<RankedCandidate>,
}

impl SegmentResult {
    /// Keeps at most [`MAX_TOP_CANDIDATES`] candidates, in the given order.
    pub fn new(segment: Segment, mut top_candidates: Vec<RankedCandidate>) -> Option<Self> {
        if top_candidates.is_empty() {
            return None;
        }
        top_candidates.truncate(MAX_TOP_CANDIDATES);
        Some(Self {
            segment,
            top_candidates,
        })
    }

    pub fn segment_index(&self) -> usize {
        self.segment.index()
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn top_candidates(&self) -> &[RankedCandidate] {
        &self.top_candidates
    }

    /// The highest-ranked candidate: this segment's primary bid.
    pub fn primary(&self) -> &RankedCandidate {
        &self.top_candidates[0]
    }
}

/// Descending-score ordering with a total order over floats.
pub(crate) fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg() -> Segment {
        Segment::new(7, 0.0, 1.0, "text", "").unwrap()
    }

    #[test]
    fn test_segment_result_requires_candidates() {
        assert!(SegmentResult::new(seg(), vec![]).is_none());
    }

    #[test]
    fn test_segment_result_truncates_to_three() {
        let cands = (0..5)
            .map(|i| RankedCandidate::new(format!("img{i}.jpg"), 1.0 - i as f64 * 0.1, "r"))
            .collect();
        let result = SegmentResult::new(seg(), cands).unwrap();
        assert_eq!(result.top_candidates().len(), MAX_TOP_CANDIDATES);
        assert_eq!(result.primary().filename, "img0.jpg");
        assert_eq!(result.segment_index(), 7);
    }

    #[test]
    fn test_by_score_desc_orders_high_first() {
        let mut scores = vec![0.2, 0.9, 0.5];
        scores.sort_by(|a, b| by_score_desc(*a, *b));
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }
}
