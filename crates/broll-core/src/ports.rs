//! Port definitions for the two external collaborators.
//!
//! - [`RetrievalPort`]: free-text query → ranked candidate images
//! - [`JudgmentOracle`]: segment + candidates → SELECT / REFINE / SKIP
//!
//! Both are async and backend-agnostic. In-memory fakes live in
//! [`crate::fakes`]; the corpus index in [`crate::corpus`] and the HTTP
//! oracle in the `broll-oracle` crate are the production adapters.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Candidate, PortError};

/// Result type for port calls.
pub type PortResult<T> = std::result::Result<T, PortError>;

/// Nearest-neighbour search over the image corpus.
///
/// Contract:
/// - results are in descending score order;
/// - fewer than `k` results is fine;
/// - an empty corpus yields `Ok(vec![])`, not an error.
#[async_trait]
pub trait RetrievalPort: Send + Sync {
    async fn query(&self, text: &str, k: usize) -> PortResult<Vec<Candidate>>;
}

/// The oracle's decision for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Select,
    Refine,
    Skip,
}

impl Verdict {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Verdict::Refine)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Select => "SELECT",
            Verdict::Refine => "REFINE",
            Verdict::Skip => "SKIP",
        };
        f.write_str(s)
    }
}

impl FromStr for Verdict {
    type Err = PortError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SELECT" => Ok(Verdict::Select),
            "REFINE" => Ok(Verdict::Refine),
            "SKIP" => Ok(Verdict::Skip),
            other => Err(PortError::Oracle(format!("unknown verdict: {other:?}"))),
        }
    }
}

/// What the oracle returned. Everything except the verdict is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub verdict: Verdict,
    pub selected_image: Option<String>,
    pub reasoning: Option<String>,
    pub suggested_query: Option<String>,
}

impl Judgment {
    pub fn select(image: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Select,
            selected_image: Some(image.into()),
            reasoning: Some(reasoning.into()),
            suggested_query: None,
        }
    }

    pub fn refine(suggested_query: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Refine,
            selected_image: None,
            reasoning: None,
            suggested_query: Some(suggested_query.into()),
        }
    }

    pub fn skip(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Skip,
            selected_image: None,
            reasoning: Some(reasoning.into()),
            suggested_query: None,
        }
    }
}

/// Everything the oracle sees for one round.
#[derive(Debug, Clone, Copy)]
pub struct JudgmentRequest<'a> {
    pub segment_text: &'a str,
    pub context: &'a str,
    /// 1-indexed round number, for display.
    pub round: u32,
    pub max_rounds: u32,
    /// Top accumulated candidates, best first, already truncated.
    pub candidates: &'a [Candidate],
}

/// External judgment capability. May be inconsistent between calls.
#[async_trait]
pub trait JudgmentOracle: Send + Sync {
    async fn evaluate(&self, request: &JudgmentRequest<'_>) -> PortResult<Judgment>;
}
