//! In-memory fakes for the port traits (testing and dry runs).
//!
//! Provides `ScriptedRetrieval`, `KeywordRetrieval`, `FailingRetrieval`,
//! `ScriptedOracle` and `ClosureOracle`, which satisfy the port contracts
//! without any external service.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::candidate::by_score_desc;
use crate::domain::{Candidate, PortError};
use crate::ports::{Judgment, JudgmentOracle, JudgmentRequest, PortResult, RetrievalPort};

fn ranked(mut candidates: Vec<Candidate>, k: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| by_score_desc(a.score, b.score));
    candidates.truncate(k);
    candidates
}

// ---------------------------------------------------------------------------
// Retrieval fakes
// ---------------------------------------------------------------------------

/// Returns one scripted response per call, repeating the last one when the
/// script runs out. Records every query it receives.
#[derive(Debug, Default)]
pub struct ScriptedRetrieval {
    responses: Mutex<VecDeque<Vec<Candidate>>>,
    last: Mutex<Vec<Candidate>>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl ScriptedRetrieval {
    pub fn new(responses: Vec<Vec<Candidate>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// A retrieval port over an empty corpus.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Queries received so far, with their requested `k`.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalPort for ScriptedRetrieval {
    async fn query(&self, text: &str, k: usize) -> PortResult<Vec<Candidate>> {
        self.queries.lock().unwrap().push((text.to_string(), k));
        let next = self.responses.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = next {
            *last = response;
        }
        Ok(ranked(last.clone(), k))
    }
}

/// Returns every candidate whose keyword occurs in the query
/// (case-insensitive). Order-independent, so safe under concurrency.
#[derive(Debug, Default)]
pub struct KeywordRetrieval {
    entries: Vec<(String, Candidate)>,
}

impl KeywordRetrieval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyword: &str, candidate: Candidate) -> Self {
        self.entries.push((keyword.to_lowercase(), candidate));
        self
    }
}

#[async_trait]
impl RetrievalPort for KeywordRetrieval {
    async fn query(&self, text: &str, k: usize) -> PortResult<Vec<Candidate>> {
        let text = text.to_lowercase();
        let mut seen = HashSet::new();
        let hits = self
            .entries
            .iter()
            .filter(|(keyword, _)| text.contains(keyword.as_str()))
            .filter(|(_, c)| seen.insert(c.filename.clone()))
            .map(|(_, c)| c.clone())
            .collect();
        Ok(ranked(hits, k))
    }
}

/// Always fails with [`PortError::Retrieval`].
#[derive(Debug, Clone)]
pub struct FailingRetrieval {
    message: String,
}

impl FailingRetrieval {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl RetrievalPort for FailingRetrieval {
    async fn query(&self, _text: &str, _k: usize) -> PortResult<Vec<Candidate>> {
        Err(PortError::Retrieval(self.message.clone()))
    }
}

// ---------------------------------------------------------------------------
// Oracle fakes
// ---------------------------------------------------------------------------

/// Owned copy of a [`JudgmentRequest`], kept by the oracle fakes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub segment_text: String,
    pub context: String,
    pub round: u32,
    pub max_rounds: u32,
    pub filenames: Vec<String>,
}

impl From<&JudgmentRequest<'_>> for RecordedRequest {
    fn from(req: &JudgmentRequest<'_>) -> Self {
        Self {
            segment_text: req.segment_text.to_string(),
            context: req.context.to_string(),
            round: req.round,
            max_rounds: req.max_rounds,
            filenames: req.candidates.iter().map(|c| c.filename.clone()).collect(),
        }
    }
}

/// Replays scripted judgments in order, repeating the last one when the
/// script runs out.
#[derive(Debug)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<PortResult<Judgment>>>,
    last: Mutex<PortResult<Judgment>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<PortResult<Judgment>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Err(PortError::Oracle("empty oracle script".to_string()))),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the same judgment.
    pub fn always(judgment: Judgment) -> Self {
        Self::new(vec![Ok(judgment)])
    }

    /// Fails every call with [`PortError::Oracle`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(vec![Err(PortError::Oracle(message.into()))])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JudgmentOracle for ScriptedOracle {
    async fn evaluate(&self, request: &JudgmentRequest<'_>) -> PortResult<Judgment> {
        self.requests.lock().unwrap().push(request.into());
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(judgment) = next {
            *last = judgment;
        }
        last.clone()
    }
}

/// Delegates each call to a closure. Useful when the answer depends on the
/// segment rather than on call order.
pub struct ClosureOracle<F> {
    judge: F,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl<F> ClosureOracle<F>
where
    F: Fn(&JudgmentRequest<'_>) -> PortResult<Judgment> + Send + Sync,
{
    pub fn new(judge: F) -> Self {
        Self {
            judge,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> JudgmentOracle for ClosureOracle<F>
where
    F: Fn(&JudgmentRequest<'_>) -> PortResult<Judgment> + Send + Sync,
{
    async fn evaluate(&self, request: &JudgmentRequest<'_>) -> PortResult<Judgment> {
        self.calls.lock().unwrap().push(request.into());
        (self.judge)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Verdict;

    #[tokio::test]
    async fn test_scripted_retrieval_repeats_last_response() {
        let port = ScriptedRetrieval::new(vec![
            vec![Candidate::new("a.jpg", "", 0.4)],
            vec![Candidate::new("b.jpg", "", 0.6), Candidate::new("c.jpg", "", 0.9)],
        ]);
        assert_eq!(port.query("q1", 5).await.unwrap()[0].filename, "a.jpg");
        let second = port.query("q2", 1).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].filename, "c.jpg");
        assert_eq!(port.query("q3", 5).await.unwrap().len(), 2);
        assert_eq!(port.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_retrieval_returns_empty_list() {
        let port = ScriptedRetrieval::empty();
        assert!(port.query("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_retrieval_matches_case_insensitively() {
        let port = KeywordRetrieval::new()
            .with("Clinic", Candidate::new("clinic.jpg", "", 0.8))
            .with("river", Candidate::new("river.jpg", "", 0.7));
        let hits = port.query("the CLINIC at night", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "clinic.jpg");
    }

    #[tokio::test]
    async fn test_scripted_oracle_records_requests() {
        let oracle = ScriptedOracle::new(vec![Ok(Judgment::refine("q")), Ok(Judgment::skip("no"))]);
        let cands = vec![Candidate::new("a.jpg", "", 0.5)];
        let req = JudgmentRequest {
            segment_text: "text",
            context: "ctx",
            round: 1,
            max_rounds: 3,
            candidates: &cands,
        };
        assert_eq!(oracle.evaluate(&req).await.unwrap().verdict, Verdict::Refine);
        assert_eq!(oracle.evaluate(&req).await.unwrap().verdict, Verdict::Skip);
        assert_eq!(oracle.evaluate(&req).await.unwrap().verdict, Verdict::Skip);
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(oracle.requests()[0].filenames, vec!["a.jpg".to_string()]);
    }
}
