//! Prompt rendering for the judgment request.

use std::path::Path;

use broll_core::{Candidate, JudgmentRequest};
use serde::Serialize;

use crate::error::{OracleError, Result};

/// Built-in system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../prompts/judge_system.md");

/// Candidate descriptions are cut to this many characters in the prompt.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

#[derive(Serialize)]
struct CandidateView<'a> {
    id: usize,
    filename: &'a str,
    description: String,
    score: String,
}

/// The candidate list as pretty JSON, ids assigned in rank order.
pub fn render_candidates(candidates: &[Candidate]) -> Result<String> {
    let views: Vec<CandidateView<'_>> = candidates
        .iter()
        .enumerate()
        .map(|(id, c)| CandidateView {
            id,
            filename: &c.filename,
            description: c.description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect(),
            score: format!("{:.2}", c.score),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&views)?)
}

pub fn render_user_message(request: &JudgmentRequest<'_>) -> Result<String> {
    let candidates = render_candidates(request.candidates)?;
    Ok(format!(
        "TRANSCRIPT SEGMENT: \"{text}\"\n\
         NARRATIVE CONTEXT: \"{context}\"\n\
         \n\
         CANDIDATE IMAGES (Ranked by Relevance):\n\
         {candidates}\n\
         \n\
         Refinement Round: {round} / {max}\n\
         \n\
         YOUR TASK:\n\
         1. SELECT the best image if it matches well.\n\
         2. REFINE if all images are poor matches (suggest better query).\n\
         3. SKIP if this segment is impossible to visualize nicely.\n\
         \n\
         Respond in JSON.\n",
        text = request.segment_text,
        context = request.context,
        round = request.round,
        max = request.max_rounds,
    ))
}

/// The system prompt: the file at `path` when given, the built-in otherwise.
pub fn load_system_prompt(path: Option<&Path>) -> Result<String> {
    match path {
        None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
        Some(p) => std::fs::read_to_string(p).map_err(|source| OracleError::Prompt {
            path: p.display().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(candidates: &[Candidate]) -> JudgmentRequest<'_> {
        JudgmentRequest {
            segment_text: "Crowds gathered at dawn",
            context: "protest coverage",
            round: 2,
            max_rounds: 3,
            candidates,
        }
    }

    #[test]
    fn test_candidates_carry_id_and_two_decimal_score() {
        let cands = vec![
            Candidate::new("a.jpg", "street crowd", 0.8765),
            Candidate::new("b.jpg", "empty square", 0.1),
        ];
        let rendered: serde_json::Value =
            serde_json::from_str(&render_candidates(&cands).unwrap()).unwrap();
        assert_eq!(rendered[0]["id"], 0);
        assert_eq!(rendered[0]["score"], "0.88");
        assert_eq!(rendered[1]["filename"], "b.jpg");
        assert_eq!(rendered[1]["score"], "0.10");
    }

    #[test]
    fn test_descriptions_are_previewed() {
        let cands = vec![Candidate::new("a.jpg", "x".repeat(500), 0.5)];
        let rendered: serde_json::Value =
            serde_json::from_str(&render_candidates(&cands).unwrap()).unwrap();
        assert_eq!(
            rendered[0]["description"].as_str().unwrap().len(),
            DESCRIPTION_PREVIEW_CHARS
        );
    }

    #[test]
    fn test_user_message_shows_segment_and_round() {
        let cands = vec![Candidate::new("a.jpg", "street crowd", 0.5)];
        let msg = render_user_message(&request(&cands)).unwrap();
        assert!(msg.contains("TRANSCRIPT SEGMENT: \"Crowds gathered at dawn\""));
        assert!(msg.contains("NARRATIVE CONTEXT: \"protest coverage\""));
        assert!(msg.contains("Refinement Round: 2 / 3"));
        assert!(msg.contains("\"filename\": \"a.jpg\""));
    }

    #[test]
    fn test_system_prompt_override() {
        assert!(load_system_prompt(None).unwrap().contains("SELECT"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        std::fs::write(&path, "custom prompt").unwrap();
        assert_eq!(load_system_prompt(Some(&path)).unwrap(), "custom prompt");

        let missing = dir.path().join("missing.md");
        assert!(matches!(
            load_system_prompt(Some(&missing)),
            Err(OracleError::Prompt { .. })
        ));
    }
}
