//! Lenient parsing of model output into a [`Judgment`].
//!
//! Models wrap JSON in markdown fences or add prose around it, and often
//! omit fields. Missing fields get defaults: the verdict falls back to
//! REFINE, the rest to `None`. An unrecognised verdict is an error.

use broll_core::{Judgment, Verdict};
use serde::Deserialize;

use crate::error::{OracleError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawJudgment {
    verdict: Option<String>,
    selected_image: Option<String>,
    reasoning: Option<String>,
    suggested_query: Option<String>,
}

/// Strip a markdown fence and any text outside the outermost JSON value.
pub fn clean_json_response(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the fence line, including any language tag.
        text = rest.split_once('\n').map_or("", |(_, body)| body).trim();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }

    let start = text.find(&['{', '['][..]);
    let end = text.rfind(&['}', ']'][..]);
    match (start, end) {
        (Some(s), Some(e)) if s <= e => &text[s..=e],
        _ => text,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse message content into a judgment.
pub fn parse_judgment(content: &str) -> Result<Judgment> {
    if content.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    let cleaned = clean_json_response(content);
    let raw: RawJudgment = serde_json::from_str(cleaned)?;

    let verdict = match non_blank(raw.verdict) {
        None => Verdict::Refine,
        Some(v) => v
            .parse::<Verdict>()
            .map_err(|_| OracleError::UnknownVerdict(v))?,
    };

    Ok(Judgment {
        verdict,
        selected_image: non_blank(raw.selected_image),
        reasoning: raw.reasoning,
        suggested_query: non_blank(raw.suggested_query),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_json_is_unchanged() {
        assert_eq!(clean_json_response(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_clean_strips_fence_with_language_tag() {
        let raw = "```json\n{\"verdict\": \"SKIP\"}\n```";
        assert_eq!(clean_json_response(raw), "{\"verdict\": \"SKIP\"}");
    }

    #[test]
    fn test_clean_strips_unterminated_fence() {
        let raw = "```\n{\"verdict\": \"SKIP\"}";
        assert_eq!(clean_json_response(raw), "{\"verdict\": \"SKIP\"}");
    }

    #[test]
    fn test_clean_strips_surrounding_prose() {
        let raw = "Sure! Here is my answer: {\"verdict\": \"SELECT\"} Hope that helps.";
        assert_eq!(clean_json_response(raw), "{\"verdict\": \"SELECT\"}");
    }

    #[test]
    fn test_parse_full_judgment() {
        let j = parse_judgment(
            r#"{"verdict":"select","selected_image":"a.jpg","reasoning":"fits","suggested_query":""}"#,
        )
        .unwrap();
        assert_eq!(j.verdict, Verdict::Select);
        assert_eq!(j.selected_image.as_deref(), Some("a.jpg"));
        assert_eq!(j.reasoning.as_deref(), Some("fits"));
        assert!(j.suggested_query.is_none());
    }

    #[test]
    fn test_missing_verdict_defaults_to_refine() {
        let j = parse_judgment(r#"{"suggested_query": "harbour at dusk"}"#).unwrap();
        assert_eq!(j.verdict, Verdict::Refine);
        assert_eq!(j.suggested_query.as_deref(), Some("harbour at dusk"));
    }

    #[test]
    fn test_null_selected_image_is_accepted() {
        let j = parse_judgment(r#"{"verdict":"SELECT","selected_image":null}"#).unwrap();
        assert_eq!(j.verdict, Verdict::Select);
        assert!(j.selected_image.is_none());
    }

    #[test]
    fn test_unknown_verdict_is_error() {
        let err = parse_judgment(r#"{"verdict":"MAYBE"}"#).unwrap_err();
        assert!(matches!(err, OracleError::UnknownVerdict(v) if v == "MAYBE"));
    }

    #[test]
    fn test_empty_and_invalid_content() {
        assert!(matches!(parse_judgment("  "), Err(OracleError::EmptyResponse)));
        assert!(matches!(
            parse_judgment("not json at all"),
            Err(OracleError::Malformed(_))
        ));
    }
}
