//! Schema validation for upstream segment documents.
//!
//! The segmentation step writes a JSON array of
//! `{start_time, end_time, text, context}` records. A record's index is its
//! position in that array. Malformed records are rejected here, before any
//! resolution starts; well-formed records keep their original index even
//! when earlier records were rejected.

use serde::Serialize;
use serde_json::Value;

use super::error::{BrollError, SchemaViolation, ViolationKind};
use super::segment::Segment;

/// Outcome of validating an upstream segment document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SegmentBatch {
    pub accepted: Vec<Segment>,
    pub rejected: Vec<SchemaViolation>,
}

/// Validate every record in `doc`.
///
/// # Errors
///
/// [`BrollError::InvalidInput`] when the document itself is not a JSON array.
/// Per-record problems never fail the call; they land in
/// [`SegmentBatch::rejected`].
pub fn parse_segments(doc: &Value) -> crate::Result<SegmentBatch> {
    let records = doc.as_array().ok_or_else(|| {
        BrollError::InvalidInput("segment document must be a JSON array".to_string())
    })?;

    let mut batch = SegmentBatch::default();
    for (index, record) in records.iter().enumerate() {
        match parse_record(index, record) {
            Ok(segment) => batch.accepted.push(segment),
            Err(violation) => batch.rejected.push(violation),
        }
    }
    Ok(batch)
}

fn parse_record(index: usize, record: &Value) -> Result<Segment, SchemaViolation> {
    let obj = record.as_object().ok_or_else(|| {
        SchemaViolation::new(index, ViolationKind::NotAnObject, "record is not an object")
    })?;

    let start = time_field(index, obj.get("start_time"), "start_time")?;
    let end = time_field(index, obj.get("end_time"), "end_time")?;

    let text = match obj.get("text") {
        None | Some(Value::Null) => {
            return Err(SchemaViolation::new(
                index,
                ViolationKind::MissingField,
                "missing text",
            ))
        }
        Some(Value::String(s)) => s.as_str(),
        Some(_) => {
            return Err(SchemaViolation::new(
                index,
                ViolationKind::InvalidField,
                "text must be a string",
            ))
        }
    };

    // Context is optional narrative framing.
    let context = obj.get("context").and_then(Value::as_str).unwrap_or("");

    Segment::new(index, start, end, text, context)
}

/// Timestamps may arrive as numbers or numeric strings.
fn time_field(index: usize, value: Option<&Value>, name: &str) -> Result<f64, SchemaViolation> {
    match value {
        None | Some(Value::Null) => Err(SchemaViolation::new(
            index,
            ViolationKind::MissingField,
            format!("missing {name}"),
        )),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            SchemaViolation::new(index, ViolationKind::InvalidField, format!("{name} out of range"))
        }),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            SchemaViolation::new(
                index,
                ViolationKind::InvalidField,
                format!("{name} is not numeric: {s:?}"),
            )
        }),
        Some(_) => Err(SchemaViolation::new(
            index,
            ViolationKind::InvalidField,
            format!("{name} must be a number"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_accepts_well_formed_records() {
        let doc = json!([
            {"start_time": 0.0, "end_time": 4.2, "text": "We arrived at dawn.", "context": "arrival"},
            {"start_time": "4.2", "end_time": 9, "text": "The clinic was full."}
        ]);
        let batch = parse_segments(&doc).unwrap();
        assert_eq!(batch.accepted.len(), 2);
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.accepted[1].start_time(), 4.2);
        assert_eq!(batch.accepted[1].context(), "");
    }

    #[test]
    fn test_rejected_records_keep_positions() {
        let doc = json!([
            {"start_time": 0.0, "text": "no end"},
            {"start_time": 1.0, "end_time": 2.0, "text": "ok"},
            "not an object",
            {"start_time": 3.0, "end_time": 2.0, "text": "inverted"},
            {"start_time": 3.0, "end_time": 4.0},
            {"start_time": "soon", "end_time": 4.0, "text": "bad time"}
        ]);
        let batch = parse_segments(&doc).unwrap();

        assert_eq!(batch.accepted.len(), 1);
        assert_eq!(batch.accepted[0].index(), 1);

        let kinds: Vec<(usize, ViolationKind)> = batch
            .rejected
            .iter()
            .map(|v| (v.index, v.kind.clone()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (0, ViolationKind::MissingField),
                (2, ViolationKind::NotAnObject),
                (3, ViolationKind::InvalidTimeRange),
                (4, ViolationKind::MissingField),
                (5, ViolationKind::InvalidField),
            ]
        );
    }

    #[test]
    fn test_non_array_document_is_an_error() {
        let err = parse_segments(&json!({"segments": []})).unwrap_err();
        assert!(matches!(err, BrollError::InvalidInput(_)));
    }
}
