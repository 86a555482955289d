//! Narrative segments supplied by the upstream segmentation step.

use serde::Serialize;

use super::error::{SchemaViolation, ViolationKind};

/// A timestamped span of narrative text that needs at most one image.
///
/// Fields are private so that `start_time < end_time` holds for every value
/// in circulation; construct through [`Segment::new`] or
/// [`crate::domain::validation::parse_segments`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    index: usize,
    start_time: f64,
    end_time: f64,
    text: String,
    context: String,
}

impl Segment {
    /// Build a segment, rejecting blank text and empty or inverted time ranges.
    pub fn new(
        index: usize,
        start_time: f64,
        end_time: f64,
        text: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Self, SchemaViolation> {
        let text = text.into().trim().to_string();
        let context = context.into().trim().to_string();

        if text.is_empty() {
            return Err(SchemaViolation::new(
                index,
                ViolationKind::EmptyText,
                "text is blank",
            ));
        }
        if !start_time.is_finite() || !end_time.is_finite() || start_time >= end_time {
            return Err(SchemaViolation::new(
                index,
                ViolationKind::InvalidTimeRange,
                format!("start_time {start_time} must be before end_time {end_time}"),
            ));
        }

        Ok(Self {
            index,
            start_time,
            end_time,
            text,
            context,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Surrounding narrative context; may be empty.
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_trims_text_and_context() {
        let seg = Segment::new(0, 1.0, 2.5, "  doctors at night ", " clinic ").unwrap();
        assert_eq!(seg.text(), "doctors at night");
        assert_eq!(seg.context(), "clinic");
        assert_eq!(seg.duration(), 1.5);
    }

    #[test]
    fn test_segment_rejects_inverted_range() {
        let err = Segment::new(3, 5.0, 5.0, "text", "").unwrap_err();
        assert_eq!(err.kind, ViolationKind::InvalidTimeRange);
        assert_eq!(err.index, 3);
    }

    #[test]
    fn test_segment_rejects_blank_text() {
        let err = Segment::new(1, 0.0, 1.0, "   ", "ctx").unwrap_err();
        assert_eq!(err.kind, ViolationKind::EmptyText);
    }

    #[test]
    fn test_segment_rejects_non_finite_times() {
        let err = Segment::new(0, f64::NAN, 1.0, "text", "").unwrap_err();
        assert_eq!(err.kind, ViolationKind::InvalidTimeRange);
    }
}
