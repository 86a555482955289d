//! Error taxonomy for broll.
//!
//! Three layers:
//! - [`PortError`]: a retrieval or judgment call failed. Recovered per segment
//!   by forcing a SKIP verdict; never aborts a run.
//! - [`SchemaViolation`]: upstream segment data is malformed. The segment is
//!   rejected before resolution begins.
//! - [`BrollError`]: driver-level failures (I/O, serialization, config).

/// Failure of an external collaborator behind a port.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    #[error("retrieval failure: {0}")]
    Retrieval(String),

    #[error("oracle failure: {0}")]
    Oracle(String),
}

/// Why an upstream segment record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    NotAnObject,
    MissingField,
    InvalidField,
    EmptyText,
    InvalidTimeRange,
}

/// A single rejected upstream segment.
#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize, serde::Deserialize)]
#[error("segment {index} rejected ({kind:?}): {detail}")]
pub struct SchemaViolation {
    /// Position of the record in the upstream list.
    pub index: usize,
    pub kind: ViolationKind,
    pub detail: String,
}

impl SchemaViolation {
    pub fn new(index: usize, kind: ViolationKind, detail: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            detail: detail.into(),
        }
    }
}

/// Driver-level errors.
#[derive(Debug, thiserror::Error)]
pub enum BrollError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("invalid input document: {0}")]
    InvalidInput(String),

    #[error("failed to persist edit decision list: {0}")]
    Persist(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for broll driver operations.
pub type Result<T> = std::result::Result<T, BrollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_display_names_the_port() {
        let err = PortError::Retrieval("index offline".to_string());
        assert_eq!(err.to_string(), "retrieval failure: index offline");

        let err = PortError::Oracle("invalid JSON".to_string());
        assert!(err.to_string().contains("oracle failure"));
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_schema_violation_display() {
        let v = SchemaViolation::new(4, ViolationKind::MissingField, "missing end_time");
        let msg = v.to_string();
        assert!(msg.contains("segment 4"));
        assert!(msg.contains("missing end_time"));
    }

    #[test]
    fn test_broll_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BrollError = io.into();
        assert!(err.to_string().contains("io error"));
    }
}
