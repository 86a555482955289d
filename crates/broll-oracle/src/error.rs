//! Error types for broll-oracle

use broll_core::PortError;
use thiserror::Error;

/// Errors that can occur while consulting the oracle
#[derive(Error, Debug)]
pub enum OracleError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the chat endpoint
    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The model answered with nothing
    #[error("empty response from oracle")]
    EmptyResponse,

    /// Response body or message content is not the expected JSON
    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("unknown verdict: {0:?}")]
    UnknownVerdict(String),

    /// System prompt override could not be read
    #[error("cannot read system prompt {path}: {source}")]
    Prompt {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid oracle configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::Malformed(err.to_string())
    }
}

/// Every oracle error is a recoverable per-segment failure.
impl From<OracleError> for PortError {
    fn from(err: OracleError) -> Self {
        PortError::Oracle(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
