//! Ollama-compatible judgment oracle for broll.
//!
//! Implements [`broll_core::JudgmentOracle`] over `POST {host}/api/chat` in
//! JSON mode. Every failure maps to a per-segment oracle failure, which the
//! segment resolver turns into a SKIP.

pub mod client;
pub mod config;
pub mod error;
pub mod parse;
pub mod prompt;

pub use client::OllamaOracle;
pub use config::OracleConfig;
pub use error::{OracleError, Result};
pub use parse::{clean_json_response, parse_judgment};
pub use prompt::{render_user_message, DEFAULT_SYSTEM_PROMPT};
