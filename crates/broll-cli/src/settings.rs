//! Layered configuration: environment (and `.env`), then the optional TOML
//! file, then command-line flags.

use std::path::Path;

use anyhow::{Context, Result};
use broll_core::PipelineConfig;
use broll_oracle::OracleConfig;
use serde::Deserialize;

/// Contents of a `--config` file.
///
/// ```toml
/// [pipeline]
/// concurrency = 2
/// edl_path = "out/edit_decision_list.json"
///
/// [oracle]
/// host = "http://localhost:11434"
/// model = "gemma3:27b-cloud"
/// ```
///
/// Absent tables and fields fall back to the environment defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub pipeline: PipelineConfig,
    pub oracle: OracleConfig,
}

impl FileConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("parse config")
    }

    /// Load `path`, or environment defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(p) => {
                let raw = std::fs::read_to_string(p).with_context(|| format!("read {:?}", p))?;
                Self::parse(&raw).with_context(|| format!("in {:?}", p))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_tables() {
        let cfg = FileConfig::parse(
            r#"
            [pipeline]
            concurrency = 3
            edl_path = "out/edl.json"

            [oracle]
            host = "http://gpu:11434"
            model = "llama3"
            timeout_secs = 45
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.concurrency, 3);
        assert_eq!(cfg.pipeline.edl_path, Path::new("out/edl.json"));
        assert_eq!(cfg.oracle.host, "http://gpu:11434");
        assert_eq!(cfg.oracle.model, "llama3");
        assert_eq!(cfg.oracle.timeout_secs, 45);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = FileConfig::parse("").unwrap();
        assert!(cfg.pipeline.concurrency >= 1);
        assert!(!cfg.oracle.model.is_empty());
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        assert!(FileConfig::parse("[database]\nurl = \"x\"").is_err());
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/broll.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("broll.toml"));
    }
}
