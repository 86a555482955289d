//! Pipeline driver configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::BrollError;

pub const DEFAULT_EDL_PATH: &str = "edit_decision_list.json";

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Segments resolved concurrently; 1 keeps the sequential reference order.
    pub concurrency: usize,
    /// Where the EDL is written on completion.
    pub edl_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            concurrency: std::env::var("BROLL_CONCURRENCY")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1),
            edl_path: std::env::var("BROLL_EDL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_EDL_PATH)),
        }
    }
}

impl PipelineConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config writing the EDL to `edl_path`, sequential.
    pub fn new(edl_path: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            concurrency: 1,
            edl_path: edl_path.into(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_edl_path(mut self, edl_path: impl Into<PathBuf>) -> Self {
        self.edl_path = edl_path.into();
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(BrollError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.edl_path.as_os_str().is_empty() {
            return Err(BrollError::InvalidConfig("edl_path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_sequential() {
        let cfg = PipelineConfig::new("out/edl.json");
        assert_eq!(cfg.concurrency, 1);
        assert_eq!(cfg.edl_path, PathBuf::from("out/edl.json"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let cfg = PipelineConfig::new("edl.json").with_concurrency(0);
        assert!(matches!(cfg.validate(), Err(BrollError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: PipelineConfig = toml::from_str("concurrency = 4").unwrap();
        assert_eq!(cfg.concurrency, 4);
        assert!(!cfg.edl_path.as_os_str().is_empty());
    }
}
