use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::domain::{parse_segments, EditDecisionList, SegmentBatch};

/// Write the EDL as pretty JSON, atomically.
///
/// The file is written to a temp file in the target directory and renamed
/// into place, so a reader never observes a partial EDL.
pub fn write_edl(path: &Path, edl: &EditDecisionList) -> Result<()> {
    let content = serde_json::to_string_pretty(edl).context("serialize edit decision list")?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;

    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("temp file in {:?}", dir))?;
    tmp.write_all(content.as_bytes())
        .with_context(|| format!("write {:?}", tmp.path()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("rename into {:?}", path))?;
    Ok(())
}

/// Read an EDL back, re-checking its ordering and no-reuse invariants.
pub fn read_edl(path: &Path) -> Result<EditDecisionList> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parse edit decision list {:?}", path))
}

/// Load and validate an upstream segments file.
pub fn load_segments(path: &Path) -> Result<SegmentBatch> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    let doc: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parse segments {:?}", path))?;
    let batch = parse_segments(&doc).with_context(|| format!("validate segments {:?}", path))?;
    Ok(batch)
}
