//! Edits and the Edit Decision List consumed by the renderer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One image overlay on the timeline. This is the renderer's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    pub start_time: f64,
    pub end_time: f64,
    pub image: String,
    pub reasoning: String,
    pub text_context: String,
}

/// An [`Edit`] together with its provenance, as confirmed by global resolution.
///
/// Provenance is not part of the renderer format; it exists for auditing and
/// for checking the one-edit-per-segment invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub segment_index: usize,
    /// `true` when the segment lost its primary bid and got a lower-ranked image.
    pub fallback: bool,
    pub edit: Edit,
}

/// Invariant violations when building an EDL from raw edits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EdlError {
    #[error("image {0} is used more than once")]
    DuplicateImage(String),

    #[error("edit {position} starts before its predecessor")]
    OutOfOrder { position: usize },
}

/// Time-ordered, conflict-free list of edits.
///
/// Serializes as a bare JSON array of [`Edit`]. Deserialization re-checks the
/// ordering and no-reuse invariants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Edit>", into = "Vec<Edit>")]
pub struct EditDecisionList {
    edits: Vec<Edit>,
}

impl EditDecisionList {
    /// Build from confirmed assignments, sorting by start time.
    ///
    /// The sort is stable, so equal start times keep assignment order.
    pub fn from_assignments(assignments: &[Assignment]) -> Self {
        let mut edits: Vec<Edit> = assignments.iter().map(|a| a.edit.clone()).collect();
        edits.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Self { edits }
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// SHA-256 over the canonical (compact) JSON encoding.
    pub fn digest(&self) -> crate::Result<EdlDigest> {
        let bytes = serde_json::to_vec(self)?;
        Ok(EdlDigest::from_bytes(&bytes))
    }
}

impl TryFrom<Vec<Edit>> for EditDecisionList {
    type Error = EdlError;

    fn try_from(edits: Vec<Edit>) -> std::result::Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        for (position, edit) in edits.iter().enumerate() {
            if !seen.insert(edit.image.as_str()) {
                return Err(EdlError::DuplicateImage(edit.image.clone()));
            }
            if position > 0 && edit.start_time < edits[position - 1].start_time {
                return Err(EdlError::OutOfOrder { position });
            }
        }
        Ok(Self { edits })
    }
}

impl From<EditDecisionList> for Vec<Edit> {
    fn from(edl: EditDecisionList) -> Self {
        edl.edits
    }
}

/// Content digest of a serialized EDL (SHA-256, lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdlDigest(String);

impl EdlDigest {
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        EdlDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for EdlDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
