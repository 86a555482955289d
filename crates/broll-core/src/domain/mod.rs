//! Domain model for broll.
//!
//! - `Segment`: a timestamped narrative span (immutable, validated)
//! - `Candidate` / `RankedCandidate`: scored corpus images
//! - `SegmentResult`: a segment's terminal SELECT output
//! - `Edit` / `EditDecisionList`: the renderer-facing assignment list

pub mod candidate;
pub mod edit;
pub mod error;
pub mod segment;
pub mod validation;

pub use candidate::{Candidate, RankedCandidate, SegmentResult, MAX_TOP_CANDIDATES};
pub use edit::{Assignment, Edit, EditDecisionList, EdlDigest, EdlError};
pub use error::{BrollError, PortError, Result, SchemaViolation, ViolationKind};
pub use segment::Segment;
pub use validation::{parse_segments, SegmentBatch};
