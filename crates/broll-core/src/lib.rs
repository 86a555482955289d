//! broll core library
//!
//! Assigns at most one image per transcript segment: a bounded
//! retrieve-and-judge loop per segment ([`resolver`]) followed by a greedy
//! global conflict-resolution pass ([`conflict`]) that yields the Edit
//! Decision List.

pub mod config;
pub mod conflict;
pub mod corpus;
pub mod domain;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod persist;
pub mod pipeline;
pub mod ports;
pub mod resolver;
pub mod telemetry;

pub use config::PipelineConfig;

pub use conflict::{assign, build_bids, resolve_assignments, resolve_conflicts, Bid};

pub use corpus::{CaptionRecord, CorpusIndex, RetrievalContext};

pub use domain::{
    parse_segments, Assignment, BrollError, Candidate, Edit, EditDecisionList, EdlDigest, EdlError,
    PortError, RankedCandidate, Result, SchemaViolation, Segment, SegmentBatch, SegmentResult,
    ViolationKind,
};

pub use persist::{load_segments, read_edl, write_edl};

pub use pipeline::{Pipeline, PipelineReport, PipelineStatus};

pub use ports::{Judgment, JudgmentOracle, JudgmentRequest, PortResult, RetrievalPort, Verdict};

pub use resolver::{
    SegmentOutcome, SegmentResolver, JUDGE_WINDOW, MAX_REFINEMENT_ROUNDS, RETRIEVAL_TOP_K,
};

pub use telemetry::init_tracing;

/// broll version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
