//! Submission lifecycle orchestration.
//!
//! The orchestrator ties the three lower layers together: it resolves the
//! environment profile and credentials, opens a session against the
//! authority, and drives each command (upload, confirm, query, fix, empty)
//! through the transport client while keeping the filesystem store in step
//! with what the authority has acknowledged.
//!
//! Local state transitions are strictly ordered after their remote
//! counterparts: an artifact is only marked sent after the send succeeded,
//! and only relocated to the processed area after the confirm succeeded. A
//! crash between the two leaves the period in the earlier state, and
//! re-running the command converges.

mod error;
mod orchestrator;

pub use error::EngineError;
pub use orchestrator::{
    BulkReport, ConfirmOutcome, EmptyOutcome, FixOutcome, Orchestrator, QueryOutcome,
    UploadOutcome,
};
