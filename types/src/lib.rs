//! Core domain types for the SSN submission lifecycle client.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application: period identifiers, filing artifacts and their wire payload,
//! and the per-period submission status.

mod artifact;
mod period;
mod status;

pub use artifact::{FilingArtifact, FilingPayload};
pub use period::{InvalidPeriodFormat, MAX_YEAR, MIN_YEAR, Period, PeriodKind};
pub use status::SubmissionStatus;
