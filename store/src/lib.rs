//! Filesystem-backed submission state store.
//!
//! The filesystem is the single source of truth for per-period state: an
//! artifact in the pending area means `Pending`, an artifact in the
//! kind-scoped processed area means `Confirmed`, and small sidecar markers
//! record the in-between states (`Sent`, `EmptyDeclared`,
//! `RectificationRequested`). There is no separate ledger to desynchronize,
//! which makes crash recovery trivial: whatever the directories say is the
//! state.
//!
//! Layout under the store root:
//!
//! ```text
//! data/                         pending area (artifacts + markers)
//! data/processed/weekly/        confirmed weekly artifacts
//! data/processed/monthly/       confirmed monthly artifacts
//! ```

mod error;
mod store;

pub use error::StoreError;
pub use store::{PendingScan, ReopenOutcome, StateStore};
