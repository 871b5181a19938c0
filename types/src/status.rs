//! Per-period submission status as inferred from the filesystem ledger.

use std::fmt;

/// Where a period sits in the submission lifecycle.
///
/// The normal flow is `NoArtifact → Pending → Sent → Confirmed`, with a
/// rectification side branch `Confirmed → RectificationRequested → Pending`
/// and a terminal `EmptyDeclared` reachable directly from `NoArtifact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// No filing artifact exists anywhere for the period.
    NoArtifact,
    /// An artifact sits in the pending area, not yet transmitted.
    Pending,
    /// The artifact was transmitted but the delivery is not yet confirmed.
    Sent,
    /// The delivery was confirmed; the artifact lives in the processed area.
    Confirmed,
    /// A rectification was granted remotely and the local artifact slot is
    /// waiting for a regenerated payload.
    RectificationRequested,
    /// A zero-record filing was declared for the period.
    EmptyDeclared,
}

impl SubmissionStatus {
    /// True when the period still has something awaiting confirmation.
    #[must_use]
    pub const fn is_confirmable(self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoArtifact => "no artifact",
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Confirmed => "confirmed",
            Self::RectificationRequested => "rectification requested",
            Self::EmptyDeclared => "empty declared",
        };
        f.write_str(text)
    }
}
