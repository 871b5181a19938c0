use thiserror::Error;

use ssn_client::ClientError;
use ssn_config::ConfigError;
use ssn_store::StoreError;
use ssn_types::{Period, SubmissionStatus};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The transport client could not be built (certificate problems,
    /// malformed base URL).
    #[error("could not initialize the transport client: {0}")]
    Setup(#[from] ClientError),

    /// A remote call failed; the command and period pin down which step.
    #[error("{command} failed for {period}: {source}")]
    Remote {
        command: &'static str,
        period: Period,
        #[source]
        source: ClientError,
    },

    /// Confirm was requested for a period that was never sent.
    #[error("nothing to confirm for {period}: status is {status}, send it first")]
    NothingToConfirm {
        period: Period,
        status: SubmissionStatus,
    },

    /// Fix was requested for a period without a confirmed delivery behind
    /// it, either still in the open flow locally or not confirmed per the
    /// authority.
    #[error("no confirmed filing to rectify for {period}: {detail}")]
    NoConfirmedFilingToFix { period: Period, detail: String },

    /// The requested operation contradicts the period's local state.
    #[error("cannot {operation} {period}: status is {status}")]
    StateConflict {
        operation: &'static str,
        period: Period,
        status: SubmissionStatus,
    },
}

impl EngineError {
    pub(crate) fn remote(command: &'static str, period: &Period, source: ClientError) -> Self {
        Self::Remote {
            command,
            period: *period,
            source,
        }
    }

    /// Whether a bulk run must stop at this error instead of moving on to
    /// the next period.
    #[must_use]
    pub fn is_hard_failure(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_hard_failure(),
            Self::Config(_) | Self::Setup(_) => true,
            _ => false,
        }
    }
}
