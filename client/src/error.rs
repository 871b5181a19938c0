use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the login (bad credentials, disabled account).
    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    /// A post-login call came back 401: the session credential is no longer
    /// accepted. The orchestrator re-logins and retries exactly once.
    #[error("session expired or no longer accepted by the authority")]
    SessionExpired,

    /// Timeout, TLS, or connection failure on any call, login included. Not
    /// retried automatically; the operator re-invokes the command.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The authority answered with a non-success status. The message
    /// aggregates everything the server reported.
    #[error("authority rejected the request ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("could not decode the authority's response: {0}")]
    InvalidResponse(String),

    #[error("failed to read certificate {}: {source}", path.display())]
    Certificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Failures that must stop a bulk run: nothing later in the batch can
    /// succeed once authentication or the transport itself is broken.
    #[must_use]
    pub const fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::SessionExpired | Self::Transport(_)
        )
    }
}
