use std::path::PathBuf;

use thiserror::Error;

use ssn_types::Period;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no filing artifact for {period}: expected {}", path.display())]
    ArtifactNotFound { period: Period, path: PathBuf },

    #[error("malformed filing artifact {}: {source}", path.display())]
    MalformedArtifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {} declares schedule '{found}' but was expected to cover {expected}", path.display())]
    PeriodMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination write did not complete; the source file is untouched.
    #[error("could not place {} into {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination was written and verified but the source could not be
    /// removed. Both copies exist; this needs operator intervention and is
    /// never resolved automatically.
    #[error(
        "partial move: both {} and {} exist; verify contents and remove one manually ({source})",
        from.display(),
        to.display()
    )]
    PartialMove {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
