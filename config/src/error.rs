use std::path::PathBuf;

use thiserror::Error;

/// Configuration failures are fatal: the operator fixes the input and
/// re-invokes the command. No retry is ever attempted on these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment '{0}': use 'prod' or 'test'")]
    InvalidEnvironment(String),

    #[error("missing required environment variable {name}")]
    MissingCredential { name: &'static str },

    #[error("configuration document not found: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration document {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("certificate file not found: {}", path.display())]
    CertificateNotFound { path: PathBuf },

    #[error("unrecognized key '{key}' in {}", path.display())]
    UnknownKey { key: String, path: PathBuf },

    #[error("no endpoint named '{0}' is configured")]
    UnknownEndpoint(String),
}
