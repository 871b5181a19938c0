//! Environment profiles.
//!
//! Exactly two environments exist. Their transport parameters differ on
//! purpose: the test server is known to be unstable, so `test` runs without
//! TLS verification and with a shorter timeout. That relaxed trust is
//! test-only and is never applied to `prod`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Production base URL of the authority's reporting API.
pub(crate) const PROD_BASE_URL: &str = "https://ri.ssn.gob.ar/api";
/// Test base URL of the authority's reporting API.
pub(crate) const TEST_BASE_URL: &str = "https://testri.ssn.gob.ar/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    Test,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Self::Prod),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// How transport-level failures (timeouts, TLS handshakes) on read-only
/// calls are treated.
///
/// Mutating calls are always strict; this policy only softens `query`, where
/// reporting the local view on a flaky test server is more useful than
/// aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportFaultPolicy {
    #[default]
    Strict,
    Warn,
}

/// Transport configuration snapshot for one environment.
///
/// A profile is a plain value passed into the transport client constructor
/// per invocation; there is no ambient global.
#[derive(Debug, Clone)]
pub struct EnvironmentProfile {
    pub environment: Environment,
    pub base_url: String,
    pub certificate_ref: Option<PathBuf>,
    pub verify_tls: bool,
    pub timeout_secs: u64,
    pub fault_policy: TransportFaultPolicy,
}

impl EnvironmentProfile {
    /// The built-in defaults for a named environment.
    #[must_use]
    pub fn builtin(environment: Environment) -> Self {
        match environment {
            Environment::Prod => Self {
                environment,
                base_url: PROD_BASE_URL.to_string(),
                certificate_ref: None,
                verify_tls: true,
                timeout_secs: 30,
                fault_policy: TransportFaultPolicy::Strict,
            },
            Environment::Test => Self {
                environment,
                base_url: TEST_BASE_URL.to_string(),
                certificate_ref: None,
                verify_tls: false,
                timeout_secs: 15,
                fault_policy: TransportFaultPolicy::Warn,
            },
        }
    }

    /// Check that the profile is usable before any network activity.
    ///
    /// When TLS verification is on and a certificate is referenced, the file
    /// must exist; a prod run must never silently fall back to an unverified
    /// connection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verify_tls
            && let Some(path) = &self.certificate_ref
            && !path.is_file()
        {
            return Err(ConfigError::CertificateNotFound { path: path.clone() });
        }
        Ok(())
    }
}
