//! Operator identity from the process environment.

use std::fmt;

use crate::error::ConfigError;

pub const ENV_USER: &str = "SSN_USER";
pub const ENV_PASSWORD: &str = "SSN_PASSWORD";
pub const ENV_COMPANY: &str = "SSN_COMPANY";

/// Login credentials plus the company (tenant) code.
///
/// Resolved once per invocation, read-only, never cached to disk. The
/// password is kept out of `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    password: String,
    pub company: String,
}

impl Credentials {
    /// Read all three required variables, failing with the exact name of the
    /// first missing one so the operator can fix that one thing.
    pub fn resolve() -> Result<Self, ConfigError> {
        Ok(Self {
            user: require(ENV_USER)?,
            password: require(ENV_PASSWORD)?,
            company: require(ENV_COMPANY)?,
        })
    }

    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            company: company.into(),
        }
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("company", &self.company)
            .finish()
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingCredential { name }),
    }
}
