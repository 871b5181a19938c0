//! Per-flow configuration documents and atomic environment switching.
//!
//! One JSON document exists per flow kind (`config-semanal.json`,
//! `config-mensual.json`). Switching environments stages the full target
//! profile in memory, validates it, then rewrites each document's transport
//! fields together in a single atomic write. The authentication section and
//! any other passthrough content are preserved verbatim.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use ssn_types::PeriodKind;

use crate::error::ConfigError;
use crate::profile::{Environment, EnvironmentProfile, TransportFaultPolicy};

/// Endpoint paths relative to the base URL.
///
/// Documents may override individual entries; anything absent falls back to
/// the authority's published paths.
#[derive(Debug, Clone)]
pub struct Endpoints {
    paths: BTreeMap<String, String>,
}

const DEFAULT_ENDPOINTS: [(&str, &str); 5] = [
    ("login", "/login"),
    ("entregaSemanal", "/inv/entregaSemanal"),
    ("confirmarEntregaSemanal", "/inv/confirmarEntregaSemanal"),
    ("entregaMensual", "/inv/entregaMensual"),
    ("confirmarEntregaMensual", "/inv/confirmarEntregaMensual"),
];

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            paths: DEFAULT_ENDPOINTS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }
}

impl Endpoints {
    /// Defaults overlaid with document-provided overrides.
    #[must_use]
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut endpoints = Self::default();
        for (name, path) in overrides {
            endpoints.paths.insert(name.clone(), path.clone());
        }
        endpoints
    }

    pub fn path(&self, name: &str) -> Result<&str, ConfigError> {
        self.paths
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))
    }

    #[must_use]
    pub fn login(&self) -> &str {
        self.paths.get("login").map_or("/login", String::as_str)
    }

    /// The delivery endpoint for a flow kind (`POST` to send, `PUT` to
    /// request rectification, `GET` to query).
    pub fn delivery(&self, kind: PeriodKind) -> Result<&str, ConfigError> {
        match kind {
            PeriodKind::Week => self.path("entregaSemanal"),
            PeriodKind::Month => self.path("entregaMensual"),
        }
    }

    /// The confirmation endpoint for a flow kind.
    pub fn confirmation(&self, kind: PeriodKind) -> Result<&str, ConfigError> {
        match kind {
            PeriodKind::Week => self.path("confirmarEntregaSemanal"),
            PeriodKind::Month => self.path("confirmarEntregaMensual"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SslSection {
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cafile: Option<PathBuf>,
}

const fn default_verify() -> bool {
    true
}

/// One flow kind's configuration document.
///
/// Recognized transport keys are typed; everything else (the authentication
/// section in particular) flows through `extra` untouched on rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub ssl: SslSection,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub debug: bool,
    #[serde(
        default,
        rename = "transportFaults",
        skip_serializing_if = "Option::is_none"
    )]
    pub transport_faults: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

const fn default_timeout() -> u64 {
    30
}

/// Sections that may appear in a document without being transport
/// configuration. `retries` is a legacy key from earlier tooling.
const PASSTHROUGH_KEYS: [&str; 3] = ["auth", "authentication", "retries"];

impl FlowDocument {
    fn environment(&self) -> Result<Environment, ConfigError> {
        if let Some(name) = &self.environment {
            return name.parse();
        }
        // Older documents carry only the URL; infer from it.
        if self.base_url.contains("testri") {
            Ok(Environment::Test)
        } else {
            Ok(Environment::Prod)
        }
    }

    fn fault_policy(&self, environment: Environment) -> TransportFaultPolicy {
        match self.transport_faults.as_deref() {
            Some("warn") => TransportFaultPolicy::Warn,
            Some("strict") => TransportFaultPolicy::Strict,
            Some(other) => {
                warn!(value = other, "Unknown transportFaults value, using strict");
                TransportFaultPolicy::Strict
            }
            None => EnvironmentProfile::builtin(environment).fault_policy,
        }
    }

    fn check_unknown_keys(&self, path: &Path) -> Result<(), ConfigError> {
        // Reject unknown keys only in strict mode (test environment or debug
        // runs); warn otherwise.
        let strict = self.debug || self.environment().is_ok_and(|e| e == Environment::Test);
        for key in self.extra.keys() {
            if PASSTHROUGH_KEYS.contains(&key.as_str()) {
                continue;
            }
            if strict {
                return Err(ConfigError::UnknownKey {
                    key: key.clone(),
                    path: path.to_path_buf(),
                });
            }
            warn!(key = %key, path = %path.display(), "Unrecognized configuration key");
        }
        Ok(())
    }
}

/// The on-disk configuration directory holding one document per flow kind.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn document_path(&self, kind: PeriodKind) -> PathBuf {
        let name = match kind {
            PeriodKind::Week => "config-semanal.json",
            PeriodKind::Month => "config-mensual.json",
        };
        self.dir.join(name)
    }

    pub fn load(&self, kind: PeriodKind) -> Result<FlowDocument, ConfigError> {
        let path = self.document_path(kind);
        let raw = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::DocumentNotFound { path: path.clone() }
            } else {
                ConfigError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let document: FlowDocument =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
                path: path.clone(),
                source,
            })?;
        document.check_unknown_keys(&path)?;
        Ok(document)
    }

    /// The transport profile a flow document currently describes.
    pub fn profile(&self, kind: PeriodKind) -> Result<EnvironmentProfile, ConfigError> {
        let document = self.load(kind)?;
        let environment = document.environment()?;
        let certificate_ref = document.ssl.cafile.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.dir.join(p)
            }
        });
        let profile = EnvironmentProfile {
            environment,
            base_url: document.base_url.clone(),
            certificate_ref,
            verify_tls: document.ssl.verify,
            timeout_secs: document.timeout,
            fault_policy: document.fault_policy(environment),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn endpoints(&self, kind: PeriodKind) -> Result<Endpoints, ConfigError> {
        Ok(Endpoints::with_overrides(&self.load(kind)?.endpoints))
    }

    /// The environment the documents are currently pointed at.
    pub fn active(&self) -> Result<Environment, ConfigError> {
        match self.load(PeriodKind::Week) {
            Ok(document) => document.environment(),
            Err(ConfigError::DocumentNotFound { .. }) => self.load(PeriodKind::Month)?.environment(),
            Err(e) => Err(e),
        }
    }

    /// Validate an environment name (`select` in the lifecycle contract).
    pub fn select(name: &str) -> Result<Environment, ConfigError> {
        name.parse()
    }

    /// Point every flow document at `environment`.
    ///
    /// Each updated document is staged fully in memory and validated before
    /// anything touches disk, then committed with one atomic write per file.
    /// The configuration can never end up mixing one environment's URL with
    /// another's trust policy.
    pub fn apply(&self, environment: Environment) -> Result<(), ConfigError> {
        let target = EnvironmentProfile::builtin(environment);

        let mut staged: Vec<(PathBuf, FlowDocument)> = Vec::new();
        for kind in [PeriodKind::Week, PeriodKind::Month] {
            let path = self.document_path(kind);
            let mut document = match self.load(kind) {
                Ok(document) => document,
                Err(ConfigError::DocumentNotFound { path }) => {
                    warn!(path = %path.display(), "Flow document missing, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };

            document.environment = Some(environment.as_str().to_string());
            document.base_url = target.base_url.clone();
            document.ssl.verify = target.verify_tls;
            document.timeout = target.timeout_secs;

            // The certificate reference is shared between environments; it
            // only matters when verification is on, so check it now.
            if document.ssl.verify
                && let Some(cafile) = &document.ssl.cafile
            {
                let resolved = if cafile.is_absolute() {
                    cafile.clone()
                } else {
                    self.dir.join(cafile)
                };
                if !resolved.is_file() {
                    return Err(ConfigError::CertificateNotFound { path: resolved });
                }
            }

            staged.push((path, document));
        }

        if staged.is_empty() {
            return Err(ConfigError::DocumentNotFound {
                path: self.document_path(PeriodKind::Week),
            });
        }

        for (path, document) in staged {
            write_document(&path, &document)?;
            debug!(path = %path.display(), environment = %environment, "Flow document updated");
        }
        Ok(())
    }
}

/// Temp file + rename in the target directory, so a crash mid-write can
/// never leave a half-updated document behind.
fn write_document(path: &Path, document: &FlowDocument) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    let bytes = serde_json::to_vec_pretty(document).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ConfigStore, Endpoints};
    use crate::profile::Environment;
    use ssn_types::PeriodKind;

    fn seed_documents(dir: &std::path::Path) {
        let weekly = serde_json::json!({
            "environment": "prod",
            "baseUrl": "https://ri.ssn.gob.ar/api",
            "ssl": { "verify": true },
            "timeout": 30,
            "debug": false,
            "auth": { "tokenHeader": "Token" }
        });
        let monthly = serde_json::json!({
            "environment": "prod",
            "baseUrl": "https://ri.ssn.gob.ar/api",
            "ssl": { "verify": true },
            "timeout": 30
        });
        std::fs::write(
            dir.join("config-semanal.json"),
            serde_json::to_vec_pretty(&weekly).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("config-mensual.json"),
            serde_json::to_vec_pretty(&monthly).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn switching_environments_round_trips_prod_fields() {
        let dir = tempfile::tempdir().unwrap();
        seed_documents(dir.path());
        let store = ConfigStore::new(dir.path());

        let before = store.profile(PeriodKind::Week).unwrap();
        store.apply(Environment::Test).unwrap();

        let test_profile = store.profile(PeriodKind::Week).unwrap();
        assert_eq!(test_profile.environment, Environment::Test);
        assert!(!test_profile.verify_tls);
        assert_eq!(test_profile.timeout_secs, 15);

        store.apply(Environment::Prod).unwrap();
        let after = store.profile(PeriodKind::Week).unwrap();
        assert_eq!(after.base_url, before.base_url);
        assert_eq!(after.verify_tls, before.verify_tls);
        assert_eq!(after.timeout_secs, before.timeout_secs);
    }

    #[test]
    fn switching_preserves_authentication_section() {
        let dir = tempfile::tempdir().unwrap();
        seed_documents(dir.path());
        let store = ConfigStore::new(dir.path());

        store.apply(Environment::Test).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("config-semanal.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["auth"]["tokenHeader"], "Token");
        assert_eq!(value["baseUrl"], "https://testri.ssn.gob.ar/api");
    }

    #[test]
    fn both_documents_move_together() {
        let dir = tempfile::tempdir().unwrap();
        seed_documents(dir.path());
        let store = ConfigStore::new(dir.path());

        store.apply(Environment::Test).unwrap();

        for kind in [PeriodKind::Week, PeriodKind::Month] {
            let profile = store.profile(kind).unwrap();
            assert_eq!(profile.environment, Environment::Test);
            assert_eq!(profile.base_url, "https://testri.ssn.gob.ar/api");
        }
        assert_eq!(store.active().unwrap(), Environment::Test);
    }

    #[test]
    fn unknown_key_is_rejected_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        let doc = serde_json::json!({
            "environment": "test",
            "baseUrl": "https://testri.ssn.gob.ar/api",
            "basUrl": "typo",
            "ssl": { "verify": false }
        });
        std::fs::write(
            dir.path().join("config-semanal.json"),
            serde_json::to_vec(&doc).unwrap(),
        )
        .unwrap();

        let store = ConfigStore::new(dir.path());
        let err = store.load(PeriodKind::Week).unwrap_err();
        assert!(err.to_string().contains("basUrl"));
    }

    #[test]
    fn missing_certificate_blocks_the_switch() {
        let dir = tempfile::tempdir().unwrap();
        let doc = serde_json::json!({
            "environment": "test",
            "baseUrl": "https://testri.ssn.gob.ar/api",
            "ssl": { "verify": false, "cafile": "certs/ssn.pem" }
        });
        std::fs::write(
            dir.path().join("config-semanal.json"),
            serde_json::to_vec(&doc).unwrap(),
        )
        .unwrap();

        let store = ConfigStore::new(dir.path());
        // Switching to prod turns verification on, and the referenced
        // certificate does not exist.
        let err = store.apply(Environment::Prod).unwrap_err();
        assert!(err.to_string().contains("certificate"));
    }

    #[test]
    fn endpoint_defaults_cover_all_operations() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.login(), "/login");
        assert_eq!(
            endpoints.delivery(PeriodKind::Week).unwrap(),
            "/inv/entregaSemanal"
        );
        assert_eq!(
            endpoints.confirmation(PeriodKind::Month).unwrap(),
            "/inv/confirmarEntregaMensual"
        );
    }
}
