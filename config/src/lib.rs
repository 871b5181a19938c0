//! Configuration for the SSN submission lifecycle client.
//!
//! Three concerns live here:
//!
//! - [`EnvironmentProfile`] - the transport parameters (base URL, certificate
//!   reference, TLS verification, timeout) of the two named environments,
//!   `prod` and `test`.
//! - [`ConfigStore`] - the per-flow JSON configuration documents
//!   (`config-semanal.json`, `config-mensual.json`) and the atomic
//!   environment switch that rewrites their transport fields together.
//! - [`Credentials`] - operator identity resolved from the process
//!   environment (`SSN_USER`, `SSN_PASSWORD`, `SSN_COMPANY`).

mod credentials;
mod documents;
mod error;
mod profile;

pub use credentials::{Credentials, ENV_COMPANY, ENV_PASSWORD, ENV_USER};
pub use documents::{ConfigStore, Endpoints, FlowDocument, SslSection};
pub use error::ConfigError;
pub use profile::{Environment, EnvironmentProfile, TransportFaultPolicy};
