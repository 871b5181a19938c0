//! Wire types for the authority's API.
//!
//! Request bodies carry the authority's field names verbatim: delivery
//! operations use upper-case keys (`CODIGOCOMPANIA`), the rectification
//! request uses lower-camel keys, and the delivery type is spelled
//! differently in each (`SEMANAL` vs `Semanal`). None of this is negotiable;
//! it is what the server accepts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ssn_types::{Period, PeriodKind};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    #[serde(rename = "USER")]
    pub user: &'a str,
    #[serde(rename = "CIA")]
    pub company: &'a str,
    #[serde(rename = "PASSWORD")]
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(rename = "TOKEN", alias = "token")]
    pub token: String,
    #[serde(rename = "EXPIRACION", alias = "expiration", default)]
    pub expiration: Option<String>,
}

/// Short-lived authenticated context for one command invocation.
///
/// Owned exclusively by the caller for the duration of the command and never
/// persisted to disk.
#[derive(Clone)]
pub struct Session {
    token: String,
    pub company: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn from_login(response: LoginResponse, company: &str) -> Self {
        let expires_at = response.expiration.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    warn!(raw, "Could not parse session expiration: {e}");
                    None
                }
            }
        });
        Self {
            token: response.token,
            company: company.to_string(),
            expires_at,
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("company", &self.company)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identifies a delivery on confirm requests.
#[derive(Debug, Serialize)]
pub(crate) struct DeliveryRef<'a> {
    #[serde(rename = "CODIGOCOMPANIA")]
    pub company: &'a str,
    #[serde(rename = "TIPOENTREGA")]
    pub delivery_type: &'a str,
    #[serde(rename = "CRONOGRAMA")]
    pub schedule: String,
}

/// The rectification request body (`PUT` on the delivery endpoint).
#[derive(Debug, Serialize)]
pub(crate) struct FixRequest<'a> {
    #[serde(rename = "cronograma")]
    pub schedule: String,
    #[serde(rename = "codigoCompania")]
    pub company: &'a str,
    #[serde(rename = "tipoEntrega")]
    pub delivery_type: &'a str,
}

pub(crate) fn fix_delivery_type(kind: PeriodKind) -> &'static str {
    match kind {
        PeriodKind::Week => "Semanal",
        PeriodKind::Month => "Mensual",
    }
}

/// Identifier the authority assigned to a transmitted delivery.
///
/// Not every deployment returns one; when absent the schedule token is used
/// so the sent marker always records something traceable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptId(String);

impl ReceiptId {
    pub(crate) fn from_response(raw: &serde_json::Value, period: &Period) -> Self {
        let id = raw
            .get("ID")
            .or_else(|| raw.get("id"))
            .and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        Self(id.unwrap_or_else(|| period.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positive acknowledgement of a confirm/fix/empty call.
#[derive(Debug, Clone, Default)]
pub struct Ack {
    pub message: Option<String>,
}

impl Ack {
    pub(crate) fn from_response(raw: &serde_json::Value) -> Self {
        let message = raw
            .get("message")
            .or_else(|| raw.get("MENSAJE"))
            .or_else(|| raw.get("mensaje"))
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);
        Self { message }
    }
}

/// The authority's view of a period, normalized from the free-form status
/// strings the query endpoint returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Pending,
    Sent,
    Confirmed,
    RectificationOpen,
    Unknown(String),
}

impl RemoteStatus {
    fn classify(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if upper.contains("RECTIF") {
            Self::RectificationOpen
        } else if upper.contains("CONFIRM") || upper.contains("PRESENTAD") {
            Self::Confirmed
        } else if upper.contains("ENVIAD") || upper.contains("CARGAD") {
            Self::Sent
        } else if upper.contains("PENDIENTE") || upper.contains("PENDING") {
            Self::Pending
        } else {
            Self::Unknown(raw.to_string())
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Sent => f.write_str("sent"),
            Self::Confirmed => f.write_str("confirmed"),
            Self::RectificationOpen => f.write_str("rectification open"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Everything the query endpoint reported about a period.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub remote: RemoteStatus,
    /// The raw response document, kept for operator display.
    pub raw: serde_json::Value,
}

const STATUS_KEYS: [&str; 6] = [
    "ESTADO",
    "estado",
    "ESTADOENTREGA",
    "estadoEntrega",
    "STATUS",
    "status",
];

impl StatusReport {
    pub(crate) fn from_response(raw: serde_json::Value) -> Self {
        let remote = STATUS_KEYS
            .iter()
            .find_map(|key| raw.get(key).and_then(serde_json::Value::as_str))
            .map_or_else(
                || RemoteStatus::Unknown("no status field in response".to_string()),
                RemoteStatus::classify,
            );
        Self { remote, raw }
    }
}
