//! Authenticated HTTP transport for the authority's filing endpoints.
//!
//! `SsnClient` owns a configured `reqwest::Client` and speaks the authority's
//! wire protocol: login for a token, then every other call carries that token
//! in the `Token` header. The client is stateless beyond its connection pool;
//! sessions are plain values held by the caller.

mod error;
mod wire;

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Certificate, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use ssn_config::{Credentials, Endpoints, EnvironmentProfile};
use ssn_types::{FilingPayload, Period};

pub use error::ClientError;
pub use wire::{Ack, ReceiptId, RemoteStatus, Session, StatusReport};

use wire::{DeliveryRef, FixRequest, LoginRequest, LoginResponse, fix_delivery_type};

const TOKEN_HEADER: &str = "Token";

/// Cap on how much of an error body is carried into error messages.
const ERROR_BODY_LIMIT: usize = 2048;

pub struct SsnClient {
    http: reqwest::Client,
    base_url: String,
    endpoints: Endpoints,
}

impl SsnClient {
    /// Build a client from an environment profile.
    ///
    /// TLS verification follows the profile: off for the test environment,
    /// on (optionally pinned to a referenced CA file) for prod.
    pub fn new(profile: &EnvironmentProfile, endpoints: Endpoints) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(profile.timeout_secs))
            .redirect(Policy::none());

        if profile.verify_tls {
            if let Some(path) = &profile.certificate_ref {
                let pem = std::fs::read(path).map_err(|source| ClientError::Certificate {
                    path: path.clone(),
                    source,
                })?;
                let cert = Certificate::from_pem(&pem).map_err(|e| ClientError::Certificate {
                    path: path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                })?;
                builder = builder.add_root_certificate(cert);
            }
        } else {
            warn!(
                environment = %profile.environment,
                "TLS verification disabled for this environment"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: profile.base_url.trim_end_matches('/').to_string(),
            endpoints,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Exchange credentials for a session token.
    ///
    /// A rejected login is an authentication failure; a timeout or TLS
    /// handshake failure stays a transport failure, so callers can tell
    /// "wrong credentials" apart from "server unreachable".
    #[instrument(skip(self, credentials), fields(user = %credentials.user))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ClientError> {
        let body = LoginRequest {
            user: &credentials.user,
            company: &credentials.company,
            password: credentials.password(),
        };

        let response = self
            .http
            .post(self.url(self.endpoints.login()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Authentication {
                reason: format!("{status}: {}", decode_error_body(&body)),
            });
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("login response: {e}")))?;

        info!("Authenticated against the reporting API");
        Ok(Session::from_login(login, &credentials.company))
    }

    /// Transmit a filing payload for its period.
    ///
    /// The company code and delivery type are filled in from the session and
    /// period when the artifact omits them.
    #[instrument(skip(self, session, payload), fields(period = %period))]
    pub async fn send_filing(
        &self,
        session: &Session,
        period: &Period,
        payload: &FilingPayload,
    ) -> Result<ReceiptId, ClientError> {
        let mut body = payload.clone();
        body.company.get_or_insert_with(|| session.company.clone());
        body.delivery_type
            .get_or_insert_with(|| period.kind().delivery_type().to_string());

        let path = self.endpoints.delivery(period.kind()).map_err(config_err)?;
        let raw = self
            .execute(self.http.post(self.url(path)).json(&body), session)
            .await?;

        let receipt = ReceiptId::from_response(&raw, period);
        debug!(receipt = %receipt, records = body.record_count(), "Delivery accepted");
        Ok(receipt)
    }

    /// Confirm a previously transmitted delivery, locking it on the
    /// authority's side.
    #[instrument(skip(self, session), fields(period = %period))]
    pub async fn confirm_filing(
        &self,
        session: &Session,
        period: &Period,
    ) -> Result<Ack, ClientError> {
        let body = DeliveryRef {
            company: &session.company,
            delivery_type: period.kind().delivery_type(),
            schedule: period.to_string(),
        };

        let path = self
            .endpoints
            .confirmation(period.kind())
            .map_err(config_err)?;
        let raw = self
            .execute(self.http.post(self.url(path)).json(&body), session)
            .await?;
        Ok(Ack::from_response(&raw))
    }

    /// Ask the authority what it thinks of a period.
    #[instrument(skip(self, session), fields(period = %period))]
    pub async fn query_filing(
        &self,
        session: &Session,
        period: &Period,
    ) -> Result<StatusReport, ClientError> {
        let path = self.endpoints.delivery(period.kind()).map_err(config_err)?;
        let request = self.http.get(self.url(path)).query(&[
            ("codigoCompania", session.company.as_str()),
            ("tipoEntrega", period.kind().delivery_type()),
            ("cronograma", &period.to_string()),
        ]);

        let raw = self.execute(request, session).await?;
        Ok(StatusReport::from_response(raw))
    }

    /// Request rectification of a confirmed delivery, unlocking it for a
    /// corrected re-send.
    #[instrument(skip(self, session), fields(period = %period))]
    pub async fn request_fix(
        &self,
        session: &Session,
        period: &Period,
    ) -> Result<Ack, ClientError> {
        let body = FixRequest {
            schedule: period.to_string(),
            company: &session.company,
            delivery_type: fix_delivery_type(period.kind()),
        };

        let path = self.endpoints.delivery(period.kind()).map_err(config_err)?;
        let raw = self
            .execute(self.http.put(self.url(path)).json(&body), session)
            .await?;
        Ok(Ack::from_response(&raw))
    }

    /// Declare a period empty (a delivery with zero operations).
    #[instrument(skip(self, session), fields(period = %period))]
    pub async fn declare_empty(
        &self,
        session: &Session,
        period: &Period,
    ) -> Result<ReceiptId, ClientError> {
        let payload = FilingPayload::empty(period, &session.company);
        let path = self.endpoints.delivery(period.kind()).map_err(config_err)?;
        let raw = self
            .execute(self.http.post(self.url(path)).json(&payload), session)
            .await?;
        Ok(ReceiptId::from_response(&raw, period))
    }

    /// Attach the session token, send, and decode.
    ///
    /// 401 after a successful login means the token lapsed, which the caller
    /// handles by re-authenticating. Any other non-success status carries the
    /// server's full complaint.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        session: &Session,
    ) -> Result<Value, ClientError> {
        let response = request
            .header(TOKEN_HEADER, session.token())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status,
                message: decode_error_body(&body),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::InvalidResponse(format!("{e} in body: {}", truncate(&text))))
    }
}

fn config_err(e: ssn_config::ConfigError) -> ClientError {
    ClientError::InvalidResponse(e.to_string())
}

fn truncate(body: &str) -> &str {
    let mut end = body.len().min(ERROR_BODY_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Pull every complaint out of an error body.
///
/// The authority mixes formats: sometimes a `message` string, sometimes an
/// `errors` (or `errores`) list, sometimes both, sometimes plain text.
fn decode_error_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let trimmed = truncate(body).trim();
        return if trimmed.is_empty() {
            "no detail provided".to_string()
        } else {
            trimmed.to_string()
        };
    };

    let mut parts: Vec<String> = Vec::new();
    for key in ["message", "MENSAJE", "mensaje"] {
        if let Some(msg) = value.get(key).and_then(Value::as_str)
            && !msg.trim().is_empty()
        {
            parts.push(msg.trim().to_string());
            break;
        }
    }
    for key in ["errors", "errores", "ERRORES"] {
        match value.get(key) {
            Some(Value::Array(items)) => {
                for item in items {
                    match item {
                        Value::String(s) => parts.push(s.clone()),
                        other => parts.push(other.to_string()),
                    }
                }
                break;
            }
            Some(Value::String(s)) => {
                parts.push(s.clone());
                break;
            }
            _ => {}
        }
    }

    if parts.is_empty() {
        let trimmed = truncate(body).trim();
        if trimmed.is_empty() {
            "no detail provided".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        parts.join("; ")
    }
}
