use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use ssn_client::{Ack, ClientError, ReceiptId, RemoteStatus, Session, SsnClient, StatusReport};
use ssn_config::{Credentials, Endpoints, EnvironmentProfile, TransportFaultPolicy};
use ssn_store::{ReopenOutcome, StateStore, StoreError};
use ssn_types::{Period, PeriodKind, SubmissionStatus};

use crate::error::EngineError;

#[derive(Debug)]
pub struct UploadOutcome {
    pub period: Period,
    pub receipt: ReceiptId,
    pub record_count: usize,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    /// The authority acknowledged the confirmation and the artifact moved to
    /// the processed area.
    Confirmed { processed: PathBuf },
    /// The period was already confirmed locally; no request was made.
    AlreadyConfirmed,
}

#[derive(Debug)]
pub struct QueryOutcome {
    pub period: Period,
    pub local: SubmissionStatus,
    /// Absent when the transport failed and the fault policy is `Warn`.
    pub remote: Option<StatusReport>,
}

impl QueryOutcome {
    /// Whether the authority's view contradicts the local record.
    ///
    /// Only states both sides can express are compared; an `Unknown` remote
    /// status or a missing report never counts as a conflict.
    #[must_use]
    pub fn conflict(&self) -> bool {
        let Some(report) = &self.remote else {
            return false;
        };
        match (&self.local, &report.remote) {
            (SubmissionStatus::Confirmed | SubmissionStatus::EmptyDeclared, remote) => !matches!(
                remote,
                RemoteStatus::Confirmed | RemoteStatus::Unknown(_)
            ),
            (
                SubmissionStatus::Pending | SubmissionStatus::Sent | SubmissionStatus::NoArtifact,
                RemoteStatus::Confirmed,
            ) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct FixOutcome {
    pub ack: Ack,
    pub reopen: ReopenOutcome,
}

#[derive(Debug)]
pub struct EmptyOutcome {
    pub period: Period,
    pub receipt: ReceiptId,
}

/// Outcome of a bulk (`--all`) run over one flow kind.
///
/// Per-period rejections do not abort the run; authentication and transport
/// failures do, since every later period would fail the same way.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub succeeded: Vec<Period>,
    pub failed: Vec<(Period, EngineError)>,
    /// Files in the pending area that could not even be read as artifacts.
    pub unreadable: Vec<(PathBuf, StoreError)>,
}

impl BulkReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unreadable.is_empty()
    }
}

/// Drives submissions through the authority's protocol.
///
/// One orchestrator serves one command invocation. It logs in lazily on the
/// first remote call, reuses that session for every later call in the run
/// (bulk runs included), and re-authenticates only when the session stops
/// being accepted.
pub struct Orchestrator {
    client: SsnClient,
    credentials: Credentials,
    store: StateStore,
    fault_policy: TransportFaultPolicy,
    session: Mutex<Option<Session>>,
}

impl Orchestrator {
    pub fn new(
        profile: &EnvironmentProfile,
        endpoints: Endpoints,
        credentials: Credentials,
        store: StateStore,
    ) -> Result<Self, EngineError> {
        profile.validate()?;
        let client = SsnClient::new(profile, endpoints)?;
        Ok(Self {
            client,
            credentials,
            store,
            fault_policy: profile.fault_policy,
            session: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run `op` under the run's session, logging in on first use and
    /// retrying exactly once after a re-login if the token lapsed.
    async fn with_session<T>(
        &self,
        op: impl AsyncFn(&Session) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let session = self.current_session().await?;
        match op(&session).await {
            Err(ClientError::SessionExpired) => {
                warn!("Session no longer accepted, re-authenticating");
                let session = self.renew_session().await?;
                op(&session).await
            }
            other => other,
        }
    }

    async fn current_session(&self) -> Result<Session, ClientError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.client.login(&self.credentials).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn renew_session(&self) -> Result<Session, ClientError> {
        let mut guard = self.session.lock().await;
        let session = self.client.login(&self.credentials).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Transmit the pending artifact for a period.
    ///
    /// Re-sending an already sent (but unconfirmed) artifact is allowed; the
    /// authority replaces the unconfirmed delivery. A confirmed period must
    /// go through `fix` first.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn upload(&self, period: &Period) -> Result<UploadOutcome, EngineError> {
        let status = self.store.status_of(period);
        if status == SubmissionStatus::Confirmed || status == SubmissionStatus::EmptyDeclared {
            return Err(EngineError::StateConflict {
                operation: "upload",
                period: *period,
                status,
            });
        }

        let payload = self.store.read_payload(period)?;
        let record_count = payload.record_count();
        let receipt = self
            .with_session(async |session| self.client.send_filing(session, period, &payload).await)
            .await
            .map_err(|e| EngineError::remote("upload", period, e))?;

        self.store.mark_sent(period, receipt.as_str())?;
        info!(period = %period, receipt = %receipt, records = record_count, "Filing transmitted");
        Ok(UploadOutcome {
            period: *period,
            receipt,
            record_count,
        })
    }

    /// Confirm a delivery and move its artifact to the processed area.
    ///
    /// A still-pending artifact is sent first; confirming is the end of the
    /// same flow and does not require a separate upload invocation.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn confirm(&self, period: &Period) -> Result<ConfirmOutcome, EngineError> {
        match self.store.status_of(period) {
            SubmissionStatus::Confirmed => {
                info!(period = %period, "Already confirmed, nothing to do");
                return Ok(ConfirmOutcome::AlreadyConfirmed);
            }
            SubmissionStatus::Sent => {}
            SubmissionStatus::Pending => {
                self.upload(period).await?;
            }
            status => {
                return Err(EngineError::NothingToConfirm {
                    period: *period,
                    status,
                });
            }
        }

        self.with_session(async |session| self.client.confirm_filing(session, period).await)
            .await
            .map_err(|e| EngineError::remote("confirm", period, e))?;

        let artifact = self.store.load_artifact(period)?;
        let processed = self.store.commit(&artifact)?;
        info!(period = %period, "Filing confirmed and archived");
        Ok(ConfirmOutcome::Confirmed { processed })
    }

    /// Report the authority's view of a period next to the local record.
    ///
    /// Under the `Warn` fault policy a transport failure degrades to a
    /// local-only answer instead of an error; the test server is allowed to
    /// be down without blocking the operator.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn query(&self, period: &Period) -> Result<QueryOutcome, EngineError> {
        let local = self.store.status_of(period);
        let remote = self
            .with_session(async |session| self.client.query_filing(session, period).await)
            .await;

        let remote = match remote {
            Ok(report) => Some(report),
            Err(e @ ClientError::Transport(_))
                if self.fault_policy == TransportFaultPolicy::Warn =>
            {
                warn!(period = %period, "Could not reach the authority: {e}");
                None
            }
            Err(e) => return Err(EngineError::remote("query", period, e)),
        };

        Ok(QueryOutcome {
            period: *period,
            local,
            remote,
        })
    }

    /// Request rectification of a confirmed delivery and reopen it locally.
    ///
    /// The precondition is the authority's view, established by a query, not
    /// the local record: the local artifact may be missing entirely (the
    /// delivery was confirmed from another machine, or declared empty), in
    /// which case the store is left awaiting a regenerated artifact.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn fix(&self, period: &Period) -> Result<FixOutcome, EngineError> {
        let status = self.store.status_of(period);
        if matches!(status, SubmissionStatus::Pending | SubmissionStatus::Sent) {
            return Err(EngineError::NoConfirmedFilingToFix {
                period: *period,
                detail: format!("local status is {status}, confirm it first"),
            });
        }

        let report = self
            .with_session(async |session| self.client.query_filing(session, period).await)
            .await
            .map_err(|e| EngineError::remote("fix", period, e))?;
        if report.remote != RemoteStatus::Confirmed {
            return Err(EngineError::NoConfirmedFilingToFix {
                period: *period,
                detail: format!("authority reports {}", report.remote),
            });
        }

        let ack = self
            .with_session(async |session| self.client.request_fix(session, period).await)
            .await
            .map_err(|e| EngineError::remote("fix", period, e))?;

        let reopen = self.store.reopen(period)?;
        info!(period = %period, "Rectification requested");
        Ok(FixOutcome { ack, reopen })
    }

    /// Declare a period empty: a delivery with zero operations.
    ///
    /// Refused when a pending artifact exists; an extracted artifact means
    /// there was activity, and discarding it silently would lose a filing.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn declare_empty(&self, period: &Period) -> Result<EmptyOutcome, EngineError> {
        let status = self.store.status_of(period);
        if status != SubmissionStatus::NoArtifact {
            return Err(EngineError::StateConflict {
                operation: "declare empty",
                period: *period,
                status,
            });
        }

        let receipt = self
            .with_session(async |session| self.client.declare_empty(session, period).await)
            .await
            .map_err(|e| EngineError::remote("empty", period, e))?;

        self.store.mark_empty_declared(period)?;
        info!(period = %period, "Empty declaration recorded");
        Ok(EmptyOutcome {
            period: *period,
            receipt,
        })
    }

    /// Upload every pending artifact of one kind, oldest first.
    #[instrument(skip(self))]
    pub async fn upload_all(&self, kind: PeriodKind) -> Result<BulkReport, EngineError> {
        let scan = self.store.list_pending(kind)?;
        let mut report = BulkReport {
            unreadable: scan.rejected,
            ..BulkReport::default()
        };

        for artifact in scan.artifacts {
            match self.upload(&artifact.period).await {
                Ok(_) => report.succeeded.push(artifact.period),
                Err(e) if e.is_hard_failure() => return Err(e),
                Err(e) => report.failed.push((artifact.period, e)),
            }
        }
        Ok(report)
    }

    /// Run the full send-and-confirm sequence over every pending artifact of
    /// one kind, oldest first.
    #[instrument(skip(self))]
    pub async fn confirm_all(&self, kind: PeriodKind) -> Result<BulkReport, EngineError> {
        let scan = self.store.list_pending(kind)?;
        let mut report = BulkReport {
            unreadable: scan.rejected,
            ..BulkReport::default()
        };

        for artifact in scan.artifacts {
            match self.confirm(&artifact.period).await {
                Ok(_) => report.succeeded.push(artifact.period),
                Err(e) if e.is_hard_failure() => return Err(e),
                Err(e) => report.failed.push((artifact.period, e)),
            }
        }
        Ok(report)
    }
}
