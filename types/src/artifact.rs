//! Filing artifacts and their wire payload.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::period::Period;

/// The JSON body of a delivery, shared between the artifact files the
/// extraction step produces and the `POST` bodies sent to the authority.
///
/// Field names follow the authority's wire format. Unknown extractor fields
/// are dropped on load; the orchestrator never rewrites artifact files, so
/// nothing is lost on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingPayload {
    #[serde(rename = "CRONOGRAMA")]
    pub schedule: String,
    #[serde(rename = "CODIGOCOMPANIA", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "TIPOENTREGA", skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
    #[serde(rename = "OPERACIONES", default)]
    pub operations: Vec<serde_json::Value>,
}

impl FilingPayload {
    /// A zero-record delivery for a period with no reportable activity.
    #[must_use]
    pub fn empty(period: &Period, company: &str) -> Self {
        Self {
            schedule: period.to_string(),
            company: Some(company.to_string()),
            delivery_type: Some(period.kind().delivery_type().to_string()),
            operations: Vec::new(),
        }
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.operations.len()
    }
}

/// A validated filing artifact located in the pending area.
///
/// The file itself is read-only from the lifecycle client's perspective: it
/// is created by extraction and only ever *relocated* (never rewritten or
/// deleted) by the submission flow.
#[derive(Debug, Clone)]
pub struct FilingArtifact {
    pub period: Period,
    pub path: PathBuf,
    pub record_count: usize,
}
