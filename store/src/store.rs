use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use ssn_types::{FilingArtifact, FilingPayload, Period, PeriodKind, SubmissionStatus};

use crate::error::StoreError;

const SENT_MARKER_EXT: &str = "sent";
const EMPTY_MARKER_EXT: &str = "empty";
const FIX_MARKER_EXT: &str = "fix";

/// What `reopen` did with a previously confirmed period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReopenOutcome {
    /// The processed artifact was moved back to the pending area.
    Relocated { pending: PathBuf },
    /// No processed copy exists locally; a rectification marker was left and
    /// the extraction step must regenerate the artifact.
    AwaitingArtifact,
}

/// Result of enumerating the pending area for one flow kind.
///
/// Files that match the kind's naming pattern but fail validation are
/// collected separately so bulk commands can report them individually
/// instead of aborting the whole run.
#[derive(Debug, Default)]
pub struct PendingScan {
    pub artifacts: Vec<FilingArtifact>,
    pub rejected: Vec<(PathBuf, StoreError)>,
}

/// The durable record of which periods have been sent, confirmed, or are
/// still pending, inferred entirely from file locations.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn pending_dir(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn processed_dir(&self, kind: PeriodKind) -> PathBuf {
        self.root.join("processed").join(kind.processed_dir())
    }

    #[must_use]
    pub fn pending_path(&self, period: &Period) -> PathBuf {
        self.root.join(period.artifact_file_name())
    }

    #[must_use]
    pub fn processed_path(&self, period: &Period) -> PathBuf {
        self.processed_dir(period.kind())
            .join(period.artifact_file_name())
    }

    fn sent_marker(&self, period: &Period) -> PathBuf {
        marker_path(&self.pending_path(period), SENT_MARKER_EXT)
    }

    fn fix_marker(&self, period: &Period) -> PathBuf {
        marker_path(&self.pending_path(period), FIX_MARKER_EXT)
    }

    fn empty_marker(&self, period: &Period) -> PathBuf {
        marker_path(&self.processed_path(period), EMPTY_MARKER_EXT)
    }

    /// Infer the submission status from file locations.
    ///
    /// A processed artifact wins over everything else: once the destination
    /// write of a commit has been verified, the period counts as confirmed
    /// even if the pending copy lingers after a failed cleanup.
    #[must_use]
    pub fn status_of(&self, period: &Period) -> SubmissionStatus {
        if self.processed_path(period).is_file() {
            return SubmissionStatus::Confirmed;
        }
        if self.pending_path(period).is_file() {
            if self.sent_marker(period).is_file() {
                return SubmissionStatus::Sent;
            }
            return SubmissionStatus::Pending;
        }
        if self.empty_marker(period).is_file() {
            return SubmissionStatus::EmptyDeclared;
        }
        if self.fix_marker(period).is_file() {
            return SubmissionStatus::RectificationRequested;
        }
        SubmissionStatus::NoArtifact
    }

    /// Load and validate the pending artifact for a period.
    pub fn load_artifact(&self, period: &Period) -> Result<FilingArtifact, StoreError> {
        let path = self.pending_path(period);
        let payload = self.read_payload_at(&path, period)?;
        Ok(FilingArtifact {
            period: *period,
            record_count: payload.record_count(),
            path,
        })
    }

    /// Read the wire payload of a pending artifact.
    pub fn read_payload(&self, period: &Period) -> Result<FilingPayload, StoreError> {
        let path = self.pending_path(period);
        self.read_payload_at(&path, period)
    }

    fn read_payload_at(&self, path: &Path, period: &Period) -> Result<FilingPayload, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::ArtifactNotFound {
                    period: *period,
                    path: path.to_path_buf(),
                }
            } else {
                StoreError::io(path, source)
            }
        })?;
        let payload: FilingPayload =
            serde_json::from_str(&raw).map_err(|source| StoreError::MalformedArtifact {
                path: path.to_path_buf(),
                source,
            })?;
        if payload.schedule != period.to_string() {
            return Err(StoreError::PeriodMismatch {
                path: path.to_path_buf(),
                expected: period.to_string(),
                found: payload.schedule,
            });
        }
        Ok(payload)
    }

    /// Enumerate pending artifacts of one kind, sorted by period.
    ///
    /// The enumeration is finite and restartable: every call re-reads the
    /// directory, so a partially processed batch can simply be run again.
    pub fn list_pending(&self, kind: PeriodKind) -> Result<PendingScan, StoreError> {
        let mut scan = PendingScan::default();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(scan),
            Err(source) => return Err(StoreError::io(&self.root, source)),
        };

        for entry in entries {
            let entry = entry.map_err(|source| StoreError::io(&self.root, source))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || !matches_kind(name, kind) {
                continue;
            }

            match self.load_pending_file(&path, kind) {
                Ok(artifact) => scan.artifacts.push(artifact),
                Err(error) => scan.rejected.push((path, error)),
            }
        }

        scan.artifacts.sort_by_key(|artifact| artifact.period);
        Ok(scan)
    }

    /// Load a pending file whose period is only known from its payload (the
    /// weekly file name carries no year).
    fn load_pending_file(
        &self,
        path: &Path,
        kind: PeriodKind,
    ) -> Result<FilingArtifact, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| StoreError::io(path, source))?;
        let payload: FilingPayload =
            serde_json::from_str(&raw).map_err(|source| StoreError::MalformedArtifact {
                path: path.to_path_buf(),
                source,
            })?;
        let period = Period::parse(&payload.schedule, kind).map_err(|_| {
            StoreError::PeriodMismatch {
                path: path.to_path_buf(),
                expected: format!("a valid {kind} schedule"),
                found: payload.schedule.clone(),
            }
        })?;
        if path.file_name().and_then(|n| n.to_str()) != Some(period.artifact_file_name().as_str()) {
            return Err(StoreError::PeriodMismatch {
                path: path.to_path_buf(),
                expected: period.artifact_file_name(),
                found: payload.schedule,
            });
        }
        Ok(FilingArtifact {
            period,
            record_count: payload.record_count(),
            path: path.to_path_buf(),
        })
    }

    /// Record a successful transmission. Clears any rectification marker:
    /// a send re-enters the normal flow.
    pub fn mark_sent(&self, period: &Period, receipt: &str) -> Result<(), StoreError> {
        let marker = self.sent_marker(period);
        write_marker(&marker, receipt)?;
        remove_if_present(&self.fix_marker(period));
        debug!(period = %period, receipt, "Marked as sent");
        Ok(())
    }

    /// The receipt recorded by a previous `mark_sent`, if any.
    #[must_use]
    pub fn sent_receipt(&self, period: &Period) -> Option<String> {
        fs::read_to_string(self.sent_marker(period))
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// Record an empty (no-activity) declaration. The pending area is left
    /// untouched.
    pub fn mark_empty_declared(&self, period: &Period) -> Result<(), StoreError> {
        let marker = self.empty_marker(period);
        write_marker(&marker, &period.to_string())?;
        debug!(period = %period, "Marked as empty declared");
        Ok(())
    }

    /// Move a confirmed artifact from the pending area to the processed
    /// area.
    ///
    /// The move is atomic from the caller's perspective: the file either
    /// ends up fully in the processed area, or on any failure remains fully
    /// in the pending area. The source is only removed after the destination
    /// write has been verified; if that removal then fails, the resulting
    /// two-copies state is surfaced as [`StoreError::PartialMove`] for the
    /// operator.
    pub fn commit(&self, artifact: &FilingArtifact) -> Result<PathBuf, StoreError> {
        let destination = self.processed_path(&artifact.period);
        relocate(&artifact.path, &destination)?;
        remove_if_present(&self.sent_marker(&artifact.period));
        debug!(period = %artifact.period, to = %destination.display(), "Artifact committed");
        Ok(destination)
    }

    /// Re-enter the normal flow after a granted rectification.
    pub fn reopen(&self, period: &Period) -> Result<ReopenOutcome, StoreError> {
        let processed = self.processed_path(period);
        if processed.is_file() {
            let pending = self.pending_path(period);
            relocate(&processed, &pending)?;
            debug!(period = %period, "Confirmed artifact moved back to pending");
            return Ok(ReopenOutcome::Relocated { pending });
        }

        write_marker(&self.fix_marker(period), &period.to_string())?;
        debug!(period = %period, "Rectification granted, awaiting regenerated artifact");
        Ok(ReopenOutcome::AwaitingArtifact)
    }
}

fn matches_kind(file_name: &str, kind: PeriodKind) -> bool {
    if !file_name.ends_with(".json") {
        return false;
    }
    match kind {
        PeriodKind::Week => file_name.starts_with("Semana"),
        PeriodKind::Month => file_name.starts_with("Mes-"),
    }
}

fn marker_path(artifact_path: &Path, ext: &str) -> PathBuf {
    let mut name = artifact_path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn write_marker(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::io(parent, source))?;
    }
    fs::write(path, content).map_err(|source| StoreError::io(path, source))
}

fn remove_if_present(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), "Could not remove marker: {e}");
    }
}

/// Copy-verify-remove move. The source is never deleted before the
/// destination write has been persisted and its length checked.
fn relocate(from: &Path, to: &Path) -> Result<(), StoreError> {
    let move_err = |source| StoreError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let bytes = fs::read(from).map_err(|source| StoreError::io(from, source))?;

    let dest_dir = to.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dest_dir).map_err(move_err)?;

    let mut tmp = NamedTempFile::new_in(dest_dir).map_err(move_err)?;
    tmp.write_all(&bytes).map_err(move_err)?;
    tmp.as_file().sync_all().map_err(move_err)?;
    tmp.persist(to).map_err(|e| move_err(e.error))?;

    let written = fs::metadata(to).map_err(move_err)?.len();
    if written != bytes.len() as u64 {
        return Err(move_err(std::io::Error::other(format!(
            "destination has {written} bytes, expected {}",
            bytes.len()
        ))));
    }

    fs::remove_file(from).map_err(|source| StoreError::PartialMove {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{ReopenOutcome, StateStore};
    use ssn_types::{Period, PeriodKind, SubmissionStatus};

    fn week(token: &str) -> Period {
        Period::parse(token, PeriodKind::Week).unwrap()
    }

    fn month(token: &str) -> Period {
        Period::parse(token, PeriodKind::Month).unwrap()
    }

    fn seed_artifact(store: &StateStore, period: &Period, records: usize) {
        let operations: Vec<serde_json::Value> = (0..records)
            .map(|i| serde_json::json!({ "TIPOOPERACION": "C", "N": i }))
            .collect();
        let payload = serde_json::json!({
            "CRONOGRAMA": period.to_string(),
            "TIPOENTREGA": period.kind().delivery_type(),
            "OPERACIONES": operations,
        });
        std::fs::write(
            store.pending_path(period),
            serde_json::to_vec_pretty(&payload).unwrap(),
        )
        .unwrap();
    }

    fn store_in(dir: &tempfile::TempDir) -> StateStore {
        StateStore::new(dir.path())
    }

    #[test]
    fn status_starts_at_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.status_of(&week("2025-15")), SubmissionStatus::NoArtifact);
    }

    #[test]
    fn pending_then_sent_then_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let period = week("2025-15");

        seed_artifact(&store, &period, 12);
        assert_eq!(store.status_of(&period), SubmissionStatus::Pending);

        store.mark_sent(&period, "R-123").unwrap();
        assert_eq!(store.status_of(&period), SubmissionStatus::Sent);
        assert_eq!(store.sent_receipt(&period).as_deref(), Some("R-123"));

        let artifact = store.load_artifact(&period).unwrap();
        assert_eq!(artifact.record_count, 12);

        let destination = store.commit(&artifact).unwrap();
        assert_eq!(store.status_of(&period), SubmissionStatus::Confirmed);
        assert!(!store.pending_path(&period).exists());
        assert!(destination.ends_with("processed/weekly/Semana15.json"));
        assert!(!store.pending_path(&period).with_extension("json.sent").exists());
    }

    #[test]
    fn interrupted_commit_leaves_period_pending() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let period = week("2025-20");
        seed_artifact(&store, &period, 1);

        // Occupy the processed path with a plain file so the destination
        // directory cannot be created.
        std::fs::write(dir.path().join("processed"), b"not a directory").unwrap();

        let artifact = store.load_artifact(&period).unwrap();
        store.commit(&artifact).unwrap_err();

        assert_eq!(store.status_of(&period), SubmissionStatus::Pending);
        assert!(store.pending_path(&period).is_file());
    }

    #[test]
    fn mismatched_schedule_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let period = week("2025-15");

        let payload = serde_json::json!({
            "CRONOGRAMA": "2025-16",
            "OPERACIONES": [],
        });
        std::fs::write(
            store.pending_path(&period),
            serde_json::to_vec(&payload).unwrap(),
        )
        .unwrap();

        let err = store.load_artifact(&period).unwrap_err();
        assert!(err.to_string().contains("2025-16"));
    }

    #[test]
    fn list_pending_is_sorted_and_kind_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        seed_artifact(&store, &week("2025-20"), 2);
        seed_artifact(&store, &week("2025-05"), 1);
        seed_artifact(&store, &month("2025-04"), 3);
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let scan = store.list_pending(PeriodKind::Week).unwrap();
        assert!(scan.rejected.is_empty());
        let tokens: Vec<String> = scan
            .artifacts
            .iter()
            .map(|a| a.period.to_string())
            .collect();
        assert_eq!(tokens, ["2025-05", "2025-20"]);

        let monthly = store.list_pending(PeriodKind::Month).unwrap();
        assert_eq!(monthly.artifacts.len(), 1);
        assert_eq!(monthly.artifacts[0].record_count, 3);
    }

    #[test]
    fn list_pending_reports_malformed_files_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        seed_artifact(&store, &week("2025-10"), 1);
        std::fs::write(dir.path().join("Semana11.json"), b"{ not json").unwrap();

        let scan = store.list_pending(PeriodKind::Week).unwrap();
        assert_eq!(scan.artifacts.len(), 1);
        assert_eq!(scan.rejected.len(), 1);
        assert!(scan.rejected[0].0.ends_with("Semana11.json"));
    }

    #[test]
    fn empty_declaration_leaves_pending_area_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let period = month("2025-05");

        store.mark_empty_declared(&period).unwrap();
        assert_eq!(store.status_of(&period), SubmissionStatus::EmptyDeclared);

        let scan = store.list_pending(PeriodKind::Month).unwrap();
        assert!(scan.artifacts.is_empty());
        assert!(scan.rejected.is_empty());
    }

    #[test]
    fn reopen_relocates_confirmed_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let period = week("2025-15");

        seed_artifact(&store, &period, 4);
        let artifact = store.load_artifact(&period).unwrap();
        store.commit(&artifact).unwrap();
        assert_eq!(store.status_of(&period), SubmissionStatus::Confirmed);

        let outcome = store.reopen(&period).unwrap();
        assert!(matches!(outcome, ReopenOutcome::Relocated { .. }));
        assert_eq!(store.status_of(&period), SubmissionStatus::Pending);
        assert!(!store.processed_path(&period).exists());
    }

    #[test]
    fn reopen_without_local_copy_awaits_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let period = week("2025-30");

        let outcome = store.reopen(&period).unwrap();
        assert_eq!(outcome, ReopenOutcome::AwaitingArtifact);
        assert_eq!(
            store.status_of(&period),
            SubmissionStatus::RectificationRequested
        );

        // A regenerated artifact re-enters the normal flow and the send
        // clears the marker.
        seed_artifact(&store, &period, 2);
        assert_eq!(store.status_of(&period), SubmissionStatus::Pending);
        store.mark_sent(&period, "R-9").unwrap();
        assert_eq!(store.status_of(&period), SubmissionStatus::Sent);
    }
}
