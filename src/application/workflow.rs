//! Selection-driven extraction workflow.
//!
//! [`WorkflowController`] owns the operator session (note cache, selection,
//! per-path run state and CSV buffer) and drives the two extraction paths:
//!
//! - **persist**: ask the repository to extract and store fields for the
//!   selected notes, then re-list to observe the result.
//! - **csv**: send the selected raw texts to the extraction service and
//!   buffer the results until a download is triggered.
//!
//! The session lock is never held across a network call, so both paths can
//! run at the same time. A path that is already in flight refuses a second
//! trigger.

use tokio::sync::Mutex;

use crate::domain::{
    AppError, ConfidenceSummary, ExtractedFields, ExtractionOptions, PropertyNote, Result,
    RunOutcome, RunState, SelectionModel, SelectionSet, SkipReason,
};

use super::clients::{ExtractionClient, NotesRepository};
use super::csv_export::{extraction_headers, CsvArtifact, CsvExporter};

pub const LOAD_FAILED: &str = "Failed to load property notes.";
pub const PERSIST_FAILED: &str = "Failed to process selected rows.";
pub const CSV_FAILED: &str = "Failed to extract with AI.";

/// In-memory state of one operator session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    notes: Vec<PropertyNote>,
    selection: SelectionSet,
    persist: RunState,
    csv: RunState,
    csv_buffer: Vec<ExtractedFields>,
    csv_ready: bool,
    load_error: Option<String>,
}

impl Session {
    /// Last successfully loaded notes.
    #[must_use]
    pub fn notes(&self) -> &[PropertyNote] {
        &self.notes
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    #[must_use]
    pub const fn persist_state(&self) -> &RunState {
        &self.persist
    }

    #[must_use]
    pub const fn csv_state(&self) -> &RunState {
        &self.csv
    }

    /// Results of the last successful CSV preparation.
    #[cfg(test)]
    #[must_use]
    pub fn csv_buffer(&self) -> &[ExtractedFields] {
        &self.csv_buffer
    }

    /// Whether a download is currently available.
    #[cfg(test)]
    #[must_use]
    pub const fn csv_ready(&self) -> bool {
        self.csv_ready
    }

    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    fn replace_notes(&mut self, notes: Vec<PropertyNote>) {
        self.notes = notes;
        self.load_error = None;
        let dropped = self.selection.retain_known(&self.notes);
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped selected ids no longer in the note list");
        }
    }

    /// Render the ready buffer with `render`. The ready flag is cleared only
    /// once rendering succeeds.
    fn take_download<T>(
        &mut self,
        render: impl FnOnce(&[ExtractedFields]) -> Result<T>,
    ) -> Result<Option<T>> {
        if !self.csv_ready {
            return Ok(None);
        }
        let rendered = render(&self.csv_buffer)?;
        self.csv_ready = false;
        Ok(Some(rendered))
    }
}

/// Drives the persist and CSV extraction paths over a shared session.
pub struct WorkflowController<R, E> {
    repository: R,
    extractor: E,
    exporter: CsvExporter,
    options: ExtractionOptions,
    session: Mutex<Session>,
}

impl<R, E> WorkflowController<R, E>
where
    R: NotesRepository,
    E: ExtractionClient,
{
    pub fn new(repository: R, extractor: E, exporter: CsvExporter) -> Self {
        Self {
            repository,
            extractor,
            exporter,
            options: ExtractionOptions::default(),
            session: Mutex::new(Session::default()),
        }
    }

    /// Use custom rules and model selection for both paths.
    #[must_use]
    pub fn with_options(mut self, options: ExtractionOptions) -> Self {
        self.options = options;
        self
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }

    /// Refresh the note cache from the repository.
    ///
    /// On failure the cache is left as it was and the load error is set.
    ///
    /// # Errors
    /// Returns the repository error.
    pub async fn load_notes(&self) -> Result<usize> {
        match self.repository.list_notes().await {
            Ok(notes) => {
                let count = notes.len();
                self.session.lock().await.replace_notes(notes);
                tracing::info!(count, "Loaded property notes");
                Ok(count)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch property notes");
                self.session.lock().await.load_error = Some(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Replace the selection from a grid selection model.
    ///
    /// Ids not present in the loaded notes are ignored. Returns the new
    /// selection size.
    pub async fn select(&self, model: SelectionModel) -> usize {
        let mut session = self.session.lock().await;
        let Session {
            notes, selection, ..
        } = &mut *session;
        selection.apply(model);
        let dropped = selection.retain_known(notes);
        if dropped > 0 {
            tracing::warn!(dropped, "Ignoring selected ids that are not loaded");
        }
        selection.len()
    }

    /// Replace the selection with explicit ids.
    pub async fn select_ids(&self, ids: impl IntoIterator<Item = i64>) -> usize {
        self.select(SelectionModel::Explicit(ids.into_iter().collect()))
            .await
    }

    /// Select every loaded note.
    pub async fn select_all(&self) -> usize {
        let mut session = self.session.lock().await;
        let Session {
            notes, selection, ..
        } = &mut *session;
        for note in notes.iter() {
            selection.insert(note.id);
        }
        selection.len()
    }

    /// Drop ids from the selection. Returns the new selection size.
    pub async fn deselect(&self, ids: impl IntoIterator<Item = i64>) -> usize {
        let mut session = self.session.lock().await;
        for id in ids {
            session.selection.remove(id);
        }
        session.selection.len()
    }

    pub async fn clear_selection(&self) {
        self.session.lock().await.selection.clear();
    }

    /// Extract and persist fields for the selected notes.
    ///
    /// On success the cache is re-listed and the selection cleared. A failed
    /// re-list is reported as a warning only. On failure the selection is
    /// kept so the same batch can be retried.
    pub async fn run_persist(&self) -> RunOutcome {
        let ids = {
            let mut session = self.session.lock().await;
            if session.selection.is_empty() {
                return skipped(SkipReason::NothingSelected);
            }
            if let Err(reason) = session.persist.begin() {
                return skipped(reason);
            }
            session.selection.ids()
        };

        tracing::info!(count = ids.len(), "Extracting selected notes into the repository");

        if let Err(e) = self
            .repository
            .bulk_apply(&ids, self.options.ai_model, &self.options.custom_rules)
            .await
        {
            tracing::error!(error = %e, "Error sending to /bulk-property-notes");
            self.session.lock().await.persist.fail(PERSIST_FAILED);
            return RunOutcome::Failed {
                message: PERSIST_FAILED.to_string(),
            };
        }

        let refreshed = self.repository.list_notes().await;

        let mut session = self.session.lock().await;
        let warning = match refreshed {
            Ok(notes) => {
                tracing::info!(count = notes.len(), "Refreshed property notes");
                session.replace_notes(notes);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Notes were processed but the refresh failed");
                Some(format!(
                    "Selected rows were processed but the note list could not be refreshed: {e}"
                ))
            }
        };

        session.selection.clear();
        session.persist.succeed();

        RunOutcome::Succeeded { warning }
    }

    /// Extract the selected notes' raw texts and buffer them for CSV.
    ///
    /// Raw texts are sent in note-list order. On failure the previous buffer
    /// and ready flag are left as they were.
    pub async fn run_csv_prepare(&self) -> RunOutcome {
        let raw_texts = {
            let mut session = self.session.lock().await;
            if session.selection.is_empty() {
                return skipped(SkipReason::NothingSelected);
            }
            if let Err(reason) = session.csv.begin() {
                return skipped(reason);
            }
            session.selection.raw_texts(&session.notes)
        };

        tracing::info!(count = raw_texts.len(), "Extracting selected notes for CSV");

        let extracted = self
            .extractor
            .extract(&raw_texts, &self.options.custom_rules, self.options.ai_model)
            .await
            .and_then(|results| {
                if results.len() == raw_texts.len() {
                    Ok(results)
                } else {
                    Err(AppError::extraction_failed(AppError::MalformedResponse {
                        message: format!(
                            "expected {} results, got {}",
                            raw_texts.len(),
                            results.len()
                        ),
                    }))
                }
            });

        let mut session = self.session.lock().await;
        match extracted {
            Ok(results) => {
                tracing::info!(count = results.len(), "CSV data ready");
                session.csv_buffer = results;
                session.csv_ready = true;
                session.csv.succeed();
                RunOutcome::Succeeded { warning: None }
            }
            Err(e) => {
                tracing::error!(error = %e, "AI extraction failed");
                session.csv.fail(CSV_FAILED);
                RunOutcome::Failed {
                    message: CSV_FAILED.to_string(),
                }
            }
        }
    }

    /// Trigger a download of the CSV buffer.
    ///
    /// Returns `None` unless a preparation has succeeded since the last
    /// download. A render failure leaves the download ready.
    ///
    /// # Errors
    /// Returns error if the buffer cannot be rendered as CSV.
    pub async fn download_csv(&self) -> Result<Option<CsvArtifact>> {
        let artifact = self
            .session
            .lock()
            .await
            .take_download(|buffer| self.exporter.materialize(buffer, &extraction_headers()))?;

        if artifact.is_none() {
            tracing::debug!("CSV download requested but nothing is ready");
        }
        Ok(artifact)
    }

    /// Reset the repository and reload. Best effort: failures are logged
    /// and reported only through the return value.
    pub async fn reset_store(&self) -> bool {
        if let Err(e) = self.repository.reset().await {
            tracing::warn!(error = %e, "Failed to reset DB");
            return false;
        }

        tracing::info!("Repository reset");
        if let Err(e) = self.load_notes().await {
            tracing::warn!(error = %e, "Reset succeeded but reload failed");
        }
        true
    }

    /// Confidence buckets over the cached notes.
    pub async fn confidence_summary(&self) -> ConfidenceSummary {
        ConfidenceSummary::from_notes(&self.session.lock().await.notes)
    }
}

fn skipped(reason: SkipReason) -> RunOutcome {
    tracing::debug!(%reason, "Run not started");
    RunOutcome::Skipped { reason }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::application::testing::{MockExtractor, MockRepository, RepoCall};
    use crate::domain::AiModel;

    fn seed() -> Vec<PropertyNote> {
        vec![
            PropertyNote::unextracted(3, "raw A"),
            PropertyNote::unextracted(5, "raw B"),
            PropertyNote::unextracted(7, "raw C"),
        ]
    }

    async fn loaded(
        repo: &MockRepository,
        extractor: &MockExtractor,
    ) -> WorkflowController<MockRepository, MockExtractor> {
        let controller = WorkflowController::new(
            repo.clone(),
            extractor.clone(),
            CsvExporter::new("ai_extracted_notes.csv"),
        )
        .with_options(ExtractionOptions::default().with_rules("UK postcodes only"));
        controller.load_notes().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn test_csv_batch_follows_cache_order() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        controller.select_ids([5, 3]).await;
        let outcome = controller.run_csv_prepare().await;

        assert!(outcome.is_success());
        assert_eq!(extractor.batches(), vec![vec!["raw A".to_string(), "raw B".to_string()]]);
        assert_eq!(extractor.rules(), vec!["UK postcodes only".to_string()]);

        let session = controller.snapshot().await;
        assert!(session.csv_ready());
        assert_eq!(session.csv_state(), &RunState::Succeeded);
        assert_eq!(session.csv_buffer().len(), 2);
        assert_eq!(session.csv_buffer()[0].postcode.as_deref(), Some("PC raw A"));
        // csv path does not touch the selection
        assert_eq!(session.selection().ids(), vec![3, 5]);
    }

    #[tokio::test]
    async fn test_persist_success_refreshes_and_clears_selection() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        controller.select_ids([3, 5]).await;
        let outcome = controller.run_persist().await;

        assert_eq!(outcome, RunOutcome::Succeeded { warning: None });
        assert_eq!(
            repo.calls(),
            vec![
                RepoCall::List,
                RepoCall::BulkApply {
                    ids: vec![3, 5],
                    ai_model: AiModel::default(),
                    custom_rules: "UK postcodes only".into()
                },
                RepoCall::List,
            ]
        );

        let session = controller.snapshot().await;
        assert!(session.selection().is_empty());
        assert_eq!(session.persist_state(), &RunState::Succeeded);
        let extracted: Vec<i64> = session
            .notes()
            .iter()
            .filter(|n| n.is_extracted())
            .map(|n| n.id)
            .collect();
        assert_eq!(extracted, vec![3, 5]);
        assert!(extractor.batches().is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_selection_and_skips_refresh() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        controller.select_ids([3, 5]).await;
        repo.fail_bulk(true);
        let outcome = controller.run_persist().await;

        assert_eq!(
            outcome,
            RunOutcome::Failed {
                message: PERSIST_FAILED.into()
            }
        );
        assert_eq!(repo.list_count(), 1);

        let session = controller.snapshot().await;
        assert_eq!(session.selection().ids(), vec![3, 5]);
        assert_eq!(session.persist_state().error(), Some(PERSIST_FAILED));

        // retry sends the same batch
        repo.fail_bulk(false);
        assert!(controller.run_persist().await.is_success());
        let bulk_ids: Vec<Vec<i64>> = repo
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RepoCall::BulkApply { ids, .. } => Some(ids),
                _ => None,
            })
            .collect();
        assert_eq!(bulk_ids, vec![vec![3, 5], vec![3, 5]]);
    }

    #[tokio::test]
    async fn test_persist_refresh_failure_is_only_a_warning() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        controller.select_ids([7]).await;
        repo.fail_list(true);
        let outcome = controller.run_persist().await;

        let RunOutcome::Succeeded { warning: Some(_) } = outcome else {
            panic!("expected success with warning, got {outcome:?}");
        };
        let session = controller.snapshot().await;
        assert!(session.selection().is_empty());
        assert_eq!(session.persist_state(), &RunState::Succeeded);
        // stale cache is kept
        assert_eq!(session.notes(), seed().as_slice());
    }

    #[tokio::test]
    async fn test_empty_selection_issues_no_calls() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        let skipped = RunOutcome::Skipped {
            reason: SkipReason::NothingSelected,
        };
        assert_eq!(controller.run_persist().await, skipped);
        assert_eq!(controller.run_csv_prepare().await, skipped);

        assert_eq!(repo.calls(), vec![RepoCall::List]);
        assert!(extractor.batches().is_empty());
        let session = controller.snapshot().await;
        assert_eq!(session.persist_state(), &RunState::Idle);
        assert_eq!(session.csv_state(), &RunState::Idle);
    }

    #[tokio::test]
    async fn test_csv_ready_cleared_by_download_only() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        assert!(controller.download_csv().await.unwrap().is_none());

        controller.select_ids([3]).await;
        controller.run_csv_prepare().await;
        assert!(controller.snapshot().await.csv_ready());

        let artifact = controller.download_csv().await.unwrap().unwrap();
        assert_eq!(artifact.filename, "ai_extracted_notes.csv");
        assert_eq!(artifact.rows, 1);
        assert_eq!(artifact.columns, 7);

        let session = controller.snapshot().await;
        assert!(!session.csv_ready());
        assert_eq!(session.csv_buffer().len(), 1);
        assert!(controller.download_csv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_csv_failure_keeps_previous_buffer() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        controller.select_ids([3]).await;
        controller.run_csv_prepare().await;
        controller.download_csv().await.unwrap();

        extractor.fail(true);
        controller.select_ids([3, 5, 7]).await;
        let outcome = controller.run_csv_prepare().await;

        assert_eq!(
            outcome,
            RunOutcome::Failed {
                message: CSV_FAILED.into()
            }
        );
        let session = controller.snapshot().await;
        assert!(!session.csv_ready());
        assert_eq!(session.csv_buffer().len(), 1);
        assert_eq!(session.csv_state().error(), Some(CSV_FAILED));
        assert_eq!(session.persist_state(), &RunState::Idle);
    }

    #[tokio::test]
    async fn test_short_extraction_result_fails_the_run() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        extractor.drop_last(true);
        controller.select_ids([3, 5]).await;
        let outcome = controller.run_csv_prepare().await;

        assert!(matches!(outcome, RunOutcome::Failed { .. }));
        assert!(!controller.snapshot().await.csv_ready());
    }

    #[tokio::test]
    async fn test_second_trigger_while_in_flight_is_refused() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        extractor.gate(Arc::clone(&started), Arc::clone(&release));
        let controller = loaded(&repo, &extractor).await;
        controller.select_ids([3]).await;

        let second = async {
            started.notified().await;
            assert!(controller.snapshot().await.csv_state().is_in_flight());
            let outcome = controller.run_csv_prepare().await;
            release.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(controller.run_csv_prepare(), second);

        assert!(first.is_success());
        assert_eq!(
            second,
            RunOutcome::Skipped {
                reason: SkipReason::AlreadyInFlight
            }
        );
        assert_eq!(extractor.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_paths_run_concurrently_and_independently() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        extractor.gate(Arc::clone(&started), Arc::clone(&release));
        let controller = loaded(&repo, &extractor).await;
        controller.select_ids([3, 5]).await;

        // persist runs to completion while the csv extraction is in flight
        let persist = async {
            started.notified().await;
            let outcome = controller.run_persist().await;
            release.notify_one();
            outcome
        };
        let (csv, persist) = tokio::join!(controller.run_csv_prepare(), persist);

        assert!(persist.is_success());
        assert!(csv.is_success());
        let session = controller.snapshot().await;
        assert!(session.csv_ready());
        assert_eq!(session.csv_buffer().len(), 2);
        assert!(session.selection().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_cache() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        repo.fail_list(true);
        assert!(controller.load_notes().await.is_err());

        let session = controller.snapshot().await;
        assert_eq!(session.notes().len(), 3);
        assert_eq!(session.load_error(), Some(LOAD_FAILED));
    }

    #[tokio::test]
    async fn test_selection_ignores_unloaded_ids() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        assert_eq!(controller.select_ids([3, 42]).await, 1);
        assert_eq!(
            controller
                .select(SelectionModel::decode_str(r#"{"type":"include","ids":[5,7]}"#))
                .await,
            2
        );
        assert_eq!(controller.select(SelectionModel::decode_str("{}")).await, 0);
        assert_eq!(controller.select_all().await, 3);
    }

    #[tokio::test]
    async fn test_deselect_and_clear() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        controller.select_all().await;
        assert_eq!(controller.deselect([5, 42]).await, 2);
        assert_eq!(controller.snapshot().await.selection().ids(), vec![3, 7]);

        controller.clear_selection().await;
        assert!(controller.snapshot().await.selection().is_empty());
        assert_eq!(
            controller.run_persist().await,
            RunOutcome::Skipped {
                reason: SkipReason::NothingSelected
            }
        );
    }

    #[test]
    fn test_failed_render_keeps_download_ready() {
        let mut session = Session {
            csv_buffer: vec![ExtractedFields::default()],
            csv_ready: true,
            ..Session::default()
        };

        let err = session
            .take_download(|_| -> Result<()> {
                Err(AppError::InvalidData {
                    message: "unrenderable".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidData { .. }));
        assert!(session.csv_ready());

        let rows = session.take_download(|buffer| Ok(buffer.len())).unwrap();
        assert_eq!(rows, Some(1));
        assert!(!session.csv_ready());
        assert_eq!(session.take_download(|buffer| Ok(buffer.len())).unwrap(), None);
    }

    #[tokio::test]
    async fn test_reset_is_best_effort() {
        let repo = MockRepository::with_notes(seed());
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        repo.fail_reset(true);
        assert!(!controller.reset_store().await);
        assert_eq!(controller.snapshot().await.notes().len(), 3);

        repo.fail_reset(false);
        assert!(controller.reset_store().await);
        assert!(controller.snapshot().await.notes().is_empty());
    }

    #[tokio::test]
    async fn test_confidence_summary_over_cache() {
        let mut notes = seed();
        notes[0].confidence_score = Some(10);
        notes[1].confidence_score = Some(8);
        notes[2].confidence_score = Some(3);
        let repo = MockRepository::with_notes(notes);
        let extractor = MockExtractor::new();
        let controller = loaded(&repo, &extractor).await;

        let summary = controller.confidence_summary().await;
        assert_eq!((summary.positive, summary.warning, summary.error), (1, 1, 1));
    }
}
