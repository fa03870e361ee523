//! Recording mock clients for workflow tests.
//!
//! Clones share state, so a test can keep a handle while the controller
//! owns another.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::domain::{AiModel, AppError, ExtractedFields, PropertyNote, Result};

use super::clients::{ExtractionClient, NotesRepository};

/// A call received by [`MockRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoCall {
    List,
    BulkApply {
        ids: Vec<i64>,
        ai_model: AiModel,
        custom_rules: String,
    },
    Reset,
}

#[derive(Default)]
struct RepoState {
    notes: Vec<PropertyNote>,
    calls: Vec<RepoCall>,
    fail_list: bool,
    fail_bulk: bool,
    fail_reset: bool,
}

/// In-memory notes repository. `bulk_apply` fills in fields for the ids.
#[derive(Clone, Default)]
pub struct MockRepository {
    state: Arc<Mutex<RepoState>>,
}

impl MockRepository {
    pub fn with_notes(notes: Vec<PropertyNote>) -> Self {
        let repo = Self::default();
        repo.state.lock().unwrap().notes = notes;
        repo
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn list_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RepoCall::List))
            .count()
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    pub fn fail_bulk(&self, fail: bool) {
        self.state.lock().unwrap().fail_bulk = fail;
    }

    pub fn fail_reset(&self, fail: bool) {
        self.state.lock().unwrap().fail_reset = fail;
    }
}

fn unavailable() -> AppError {
    AppError::repository_unavailable(AppError::Transport {
        message: "connection refused".into(),
        source: None,
    })
}

#[async_trait]
impl NotesRepository for MockRepository {
    async fn list_notes(&self) -> Result<Vec<PropertyNote>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RepoCall::List);
        if state.fail_list {
            return Err(unavailable());
        }
        Ok(state.notes.clone())
    }

    async fn bulk_apply(&self, ids: &[i64], ai_model: AiModel, custom_rules: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RepoCall::BulkApply {
            ids: ids.to_vec(),
            ai_model,
            custom_rules: custom_rules.to_string(),
        });
        if state.fail_bulk {
            return Err(unavailable());
        }
        for note in state.notes.iter_mut().filter(|n| ids.contains(&n.id)) {
            note.city = Some("Brighton".into());
            note.confidence_score = Some(10);
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RepoCall::Reset);
        if state.fail_reset {
            return Err(unavailable());
        }
        state.notes.clear();
        Ok(())
    }
}

#[derive(Default)]
struct ExtractorState {
    batches: Vec<Vec<String>>,
    rules: Vec<String>,
    fail: bool,
    drop_last: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

/// Extraction service mock. Each text `t` yields postcode `"PC t"`.
#[derive(Clone, Default)]
pub struct MockExtractor {
    state: Arc<Mutex<ExtractorState>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().batches.clone()
    }

    pub fn rules(&self) -> Vec<String> {
        self.state.lock().unwrap().rules.clone()
    }

    pub fn fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Return one result fewer than requested.
    pub fn drop_last(&self, drop: bool) {
        self.state.lock().unwrap().drop_last = drop;
    }

    /// Signal `started` on each call, then wait for `release`.
    pub fn gate(&self, started: Arc<Notify>, release: Arc<Notify>) {
        self.state.lock().unwrap().gate = Some((started, release));
    }
}

#[async_trait]
impl ExtractionClient for MockExtractor {
    async fn extract(
        &self,
        raw_texts: &[String],
        custom_rules: &str,
        _ai_model: AiModel,
    ) -> Result<Vec<ExtractedFields>> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.batches.push(raw_texts.to_vec());
            state.rules.push(custom_rules.to_string());
            state.gate.clone()
        };

        if let Some((started, release)) = gate {
            started.notify_one();
            release.notified().await;
        }

        let state = self.state.lock().unwrap();
        if state.fail {
            return Err(AppError::extraction_failed(AppError::Api {
                status: 500,
                message: "upstream model error".into(),
            }));
        }

        let mut results: Vec<ExtractedFields> = raw_texts
            .iter()
            .map(|t| ExtractedFields {
                postcode: Some(format!("PC {t}")),
                ..Default::default()
            })
            .collect();
        if state.drop_last {
            results.pop();
        }
        Ok(results)
    }
}
