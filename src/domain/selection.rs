//! Operator selection of notes.
//!
//! The selection is an unordered id set. Grid widgets hand over their
//! selection in more than one shape, so the raw shape is decoded once at
//! the boundary by [`SelectionModel::decode`].

use std::collections::BTreeSet;

use serde::Deserialize;

use super::models::PropertyNote;

/// Ids currently chosen by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<i64>,
}

impl SelectionSet {
    /// Build a selection from explicit ids (duplicates collapse).
    #[cfg(test)]
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }

    pub fn insert(&mut self, id: i64) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: i64) -> bool {
        self.ids.remove(&id)
    }

    /// Replace the whole selection.
    pub fn replace(&mut self, ids: impl IntoIterator<Item = i64>) {
        self.ids = ids.into_iter().collect();
    }

    /// Replace the selection from a decoded grid model.
    pub fn apply(&mut self, model: SelectionModel) {
        match model {
            SelectionModel::Explicit(ids) => self.replace(ids),
            SelectionModel::Unrecognized => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that are not present in `notes`. Returns how many were dropped.
    pub fn retain_known(&mut self, notes: &[PropertyNote]) -> usize {
        let before = self.ids.len();
        let known: BTreeSet<i64> = notes.iter().map(|n| n.id).collect();
        self.ids.retain(|id| known.contains(id));
        before - self.ids.len()
    }

    /// Raw texts of the selected notes, in the order of `notes`.
    #[must_use]
    pub fn raw_texts(&self, notes: &[PropertyNote]) -> Vec<String> {
        notes
            .iter()
            .filter(|n| self.contains(n.id))
            .map(|n| n.raw_text.clone())
            .collect()
    }
}

/// A selection handed over by a grid, after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionModel {
    /// `{"type": "include", "ids": [...]}` or a bare `[...]`.
    Explicit(Vec<i64>),
    /// Any other shape. Applies as an empty selection.
    Unrecognized,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum IncludeTag {
    Include,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Include {
        #[serde(rename = "type")]
        _kind: IncludeTag,
        ids: Vec<i64>,
    },
    List(Vec<i64>),
}

impl SelectionModel {
    /// Decode a grid selection value. Never fails.
    #[must_use]
    pub fn decode(value: &serde_json::Value) -> Self {
        match RawSelection::deserialize(value) {
            Ok(RawSelection::Include { ids, .. } | RawSelection::List(ids)) => Self::Explicit(ids),
            Err(e) => {
                tracing::debug!(error = %e, "Unrecognized selection shape");
                Self::Unrecognized
            }
        }
    }

    /// Decode from JSON text; unparsable text is treated as unrecognized.
    #[must_use]
    pub fn decode_str(json: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => Self::decode(&value),
            Err(e) => {
                tracing::warn!(error = %e, "Selection is not valid JSON, using empty selection");
                Self::Unrecognized
            }
        }
    }
}
