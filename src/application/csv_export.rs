//! CSV materialization of extraction results.
//!
//! Columns follow the header mapping order, not the field order of the
//! records. A key missing from a record renders as an empty cell.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AppError, Result};

/// One output column: display label and the record key it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderColumn {
    pub label: String,
    pub key: String,
}

impl HeaderColumn {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

/// Ordered list of output columns.
pub type HeaderMapping = Vec<HeaderColumn>;

/// Columns used for AI-extracted notes.
#[must_use]
pub fn extraction_headers() -> HeaderMapping {
    [
        ("Access Instructions", "access_instructions"),
        ("Confidence Tip", "confidence_tip"),
        ("Confidence Score", "confidence_score"),
        ("Parking Info", "parking_info"),
        ("Amenities", "amenities"),
        ("Postcode", "postcode"),
        ("City", "city"),
    ]
    .into_iter()
    .map(|(label, key)| HeaderColumn::new(label, key))
    .collect()
}

/// A generated CSV file, held in memory until written.
#[derive(Debug, Clone)]
pub struct CsvArtifact {
    pub filename: String,
    pub content: Vec<u8>,
    pub rows: usize,
    pub columns: usize,
    pub generated_at: DateTime<Utc>,
}

impl CsvArtifact {
    /// Write the artifact to `path`, creating parent directories.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io(format!("Failed to create {}", parent.display()), e))?;
        }

        std::fs::write(path, &self.content)
            .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

        tracing::info!(
            path = %path.display(),
            rows = self.rows,
            columns = self.columns,
            "CSV written"
        );
        Ok(())
    }
}

/// Builds CSV artifacts from serializable records.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    filename: String,
}

impl CsvExporter {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    /// Render `records` into a CSV with one row per record.
    ///
    /// # Errors
    /// Returns error if a record does not serialize to a JSON object.
    pub fn materialize<T: Serialize>(
        &self,
        records: &[T],
        headers: &[HeaderColumn],
    ) -> Result<CsvArtifact> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(headers.iter().map(|h| h.label.as_str()))
            .map_err(AppError::csv)?;

        for (index, record) in records.iter().enumerate() {
            let value = serde_json::to_value(record).map_err(AppError::json_parse)?;
            let fields = value.as_object().ok_or_else(|| AppError::InvalidData {
                message: format!("CSV record {index} is not an object"),
            })?;

            let row: Vec<String> = headers
                .iter()
                .map(|h| fields.get(&h.key).map(cell_text).unwrap_or_default())
                .collect();
            writer.write_record(&row).map_err(AppError::csv)?;
        }

        let content = writer
            .into_inner()
            .map_err(|e| AppError::io("Failed to flush CSV buffer", e.into_error()))?;

        Ok(CsvArtifact {
            filename: self.filename.clone(),
            content,
            rows: records.len(),
            columns: headers.len(),
            generated_at: Utc::now(),
        })
    }
}

/// Text of a single cell. Nulls are empty, other non-strings are JSON.
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}
