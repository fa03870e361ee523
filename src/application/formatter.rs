//! Output formatting for notes, run states and extraction results.
//!
//! Supports a table view for the terminal and JSON for programmatic use.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::domain::{ConfidenceSummary, ExtractedFields, PropertyNote, RunPath, RunState};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Table listing.
    #[default]
    Table,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: table, json")),
        }
    }
}

/// Formats notes as a table, in the order given.
pub fn format_notes_table(notes: &[PropertyNote]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID",
        "Raw Text",
        "Postcode",
        "Parking Info",
        "City",
        "Access Instructions",
        "Amenities",
        "Score",
        "Confidence Tip",
    ]);

    for note in notes {
        table.add_row(vec![
            note.id.to_string(),
            truncate(&note.raw_text, 60),
            cell(note.postcode.as_deref()),
            cell(note.parking_info.as_deref()),
            cell(note.city.as_deref()),
            cell(note.access_instructions.as_deref()),
            cell(note.amenities.as_deref()),
            note.confidence_score
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            cell(note.confidence_tip.as_deref()),
        ]);
    }

    table.to_string()
}

/// Formats notes as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_notes_json(notes: &[PropertyNote]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(notes)
}

/// Formats extraction results as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_extracted_json(results: &[ExtractedFields]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}

/// Warning and error banners for the confidence summary, if any apply.
pub fn format_confidence_banners(summary: &ConfidenceSummary) -> Vec<String> {
    let mut banners = Vec::new();

    if summary.warning > 0 {
        banners.push(
            format!(
                "⚠ Warning: {} values that need attention",
                summary.warning
            )
            .yellow()
            .bold()
            .to_string(),
        );
    }

    if summary.error > 0 {
        banners.push(
            format!(
                "✗ Error: {} values that need urgent attention",
                summary.error
            )
            .red()
            .bold()
            .to_string(),
        );
    }

    banners
}

/// Formats the confidence counts for display.
pub fn format_confidence_summary(summary: &ConfidenceSummary) -> String {
    format!(
        "{}\n  Confident: {}\n  Needs attention: {}\n  Needs urgent attention: {}",
        "📊 Confidence".bold(),
        summary.positive.to_string().green(),
        summary.warning.to_string().yellow(),
        summary.error.to_string().red()
    )
}

/// One status line for a workflow path.
pub fn format_run_state(path: RunPath, state: &RunState) -> String {
    let label = format!("[{path}]").bold();
    if let Some(reason) = state.error() {
        return format!("{label} {} {}", "failed:".red(), reason.red().bold());
    }

    let state_text = match state {
        RunState::Idle => state.to_string().dimmed(),
        RunState::InFlight => state.to_string().cyan(),
        _ => state.to_string().green(),
    };
    format!("{label} {state_text}")
}

fn cell(value: Option<&str>) -> String {
    value.map_or_else(|| "-".to_string(), |v| truncate(v, 40))
}

/// Truncates to the first line and at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
