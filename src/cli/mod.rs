//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::ModelName;

/// Listing texts offered by `suggest --example N`.
pub const SAMPLE_LISTINGS: [&str; 4] = [
    "Charming cottage with beautiful views. The kitchen is fully equipped and there’s a cozy lounge to relax in. Guests can enjoy the outdoor seating area and the nearby countryside walks.",
    "Modern apartment with WiFi and a large smart TV. Fresh towels are provided. Great for couples or solo travelers looking for a quiet getaway.",
    "Welcome to our lovely home in BN3 2AB. We’re close to local shops and public transport. Great location for exploring the area!",
    "You’ll love staying here — super comfy bed and lots of natural light. It’s our favorite spot to unwind after a long day.",
];

/// Property Notes Extractor - turn free-text listings into structured fields.
///
/// Select notes by id and either extract them into the store (`persist`)
/// or into a CSV file (`export-csv`).
#[derive(Parser, Debug)]
#[command(name = "notes-extract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format: table or json.
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Backend base URL (overrides config and PROPERTY_NOTES_API_ENDPOINT).
    #[arg(long)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which notes to act on.
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Note ids to select (comma separated).
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["all", "selection_json"])]
    pub ids: Vec<i64>,

    /// Select every loaded note.
    #[arg(long, conflicts_with = "selection_json")]
    pub all: bool,

    /// Grid selection model as JSON, e.g. '{"type":"include","ids":[3,5]}'.
    #[arg(long)]
    pub selection_json: Option<String>,

    /// Note ids to drop from the selection (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<i64>,
}

/// Custom rules and model for extraction.
#[derive(Args, Debug, Default)]
pub struct ExtractionArgs {
    /// Custom extraction rules (markdown or plain text).
    #[arg(long, conflicts_with = "rules_file")]
    pub rules: Option<String>,

    /// Read custom extraction rules from a file.
    #[arg(long)]
    pub rules_file: Option<PathBuf>,

    /// AI model to use.
    #[arg(long)]
    pub model: Option<ModelName>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List property notes with their extracted fields.
    List,

    /// Extract the selected notes and store the fields in the backend.
    Persist {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Extract the selected notes and download the result as CSV.
    ExportCsv {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Output file path (defaults to the configured CSV file name).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the store and CSV extractions side by side on one selection.
    Process {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        extraction: ExtractionArgs,

        /// Output file path for the CSV.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract fields from a single free text.
    Extract {
        /// Property text (HTML or plain description).
        #[arg(required_unless_present = "file")]
        text: Option<String>,

        /// Read the property text from a file.
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Ask for suggestions to improve a listing text.
    Suggest {
        /// Listing text.
        #[arg(required_unless_present = "example")]
        input: Option<String>,

        /// Use one of the built-in sample listings (1-4).
        #[arg(short, long, conflicts_with = "input", value_parser = clap::value_parser!(u8).range(1..=4))]
        example: Option<u8>,
    },

    /// Reset the notes store to its seed state.
    Reset {
        /// Confirm the destructive reset.
        #[arg(long)]
        yes: bool,
    },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create the default configuration file if missing.
    Init,
    /// Print the effective configuration.
    Show,
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

/// Text chosen for `suggest`, from the argument or a sample listing.
#[must_use]
pub fn suggestion_input(input: Option<String>, example: Option<u8>) -> String {
    example
        .and_then(|n| SAMPLE_LISTINGS.get(usize::from(n).saturating_sub(1)))
        .map_or_else(|| input.unwrap_or_default(), |s| (*s).to_string())
}
