//! Property Notes Extractor - drive AI field extraction over property listings.
//!
//! Loads free-text property notes from the notes backend, lets the operator
//! select a subset, and runs the AI extraction either into the backend
//! (`persist`) or into a downloadable CSV (`export-csv`).
//!
//! QUICK START:
//!   notes-extract list                          # Show notes and confidence
//!   notes-extract persist --ids 3,5             # Extract into the store
//!   notes-extract export-csv --all -o out.csv   # Extract into a CSV file
//!   notes-extract suggest --example 2           # Rewrite suggestions

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_confidence_banners, format_confidence_summary, format_extracted_json,
    format_notes_json, format_notes_table, format_run_state, CsvExporter, ExtractionClient,
    OutputFormat, SuggestionClient, WorkflowController,
};
use cli::{Cli, Commands, ConfigAction, ExtractionArgs, SelectionArgs};
use domain::{
    AppConfig, AppError, ExtractionOptions, PropertyNote, RunOutcome, RunPath, SelectionModel,
};
use infrastructure::{ensure_config_exists, load_config, resolve_custom_rules, ApiClient};

type Controller = WorkflowController<ApiClient, ApiClient>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;

    let config = load_config()?.with_endpoint(cli.endpoint);

    match cli.command {
        Commands::List => cmd_list(&config, format).await,
        Commands::Persist {
            selection,
            extraction,
        } => cmd_persist(&config, &selection, &extraction, format).await,
        Commands::ExportCsv {
            selection,
            extraction,
            output,
        } => cmd_export_csv(&config, &selection, &extraction, output.as_deref()).await,
        Commands::Process {
            selection,
            extraction,
            output,
        } => cmd_process(&config, &selection, &extraction, output.as_deref(), format).await,
        Commands::Extract {
            text,
            file,
            extraction,
        } => cmd_extract(&config, text, file.as_deref(), &extraction).await,
        Commands::Suggest { input, example } => {
            cmd_suggest(&config, &cli::suggestion_input(input, example)).await
        }
        Commands::Reset { yes } => cmd_reset(&config, yes).await,
        Commands::Config { action } => cmd_config(&config, &action),
    }
}

/// List notes command.
async fn cmd_list(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let controller = build_controller(config, ExtractionOptions::default())?;
    if let Err(e) = controller.load_notes().await {
        if let Some(banner) = controller.snapshot().await.load_error() {
            eprintln!("{}", banner.red());
        }
        return Err(e);
    }

    let session = controller.snapshot().await;
    print_notes(session.notes(), format)?;

    if matches!(format, OutputFormat::Table) {
        let extracted = session.notes().iter().filter(|n| n.is_extracted()).count();
        println!("{extracted} of {} notes extracted", session.notes().len());

        let summary = controller.confidence_summary().await;
        println!();
        for banner in format_confidence_banners(&summary) {
            println!("{banner}");
        }
        println!("{}", format_confidence_summary(&summary));
    }

    Ok(())
}

/// Extract selected notes into the store.
async fn cmd_persist(
    config: &AppConfig,
    selection: &SelectionArgs,
    extraction: &ExtractionArgs,
    format: OutputFormat,
) -> domain::Result<()> {
    let controller = build_controller(config, extraction_options(config, extraction)?)?;
    prepare_selection(&controller, selection).await?;

    println!("{}", "Extracting Free Text to DB...".cyan());
    let outcome = controller.run_persist().await;
    let session = controller.snapshot().await;
    println!("{}", format_run_state(RunPath::Persist, session.persist_state()));

    if outcome.is_success() {
        print_notes(session.notes(), format)?;
    }
    report_outcome(RunPath::Persist, outcome)
}

/// Extract selected notes and write the CSV download.
async fn cmd_export_csv(
    config: &AppConfig,
    selection: &SelectionArgs,
    extraction: &ExtractionArgs,
    output: Option<&Path>,
) -> domain::Result<()> {
    let controller = build_controller(config, extraction_options(config, extraction)?)?;
    prepare_selection(&controller, selection).await?;

    println!("{}", "Extracting for CSV...".cyan());
    let outcome = controller.run_csv_prepare().await;
    let session = controller.snapshot().await;
    println!("{}", format_run_state(RunPath::CsvPrepare, session.csv_state()));
    report_outcome(RunPath::CsvPrepare, outcome)?;

    download_csv(&controller, config, output).await
}

/// Run both paths at once against the same selection.
async fn cmd_process(
    config: &AppConfig,
    selection: &SelectionArgs,
    extraction: &ExtractionArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> domain::Result<()> {
    let controller = build_controller(config, extraction_options(config, extraction)?)?;
    prepare_selection(&controller, selection).await?;

    println!("{}", "Extracting to DB and for CSV...".cyan());
    let (persist, csv) = tokio::join!(controller.run_persist(), controller.run_csv_prepare());

    let session = controller.snapshot().await;
    println!("{}", format_run_state(RunPath::Persist, session.persist_state()));
    println!("{}", format_run_state(RunPath::CsvPrepare, session.csv_state()));

    if persist.is_success() {
        print_notes(session.notes(), format)?;
    }
    if csv.is_success() {
        download_csv(&controller, config, output).await?;
    }

    let csv_result = report_outcome(RunPath::CsvPrepare, csv);
    report_outcome(RunPath::Persist, persist)?;
    csv_result
}

/// Single free-text extraction.
async fn cmd_extract(
    config: &AppConfig,
    text: Option<String>,
    file: Option<&Path>,
    extraction: &ExtractionArgs,
) -> domain::Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?,
        None => text.unwrap_or_default(),
    };

    let options = extraction_options(config, extraction)?;
    let client = ApiClient::new(&config.api)?;

    let results = client
        .extract(&[text], &options.custom_rules, options.ai_model)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error sending to /ask"))?;

    println!(
        "{}",
        format_extracted_json(&results).map_err(AppError::json_parse)?
    );
    Ok(())
}

/// Listing rewrite suggestions.
async fn cmd_suggest(config: &AppConfig, input: &str) -> domain::Result<()> {
    let client = ApiClient::new(&config.api)?;
    let content = client
        .suggest(input)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Error sending to /suggestions"))?;

    println!("{}", "💡 Suggestions".bold());
    println!();
    println!("{content}");
    Ok(())
}

/// Reset the store (best effort).
async fn cmd_reset(config: &AppConfig, yes: bool) -> domain::Result<()> {
    if !yes {
        println!(
            "{} This deletes every extracted field. Re-run with --yes to confirm.",
            "⚠".yellow().bold()
        );
        return Ok(());
    }

    let controller = build_controller(config, ExtractionOptions::default())?;
    if controller.reset_store().await {
        let count = controller.snapshot().await.notes().len();
        println!("{} Database reset, {} notes loaded", "✓".green().bold(), count);
    }
    Ok(())
}

/// Configuration management.
fn cmd_config(config: &AppConfig, action: &ConfigAction) -> domain::Result<()> {
    match action {
        ConfigAction::Init => {
            let (path, created) = ensure_config_exists()?;
            if created {
                println!("{} Created {}", "✓".green().bold(), path.display());
            } else {
                println!("Configuration already exists: {}", path.display());
            }
        }
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
                message: format!("Failed to serialize config: {e}"),
            })?;
            println!("# {}", AppConfig::config_file_path().display());
            println!("{content}");
        }
    }
    Ok(())
}

fn build_controller(config: &AppConfig, options: ExtractionOptions) -> domain::Result<Controller> {
    let client = ApiClient::new(&config.api)?;
    tracing::debug!(base_url = client.base_url(), "Using notes API");

    Ok(WorkflowController::new(
        client.clone(),
        client,
        CsvExporter::new(&config.export.csv_filename),
    )
    .with_options(options))
}

/// Custom rules from the flag, the rules file, or the configured file.
fn extraction_options(
    config: &AppConfig,
    args: &ExtractionArgs,
) -> domain::Result<ExtractionOptions> {
    let custom_rules = resolve_custom_rules(
        args.rules.as_deref(),
        args.rules_file.as_deref(),
        config.extraction.custom_rules_file.as_deref(),
    )?;

    let mut ai_model = config.extraction.ai_model();
    if let Some(model) = args.model {
        ai_model.model = model;
    }

    Ok(ExtractionOptions {
        ai_model,
        ..ExtractionOptions::default()
    }
    .with_rules(custom_rules))
}

/// Load notes and apply the requested selection.
async fn prepare_selection(controller: &Controller, args: &SelectionArgs) -> domain::Result<()> {
    let total = controller.load_notes().await?;

    if args.all {
        controller.select_all().await;
    } else if let Some(json) = &args.selection_json {
        controller.select(SelectionModel::decode_str(json)).await;
    } else if args.ids.is_empty() {
        controller.clear_selection().await;
    } else {
        controller.select_ids(args.ids.iter().copied()).await;
    }
    if !args.exclude.is_empty() {
        controller.deselect(args.exclude.iter().copied()).await;
    }

    let session = controller.snapshot().await;
    let selected = session.selection();
    tracing::debug!(ids = ?selected.ids(), "Selection ready");
    println!("Selected {} of {total} notes", selected.len());
    Ok(())
}

/// Trigger the CSV download and write it out.
async fn download_csv(
    controller: &Controller,
    config: &AppConfig,
    output: Option<&Path>,
) -> domain::Result<()> {
    let Some(artifact) = controller.download_csv().await? else {
        println!("{}", "Nothing to download.".dimmed());
        return Ok(());
    };

    let path = output.map_or_else(|| config.csv_output_path(), PathBuf::from);
    artifact.write_to(&path)?;

    println!(
        "{} Exported {} rows to {} at {}",
        "✓".green().bold(),
        artifact.rows,
        path.display(),
        artifact.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

fn print_notes(notes: &[PropertyNote], format: OutputFormat) -> domain::Result<()> {
    let output = match format {
        OutputFormat::Table => format_notes_table(notes),
        OutputFormat::Json => format_notes_json(notes).map_err(AppError::json_parse)?,
    };
    println!("{output}");
    Ok(())
}

/// Print the outcome of a run; a failed run becomes the command's error.
fn report_outcome(path: RunPath, outcome: RunOutcome) -> domain::Result<()> {
    match outcome {
        RunOutcome::Skipped { reason } => {
            println!("{} {path} not started: {reason}", "⏸".yellow());
            Ok(())
        }
        RunOutcome::Succeeded { warning } => {
            if let Some(warning) = warning {
                println!("{} {}", "⚠".yellow().bold(), warning.yellow());
            }
            Ok(())
        }
        RunOutcome::Failed { message } => Err(AppError::RunFailed { path, message }),
    }
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
