//! riskshare CLI - turn a risk-assessment table export into a shareable HTML report

#![deny(warnings)]

// Global invariants enforced:
// - Nothing is written when the table has no visible rows
// - Report files are replaced atomically

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use riskshare_core::report::{render_projection_json, render_projection_text, render_text_summary};
use riskshare_core::table::{self, ImageNameMap};
use riskshare_core::{config, prepare_report, project_with_params, render_prepared};
use riskshare_core::{Control, ControlType, JsonTableSource, ResolvedConfig};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "riskshare")]
#[command(about = "Render risk-assessment tables as self-contained HTML reports")]
#[command(version = env!("RISKSHARE_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an HTML report from a table export
    Generate {
        /// Path to the table export (JSON)
        table: PathBuf,

        /// Output file path
        #[arg(long, default_value = "risk-report.html")]
        output: PathBuf,

        /// JSON object mapping image ids to display file names
        #[arg(long)]
        image_names: Option<PathBuf>,

        /// Add projected scores and the evolution chart (overrides config file)
        #[arg(long)]
        projections: bool,

        /// Report heading (overrides config file)
        #[arg(long)]
        title: Option<String>,

        /// Path to config file (default: auto-discover next to the table)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Project the residual score of a single task
    Project {
        /// Current risk score
        #[arg(long)]
        score: u32,

        /// Control type applied to the task (repeatable)
        #[arg(long = "control")]
        controls: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate or inspect a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without generating a report
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            table: table_path,
            output,
            image_names,
            projections,
            title,
            config: config_path,
        } => {
            if !table_path.exists() {
                anyhow::bail!("Table export does not exist: {}", table_path.display());
            }

            let table_dir = table_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let mut resolved_config = config::load_and_resolve(&table_dir, config_path.as_deref())
                .context("failed to load configuration")?;

            if let Some(config_path) = &resolved_config.config_path {
                eprintln!("Using config: {}", config_path.display());
            }

            // CLI flags override config file values
            if projections {
                resolved_config.include_projections = true;
            }
            if let Some(title) = title {
                resolved_config.title = title;
            }

            let source = JsonTableSource::from_path(&table_path)?;
            let names = match image_names {
                Some(path) => table::load_image_names(&path)?,
                None => ImageNameMap::new(),
            };

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message("Preparing images");
            spinner.enable_steady_tick(Duration::from_millis(100));
            let prepared = prepare_report(&source, &names, &resolved_config);
            spinner.finish_and_clear();
            tracing::debug!(records = prepared.records.len(), "report prepared");

            if prepared.is_empty() {
                eprintln!("No visible rows in {}; nothing written.", table_path.display());
                return Ok(());
            }

            let html = render_prepared(&prepared, &resolved_config, unix_now());
            write_html_report(&output, &html)?;
            eprintln!("Report written to: {}", output.display());
            print!(
                "{}",
                render_text_summary(&prepared.records, &resolved_config.thresholds)
            );
        }
        Commands::Project {
            score,
            controls,
            format,
            config: config_path,
        } => {
            let project_root = std::env::current_dir()?;
            let resolved = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;

            let controls: Vec<Control> = controls
                .iter()
                .map(|name| Control::new(ControlType::parse(name), ""))
                .collect();
            for control in &controls {
                if control.control_type.bucket().is_none() {
                    eprintln!(
                        "Warning: unrecognized control type '{}' has no effect",
                        control.control_type
                    );
                }
            }

            let projection =
                project_with_params(score, &controls, &resolved.effectiveness, &resolved.projection);
            match format {
                OutputFormat::Text => {
                    print!("{}", render_projection_text(&projection, &resolved.thresholds));
                }
                OutputFormat::Json => {
                    println!("{}", render_projection_json(&projection));
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_resolved_config(&resolved);
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn print_resolved_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Report:");
    println!("  title: {}", resolved.title);
    println!("  include_projections: {}", resolved.include_projections);
    println!();
    println!("Thresholds:");
    println!("  low_max: {}", resolved.thresholds.low_max);
    println!("  medium_max: {}", resolved.thresholds.medium_max);
    println!("  high_max: {}", resolved.thresholds.high_max);
    println!();
    println!("Effectiveness:");
    println!("  substitute: {}", resolved.effectiveness.substitute);
    println!("  engineer: {}", resolved.effectiveness.engineer);
    println!("  visual: {}", resolved.effectiveness.visual);
    println!("  admin: {}", resolved.effectiveness.admin);
    println!("  individual: {}", resolved.effectiveness.individual);
    println!();
    println!("Projection:");
    println!("  hard_decay: {}", resolved.projection.hard_decay);
    println!("  soft_decay: {}", resolved.projection.soft_decay);
    println!("  hard_floor: {}", resolved.projection.hard_floor);
    println!("  soft_floor: {}", resolved.projection.soft_floor);
    println!();
    println!("Images:");
    println!("  max_dimension: {}", resolved.images.max_dimension);
    println!("  jpeg_quality: {}", resolved.images.jpeg_quality);
    println!();
    println!("Columns:");
    println!("  category: {}", resolved.columns.category);
    println!("  score: {}", resolved.columns.score);
    println!("  title: {}", resolved.columns.title);
}

/// Write HTML report to file with atomic write pattern
fn write_html_report(path: &Path, html: &str) -> anyhow::Result<()> {
    use std::fs;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("html.tmp");
    fs::write(&temp_path, html)
        .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}
