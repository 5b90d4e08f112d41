//! Command-line front end for the compliance console.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use compliance_console_lib::config::{self, ConsoleConfig};
use compliance_console_lib::gateway::{PipelineParams, ThresholdAlertOptions};
use compliance_console_lib::query_cache::CacheKey;
use compliance_console_lib::upload::UploadFile;
use compliance_console_lib::workflow::catalog;
use compliance_console_lib::{init_tracing, ConsoleState};

#[derive(Parser)]
#[command(author, version, about = "Compliance Console", long_about = None)]
struct Cli {
    /// Backend API base URL; overrides config file and COMPLIANCE_API_URL
    #[arg(long)]
    api: Option<String>,

    /// Alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bundled backend pipeline (generate, analyze, alert)
    Pipeline {
        /// Generate fresh synthetic data first
        #[arg(long)]
        generate: bool,
        #[arg(long, default_value_t = 10)]
        documents: u32,
        #[arg(long, default_value_t = 50)]
        logs: u32,
    },
    /// Generate synthetic data, then analyze all documents
    Process {
        #[arg(long, default_value_t = catalog::PROCESS_DOCUMENT_COUNT)]
        documents: u32,
        #[arg(long, default_value_t = catalog::PROCESS_LOG_COUNT)]
        logs: u32,
    },
    /// Generate alerts from operational logs
    Alerts,
    /// Run threshold checks and generate alerts
    Thresholds {
        /// Skip operational log analysis
        #[arg(long)]
        no_logs: bool,
        /// Skip historical data
        #[arg(long)]
        no_historical: bool,
    },
    /// Load sample documents
    Samples {
        #[arg(long, default_value_t = catalog::SAMPLE_DOCUMENT_COUNT)]
        documents: u32,
    },
    /// Upload a plain text document
    Upload {
        path: PathBuf,
    },
    /// Analyze a single document by id
    Analyze {
        document_id: String,
    },
    /// List documents
    Documents,
    /// Dashboard figures and ranked alerts
    Summary,
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut console_config = match &cli.config {
        Some(path) => {
            let mut loaded = ConsoleConfig::from_file(path)?;
            loaded.apply_env(|var| std::env::var(var).ok())?;
            loaded
        }
        None => ConsoleConfig::load()?,
    };
    if let Some(api) = cli.api {
        console_config.api_base_url = api;
    }
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let state = ConsoleState::from_config(console_config)?;

    match cli.command {
        Commands::Pipeline {
            generate,
            documents,
            logs,
        } => {
            let summary = state
                .run_full_pipeline(PipelineParams {
                    generate_new_data: generate,
                    document_count: documents,
                    log_count: logs,
                })
                .await?;
            print_json(&summary)
        }
        Commands::Process { documents, logs } => {
            print_json(&state.process_documents(documents, logs).await?)
        }
        Commands::Alerts => print_json(&state.generate_alerts().await?),
        Commands::Thresholds {
            no_logs,
            no_historical,
        } => {
            let options = ThresholdAlertOptions {
                analyze_operational_logs: !no_logs,
                check_thresholds: true,
                include_historical: !no_historical,
            };
            print_json(&state.check_thresholds(options).await?)
        }
        Commands::Samples { documents } => print_json(&state.initialize_samples(documents).await?),
        Commands::Upload { path } => {
            let file = UploadFile::from_path(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            state.upload(file).await?;
            print_json(&state.upload_banner())
        }
        Commands::Analyze { document_id } => {
            print_json(&state.analyze_document(&document_id).await?)
        }
        Commands::Documents => {
            let report = state.refresh(&[CacheKey::Documents]).await;
            if !report.all_succeeded() {
                bail!("could not fetch documents");
            }
            let documents = state.documents().value.unwrap_or_default();
            print_json(documents.as_ref())
        }
        Commands::Summary => {
            let report = state.load_all().await;
            if !report.all_succeeded() {
                eprintln!("warning: stale collections: {:?}", report.failed_keys());
            }
            print_json(&serde_json::json!({
                "dashboard": state.dashboard_summary(),
                "alerts": state.ranked_alerts(),
            }))
        }
        Commands::Health => {
            if state.health().await? {
                println!("backend healthy");
                Ok(())
            } else {
                bail!("backend reported unhealthy")
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
