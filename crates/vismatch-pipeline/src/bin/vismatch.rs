//! vismatch: find catalog products that look like a photo.
//!
//! Configuration comes from the environment (and `.env`), with command-line
//! flags taking precedence.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vismatch_core::{SearchPhase, SearchState};
use vismatch_inference::MatcherConfig;
use vismatch_pipeline::{MatchOrchestrator, RunOutcome};

/// Exit code for configuration errors.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "vismatch")]
#[command(author, version, about = "Visual product matcher")]
#[command(propagate_version = true)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Upload size limit in bytes (overrides VISMATCH_MAX_UPLOAD_BYTES)
    #[arg(long, global = true)]
    max_upload_bytes: Option<u64>,

    /// Classifier timeout in milliseconds (overrides VISMATCH_CLASSIFIER_TIMEOUT_MS)
    #[arg(long, global = true)]
    classifier_timeout_ms: Option<u64>,

    /// Catalog timeout in milliseconds (overrides VISMATCH_CATALOG_TIMEOUT_MS)
    #[arg(long, global = true)]
    catalog_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an image and list matching catalog products
    Match {
        /// Image file (PNG, JPEG or WebP)
        image: PathBuf,

        /// Print the final search state as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the categories the classifier may choose from
    Categories,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match cli.command {
        Commands::Categories => {
            for category in &config.allowed_categories {
                println!("{}", category);
            }
            ExitCode::SUCCESS
        }
        Commands::Match { ref image, json } => {
            if config.classifier.api_key.is_none() {
                eprintln!("Error: GEMINI_API_KEY is not set");
                return ExitCode::from(EXIT_CONFIG);
            }
            match cmd_match(&config, image, json).await {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vismatch=info,vismatch_pipeline=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so stdout stays parseable with --json.
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> vismatch_core::Result<MatcherConfig> {
    let mut config = MatcherConfig::from_env()?;
    if let Some(bytes) = cli.max_upload_bytes {
        config.max_upload_size_bytes = bytes;
    }
    if let Some(ms) = cli.classifier_timeout_ms {
        config.classifier.timeout_ms = ms;
    }
    if let Some(ms) = cli.catalog_timeout_ms {
        config.catalog.timeout_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_match(config: &MatcherConfig, image: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let orchestrator = MatchOrchestrator::from_matcher_config(config)
        .context("Failed to build the matching pipeline")?;

    let mut events = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(state) = events.recv().await {
            if let Some(message) = state.progress_message() {
                eprintln!("{}", message);
            }
        }
    });

    let outcome = orchestrator.handle_file_upload(image).await;
    progress.abort();

    let state = match outcome {
        RunOutcome::Completed(state) => state,
        RunOutcome::Superseded => anyhow::bail!("Run was superseded"),
    };

    if json {
        let out = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
        println!("{}", out);
    } else {
        print_state(&state);
    }

    Ok(match state.phase {
        SearchPhase::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

fn print_state(state: &SearchState) {
    if let Some(category) = state.category {
        println!("Category: {}", category);
    }
    match state.phase {
        SearchPhase::Succeeded => {
            println!("Found {} products:", state.products.len());
            for product in &state.products {
                println!(
                    "  [{}] {}  ({})  {}",
                    product.id, product.name, product.brand, product.display_price
                );
            }
        }
        _ => {
            if let Some(ref message) = state.error_message {
                println!("{}", message);
            }
        }
    }
}
