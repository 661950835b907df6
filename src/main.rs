//! # Lead Research Agent
//!
//! Iterative lead research with asynchronous LinkedIn profile enrichment,
//! built with the Rig framework.
//!
//! The agent searches the web (Tavily), extracts LinkedIn profile URLs from
//! the results, asks Clay to enrich them, and folds everything into a lead
//! list with an OpenAI model. Clay answers later through the webhook
//! receiver; the stored profiles show up in the next run.
//!
//! ## Quick Start
//! ```bash
//! # Terminal 1: receive Clay callbacks
//! cargo run -- --webhook-service
//!
//! # Terminal 2: research leads
//! cargo run -- "CTOs at Series B fintech startups" --max-loops 2
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// Research agent wiring
mod agent;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rig_leadgen::{receiver, ProfileStore, PromptSet, ResearchError};

use crate::agent::LeadResearchAgent;
use crate::config::Config;

const SEPARATOR_WIDTH: usize = 50;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// Prompt vocabulary for a run
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Mode {
    /// Lead generation: people matching lead criteria
    #[default]
    Leads,
    /// Generic topic research
    Research,
}

impl Mode {
    fn prompts(self) -> PromptSet {
        match self {
            Mode::Leads => PromptSet::leads(),
            Mode::Research => PromptSet::research(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "lead-research-agent",
    version,
    about = "Researches leads on the web and enriches LinkedIn profiles through Clay",
    long_about = r#"
Lead Research Agent

Runs an iterative research loop for a topic or lead criteria:
  1. Generate a search query
  2. Search the web and collect LinkedIn profile URLs
  3. Request Clay enrichment for new profiles
  4. Summarize, reflect, and search again until the loop budget is spent

Clay delivers enrichment asynchronously to the webhook receiver
(--webhook-service); stored profiles are used by subsequent runs.

ENVIRONMENT:
  OPENAI_API_KEY, TAVILY_API_KEY, CLAY_WEBHOOK_URL, CALLBACK_URL
  (a .env file in the working directory is loaded automatically)

EXAMPLES:
  # Research leads once
  lead-research-agent "CTOs at Series B fintech startups"

  # Only receive Clay callbacks
  lead-research-agent --webhook-service --port 8080

  # Receive callbacks while researching, keep serving afterwards
  lead-research-agent --webhook-service "VP Engineering in Berlin" --max-loops 1
"#
)]
struct Args {
    /// The topic or lead criteria to research
    #[arg(value_name = "TOPIC")]
    topic: Option<String>,

    /// Run the webhook receiver for Clay callbacks
    #[arg(long = "webhook-service", visible_alias = "linkedin-service")]
    webhook_service: bool,

    /// Webhook receiver port (overrides WEBHOOK_PORT / FLASK_RUN_PORT)
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Loop budget; the run performs this many iterations plus one
    #[arg(long = "max-loops", value_name = "N")]
    max_loops: Option<usize>,

    /// Prompt vocabulary
    #[arg(long = "mode", value_enum, default_value_t = Mode::Leads)]
    mode: Mode,

    /// Profile store directory (overrides PROFILES_DIR)
    #[arg(long = "profiles-dir", value_name = "DIR")]
    profiles_dir: Option<PathBuf>,

    /// The OpenAI model to use (overrides LLM_MODEL env var)
    #[arg(short = 'm', long = "model", env = "LLM_MODEL")]
    model: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    /// Fold command-line overrides into the environment configuration
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.webhook_port = port;
        }
        if let Some(max_loops) = self.max_loops {
            config.max_web_research_loops = max_loops;
        }
        if let Some(dir) = &self.profiles_dir {
            config.profiles_dir = dir.clone();
        }
        if let Some(model) = &self.model {
            info!(model = %model, "Using model from command line");
            config.model = model.clone();
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.topic.is_none() && !args.webhook_service {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    init_logging(args.verbose)?;

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        model = %config.model,
        profiles_dir = %config.profiles_dir.display(),
        "Configuration loaded"
    );

    // One store handle for the whole process, shared by runs and receiver
    let store = ProfileStore::open(&config.profiles_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to open profile directory {}",
                config.profiles_dir.display()
            )
        })?;

    let receiver_task = if args.webhook_service {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind webhook receiver to {}", addr))?;
        Some(tokio::spawn(receiver::serve(
            listener,
            store.clone(),
            shutdown_signal(),
        )))
    } else {
        None
    };

    if let Some(topic) = &args.topic {
        let agent = LeadResearchAgent::new(&config, store.clone(), args.mode.prompts());

        match agent.research(topic).await {
            Ok(output) => print_results(&output.running_summary),
            Err(e) => {
                error!(error = %e, "Research failed");
                eprintln!("\nResearch failed: {:#}", e);

                if let Some(ResearchError::Config(_)) = e.downcast_ref::<ResearchError>() {
                    eprintln!("\nTip: set the missing value in your environment or .env file.");
                }

                return Err(e);
            }
        }
    }

    if let Some(handle) = receiver_task {
        info!("Webhook receiver running, press Ctrl-C to stop");
        handle
            .await
            .context("Webhook receiver task panicked")?
            .context("Webhook receiver failed")?;
    }

    Ok(())
}

fn print_results(summary: &str) {
    println!("\n{}", "=".repeat(SEPARATOR_WIDTH));
    println!("RESEARCH RESULTS:");
    println!("{}", "=".repeat(SEPARATOR_WIDTH));
    println!("{}", summary);
    println!("{}", "=".repeat(SEPARATOR_WIDTH));
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        // Serve until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Shutting down webhook receiver");
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over `--verbose` when set.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
