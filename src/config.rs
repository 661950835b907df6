//! # Configuration Module
//!
//! Loads run and receiver settings from the environment (and a `.env` file).
//!
//! API keys and the vendor webhook URL are optional here: each is
//! checked by the collaborator that needs it, at the moment it is first used,
//! so `--webhook-service` alone runs without any LLM or search credentials.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use rig_leadgen::{DEFAULT_CALLBACK_URL, DEFAULT_MODEL};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Main configuration for the lead research agent.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API key (OPENAI_API_KEY)
    pub openai_api_key: Option<String>,

    /// Completion model (LLM_MODEL)
    pub model: String,

    /// Sampling temperature; provider default when unset
    pub temperature: Option<f64>,

    /// Tavily API key (TAVILY_API_KEY)
    pub tavily_api_key: Option<String>,

    /// Clay inbound webhook URL (CLAY_WEBHOOK_URL)
    pub clay_webhook_url: Option<String>,

    /// URL Clay calls back with enrichment results (CALLBACK_URL)
    pub callback_url: String,

    /// Profile store directory (PROFILES_DIR)
    pub profiles_dir: PathBuf,

    /// Loop budget; a run performs this many iterations plus one
    pub max_web_research_loops: usize,

    /// Search results fetched per iteration
    pub max_search_results: usize,

    /// Content truncation budget per source, in tokens
    pub max_tokens_per_source: usize,

    /// Webhook receiver port
    pub webhook_port: u16,
}

// =============================================================================
// DEFAULT IMPLEMENTATION
// =============================================================================
impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            tavily_api_key: None,
            clay_webhook_url: None,
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            profiles_dir: PathBuf::from("linkedin_profiles"),
            max_web_research_loops: 3,
            max_search_results: 5,
            max_tokens_per_source: 1000,
            webhook_port: 8080,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    ///
    /// # Rust Concept: Generic Closures
    ///
    /// Taking `impl Fn(&str) -> Option<String>` lets tests pass a map
    /// instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Config::default();

        config.openai_api_key = get("OPENAI_API_KEY");
        config.tavily_api_key = get("TAVILY_API_KEY");
        config.clay_webhook_url = get("CLAY_WEBHOOK_URL");

        if let Some(val) = get("LLM_MODEL") {
            config.model = val;
        }

        if let Some(val) = get("TEMPERATURE") {
            config.temperature = Some(
                val.parse()
                    .context("TEMPERATURE must be a valid floating-point number (e.g., 0.7)")?,
            );
        }

        if let Some(val) = get("CALLBACK_URL") {
            config.callback_url = val;
        }

        if let Some(val) = get("PROFILES_DIR") {
            config.profiles_dir = PathBuf::from(val);
        }

        if let Some(val) = get("MAX_WEB_RESEARCH_LOOPS") {
            config.max_web_research_loops = val
                .parse()
                .context("MAX_WEB_RESEARCH_LOOPS must be a valid non-negative integer")?;
        }

        if let Some(val) = get("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }

        if let Some(val) = get("MAX_TOKENS_PER_SOURCE") {
            config.max_tokens_per_source = val
                .parse()
                .context("MAX_TOKENS_PER_SOURCE must be a valid positive integer")?;
        }

        // WEBHOOK_PORT wins over the legacy FLASK_RUN_PORT
        if let Some(val) = get("WEBHOOK_PORT").or_else(|| get("FLASK_RUN_PORT")) {
            config.webhook_port = val
                .parse()
                .context("WEBHOOK_PORT must be a valid port number")?;
        }

        Ok(config)
    }

    /// Validate ranges before a run starts.
    ///
    /// Credentials are not checked here; see the module docs.
    pub fn validate(&self) -> Result<()> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                anyhow::bail!("Temperature must be between 0.0 and 2.0, got: {}", temperature);
            }
        }

        if self.max_search_results == 0 {
            anyhow::bail!("MAX_SEARCH_RESULTS must be at least 1");
        }

        if self.max_tokens_per_source == 0 {
            anyhow::bail!("MAX_TOKENS_PER_SOURCE must be at least 1");
        }

        if self.model.is_empty() {
            anyhow::bail!("LLM_MODEL cannot be empty");
        }

        if self.callback_url.is_empty() {
            anyhow::bail!("CALLBACK_URL cannot be empty");
        }

        Ok(())
    }
}
