//! # Agent Module
//!
//! Wires concrete collaborators into a `ResearchOrchestrator`:
//! - OpenAI (via Rig) for query generation, summarization and reflection
//! - Tavily for web search
//! - Clay for profile enrichment, answered through the webhook receiver

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use rig_leadgen::{
    ClayWebhookClient, EnrichmentGateway, LoopConfig, OpenAIProvider, ProfileStore, PromptSet,
    ResearchOrchestrator, ResearchOutput, TavilySearch,
};

use crate::config::Config;

// =============================================================================
// LEAD RESEARCH AGENT
// =============================================================================
/// Research agent for one process: owns the orchestrator built from config.
///
/// # Rust Concept: Trait Objects
///
/// The orchestrator holds its collaborators as `Arc<dyn Trait>`, so this is
/// the only place that names the concrete OpenAI, Tavily and Clay types.
pub struct LeadResearchAgent {
    orchestrator: ResearchOrchestrator,
}

impl LeadResearchAgent {
    /// Build the agent from configuration and a shared profile store handle
    pub fn new(config: &Config, store: ProfileStore, prompts: PromptSet) -> Self {
        let mut llm = OpenAIProvider::new(config.openai_api_key.clone(), &config.model);
        if let Some(temperature) = config.temperature {
            llm = llm.with_temperature(temperature);
        }

        let search = TavilySearch::new(config.tavily_api_key.clone());
        let vendor = ClayWebhookClient::new(config.clay_webhook_url.clone());
        let gateway =
            EnrichmentGateway::new(store, Arc::new(vendor)).with_callback_url(&config.callback_url);

        let loop_config = LoopConfig {
            max_web_research_loops: config.max_web_research_loops,
            max_search_results: config.max_search_results,
            max_tokens_per_source: config.max_tokens_per_source,
        };

        Self {
            orchestrator: ResearchOrchestrator::new(
                Arc::new(llm),
                Arc::new(search),
                gateway,
                prompts,
                loop_config,
            ),
        }
    }

    pub fn loop_config(&self) -> &LoopConfig {
        self.orchestrator.config()
    }

    /// Research `topic` and return the finalized output
    pub async fn research(&self, topic: &str) -> Result<ResearchOutput> {
        info!(
            topic = %topic,
            max_loops = self.loop_config().max_web_research_loops,
            "Starting research task"
        );

        let output = self
            .orchestrator
            .run(topic)
            .await
            .context("Research run failed")?;

        info!("Research completed successfully");
        Ok(output)
    }
}
