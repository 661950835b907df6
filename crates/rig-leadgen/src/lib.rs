//! rig-leadgen: iterative research/enrichment loop for Rig
//!
//! Given a topic or lead criteria, the loop repeatedly generates a search
//! query, fetches web results, extracts profile references, resolves their
//! enrichment and folds everything into a running summary until the loop
//! budget is spent.
//!
//! Enrichment completes out of band: the gateway sends a one-way request to
//! the vendor, the vendor calls the webhook receiver, and the receiver writes
//! the payload into the profile store. A later run picks it up.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rig_leadgen::{
//!     ClayWebhookClient, EnrichmentGateway, LoopConfig, OpenAIProvider, ProfileStore,
//!     PromptSet, ResearchOrchestrator, TavilySearch,
//! };
//!
//! let store = ProfileStore::open("linkedin_profiles").await?;
//! let gateway = EnrichmentGateway::new(
//!     store.clone(),
//!     Arc::new(ClayWebhookClient::new(std::env::var("CLAY_WEBHOOK_URL").ok())),
//! );
//! let orchestrator = ResearchOrchestrator::new(
//!     Arc::new(OpenAIProvider::new(std::env::var("OPENAI_API_KEY").ok(), "gpt-4o")),
//!     Arc::new(TavilySearch::new(std::env::var("TAVILY_API_KEY").ok())),
//!     gateway,
//!     PromptSet::leads(),
//!     LoopConfig::default(),
//! );
//!
//! let output = orchestrator.run("fintech CTOs").await?;
//! println!("{}", output.running_summary);
//! ```

pub mod enrichment;
pub mod error;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod receiver;
pub mod search;
pub mod sources;
pub mod state;
pub mod store;

// Re-exports for convenience
pub use enrichment::{
    ClayWebhookClient, EnrichmentError, EnrichmentGateway, EnrichmentVendor, DEFAULT_CALLBACK_URL,
};
pub use error::{ResearchError, StoreError};
pub use extract::{extract_profile_urls, reference_id};
pub use llm::{parse_query_response, LLMProvider, OpenAIProvider, ResponseFormat, DEFAULT_MODEL};
pub use orchestrator::{finalize, route, LoopConfig, ResearchOrchestrator, Step};
pub use prompts::PromptSet;
pub use search::{SearchError, SearchProvider, TavilySearch};
pub use sources::{dedup_source_lines, deduplicate_and_format_sources, format_sources};
pub use state::{
    ProfileRecord, ProfileStatus, ResearchOutput, ResearchState, ResearchUpdate, SourceRecord,
};
pub use store::ProfileStore;
