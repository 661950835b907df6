//! Research loop state machine
//!
//! ```text
//! GenerateQuery ─▶ WebResearch ─▶ Summarize ─▶ Reflect ─▶ Route ─┬─▶ WebResearch
//!                                                                 └─▶ Finalize
//! ```
//!
//! Steps run strictly one after another. Each step reads the current
//! `ResearchState` and returns a `ResearchUpdate`; the loop folds updates
//! into the state. `Route` and `Finalize` are pure functions of the state.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::enrichment::EnrichmentGateway;
use crate::error::ResearchError;
use crate::extract::extract_profile_urls;
use crate::llm::{parse_query_response, LLMProvider, ResponseFormat};
use crate::prompts::PromptSet;
use crate::search::SearchProvider;
use crate::sources::{dedup_source_lines, deduplicate_and_format_sources, format_sources};
use crate::state::{ResearchOutput, ResearchState, ResearchUpdate, PENDING_ANNOTATION};

const NO_RESEARCH: &str = "No web research results available yet.";

/// Loop budget and per-iteration limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Routing finalizes once more than this many iterations completed
    pub max_web_research_loops: usize,
    pub max_search_results: usize,
    pub max_tokens_per_source: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_web_research_loops: 3,
            max_search_results: 5,
            max_tokens_per_source: 1000,
        }
    }
}

impl LoopConfig {
    pub fn with_max_loops(mut self, max_web_research_loops: usize) -> Self {
        self.max_web_research_loops = max_web_research_loops;
        self
    }
}

/// States of the research loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    GenerateQuery,
    WebResearch,
    Summarize,
    Reflect,
    Route,
    Finalize,
}

/// Drives one research run at a time over injected collaborators
pub struct ResearchOrchestrator {
    llm: Arc<dyn LLMProvider>,
    search: Arc<dyn SearchProvider>,
    gateway: EnrichmentGateway,
    prompts: PromptSet,
    config: LoopConfig,
}

impl ResearchOrchestrator {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        search: Arc<dyn SearchProvider>,
        gateway: EnrichmentGateway,
        prompts: PromptSet,
        config: LoopConfig,
    ) -> Self {
        Self {
            llm,
            search,
            gateway,
            prompts,
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run the loop for `topic` and return the finalized output
    pub async fn run(&self, topic: &str) -> Result<ResearchOutput, ResearchError> {
        let state = self.execute(topic).await?;
        Ok(finalize(&state, &self.prompts))
    }

    /// Run the loop for `topic` up to (not including) finalization
    pub async fn execute(&self, topic: &str) -> Result<ResearchState, ResearchError> {
        info!(topic, llm = self.llm.name(), "Starting research run");

        let mut state = ResearchState::new(topic);
        let mut step = Step::GenerateQuery;

        loop {
            debug!(?step, loop_count = state.loop_count, "Entering step");
            step = match step {
                Step::GenerateQuery => {
                    let update = self.generate_query(&state).await?;
                    state = state.apply(update);
                    Step::WebResearch
                }
                Step::WebResearch => {
                    let update = self.web_research(&state).await?;
                    state = state.apply(update);
                    Step::Summarize
                }
                Step::Summarize => {
                    let update = self.summarize(&state).await?;
                    state = state.apply(update);
                    Step::Reflect
                }
                Step::Reflect => {
                    let update = self.reflect(&state).await?;
                    state = state.apply(update);
                    Step::Route
                }
                Step::Route => route(&state, &self.config),
                Step::Finalize => {
                    info!(iterations = state.loop_count, "Research run complete");
                    return Ok(state);
                }
            };
        }
    }

    /// Ask the LLM for the first search query
    pub async fn generate_query(
        &self,
        state: &ResearchState,
    ) -> Result<ResearchUpdate, ResearchError> {
        let system = self.prompts.query_writer_instructions(&state.topic);
        let content = self
            .llm
            .complete(&system, self.prompts.query_request, ResponseFormat::JsonObject)
            .await?;

        let query = parse_query_response(&content);
        info!(query = %query, "Generated search query");
        Ok(ResearchUpdate::with_query(query))
    }

    /// Search, format results, and resolve every profile reference found
    pub async fn web_research(
        &self,
        state: &ResearchState,
    ) -> Result<ResearchUpdate, ResearchError> {
        let query = if state.search_query.is_empty() {
            format!("{} {}", self.prompts.default_query_prefix, state.topic)
        } else {
            state.search_query.clone()
        };

        let results = self
            .search
            .search(&query, self.config.max_search_results)
            .await?;

        let sources = format_sources(&results);
        let formatted = deduplicate_and_format_sources(&results, self.config.max_tokens_per_source);

        let mut seen = HashSet::new();
        let references: Vec<String> = results
            .iter()
            .flat_map(|r| {
                let mut urls = extract_profile_urls(&r.content);
                urls.extend(extract_profile_urls(&r.title));
                urls
            })
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let mut profiles = Vec::with_capacity(references.len());
        for url in &references {
            profiles.push(self.gateway.resolve(url).await?);
        }

        info!(
            query = %query,
            results = results.len(),
            profiles = profiles.len(),
            iteration = state.loop_count + 1,
            "Web research iteration complete"
        );
        Ok(ResearchUpdate::iteration(sources, formatted, profiles))
    }

    /// Fold the latest research into the running summary
    pub async fn summarize(&self, state: &ResearchState) -> Result<ResearchUpdate, ResearchError> {
        let document = summary_document(state, &self.prompts);
        let summary = self
            .llm
            .complete(self.prompts.summarizer, &document, ResponseFormat::Text)
            .await?;

        debug!(chars = summary.len(), "Updated running summary");
        Ok(ResearchUpdate::with_summary(summary))
    }

    /// Ask the LLM for a follow-up query that fills a gap in the summary
    pub async fn reflect(&self, state: &ResearchState) -> Result<ResearchUpdate, ResearchError> {
        let system = self.prompts.reflection_instructions(&state.topic);
        let message = self.prompts.reflect_message(&state.running_summary);
        let content = self
            .llm
            .complete(&system, &message, ResponseFormat::JsonObject)
            .await?;

        let query = parse_query_response(&content);
        info!(query = %query, "Generated follow-up query");
        Ok(ResearchUpdate::with_query(query))
    }
}

/// Continue researching until more than `max_web_research_loops`
/// iterations have completed, so a budget of `n` runs `n + 1` iterations.
pub fn route(state: &ResearchState, config: &LoopConfig) -> Step {
    if state.loop_count <= config.max_web_research_loops {
        Step::WebResearch
    } else {
        Step::Finalize
    }
}

/// User message for the summarize step
pub fn summary_document(state: &ResearchState, prompts: &PromptSet) -> String {
    let research = state.latest_research().unwrap_or(NO_RESEARCH);
    let topic_tag = prompts.topic_tag;

    let mut document = if state.running_summary.is_empty() {
        format!(
            "<{topic_tag}> \n {} \n </{topic_tag}>\n\n\
             <Search Results> \n {} \n </Search Results>",
            state.topic, research
        )
    } else {
        let existing_tag = prompts.existing_tag;
        format!(
            "<{topic_tag}> \n {} \n </{topic_tag}>\n\n\
             <{existing_tag}> \n {} \n </{existing_tag}>\n\n\
             <New Search Results> \n {} \n </New Search Results>",
            state.topic, state.running_summary, research
        )
    };

    if !state.profiles.is_empty() {
        let profile_tag = prompts.profile_tag;
        document.push_str(&format!("\n\n<{profile_tag}>\n"));
        for profile in &state.profiles {
            document.push_str(&profile.describe());
            if profile.is_pending() {
                document.push(' ');
                document.push_str(PENDING_ANNOTATION);
            }
            document.push('\n');
        }
        document.push_str(&format!("</{profile_tag}>"));
    }

    document
}

/// Assemble the final output: summary, deduplicated sources and profiles
pub fn finalize(state: &ResearchState, prompts: &PromptSet) -> ResearchOutput {
    let summary = if state.running_summary.is_empty() {
        prompts.empty_summary
    } else {
        state.running_summary.as_str()
    };
    let sources = dedup_source_lines(&state.sources_gathered).join("\n");

    let mut output = format!(
        "{}\n\n{}\n\n### Sources:\n{}",
        prompts.final_heading, summary, sources
    );

    if !state.profiles.is_empty() {
        output.push_str(&format!("\n\n{}\n", prompts.profile_section));
        for profile in &state.profiles {
            output.push_str(&profile.describe());
            output.push('\n');
        }
    }

    ResearchOutput {
        topic: state.topic.clone(),
        running_summary: output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::{EnrichmentError, EnrichmentVendor};
    use crate::search::SearchError;
    use crate::state::{ProfileRecord, SourceRecord};
    use crate::store::ProfileStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Answers JSON-mode calls from a queue (then a fixed query) and text
    /// calls with a numbered summary (or an LLM error when `fail_summary`).
    struct ScriptedLLM {
        json_answers: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<(String, ResponseFormat)>>,
        fail_summary: bool,
    }

    impl ScriptedLLM {
        fn new(json_answers: &[&str]) -> Self {
            Self {
                json_answers: Mutex::new(json_answers.iter().map(|s| s.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
                fail_summary: false,
            }
        }

        fn failing_summary() -> Self {
            Self {
                fail_summary: true,
                ..Self::new(&[])
            }
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedLLM {
        async fn complete(
            &self,
            _system: &str,
            user: &str,
            format: ResponseFormat,
        ) -> Result<String, ResearchError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((user.to_string(), format));
            match format {
                ResponseFormat::JsonObject => Ok(self
                    .json_answers
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| r#"{"query": "follow up"}"#.to_string())),
                ResponseFormat::Text if self.fail_summary => {
                    Err(ResearchError::Llm("rate limited".to_string()))
                }
                ResponseFormat::Text => Ok(format!("summary {}", calls.len())),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct ScriptedSearch {
        results: Vec<SourceRecord>,
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ScriptedSearch {
        fn new(results: Vec<SourceRecord>) -> Self {
            Self {
                results,
                queries: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl SearchProvider for ScriptedSearch {
        async fn search(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<SourceRecord>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(SearchError::HttpError(418, "teapot".to_string()));
            }
            Ok(self.results.clone())
        }
    }

    #[derive(Default)]
    struct CountingVendor {
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EnrichmentVendor for CountingVendor {
        async fn request_enrichment(
            &self,
            profile_url: &str,
            _callback_url: &str,
        ) -> Result<(), EnrichmentError> {
            self.requested.lock().unwrap().push(profile_url.to_string());
            Ok(())
        }
    }

    fn hits() -> Vec<SourceRecord> {
        vec![
            SourceRecord::new(
                "Jane Doe - CTO",
                "https://example.com/jane",
                "Profile at https://www.linkedin.com/in/jane-doe, also https://www.linkedin.com/in/jane-doe",
            ),
            SourceRecord::new(
                "https://linkedin.com/in/john-roe",
                "https://example.com/john",
                "John leads engineering. https://www.linkedin.com/in/jane-doe",
            ),
        ]
    }

    struct Harness {
        _temp: TempDir,
        llm: Arc<ScriptedLLM>,
        search: Arc<ScriptedSearch>,
        vendor: Arc<CountingVendor>,
        orchestrator: ResearchOrchestrator,
    }

    async fn harness(llm: ScriptedLLM, search: ScriptedSearch, max_loops: usize) -> Harness {
        let temp = TempDir::new().unwrap();
        let store = ProfileStore::open(temp.path()).await.unwrap();
        let llm = Arc::new(llm);
        let search = Arc::new(search);
        let vendor = Arc::new(CountingVendor::default());
        let orchestrator = ResearchOrchestrator::new(
            llm.clone(),
            search.clone(),
            EnrichmentGateway::new(store, vendor.clone()),
            PromptSet::leads(),
            LoopConfig::default().with_max_loops(max_loops),
        );
        Harness {
            _temp: temp,
            llm,
            search,
            vendor,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_budget_n_runs_n_plus_one_iterations() {
        for n in 0..=3 {
            let h = harness(ScriptedLLM::new(&[]), ScriptedSearch::new(hits()), n).await;

            let state = h.orchestrator.execute("fintech CTOs").await.unwrap();

            assert_eq!(state.loop_count, n + 1);
            assert_eq!(h.search.queries.lock().unwrap().len(), n + 1);
            assert_eq!(state.sources_gathered.len(), n + 1);
        }
    }

    #[tokio::test]
    async fn test_query_generation_uses_json_query() {
        let h = harness(ScriptedLLM::new(&[r#"{"query":"x"}"#]), ScriptedSearch::new(vec![]), 0).await;

        h.orchestrator.execute("fintech CTOs").await.unwrap();

        assert_eq!(h.search.queries.lock().unwrap()[0], "x");
    }

    #[tokio::test]
    async fn test_query_generation_falls_back_to_raw_text() {
        let h = harness(ScriptedLLM::new(&["not json"]), ScriptedSearch::new(vec![]), 0).await;
        let state = ResearchState::new("fintech CTOs");

        let update = h.orchestrator.generate_query(&state).await.unwrap();

        assert_eq!(state.apply(update).search_query, "not json");
    }

    #[tokio::test]
    async fn test_reflection_sets_next_query() {
        let answers = [r#"{"query":"first"}"#, "raw follow up"];
        let h = harness(ScriptedLLM::new(&answers), ScriptedSearch::new(vec![]), 1).await;

        h.orchestrator.execute("fintech CTOs").await.unwrap();

        assert_eq!(*h.search.queries.lock().unwrap(), vec!["first", "raw follow up"]);
    }

    #[tokio::test]
    async fn test_empty_query_uses_topic_default() {
        let h = harness(ScriptedLLM::new(&[r#"{"query":""}"#]), ScriptedSearch::new(vec![]), 0).await;

        h.orchestrator.execute("fintech CTOs").await.unwrap();

        assert_eq!(h.search.queries.lock().unwrap()[0], "leads for fintech CTOs");
    }

    #[tokio::test]
    async fn test_references_deduplicated_within_iteration() {
        let h = harness(ScriptedLLM::new(&[]), ScriptedSearch::new(hits()), 0).await;

        let state = h.orchestrator.execute("fintech CTOs").await.unwrap();

        let requested = h.vendor.requested.lock().unwrap().clone();
        assert_eq!(
            requested,
            vec![
                "https://www.linkedin.com/in/jane-doe",
                "https://linkedin.com/in/john-roe",
            ]
        );
        assert_eq!(state.profiles.len(), 2);
        assert!(state.profiles.iter().all(ProfileRecord::is_pending));
    }

    #[tokio::test]
    async fn test_summarize_sees_pending_profiles() {
        let h = harness(ScriptedLLM::new(&[]), ScriptedSearch::new(hits()), 0).await;

        h.orchestrator.execute("fintech CTOs").await.unwrap();

        let calls = h.llm.calls.lock().unwrap();
        let (document, _) = calls
            .iter()
            .find(|(_, format)| *format == ResponseFormat::Text)
            .unwrap();
        assert!(document.starts_with("<Lead Criteria> \n fintech CTOs \n </Lead Criteria>"));
        assert!(document.contains("<Search Results>"));
        assert!(document.contains(&format!(
            "- Unknown: No title at No company | https://www.linkedin.com/in/jane-doe {}",
            PENDING_ANNOTATION
        )));
    }

    #[tokio::test]
    async fn test_search_failure_is_fatal() {
        let h = harness(ScriptedLLM::new(&[]), ScriptedSearch::failing(), 3).await;

        let result = h.orchestrator.run("fintech CTOs").await;

        assert!(matches!(result, Err(ResearchError::Search(_))));
    }

    #[tokio::test]
    async fn test_summarize_failure_is_fatal() {
        let h = harness(ScriptedLLM::failing_summary(), ScriptedSearch::new(hits()), 3).await;

        let result = h.orchestrator.run("fintech CTOs").await;

        assert!(matches!(result, Err(ResearchError::Llm(ref msg)) if msg == "rate limited"));
        // The run stops after the first iteration: no reflection, no second search
        assert_eq!(h.search.queries.lock().unwrap().len(), 1);
        let calls = h.llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, ResponseFormat::Text);
    }

    #[tokio::test]
    async fn test_run_output_sources_have_no_duplicate_lines() {
        let h = harness(ScriptedLLM::new(&[]), ScriptedSearch::new(hits()), 2).await;

        let output = h.orchestrator.run("fintech CTOs").await.unwrap();

        assert_eq!(output.topic, "fintech CTOs");
        let text = &output.running_summary;
        assert!(text.starts_with("## Lead List\n\n"));
        let sources = text
            .split("### Sources:\n")
            .nth(1)
            .unwrap()
            .split("\n\n## LinkedIn Profiles")
            .next()
            .unwrap();
        let lines: Vec<&str> = sources.lines().collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.len(), unique.len());
    }

    #[test]
    fn test_route_boundary() {
        let config = LoopConfig::default().with_max_loops(2);
        let mut state = ResearchState::new("t");

        for (count, expected) in [(0, Step::WebResearch), (2, Step::WebResearch), (3, Step::Finalize)] {
            state.loop_count = count;
            assert_eq!(route(&state, &config), expected);
        }
    }

    #[test]
    fn test_summary_document_with_existing_summary() {
        let state = ResearchState::new("t")
            .apply(ResearchUpdate::with_summary("old"))
            .apply(ResearchUpdate::iteration("1. A - a", "SOURCE 1", vec![]));

        let document = summary_document(&state, &PromptSet::research());

        assert_eq!(
            document,
            "<Research Topic> \n t \n </Research Topic>\n\n\
             <Existing Summary> \n old \n </Existing Summary>\n\n\
             <New Search Results> \n SOURCE 1 \n </New Search Results>"
        );
    }

    #[test]
    fn test_summary_document_without_research() {
        let document = summary_document(&ResearchState::new("t"), &PromptSet::leads());
        assert!(document.contains(NO_RESEARCH));
    }

    #[test]
    fn test_finalize_layout() {
        let state = ResearchState::new("t")
            .apply(ResearchUpdate::iteration(
                "1. A - a\n2. B - b",
                "r",
                vec![ProfileRecord::pending("https://linkedin.com/in/jd")],
            ))
            .apply(ResearchUpdate::iteration("1. A - a\n2. C - c", "r", vec![]))
            .apply(ResearchUpdate::with_summary("Leads here"));

        let output = finalize(&state, &PromptSet::leads());

        assert_eq!(
            output.running_summary,
            "## Lead List\n\nLeads here\n\n### Sources:\n1. A - a\n2. B - b\n2. C - c\n\n\
             ## LinkedIn Profiles\n- Unknown: No title at No company | https://linkedin.com/in/jd\n"
        );
    }

    #[test]
    fn test_finalize_without_profiles() {
        let state = ResearchState::new("t").apply(ResearchUpdate::iteration("1. A - a", "r", vec![]));

        let output = finalize(&state, &PromptSet::research());

        assert_eq!(
            output.running_summary,
            "## Summary\n\nNo summary available.\n\n### Sources:\n1. A - a"
        );

        let leads = finalize(&state, &PromptSet::leads());
        assert!(leads.running_summary.starts_with("## Lead List\n\nNo leads available.\n\n"));
    }
}
