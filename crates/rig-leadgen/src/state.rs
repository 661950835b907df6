//! Research loop state definition
//!
//! A run owns exactly one `ResearchState`. Each step of the loop produces a
//! `ResearchUpdate`, and `ResearchState::apply` folds it into a new state.
//! Accumulating fields (`sources_gathered`, `web_research_results`,
//! `profiles`) are append-only; `loop_count` moves only when an update
//! records a completed web research iteration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::reference_id;

/// Annotation appended to pending profiles in the summarization document
pub const PENDING_ANNOTATION: &str = "(Profile data requested and will be available in future runs)";

/// A raw search hit as returned by the search collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl SourceRecord {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Enrichment status of a profile reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    /// Enrichment requested (or attempted) but not yet received
    Pending,
    /// Enrichment payload found in the profile store
    Complete,
}

/// A profile reference together with whatever enrichment is known for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Identifier derived from the trailing URL path segment
    pub reference_id: String,
    pub url: String,
    pub status: ProfileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Set when the enrichment request itself could not be delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_error: Option<String>,
    /// Full enrichment payload for complete records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Value>,
}

impl ProfileRecord {
    /// A record whose enrichment has been requested but not received
    pub fn pending(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            reference_id: reference_id(&url).to_string(),
            url,
            status: ProfileStatus::Pending,
            name: None,
            title: None,
            company: None,
            request_error: None,
            enrichment: None,
        }
    }

    /// Mark a pending record as one whose request never reached the vendor
    pub fn with_request_error(mut self, error: impl Into<String>) -> Self {
        self.request_error = Some(error.into());
        self
    }

    /// Build a complete record from a stored enrichment payload.
    ///
    /// The payload's own `url` wins over the reference URL when present.
    pub fn complete(url: impl Into<String>, payload: Value) -> Self {
        let field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        let url = field("url").unwrap_or_else(|| url.into());

        Self {
            reference_id: reference_id(&url).to_string(),
            name: field("name"),
            title: field("title"),
            company: field("company"),
            url,
            status: ProfileStatus::Complete,
            request_error: None,
            enrichment: Some(payload),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProfileStatus::Pending
    }

    /// `- {name}: {title} at {company} | {url}`
    pub fn describe(&self) -> String {
        format!(
            "- {}: {} at {} | {}",
            self.name.as_deref().unwrap_or("Unknown"),
            self.title.as_deref().unwrap_or("No title"),
            self.company.as_deref().unwrap_or("No company"),
            self.url
        )
    }
}

/// State of a single research run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    /// Topic or lead criteria the run was started with
    pub topic: String,

    /// Latest search query
    pub search_query: String,

    /// Accreted summary, overwritten by each summarize step
    pub running_summary: String,

    /// Completed web research iterations
    pub loop_count: usize,

    /// Formatted source listings, one block per iteration
    pub sources_gathered: Vec<String>,

    /// Formatted search result text, one block per iteration
    pub web_research_results: Vec<String>,

    /// Profile records in discovery order (may repeat across iterations)
    pub profiles: Vec<ProfileRecord>,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Fold an update into the state, returning the new state
    pub fn apply(mut self, update: ResearchUpdate) -> Self {
        if let Some(query) = update.search_query {
            self.search_query = query;
        }
        if let Some(summary) = update.running_summary {
            self.running_summary = summary;
        }
        self.sources_gathered.extend(update.new_sources);
        self.web_research_results.extend(update.new_results);
        self.profiles.extend(update.new_profiles);
        if update.completed_iteration {
            self.loop_count += 1;
        }
        self
    }

    /// Most recent web research block, if any
    pub fn latest_research(&self) -> Option<&str> {
        self.web_research_results.last().map(String::as_str)
    }
}

/// Change produced by one step of the loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchUpdate {
    pub search_query: Option<String>,
    pub running_summary: Option<String>,
    pub new_sources: Vec<String>,
    pub new_results: Vec<String>,
    pub new_profiles: Vec<ProfileRecord>,
    pub completed_iteration: bool,
}

impl ResearchUpdate {
    /// Replace the search query
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            search_query: Some(query.into()),
            ..Default::default()
        }
    }

    /// Replace the running summary
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            running_summary: Some(summary.into()),
            ..Default::default()
        }
    }

    /// Record one completed web research iteration
    pub fn iteration(
        sources: impl Into<String>,
        results: impl Into<String>,
        profiles: Vec<ProfileRecord>,
    ) -> Self {
        Self {
            new_sources: vec![sources.into()],
            new_results: vec![results.into()],
            new_profiles: profiles,
            completed_iteration: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search_query.is_none()
            && self.running_summary.is_none()
            && self.new_sources.is_empty()
            && self.new_results.is_empty()
            && self.new_profiles.is_empty()
            && !self.completed_iteration
    }
}

/// What a finished run hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchOutput {
    pub topic: String,
    pub running_summary: String,
}
