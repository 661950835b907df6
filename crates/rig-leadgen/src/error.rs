//! Error types for the research loop
//!
//! `ResearchError` is the run-level error: anything that reaches the caller
//! of `ResearchOrchestrator::run` terminates the run. Collaborator-specific
//! errors (`SearchError`, `EnrichmentError`) live next to their clients.

use std::path::PathBuf;
use thiserror::Error;

use crate::search::SearchError;

/// Profile store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile payload in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Run-level error
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Search failed: {0}")]
    Search(SearchError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SearchError> for ResearchError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::MissingApiKey => ResearchError::Config(e.to_string()),
            other => ResearchError::Search(other),
        }
    }
}
