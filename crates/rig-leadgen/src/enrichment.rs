//! Profile enrichment gateway
//!
//! Enrichment is asynchronous: the gateway either returns what the profile
//! store already holds for a reference, or sends a one-way request to the
//! vendor and returns a pending record immediately. The vendor's answer
//! arrives later through the webhook receiver and only becomes visible to a
//! subsequent run.
//!
//! ```text
//!  orchestrator ──resolve──▶ gateway ──latest──▶ ProfileStore ◀──save── receiver
//!                               │                                        ▲
//!                               └──request_enrichment──▶ vendor ─callback┘
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ResearchError;
use crate::extract::reference_id;
use crate::state::ProfileRecord;
use crate::store::ProfileStore;

/// Default callback URL handed to the vendor
pub const DEFAULT_CALLBACK_URL: &str = "http://localhost:8080/webhook/clay-callback";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors from the enrichment vendor
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("Clay webhook URL not found. Please set the CLAY_WEBHOOK_URL environment variable.")]
    MissingWebhookUrl,

    #[error("Enrichment request failed: {0}")]
    Transport(String),

    #[error("Enrichment request rejected with status code: {0}")]
    Status(u16),
}

/// Outbound side of the enrichment vendor
#[async_trait]
pub trait EnrichmentVendor: Send + Sync {
    /// Ask the vendor to enrich `profile_url` and report to `callback_url`.
    ///
    /// Returns once the request has been accepted; never waits for the
    /// enrichment itself.
    async fn request_enrichment(
        &self,
        profile_url: &str,
        callback_url: &str,
    ) -> Result<(), EnrichmentError>;
}

#[derive(Debug, Serialize)]
struct EnrichmentRequest<'a> {
    url: &'a str,
    callback_url: &'a str,
}

/// Clay inbound-webhook client
#[derive(Debug, Clone)]
pub struct ClayWebhookClient {
    webhook_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl ClayWebhookClient {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl EnrichmentVendor for ClayWebhookClient {
    async fn request_enrichment(
        &self,
        profile_url: &str,
        callback_url: &str,
    ) -> Result<(), EnrichmentError> {
        let webhook_url = self
            .webhook_url
            .as_deref()
            .ok_or(EnrichmentError::MissingWebhookUrl)?;

        let response = self
            .client
            .post(webhook_url)
            .timeout(self.timeout)
            .json(&EnrichmentRequest {
                url: profile_url,
                callback_url,
            })
            .send()
            .await
            .map_err(|e| EnrichmentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }

        info!(profile_url, "Sent profile to Clay for enrichment");
        Ok(())
    }
}

/// Resolves profile references against the store, requesting enrichment
/// for the ones it has never seen.
#[derive(Clone)]
pub struct EnrichmentGateway {
    store: ProfileStore,
    vendor: Arc<dyn EnrichmentVendor>,
    callback_url: String,
}

impl EnrichmentGateway {
    pub fn new(store: ProfileStore, vendor: Arc<dyn EnrichmentVendor>) -> Self {
        Self {
            store,
            vendor,
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
        }
    }

    pub fn with_callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = callback_url.into();
        self
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Resolve a profile reference.
    ///
    /// Cached enrichment yields a complete record. Otherwise an enrichment
    /// request is sent and a pending record returned; vendor transport
    /// failures are logged and recorded on the record instead of failing
    /// the run. A missing vendor URL is a configuration error.
    pub async fn resolve(&self, profile_url: &str) -> Result<ProfileRecord, ResearchError> {
        let id = reference_id(profile_url);

        if let Some(payload) = self.store.latest(id).await? {
            info!(reference_id = id, "Using stored profile enrichment");
            return Ok(ProfileRecord::complete(profile_url, payload));
        }

        match self
            .vendor
            .request_enrichment(profile_url, &self.callback_url)
            .await
        {
            Ok(()) => Ok(ProfileRecord::pending(profile_url)),
            Err(EnrichmentError::MissingWebhookUrl) => Err(ResearchError::Config(
                EnrichmentError::MissingWebhookUrl.to_string(),
            )),
            Err(e) => {
                warn!(profile_url, error = %e, "Failed to send profile to Clay");
                Ok(ProfileRecord::pending(profile_url).with_request_error(e.to_string()))
            }
        }
    }
}
