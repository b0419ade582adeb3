//! HTTP client for the Planning Center Services API
//!
//! # Example
//!
//! ```no_run
//! use pcoservices::{PlanningCenterClient, PlanLocator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PlanningCenterClient::builder()
//!         .credentials("app-id", "secret")
//!         .build()?;
//!
//!     let locator = PlanLocator::new(&client);
//!     let service_type = locator.find_service_type("Celebration Service").await?;
//!     println!("Using service type {} ({})", service_type.name, service_type.id);
//!
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::fetcher::{Page, PageFetcher};
use crate::models::Document;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default Planning Center Services API base URL
pub const DEFAULT_API_BASE: &str = "https://api.planningcenteronline.com/services/v2";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PCOSync/0.1.0 (pcoservices)";

/// Planning Center Services HTTP client
///
/// Authenticates every request with HTTP Basic auth built from a personal
/// access token (application id and secret). The client is stateless and
/// caches nothing between calls.
#[derive(Debug, Clone)]
pub struct PlanningCenterClient {
    client: Client,
    api_base: String,
    app_id: String,
    secret: String,
    page_size: Option<u32>,
    timeout: Duration,
}

impl PlanningCenterClient {
    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the API base URL
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait]
impl PageFetcher for PlanningCenterClient {
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))?)
    }

    async fn fetch(&self, url: Url, query: &[(&str, &str)]) -> Result<Page> {
        debug!("GET {} with {} params", url, query.len());

        let mut request = self
            .client
            .get(url.clone())
            .basic_auth(&self.app_id, Some(&self.secret))
            .timeout(self.timeout);

        if !query.is_empty() {
            request = request.query(query);
        }

        // Continuation links already carry the page size
        if let Some(size) = self.page_size {
            if !url.query_pairs().any(|(name, _)| name == "per_page") {
                request = request.query(&[("per_page", size)]);
            }
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("API error ({}) for {}", status, url);
            return Err(Error::Transport {
                status,
                url: url.to_string(),
            });
        }

        let document: Document = response.json().await?;
        Page::from_document(document)
    }
}

/// Builder for configuring a PlanningCenterClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    api_base: String,
    app_id: String,
    secret: String,
    page_size: Option<u32>,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            app_id: String::new(),
            secret: String::new(),
            page_size: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the API base URL
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Set the personal access token
    pub fn credentials(mut self, app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self.secret = secret.into();
        self
    }

    /// Request `per_page` items per page
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PlanningCenterClient> {
        Url::parse(&self.api_base)?;

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?,
        };

        Ok(PlanningCenterClient {
            client,
            api_base: self.api_base,
            app_id: self.app_id,
            secret: self.secret,
            page_size: self.page_size,
            timeout: self.timeout,
        })
    }
}
