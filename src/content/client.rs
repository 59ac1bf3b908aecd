use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::{ContentConfig, ContentCredentials};
use crate::content::EntriesQuery;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;
const ENTRIES_PATH: &str = "/api/v1/entries";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("deal-personalizer/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client")
});

/// Entries client for the headless content API.
pub struct ContentClient {
    base_url: String,
    timeout: Duration,
    credentials: ContentCredentials,
}

impl ContentClient {
    pub fn new(config: &ContentConfig, credentials: ContentCredentials) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            credentials,
        }
    }

    /// Fetches raw entries; each item is the API's `{"entry": {...}}` wrapper.
    pub async fn get_entries(&self, query: &EntriesQuery) -> Result<Vec<Value>> {
        let url = format!("{}{ENTRIES_PATH}", self.base_url);
        let limit = query.limit.to_string();
        debug!(order_by = %query.order_by, "querying content entries");

        let response = HTTP_CLIENT
            .get(&url)
            .header("x-api-key", &self.credentials.api_key)
            .query(&[
                ("projectId", self.credentials.project_id.as_str()),
                ("filters.type[eq]", query.content_type),
                ("limit", limit.as_str()),
                ("orderBy", query.order_by.as_str()),
                ("locale", query.locale),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("failed GET request: {url}"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed reading response body: {url}"))?;
        if !status.is_success() {
            let preview: String = body.chars().take(180).collect();
            return Err(anyhow!("GET {url} returned {status}: {preview}"));
        }

        let mut payload: Value =
            serde_json::from_str(&body).with_context(|| format!("invalid JSON response: {url}"))?;
        match payload.get_mut("entries").map(Value::take) {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(anyhow!("response from {url} has no entries array")),
        }
    }
}
