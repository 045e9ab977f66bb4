use crate::error::FetchError;
use crate::location::{parse_locations, LocationLoad};
use crate::OverlayConfig;
use serde::Deserialize;

/// Which location list to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    /// Locations where the given user's courses have lessons
    User(u64),
    /// Every known location
    All,
}

impl LocationSource {
    pub fn path(&self) -> String {
        match self {
            LocationSource::User(user_id) => format!("/users/{}/locations/", user_id),
            LocationSource::All => "/locations/".to_string(),
        }
    }
}

/// Error body returned by the backend on 4xx/5xx
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// HTTP client for the locations endpoints
#[derive(Debug, Clone)]
pub struct LocationsClient {
    client: reqwest::Client,
    api_root: String,
    source: LocationSource,
}

impl LocationsClient {
    pub fn new(config: &OverlayConfig) -> Result<Self, FetchError> {
        let user_agent = format!(
            "campusmap/{} (https://github.com/h4x0r/campusmap)",
            env!("CARGO_PKG_VERSION")
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_root: config.api_root.trim_end_matches('/').to_string(),
            source: config.source(),
        })
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.api_root, self.source.path())
    }

    /// Fetch and parse the location list
    pub async fn fetch_locations(&self) -> Result<LocationLoad, FetchError> {
        let url = self.url();
        log::debug!("Fetching locations from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Response {
                status,
                message: error_message(status, &body),
            });
        }

        parse_locations(&body)
    }
}

/// Human readable reason for a failed request
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "unexpected status".to_string())
}
