use std::future::Future;

use log::{debug, error};
use thiserror::Error;

use crate::descriptor::{ApiResponse, CrystalDescriptor};

/// Path prefix of the per-user crystal endpoint.
pub const CRYSTALS_PATH: &str = "/api/v1/crystals";

/// Reasons a crystal could not be fetched. Only surfaced through logs;
/// callers see `None`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with HTTP {0}")]
    Status(u16),
    #[error("server rejected the request: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),
    #[error("response did not include crystal data")]
    MissingData,
    #[error("response body is not a valid crystal payload")]
    Malformed(#[from] serde_json::Error),
}

/// Anything that can produce a user's crystal descriptor.
pub trait CrystalSource {
    /// Resolves to `None` on any failure; implementations log the cause.
    fn fetch_crystal_data(&self, user_id: &str)
        -> impl Future<Output = Option<CrystalDescriptor>>;
}

/// HTTP client for the crystals API.
#[derive(Debug, Clone)]
pub struct CrystalClient {
    http: reqwest::Client,
    base_url: String,
}

impl CrystalClient {
    /// Creates a client rooted at `base_url` (scheme and host, e.g.
    /// `https://example.org`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn crystal_url(&self, user_id: &str) -> String {
        format!("{}{CRYSTALS_PATH}/{user_id}", self.base_url)
    }

    /// Fetches and decodes the crystal of `user_id`, reporting why it failed.
    pub async fn try_fetch(&self, user_id: &str) -> Result<CrystalDescriptor, FetchError> {
        let url = self.crystal_url(user_id);
        debug!("GET {url}");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let payload: ApiResponse<CrystalDescriptor> = serde_json::from_str(&body)?;
        if !payload.success {
            return Err(FetchError::Rejected(payload.error));
        }
        payload.data.ok_or(FetchError::MissingData)
    }
}

impl CrystalSource for CrystalClient {
    async fn fetch_crystal_data(&self, user_id: &str) -> Option<CrystalDescriptor> {
        match self.try_fetch(user_id).await {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                error!("failed to fetch crystal for user {user_id}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crystal_url_joins_base_and_user() {
        let client = CrystalClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.crystal_url("42"),
            "http://localhost:8000/api/v1/crystals/42"
        );
    }

    #[test]
    fn rejection_message_names_reason() {
        let err = FetchError::Rejected(Some("user not found".into()));
        assert_eq!(
            err.to_string(),
            "server rejected the request: user not found"
        );
        let err = FetchError::Rejected(None);
        assert!(err.to_string().ends_with("no reason given"));
    }
}
