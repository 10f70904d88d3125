//! Thin REST client for the two lookups the built-in handlers need.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{ApiError, error_message};
use crate::effects::{FileLink, FileLookup, LookupError, PaymentIntentLookup, PaymentIntentSummary};
use crate::types::{FileId, PaymentIntentId};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the pinned API version (and any beta flags).
const VERSION_HEADER: &str = "stripe-version";

/// Connection settings for [`ApiClient`].
#[derive(Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Sent as the version header when set.
    pub api_version: Option<String>,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        ApiConfig {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_version: None,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// File objects may come back without a URL; only linked files are useful.
#[derive(Debug, Deserialize)]
struct FileObject {
    id: FileId,
    url: Option<String>,
}

/// Vendor API client implementing [`PaymentIntentLookup`] and [`FileLookup`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Builds a client with bearer auth and the configured timeout.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ApiError::permanent("API key is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        if let Some(version) = &config.api_version {
            let value = HeaderValue::from_str(version)
                .map_err(|_| ApiError::permanent("API version is not a valid header value"))?;
            headers.insert(VERSION_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;

        Ok(ApiClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches a payment intent.
    pub async fn payment_intent(
        &self,
        id: &PaymentIntentId,
    ) -> Result<PaymentIntentSummary, ApiError> {
        self.get("payment_intents", id.as_str()).await
    }

    /// Fetches a file and returns its download link.
    pub async fn file_link(&self, id: &FileId) -> Result<FileLink, ApiError> {
        let file: FileObject = self.get("files", id.as_str()).await?;
        let url = file
            .url
            .ok_or_else(|| ApiError::permanent(format!("file {} has no url", file.id)))?;
        Ok(FileLink { id: file.id, url })
    }

    async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T, ApiError> {
        validate_id(id)?;
        let url = format!("{}/v1/{}/{}", self.base_url, collection, id);
        debug!(url = %url, "Vendor API lookup");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), error_message(&body)));
        }

        response.json::<T>().await.map_err(ApiError::from_reqwest)
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Ids are interpolated into the request path, so only the characters vendor
/// ids are made of are allowed.
fn validate_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::permanent(format!("invalid object id: {id:?}")));
    }
    Ok(())
}

impl PaymentIntentLookup for ApiClient {
    async fn retrieve_payment_intent(
        &self,
        id: &PaymentIntentId,
    ) -> Result<PaymentIntentSummary, LookupError> {
        self.payment_intent(id)
            .await
            .map_err(|e| e.into_lookup_error("payment_intent", id.as_str()))
    }
}

impl FileLookup for ApiClient {
    async fn retrieve_file(&self, id: &FileId) -> Result<FileLink, LookupError> {
        self.file_link(id)
            .await
            .map_err(|e| e.into_lookup_error("file", id.as_str()))
    }
}
