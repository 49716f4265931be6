//! HTTP client for the bins backend.
//!
//! The backend exposes two endpoints: `GET /bins` with a bounding-box query
//! and `POST /bins` for reporting a new bin. Responses are bare JSON (no
//! envelope).

use std::time::Duration;

use binfinder_core::{AppConfig, Bin, BoundingBox, Coordinate};
use reqwest::{Client, RequestBuilder, Url};

use crate::error::ClientError;
use crate::retry::retry_with_backoff;
use crate::types::{BinRecord, NewBin};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Client for the bins REST API.
///
/// Holds its own bearer token; there is no process-wide credential cache.
pub struct BinsClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl BinsClient {
    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if no base URL is configured,
    /// [`ClientError::Http`] if the `reqwest::Client` cannot be built
    /// or [`ClientError::InvalidBaseUrl`] if the configured URL does not parse.
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        Ok(Self::with_base_url(
            config.require_api_base_url()?,
            config.api_token.as_deref(),
            config.request_timeout_secs,
        )?
        .with_retry(config.max_retries, config.retry_backoff_base_ms))
    }

    /// Creates a client against an explicit base URL (e.g. a wiremock server).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be built
    /// or [`ClientError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("binfinder/0.1")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            token: token.map(str::to_owned),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches every bin inside `area`.
    ///
    /// Records with coordinates out of range are skipped with a warning.
    /// Hidden and deleted bins are returned as-is; filtering is the caller's
    /// display concern.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure after retries.
    /// - [`ClientError::UnexpectedStatus`] on a non-2xx response.
    /// - [`ClientError::Deserialize`] if the body is not a JSON array of bins.
    pub async fn fetch_bins(&self, area: &BoundingBox) -> Result<Vec<Bin>, ClientError> {
        let url = self.bins_url(Some(area))?;
        let records: Vec<BinRecord> =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                self.request_json(self.authorize(self.client.get(url.clone())), &url)
            })
            .await?;

        let total = records.len();
        let bins: Vec<Bin> = records
            .into_iter()
            .filter_map(|record| match Bin::try_from(record) {
                Ok(bin) => Some(bin),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping invalid bin record");
                    None
                }
            })
            .collect();
        tracing::info!(total, valid = bins.len(), "fetched bins");
        Ok(bins)
    }

    /// Reports a new bin at `at`. The backend stores it unmoderated.
    ///
    /// Not retried: a lost response could otherwise create duplicates.
    ///
    /// # Errors
    ///
    /// Same as [`BinsClient::fetch_bins`], plus [`ClientError::InvalidRecord`]
    /// if the echoed record is invalid.
    pub async fn create_bin(&self, at: Coordinate) -> Result<Bin, ClientError> {
        let url = self.bins_url(None)?;
        let request = self
            .authorize(self.client.post(url.clone()))
            .json(&NewBin::from(at));
        let record: BinRecord = self.request_json(request, &url).await?;
        let bin = Bin::try_from(record)?;
        tracing::info!(bin_id = bin.id, %at, "created bin");
        Ok(bin)
    }

    fn bins_url(&self, area: Option<&BoundingBox>) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join("bins")
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        if let Some(area) = area {
            url.query_pairs_mut()
                .append_pair("minLat", &area.min_latitude.to_string())
                .append_pair("maxLat", &area.max_latitude.to_string())
                .append_pair("minLng", &area.min_longitude.to_string())
                .append_pair("maxLng", &area.max_longitude.to_string());
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends `request`, requires a 2xx status and decodes the body.
    async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: url.path().to_owned(),
            source: e,
        })
    }
}
