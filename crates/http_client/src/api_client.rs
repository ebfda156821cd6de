// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use crate::api_client_core::{ApiClientCore, ApiClientCoreImpl};
use crate::error::HttpError;

const JSON: &str = "application/json";

/// Helper for querying JSON REST APIs
#[derive(Clone)]
pub struct BaseApiClient {
    // 99% of the time this is going to be ApiClientCoreImpl, but it's overrideable for mocking purposes
    core: Arc<dyn ApiClientCore + Send + Sync>,
}

impl<Core: ApiClientCore + Send + Sync + 'static> From<Core> for BaseApiClient {
    fn from(core: Core) -> Self {
        Self {
            core: Arc::new(core),
        }
    }
}

impl BaseApiClient {
    /// Construct a new ApiClient backed by reqwest.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, HttpError> {
        Ok(ApiClientCoreImpl::new(user_agent, timeout)?.into())
    }

    /// Get JSON. Returns error for >=400 status.
    pub async fn json_get<O: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<O, HttpError> {
        self.json_get_with_headers(url, &[]).await
    }

    /// Get JSON (with custom headers). Returns error for >=400 status.
    pub async fn json_get_with_headers<O: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<O, HttpError> {
        let bytes = self.raw_get(url, headers, JSON).await?;
        decode_json(url, bytes)
    }

    /// Post JSON, get JSON. Returns error for >=400 status.
    pub async fn json_json_post<I: serde::Serialize, O: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        payload: &I,
    ) -> Result<O, HttpError> {
        self.json_json_post_with_headers(url, payload, &[]).await
    }

    /// Post JSON, get JSON (with custom headers). Returns error for >=400 status.
    pub async fn json_json_post_with_headers<I: serde::Serialize, O: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        payload: &I,
        headers: &[(String, String)],
    ) -> Result<O, HttpError> {
        let body = serde_json::to_vec(payload).map_err(|e| HttpError::EncodeError {
            encoding: format!("json payload for {url}"),
            source: Box::new(e),
        })?;
        let bytes = self.raw_post(url, body.into(), JSON, headers, JSON).await?;
        decode_json(url, bytes)
    }

    pub(crate) async fn raw_post(
        &self,
        url: &str,
        body: Bytes,
        content_type: &'static str,
        header_iter: &[(String, String)],
        expected_content_type: &'static str,
    ) -> Result<bytes::Bytes, HttpError> {
        self.core
            .raw_request(
                url,
                Some(body),
                content_type,
                header_iter,
                expected_content_type,
            )
            .await
    }

    pub(crate) async fn raw_get(
        &self,
        url: &str,
        header_iter: &[(String, String)],
        expected_content_type: &'static str,
    ) -> Result<bytes::Bytes, HttpError> {
        self.core
            .raw_request(url, None, "", header_iter, expected_content_type)
            .await
    }
}

impl fmt::Debug for BaseApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseApiClient").finish_non_exhaustive()
    }
}

/// Helper for local testing: rewrites all URLs requested by this client from https:// to http://,
/// to hit non-TLS emulators
pub struct HttpsToHttpRewriter {
    inner: Arc<dyn ApiClientCore + Send + Sync + 'static>,
}

#[async_trait::async_trait]
impl ApiClientCore for HttpsToHttpRewriter {
    async fn raw_request(
        &self,
        url: &str,
        body: Option<Bytes>,
        content_type: &'static str,
        headers: &[(String, String)],
        expected_content_type: &'static str,
    ) -> Result<bytes::Bytes, HttpError> {
        let new_url = url.replacen("https://", "http://", 1);
        info!("api_client::HttpsToHttpRewriter: rewrote {url} to {new_url} for local testing");
        self.inner
            .raw_request(&new_url, body, content_type, headers, expected_content_type)
            .await
    }
}

impl HttpsToHttpRewriter {
    /// Inject this layer in between the normal client and the inner core to do the URL rewriting
    pub fn inject(client: BaseApiClient) -> BaseApiClient {
        let BaseApiClient { core } = client;
        BaseApiClient {
            core: Arc::new(Self { inner: core }),
        }
    }
}

fn decode_json<O: serde::de::DeserializeOwned>(url: &str, bytes: Bytes) -> Result<O, HttpError> {
    serde_json::from_slice(&bytes).map_err(|e| {
        let error_text = format_serde_error_from_bytes(bytes.into(), e);
        HttpError::DecodeError {
            decoding: format!("json from {url}"),
            source: error_text.into(),
        }
    })
}

fn format_serde_error_from_bytes(
    bytes: Vec<u8>,
    e: impl Into<format_serde_error::ErrorTypes>,
) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => format_serde_error::SerdeError::new(text, e).to_string(),
        Err(err) => err.to_string(),
    }
}
