// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::error::HttpError;

#[derive(Debug, Clone)]
pub struct ApiClientCore {
    client: reqwest::Client, // cheaply cloneable (Arc<...> internally), see docs
}

impl ApiClientCore {
    /// Construct a new ApiClientCore that identifies itself with `user_agent` and gives up on
    /// any single request after `timeout`, if one is given.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, HttpError> {
        let mut builder = reqwest::ClientBuilder::new().user_agent(user_agent.to_owned());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| HttpError::RequestError {
            ctx: "building http client".into(),
            status: None,
            retriable: false,
            source: Box::new(e),
        })?;
        Ok(Self { client })
    }

    /// Get or post a given body to a given url with a given content type, and optional extra headers.
    /// The response type will be verified against `expected_content_type`.
    pub(crate) async fn raw_request(
        &self,
        url: &str,
        body: Option<Bytes>,
        content_type: &'static str,
        header_iter: &[(String, String)],
        expected_content_type: &'static str,
    ) -> Result<bytes::Bytes, HttpError> {
        let mut rb = match body {
            Some(b) => self
                .client
                .post(url)
                .body(b)
                .header(reqwest::header::CONTENT_TYPE, content_type),
            None => self.client.get(url),
        };

        for (key, value) in header_iter {
            rb = rb.header(key, value)
        }

        debug!("http_client: requesting {url}");

        let response = rb.send().await.map_err(|e| HttpError::RequestError {
            ctx: format!("requesting {url}"),
            status: e.status().map(|s| s.as_u16()),
            retriable: e.is_timeout() || e.is_connect(),
            source: Box::new(e),
        })?;

        let status = response.status();
        debug!("http_client: response from {url:?}: {status}");

        let content_type_ok = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| content_type_matches(v, expected_content_type))
            .unwrap_or(false);

        let bytes = response.bytes().await.map_err(|e| HttpError::RequestError {
            ctx: format!("reading response body from {url}"),
            status: Some(status.as_u16()),
            retriable: true,
            source: Box::new(e),
        })?;

        if status.is_client_error() || status.is_server_error() {
            Err(HttpError::StatusError {
                ctx: format!("requesting {url}"),
                status: status.as_u16(),
                retriable: super::status_code::is_retriable(status.as_u16()),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            })
        } else if !content_type_ok {
            Err(HttpError::DecodeError {
                decoding: format!("response from {url}"),
                source: format!(
                    "{status}: expected content-type {expected_content_type}: {}",
                    String::from_utf8_lossy(&bytes)
                )
                .into(),
            })
        } else {
            Ok(bytes)
        }
    }
}

/// Compares the media type of a `Content-Type` header value, ignoring parameters
/// such as `charset=UTF-8` and ASCII case.
pub(crate) fn content_type_matches(header_value: &str, expected: &str) -> bool {
    let media_type = header_value.split(';').next().unwrap_or_default().trim();
    media_type.eq_ignore_ascii_case(expected)
}

#[cfg(test)]
mod tests {
    use super::content_type_matches;

    #[test]
    fn content_type_ignores_charset() {
        assert!(content_type_matches(
            "application/json; charset=UTF-8",
            "application/json"
        ));
        assert!(content_type_matches("Application/JSON", "application/json"));
        assert!(!content_type_matches("text/html", "application/json"));
        assert!(!content_type_matches("", "application/json"));
    }
}
