// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 bearer tokens for the KMS API.

use std::fmt;
use std::path::PathBuf;

use http_client::{BaseApiClient, HttpError};
use serde::Deserialize;
use tracing::debug;

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access token is empty")]
    Empty,
    #[error("reading access token from {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("fetching access token from the metadata server: {0}")]
    Metadata(#[from] HttpError),
}

/// Where the bearer token attached to every KMS request comes from.
#[derive(Clone)]
pub enum AccessTokenSource {
    /// A token passed directly, e.g. the output of `gcloud auth print-access-token`.
    Static(String),
    /// A file whose (trimmed) contents are the token.
    File(PathBuf),
    /// The GCE/GKE metadata server's default service account.
    MetadataServer { client: BaseApiClient, url: String },
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

impl AccessTokenSource {
    pub fn metadata_server(client: BaseApiClient) -> Self {
        Self::MetadataServer {
            client,
            url: METADATA_TOKEN_URL.to_owned(),
        }
    }

    pub async fn token(&self) -> Result<String, TokenError> {
        let token = match self {
            AccessTokenSource::Static(token) => token.trim().to_owned(),
            AccessTokenSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| TokenError::ReadFile {
                    path: path.clone(),
                    source,
                })?
                .trim()
                .to_owned(),
            AccessTokenSource::MetadataServer { client, url } => {
                let token: MetadataToken = client
                    .json_get_with_headers(url, &[("Metadata-Flavor".into(), "Google".into())])
                    .await?;
                debug!(
                    "auth: got metadata server token, expires in {}s",
                    token.expires_in
                );
                token.access_token
            }
        };
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(token)
    }
}

impl fmt::Debug for AccessTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessTokenSource::Static(_) => f.write_str("Static(<redacted>)"),
            AccessTokenSource::File(path) => f.debug_tuple("File").field(path).finish(),
            AccessTokenSource::MetadataServer { url, .. } => f
                .debug_struct("MetadataServer")
                .field("url", url)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use futures::FutureExt;
    use http_client::test_utils::ApiClientCoreMock;

    use super::*;

    #[tokio::test]
    async fn static_token_is_trimmed() {
        let source = AccessTokenSource::Static(" ya29.token\n".into());
        assert_eq!(source.token().await.unwrap(), "ya29.token");
        assert!(!format!("{source:?}").contains("ya29"));
    }

    #[tokio::test]
    async fn file_token() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ya29.from-file").unwrap();
        let source = AccessTokenSource::File(file.path().to_owned());
        assert_eq!(source.token().await.unwrap(), "ya29.from-file");
    }

    #[tokio::test]
    async fn empty_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = AccessTokenSource::File(file.path().to_owned());
        assert!(matches!(source.token().await, Err(TokenError::Empty)));
    }

    #[tokio::test]
    async fn metadata_server_token() {
        let client = BaseApiClient::from(ApiClientCoreMock::from(
            |url: String, body: Option<bytes::Bytes>, _content_type, headers: Vec<(String, String)>, _expected| {
                async move {
                    assert_eq!(url, METADATA_TOKEN_URL);
                    assert!(body.is_none(), "token fetch is a GET");
                    assert!(headers.contains(&("Metadata-Flavor".into(), "Google".into())));
                    Ok(r#"{"access_token": "ya29.meta", "expires_in": 3599, "token_type": "Bearer"}"#
                        .as_bytes()
                        .into())
                }
                .boxed()
            },
        ));
        let source = AccessTokenSource::metadata_server(client);
        assert_eq!(source.token().await.unwrap(), "ya29.meta");
    }
}
