// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use http_client::HttpError;

use crate::auth::TokenError;
use crate::names::ResourceNameError;
use crate::types::{ApiErrorBody, CryptoKeyVersionAlgorithm, CryptoKeyVersionState};

#[derive(Debug, thiserror::Error)]
pub enum KmsError {
    /// The service rejected the call with a structured error.
    #[error("{status} ({code}): {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
        retriable: bool,
    },
    #[error(transparent)]
    Http(HttpError),
    #[error(transparent)]
    Name(#[from] ResourceNameError),
    #[error("obtaining access token: {0}")]
    Token(#[from] TokenError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("integrity check failed for {what}: {detail}")]
    Integrity { what: String, detail: String },
    #[error("invalid public key: {0}")]
    PublicKey(String),
    #[error("{algorithm} keys cannot be used for asymmetric signing")]
    UnsupportedAlgorithm {
        algorithm: CryptoKeyVersionAlgorithm,
    },
    #[error("{name} is {state}, expected ENABLED")]
    UnexpectedKeyState {
        name: String,
        state: CryptoKeyVersionState,
    },
    #[error("{name} was still PENDING_GENERATION after {attempts} checks")]
    StillPending { name: String, attempts: u32 },
    #[error("key {label:?} is not in the HSM; did you specify the label of something that exists in {key_ring}?")]
    KeyPairNotFound { key_ring: String, label: String },
}

impl KmsError {
    pub fn is_retriable(&self) -> bool {
        match self {
            KmsError::Api { retriable, .. } => *retriable,
            KmsError::Http(err) => err.is_retriable(),
            _ => false,
        }
    }
}

impl From<HttpError> for KmsError {
    fn from(err: HttpError) -> Self {
        if let HttpError::StatusError {
            body, retriable, ..
        } = &err
        {
            if let Ok(ApiErrorBody { error }) = serde_json::from_str::<ApiErrorBody>(body) {
                return KmsError::Api {
                    code: error.code,
                    status: error.status,
                    message: error.message,
                    retriable: *retriable,
                };
            }
        }
        KmsError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelope_becomes_api_error() {
        let err = KmsError::from(HttpError::StatusError {
            ctx: "requesting x".into(),
            status: 429,
            retriable: true,
            body: r#"{"error": {"code": 429, "message": "Quota exceeded for HSM operations.", "status": "RESOURCE_EXHAUSTED"}}"#.into(),
        });
        assert_eq!(
            err.to_string(),
            "RESOURCE_EXHAUSTED (429): Quota exceeded for HSM operations."
        );
        assert!(err.is_retriable());
    }

    #[test]
    fn other_bodies_stay_http_errors() {
        let err = KmsError::from(HttpError::StatusError {
            ctx: "requesting x".into(),
            status: 502,
            retriable: false,
            body: "<html>bad gateway</html>".into(),
        });
        assert!(matches!(err, KmsError::Http(_)));
    }
}
