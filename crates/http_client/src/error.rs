// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request never produced a response (connection, TLS, timeout...).
    #[error("while {ctx}: {status_wrap}, {retriable_wrap}: {source}", status_wrap=StatusWrapper(*status), retriable_wrap=RetriableWrapper(*retriable))]
    RequestError {
        ctx: String,
        /// The HTTP status code of the error, or None if no status was available.
        status: Option<u16>,
        retriable: bool,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    /// The server answered with a >=400 status. `body` is the raw response text,
    /// which for Google APIs is usually a JSON error envelope.
    #[error("while {ctx}: {status_wrap}, {retriable_wrap}: {body}", status_wrap=StatusWrapper(Some(*status)), retriable_wrap=RetriableWrapper(*retriable))]
    StatusError {
        ctx: String,
        status: u16,
        retriable: bool,
        body: String,
    },
    #[error("decoding {decoding}: {source}")]
    DecodeError {
        decoding: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error("encoding {encoding}: {source}")]
    EncodeError {
        encoding: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl HttpError {
    pub fn is_retriable(&self) -> bool {
        match self {
            HttpError::RequestError { retriable, .. } | HttpError::StatusError { retriable, .. } => {
                *retriable
            }
            HttpError::DecodeError { .. } | HttpError::EncodeError { .. } => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::RequestError { status, .. } => *status,
            HttpError::StatusError { status, .. } => Some(*status),
            HttpError::DecodeError { .. } | HttpError::EncodeError { .. } => None,
        }
    }
}

struct StatusWrapper(Option<u16>);

impl std::fmt::Display for StatusWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            None => f.write_str("no status"),
            Some(status) => write!(f, "status: {status}"),
        }
    }
}

struct RetriableWrapper(bool);

impl std::fmt::Display for RetriableWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            false => f.write_str("not retriable"),
            true => f.write_str("retriable"),
        }
    }
}
