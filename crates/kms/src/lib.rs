// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed client for the HSM-backed parts of the Cloud KMS REST API: random
//! bytes, asymmetric signing key creation, public key retrieval and signing.

pub mod auth;
pub mod checksum;
pub mod client;
pub mod error;
pub mod names;
pub mod types;

pub use auth::AccessTokenSource;
pub use client::KmsClient;
pub use error::KmsError;
pub use names::{CryptoKeyName, CryptoKeyVersionName, KeyRingName, LocationName};
