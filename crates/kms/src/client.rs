// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use http_client::BaseApiClient;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::auth::AccessTokenSource;
use crate::checksum;
use crate::error::KmsError;
use crate::names::{CryptoKeyName, CryptoKeyVersionName, KeyRingName, LocationName};
use crate::types::{
    AsymmetricSignRequest, AsymmetricSignResponse, CryptoKey, CryptoKeyPurpose,
    CryptoKeyVersion, CryptoKeyVersionAlgorithm, CryptoKeyVersionState,
    CryptoKeyVersionTemplate, GenerateRandomBytesRequest, GenerateRandomBytesResponse,
    NewCryptoKey, ProtectionLevel, PublicKey,
};

pub const DEFAULT_ENDPOINT: &str = "https://cloudkms.googleapis.com";

/// Bounds the service enforces on `generateRandomBytes`.
pub const MIN_RANDOM_BYTES: u32 = 8;
pub const MAX_RANDOM_BYTES: u32 = 1024;

/// Client for the Cloud KMS v1 REST API.
///
/// The bearer token is resolved on first use and reused for every later call
/// made through the same client.
#[derive(Debug)]
pub struct KmsClient {
    api: BaseApiClient,
    endpoint: String,
    tokens: AccessTokenSource,
    token: OnceCell<String>,
}

impl KmsClient {
    pub fn new(api: BaseApiClient, endpoint: &str, tokens: AccessTokenSource) -> Self {
        Self {
            api,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            tokens,
            token: OnceCell::new(),
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/v1/{resource}", self.endpoint)
    }

    async fn auth_headers(&self) -> Result<Vec<(String, String)>, KmsError> {
        let token = self
            .token
            .get_or_try_init(|| self.tokens.token())
            .await?;
        Ok(vec![("Authorization".into(), format!("Bearer {token}"))])
    }

    async fn get<O: DeserializeOwned>(&self, resource: &str) -> Result<O, KmsError> {
        let headers = self.auth_headers().await?;
        Ok(self
            .api
            .json_get_with_headers(&self.url(resource), &headers)
            .await?)
    }

    async fn post<I: Serialize, O: DeserializeOwned>(
        &self,
        resource: &str,
        payload: &I,
    ) -> Result<O, KmsError> {
        let headers = self.auth_headers().await?;
        Ok(self
            .api
            .json_json_post_with_headers(&self.url(resource), payload, &headers)
            .await?)
    }

    /// Asks the service for `length` random bytes at the given protection level.
    /// Random bytes are scoped to a location, not to any key ring.
    pub async fn generate_random_bytes(
        &self,
        location: &LocationName,
        length: u32,
        protection_level: ProtectionLevel,
    ) -> Result<Vec<u8>, KmsError> {
        if !(MIN_RANDOM_BYTES..=MAX_RANDOM_BYTES).contains(&length) {
            return Err(KmsError::InvalidArgument(format!(
                "random byte length must be between {MIN_RANDOM_BYTES} and {MAX_RANDOM_BYTES}, got {length}"
            )));
        }

        let request = GenerateRandomBytesRequest {
            length_bytes: length,
            protection_level,
        };
        let response: GenerateRandomBytesResponse = self
            .post(&format!("{location}:generateRandomBytes"), &request)
            .await?;

        checksum::verify("random bytes", &response.data, response.data_crc32c)?;
        if response.data.len() != length as usize {
            return Err(KmsError::Integrity {
                what: "random bytes".into(),
                detail: format!(
                    "asked for {length} bytes, got {}",
                    response.data.len()
                ),
            });
        }
        Ok(response.data)
    }

    /// Creates an `ASYMMETRIC_SIGN` key; the service generates version 1 along with it.
    pub async fn create_asymmetric_signing_key(
        &self,
        key_ring: &KeyRingName,
        key_id: &str,
        algorithm: CryptoKeyVersionAlgorithm,
        protection_level: ProtectionLevel,
    ) -> Result<CryptoKey, KmsError> {
        let name = key_ring.crypto_key(key_id)?;
        if algorithm.digest_kind().is_none() {
            return Err(KmsError::UnsupportedAlgorithm { algorithm });
        }

        let body = NewCryptoKey {
            purpose: CryptoKeyPurpose::AsymmetricSign,
            version_template: CryptoKeyVersionTemplate {
                algorithm,
                protection_level,
            },
        };
        info!("creating {algorithm} key {name} at {protection_level} protection");
        self.post(
            &format!("{key_ring}/cryptoKeys?cryptoKeyId={}", name.crypto_key),
            &body,
        )
        .await
    }

    pub async fn get_crypto_key_version(
        &self,
        name: &CryptoKeyVersionName,
    ) -> Result<CryptoKeyVersion, KmsError> {
        self.get(&name.to_string()).await
    }

    /// Polls until `name` leaves `PENDING_GENERATION`. HSM key generation is
    /// asynchronous, and the public key can't be read until the version is enabled.
    /// The version is always checked at least once.
    pub async fn wait_for_version_enabled(
        &self,
        name: &CryptoKeyVersionName,
        attempts: u32,
        interval: Duration,
    ) -> Result<CryptoKeyVersion, KmsError> {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            let version = self.get_crypto_key_version(name).await?;
            match version.state {
                CryptoKeyVersionState::Enabled => return Ok(version),
                CryptoKeyVersionState::PendingGeneration => {
                    debug!("{name} pending generation ({attempt}/{attempts})");
                    if attempt < attempts {
                        tokio::time::sleep(interval).await;
                    }
                }
                state => {
                    return Err(KmsError::UnexpectedKeyState {
                        name: name.to_string(),
                        state,
                    })
                }
            }
        }
        Err(KmsError::StillPending {
            name: name.to_string(),
            attempts,
        })
    }

    /// Fetches the public half of a signing key version as a PEM `PUBLIC KEY` (SPKI) block.
    pub async fn get_public_key(
        &self,
        name: &CryptoKeyVersionName,
    ) -> Result<PublicKey, KmsError> {
        let public_key: PublicKey = self.get(&format!("{name}/publicKey")).await?;
        checksum::verify("public key", public_key.pem.as_bytes(), public_key.pem_crc32c)?;
        spki_der(&public_key)?;
        Ok(public_key)
    }

    /// Signs `message` with the given key version. The message is hashed here
    /// with the digest the key's algorithm requires; only the digest is sent.
    pub async fn asymmetric_sign(
        &self,
        name: &CryptoKeyVersionName,
        message: &[u8],
    ) -> Result<AsymmetricSignResponse, KmsError> {
        let public_key = self.get_public_key(name).await?;
        let algorithm = public_key.algorithm;
        let digest = algorithm
            .digest_kind()
            .ok_or(KmsError::UnsupportedAlgorithm { algorithm })?
            .digest(message);

        let request = AsymmetricSignRequest {
            digest_crc32c: Some(checksum::crc32c(digest.bytes())),
            digest,
        };
        let response: AsymmetricSignResponse = self
            .post(&format!("{name}:asymmetricSign"), &request)
            .await?;

        if !response.verified_digest_crc32c {
            return Err(KmsError::Integrity {
                what: "digest".into(),
                detail: "the service did not confirm the digest checksum".into(),
            });
        }
        if !response.name.is_empty() && response.name != name.to_string() {
            return Err(KmsError::Integrity {
                what: "signature".into(),
                detail: format!("signed by {}, expected {name}", response.name),
            });
        }
        checksum::verify("signature", &response.signature, response.signature_crc32c)?;
        Ok(response)
    }

    /// Looks up an existing key pair in the HSM by label.
    ///
    /// Cloud KMS has no label-addressed key handles, so this always fails.
    pub fn find_key_pair(&self, key_ring: &KeyRingName, label: &str) -> Result<u64, KmsError> {
        debug!("find_key_pair: {label:?} in {key_ring}");
        Err(KmsError::KeyPairNotFound {
            key_ring: key_ring.to_string(),
            label: label.to_owned(),
        })
    }

    /// Creates a signing key and waits for its first version to be usable.
    pub async fn create_and_await_signing_key(
        &self,
        key_ring: &KeyRingName,
        key_id: &str,
        algorithm: CryptoKeyVersionAlgorithm,
        protection_level: ProtectionLevel,
        attempts: u32,
        interval: Duration,
    ) -> Result<(CryptoKeyName, PublicKey), KmsError> {
        let key = self
            .create_asymmetric_signing_key(key_ring, key_id, algorithm, protection_level)
            .await?;
        let name: CryptoKeyName = key.name.parse()?;
        let version = name.version(1)?;
        self.wait_for_version_enabled(&version, attempts, interval)
            .await?;
        let public_key = self.get_public_key(&version).await?;
        Ok((name, public_key))
    }
}

/// DER-encoded SubjectPublicKeyInfo from the key's PEM.
pub fn spki_der(public_key: &PublicKey) -> Result<Vec<u8>, KmsError> {
    let pem = pem::parse(&public_key.pem).map_err(|e| KmsError::PublicKey(e.to_string()))?;
    if pem.tag() != "PUBLIC KEY" {
        return Err(KmsError::PublicKey(format!(
            "expected a PUBLIC KEY block, got {}",
            pem.tag()
        )));
    }
    Ok(pem.into_contents())
}
