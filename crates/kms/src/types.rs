// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON wire types for the subset of the Cloud KMS v1 REST API we call.
//!
//! Field names follow the proto3 JSON mapping: camelCase, `bytes` as standard
//! base64, `int64` (the CRC32C checksums) as decimal strings, and default
//! values omitted from responses.

use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::{serde_as, DisplayFromStr};
use sha2::Digest as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtectionLevel {
    Software,
    Hsm,
    External,
    ExternalVpc,
    #[serde(other, rename = "PROTECTION_LEVEL_UNSPECIFIED")]
    Unspecified,
}

serde_plain::derive_display_from_serialize!(ProtectionLevel);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyPurpose {
    AsymmetricSign,
    #[serde(other, rename = "CRYPTO_KEY_PURPOSE_UNSPECIFIED")]
    Unspecified,
}

/// Signing algorithms. Anything else the service reports (encryption, MAC)
/// deserializes as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CryptoKeyVersionAlgorithm {
    #[serde(rename = "EC_SIGN_P256_SHA256")]
    EcSignP256Sha256,
    #[serde(rename = "EC_SIGN_P384_SHA384")]
    EcSignP384Sha384,
    #[serde(rename = "EC_SIGN_SECP256K1_SHA256")]
    EcSignSecp256k1Sha256,
    #[serde(rename = "RSA_SIGN_PSS_2048_SHA256")]
    RsaSignPss2048Sha256,
    #[serde(rename = "RSA_SIGN_PSS_3072_SHA256")]
    RsaSignPss3072Sha256,
    #[serde(rename = "RSA_SIGN_PSS_4096_SHA256")]
    RsaSignPss4096Sha256,
    #[serde(rename = "RSA_SIGN_PSS_4096_SHA512")]
    RsaSignPss4096Sha512,
    #[serde(rename = "RSA_SIGN_PKCS1_2048_SHA256")]
    RsaSignPkcs12048Sha256,
    #[serde(rename = "RSA_SIGN_PKCS1_3072_SHA256")]
    RsaSignPkcs13072Sha256,
    #[serde(rename = "RSA_SIGN_PKCS1_4096_SHA256")]
    RsaSignPkcs14096Sha256,
    #[serde(rename = "RSA_SIGN_PKCS1_4096_SHA512")]
    RsaSignPkcs14096Sha512,
    #[serde(other, rename = "CRYPTO_KEY_VERSION_ALGORITHM_UNSPECIFIED")]
    Other,
}

serde_plain::derive_display_from_serialize!(CryptoKeyVersionAlgorithm);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    Sha256,
    Sha384,
    Sha512,
}

impl CryptoKeyVersionAlgorithm {
    /// The digest the service expects in an `asymmetricSign` request for this algorithm.
    pub fn digest_kind(self) -> Option<DigestKind> {
        use CryptoKeyVersionAlgorithm::*;
        match self {
            EcSignP256Sha256
            | EcSignSecp256k1Sha256
            | RsaSignPss2048Sha256
            | RsaSignPss3072Sha256
            | RsaSignPss4096Sha256
            | RsaSignPkcs12048Sha256
            | RsaSignPkcs13072Sha256
            | RsaSignPkcs14096Sha256 => Some(DigestKind::Sha256),
            EcSignP384Sha384 => Some(DigestKind::Sha384),
            RsaSignPss4096Sha512 | RsaSignPkcs14096Sha512 => Some(DigestKind::Sha512),
            Other => None,
        }
    }
}

impl DigestKind {
    pub fn digest(self, message: &[u8]) -> Digest {
        match self {
            DigestKind::Sha256 => Digest {
                sha256: Some(sha2::Sha256::digest(message).to_vec()),
                ..Default::default()
            },
            DigestKind::Sha384 => Digest {
                sha384: Some(sha2::Sha384::digest(message).to_vec()),
                ..Default::default()
            },
            DigestKind::Sha512 => Digest {
                sha512: Some(sha2::Sha512::digest(message).to_vec()),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CryptoKeyVersionState {
    PendingGeneration,
    Enabled,
    Disabled,
    Destroyed,
    DestroyScheduled,
    PendingImport,
    ImportFailed,
    GenerationFailed,
    PendingExternalDestruction,
    ExternalDestructionFailed,
    #[serde(other, rename = "CRYPTO_KEY_VERSION_STATE_UNSPECIFIED")]
    Unspecified,
}

serde_plain::derive_display_from_serialize!(CryptoKeyVersionState);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersionTemplate {
    pub algorithm: CryptoKeyVersionAlgorithm,
    pub protection_level: ProtectionLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKeyVersion {
    pub name: String,
    #[serde(default = "unspecified_state")]
    pub state: CryptoKeyVersionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<ProtectionLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<CryptoKeyVersionAlgorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_time: Option<String>,
}

fn unspecified_state() -> CryptoKeyVersionState {
    CryptoKeyVersionState::Unspecified
}

/// Body of `cryptoKeys.create`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCryptoKey {
    pub purpose: CryptoKeyPurpose,
    pub version_template: CryptoKeyVersionTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoKey {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<CryptoKeyPurpose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_template: Option<CryptoKeyVersionTemplate>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub pem: String,
    pub algorithm: CryptoKeyVersionAlgorithm,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pem_crc32c: Option<u32>,
    /// The version this key belongs to.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<ProtectionLevel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRandomBytesRequest {
    pub length_bytes: u32,
    pub protection_level: ProtectionLevel,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRandomBytesResponse {
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub data_crc32c: Option<u32>,
}

/// Exactly one field is set.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    #[serde_as(as = "Option<Base64>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Vec<u8>>,
    #[serde_as(as = "Option<Base64>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha384: Option<Vec<u8>>,
    #[serde_as(as = "Option<Base64>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha512: Option<Vec<u8>>,
}

impl Digest {
    pub fn bytes(&self) -> &[u8] {
        self.sha256
            .as_deref()
            .or(self.sha384.as_deref())
            .or(self.sha512.as_deref())
            .unwrap_or_default()
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsymmetricSignRequest {
    pub digest: Digest,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_crc32c: Option<u32>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsymmetricSignResponse {
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub signature: Vec<u8>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_crc32c: Option<u32>,
    #[serde(default)]
    pub verified_digest_crc32c: bool,
    /// The version that produced the signature.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_level: Option<ProtectionLevel>,
}

/// Google API error envelope, returned with every >=400 response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorStatus {
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_response_decodes_proto3_json() {
        let resp: GenerateRandomBytesResponse =
            serde_json::from_str(r#"{"data": "AAEC/w==", "dataCrc32c": "1234"}"#).unwrap();
        assert_eq!(resp.data, vec![0, 1, 2, 255]);
        assert_eq!(resp.data_crc32c, Some(1234));

        let empty: GenerateRandomBytesResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.data.is_empty());
        assert_eq!(empty.data_crc32c, None);
    }

    #[test]
    fn sign_request_encodes_digest_and_checksum_as_strings() {
        let req = AsymmetricSignRequest {
            digest: Digest {
                sha256: Some(vec![0xde, 0xad]),
                ..Default::default()
            },
            digest_crc32c: Some(42),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"digest": {"sha256": "3q0="}, "digestCrc32c": "42"})
        );
    }

    #[test]
    fn unknown_enum_values_fall_back() {
        let version: CryptoKeyVersion = serde_json::from_str(
            r#"{"name": "v", "state": "SOMETHING_NEW", "algorithm": "GOOGLE_SYMMETRIC_ENCRYPTION"}"#,
        )
        .unwrap();
        assert_eq!(version.state, CryptoKeyVersionState::Unspecified);
        assert_eq!(version.algorithm, Some(CryptoKeyVersionAlgorithm::Other));
        assert_eq!(CryptoKeyVersionAlgorithm::Other.digest_kind(), None);
    }

    #[test]
    fn digest_kinds_follow_algorithm_suffix() {
        use CryptoKeyVersionAlgorithm::*;
        assert_eq!(EcSignP256Sha256.digest_kind(), Some(DigestKind::Sha256));
        assert_eq!(EcSignP384Sha384.digest_kind(), Some(DigestKind::Sha384));
        assert_eq!(RsaSignPss4096Sha512.digest_kind(), Some(DigestKind::Sha512));
        assert_eq!(RsaSignPkcs13072Sha256.digest_kind(), Some(DigestKind::Sha256));

        let digest = DigestKind::Sha384.digest(b"hello");
        assert_eq!(digest.bytes().len(), 48);
        assert!(digest.sha256.is_none() && digest.sha512.is_none());
    }

    #[test]
    fn displays_wire_names() {
        assert_eq!(
            CryptoKeyVersionAlgorithm::RsaSignPkcs12048Sha256.to_string(),
            "RSA_SIGN_PKCS1_2048_SHA256"
        );
        assert_eq!(
            CryptoKeyVersionState::PendingGeneration.to_string(),
            "PENDING_GENERATION"
        );
        assert_eq!(ProtectionLevel::Hsm.to_string(), "HSM");
    }

    #[test]
    fn error_envelope_decodes() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error": {"code": 404, "message": "KeyRing not found.", "status": "NOT_FOUND"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.code, 404);
        assert_eq!(body.error.status, "NOT_FOUND");
    }
}
