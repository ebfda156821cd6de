// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Write;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::FutureExt;

use hsmtest::operations;
use hsmtest::opts::{KeyArgs, MessageArgs, Operation, WaitArgs};
use hsmtest::output::OutputFormat;
use hsmtest::Config;
use http_client::test_utils::ApiClientCoreMock;
use http_client::{BaseApiClient, HttpError};
use kms::checksum::crc32c;
use kms::types::{CryptoKeyVersionAlgorithm, ProtectionLevel};
use kms::{AccessTokenSource, KmsClient};

const LOCATION: &str = "projects/hsm-test/locations/us-east1";
const PEM: &str = "-----BEGIN PUBLIC KEY-----\nMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQc=\n-----END PUBLIC KEY-----\n";

type Requests = Arc<Mutex<Vec<(String, Option<serde_json::Value>)>>>;

/// A fake KMS that answers every endpoint the harness uses. Keys report
/// PENDING_GENERATION on the first version lookup and ENABLED afterwards.
fn fake_kms() -> (BaseApiClient, Requests) {
    let requests: Requests = Default::default();
    let log = requests.clone();
    let version_lookups = Arc::new(Mutex::new(0));

    let client = BaseApiClient::from(ApiClientCoreMock::from(
        move |url: String, body: Option<Bytes>, _ct, _headers, _ect| {
            let json = body.map(|b| serde_json::from_slice::<serde_json::Value>(&b).unwrap());
            log.lock().unwrap().push((url.clone(), json.clone()));

            let Some(path) = url.strip_prefix("https://kms.test/v1/") else {
                let response = Err(not_found(&url));
                return async move { response }.boxed();
            };
            let response = if path.ends_with(":generateRandomBytes") {
                let data = vec![0xa5u8; 16];
                Ok(serde_json::json!({
                    "data": "paWlpaWlpaWlpaWlpaWlpQ==",
                    "dataCrc32c": crc32c(&data).to_string(),
                }))
            } else if let Some((ring, id)) = path.split_once("/cryptoKeys?cryptoKeyId=") {
                Ok(serde_json::json!({
                    "name": format!("{ring}/cryptoKeys/{id}"),
                    "purpose": "ASYMMETRIC_SIGN",
                    "versionTemplate": json.as_ref().unwrap()["versionTemplate"],
                }))
            } else if let Some(version) = path.strip_suffix("/publicKey") {
                Ok(serde_json::json!({
                    "pem": PEM,
                    "pemCrc32c": crc32c(PEM.as_bytes()).to_string(),
                    "algorithm": "EC_SIGN_P256_SHA256",
                    "protectionLevel": "HSM",
                    "name": version,
                }))
            } else if let Some(version) = path.strip_suffix(":asymmetricSign") {
                let signature = [0x30u8, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01];
                Ok(serde_json::json!({
                    "signature": "MAYCAQECAQE=",
                    "signatureCrc32c": crc32c(&signature).to_string(),
                    "verifiedDigestCrc32c": true,
                    "name": version,
                    "protectionLevel": "HSM",
                }))
            } else if path.contains("/cryptoKeyVersions/") {
                let mut lookups = version_lookups.lock().unwrap();
                *lookups += 1;
                let state = if *lookups == 1 { "PENDING_GENERATION" } else { "ENABLED" };
                Ok(serde_json::json!({"name": path, "state": state}))
            } else {
                Err(not_found(&url))
            };
            let response = response.map(|v| Bytes::from(v.to_string()));
            async move { response }.boxed()
        },
    ));
    (client, requests)
}

fn not_found(url: &str) -> HttpError {
    HttpError::StatusError {
        ctx: format!("requesting {url}"),
        status: 404,
        retriable: false,
        body: r#"{"error": {"code": 404, "message": "not found", "status": "NOT_FOUND"}}"#.into(),
    }
}

fn config(operation: Operation) -> (Config, Requests) {
    let (api, requests) = fake_kms();
    let config = Config {
        client: KmsClient::new(api, "https://kms.test", AccessTokenSource::Static("t".into())),
        location: LOCATION.parse().unwrap(),
        protection_level: ProtectionLevel::Hsm,
        operation,
        fmt: OutputFormat {
            quiet: true,
            compact: true,
        },
    };
    (config, requests)
}

fn key_args(key: &str) -> KeyArgs {
    KeyArgs {
        key_ring: "ring".into(),
        key: key.into(),
    }
}

fn no_wait() -> WaitArgs {
    WaitArgs {
        wait_attempts: 3,
        wait_interval_ms: 0,
    }
}

#[tokio::test]
async fn generate_ecdsa_creates_waits_and_reads_public_key() {
    let (config, requests) = config(Operation::RandReader { length: 8 });

    let out = operations::generate_key(
        &config,
        &key_args("ecdsa-1"),
        CryptoKeyVersionAlgorithm::EcSignP256Sha256,
        &no_wait(),
    )
    .await
    .unwrap();

    let version = format!("{LOCATION}/keyRings/ring/cryptoKeys/ecdsa-1/cryptoKeyVersions/1");
    assert_eq!(out.name, version);
    assert_eq!(out.pem, PEM);
    assert_eq!(out.spki_sha256.len(), 64);

    let urls: Vec<String> = requests
        .lock()
        .unwrap()
        .iter()
        .map(|(url, _)| url.clone())
        .collect();
    assert_eq!(
        urls,
        vec![
            format!("https://kms.test/v1/{LOCATION}/keyRings/ring/cryptoKeys?cryptoKeyId=ecdsa-1"),
            format!("https://kms.test/v1/{version}"),
            format!("https://kms.test/v1/{version}"),
            format!("https://kms.test/v1/{version}/publicKey"),
        ]
    );
}

#[tokio::test]
async fn run_generate_rsa_sends_rsa_template() {
    let (config, requests) = config(Operation::GenerateRsa {
        key: key_args("rsa-1"),
        bits: hsmtest::opts::RsaBits::B3072,
        padding: hsmtest::opts::RsaPadding::Pss,
        wait: no_wait(),
    });

    operations::run(&config).await.unwrap();

    let requests = requests.lock().unwrap();
    let create_body = requests[0].1.as_ref().unwrap();
    assert_eq!(
        create_body["versionTemplate"]["algorithm"],
        "RSA_SIGN_PSS_3072_SHA256"
    );
    assert_eq!(create_body["versionTemplate"]["protectionLevel"], "HSM");
}

#[tokio::test]
async fn rand_reader_hex_encodes() {
    let (config, requests) = config(Operation::RandReader { length: 16 });

    let out = operations::rand_reader(&config, 16).await.unwrap();
    assert_eq!(out.length, 16);
    assert_eq!(out.hex, "a5".repeat(16));

    let requests = requests.lock().unwrap();
    assert_eq!(
        requests[0].0,
        format!("https://kms.test/v1/{LOCATION}:generateRandomBytes")
    );
}

#[tokio::test]
async fn find_keypair_always_fails() {
    let (config, requests) = config(Operation::FindKeypair {
        key_ring: "ring".into(),
        label: "my-label".into(),
    });

    let err = operations::run(&config).await.unwrap_err();
    let err = format!("{err:#}");
    assert!(err.starts_with("failed to find key pair: "), "{err}");
    assert!(err.contains("is not in the HSM"), "{err}");
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn sign_reads_message_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"payload").unwrap();

    let (config, requests) = config(Operation::Sign {
        key: key_args("ecdsa-1"),
        key_version: 2,
        message: MessageArgs {
            message: None,
            message_file: Some(file.path().to_owned()),
        },
    });
    operations::run(&config).await.unwrap();

    let out = operations::sign(&config, &key_args("ecdsa-1"), 2, b"payload")
        .await
        .unwrap();
    assert_eq!(out.signature, "3006020101020101");
    assert_eq!(out.protection_level, Some(ProtectionLevel::Hsm));

    let requests = requests.lock().unwrap();
    let sign_body = requests[1].1.as_ref().unwrap();
    assert!(sign_body["digest"]["sha256"].is_string());
    assert!(requests[1].0.ends_with("/cryptoKeys/ecdsa-1/cryptoKeyVersions/2:asymmetricSign"));
    // the file-driven run and the direct call sign the same digest
    assert_eq!(requests[1].1, requests[3].1);
}

#[tokio::test]
async fn unreadable_message_file_is_a_sign_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (config, requests) = config(Operation::Sign {
        key: key_args("ecdsa-1"),
        key_version: 1,
        message: MessageArgs {
            message: None,
            message_file: Some(dir.path().join("missing.bin")),
        },
    });

    let err = operations::run(&config).await.unwrap_err();
    let err = format!("{err:#}");
    assert!(err.starts_with("failed to sign: reading message from "), "{err}");
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn service_errors_carry_operation_context() {
    let (config, _) = config(Operation::GetPublicKey {
        key: key_args("ecdsa-1"),
        key_version: 1,
    });
    // the fake answers anything outside its own endpoint with NOT_FOUND
    let bad = KmsClient::new(
        fake_kms().0,
        "https://elsewhere.test",
        AccessTokenSource::Static("t".into()),
    );
    let config = Config {
        client: bad,
        ..config
    };

    let err = operations::run(&config).await.unwrap_err();
    let err = format!("{err:#}");
    assert_eq!(err, "failed to get public key: NOT_FOUND (404): not found");
}
