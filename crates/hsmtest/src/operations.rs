// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use kms::client::spki_der;
use kms::types::{CryptoKeyVersionAlgorithm, ProtectionLevel, PublicKey};

use crate::opts::{rsa_algorithm, Config, KeyArgs, Operation, WaitArgs};

/// A signing key's public half, as printed after generation or lookup.
#[derive(Debug, Clone, Serialize)]
pub struct KeyOutput {
    pub name: String,
    pub algorithm: CryptoKeyVersionAlgorithm,
    pub protection_level: Option<ProtectionLevel>,
    /// SHA-256 of the DER SubjectPublicKeyInfo, hex encoded.
    pub spki_sha256: String,
    pub pem: String,
}

impl KeyOutput {
    /// `version` names the key when the service response leaves it out.
    fn new(public_key: PublicKey, version: String) -> Result<Self> {
        let der = spki_der(&public_key)?;
        Ok(Self {
            name: if public_key.name.is_empty() {
                version
            } else {
                public_key.name
            },
            algorithm: public_key.algorithm,
            protection_level: public_key.protection_level,
            spki_sha256: hex::encode(Sha256::digest(der)),
            pem: public_key.pem,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RandomOutput {
    pub length: usize,
    pub hex: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureOutput {
    pub name: String,
    pub protection_level: Option<ProtectionLevel>,
    pub signature: String,
}

fn banner(title: &str) {
    info!("{title}");
    info!("{}", "*".repeat(title.len()));
}

/// Runs the configured operation, printing its result on success.
pub async fn run(config: &Config) -> Result<()> {
    let fmt = config.fmt;
    let level = config.protection_level;

    match &config.operation {
        Operation::GenerateEcdsa { key, curve, wait } => {
            banner(&format!("Testing ECDSA key generation on {level}"));
            let out = generate_key(config, key, curve.algorithm(), wait)
                .await
                .context("failed to generate ecdsa")?;
            info!("Succeeded!");
            fmt.output("generate-ecdsa", &out.name, &out);
        }
        Operation::GenerateRsa {
            key,
            bits,
            padding,
            wait,
        } => {
            banner(&format!("Testing RSA key generation on {level}"));
            let out = generate_key(config, key, rsa_algorithm(*bits, *padding), wait)
                .await
                .context("failed to generate rsa")?;
            info!("Succeeded!");
            fmt.output("generate-rsa", &out.name, &out);
        }
        Operation::RandReader { length } => {
            banner(&format!("Testing random byte generation on {level}"));
            let out = rand_reader(config, *length)
                .await
                .context("rand reader test failed")?;
            info!("Succeeded!");
            fmt.output("rand-reader", &config.location.to_string(), &out);
        }
        Operation::FindKeypair { key_ring, label } => {
            banner(&format!("Testing key pair lookup on {level}"));
            let handle = find_keypair(config, key_ring, label).context("failed to find key pair")?;
            info!("Succeeded!");
            info!("handle is: {handle}");
        }
        Operation::Sign {
            key,
            key_version,
            message,
        } => {
            banner(&format!("Testing asymmetric signing on {level}"));
            let out = match message.read().await {
                Ok(message) => sign(config, key, *key_version, &message).await,
                Err(err) => Err(err),
            }
            .context("failed to sign")?;
            info!("Succeeded!");
            fmt.output("sign", &out.name, &out);
        }
        Operation::GetPublicKey { key, key_version } => {
            banner(&format!("Testing public key retrieval on {level}"));
            let out = get_public_key(config, key, *key_version)
                .await
                .context("failed to get public key")?;
            info!("Succeeded!");
            fmt.output("get-public-key", &out.name, &out);
        }
    }
    Ok(())
}

pub async fn generate_key(
    config: &Config,
    key: &KeyArgs,
    algorithm: CryptoKeyVersionAlgorithm,
    wait: &WaitArgs,
) -> Result<KeyOutput> {
    let key_ring = config.key_ring(&key.key_ring)?;
    let (name, public_key) = config
        .client
        .create_and_await_signing_key(
            &key_ring,
            &key.key,
            algorithm,
            config.protection_level,
            wait.wait_attempts,
            wait.interval(),
        )
        .await?;
    info!("created {name}");
    KeyOutput::new(public_key, format!("{name}/cryptoKeyVersions/1"))
}

pub async fn rand_reader(config: &Config, length: u32) -> Result<RandomOutput> {
    let data = config
        .client
        .generate_random_bytes(&config.location, length, config.protection_level)
        .await?;
    Ok(RandomOutput {
        length: data.len(),
        hex: hex::encode(data),
    })
}

pub fn find_keypair(config: &Config, key_ring: &str, label: &str) -> Result<u64> {
    let key_ring = config.key_ring(key_ring)?;
    Ok(config.client.find_key_pair(&key_ring, label)?)
}

pub async fn sign(
    config: &Config,
    key: &KeyArgs,
    key_version: u64,
    message: &[u8],
) -> Result<SignatureOutput> {
    let version = config
        .key_ring(&key.key_ring)?
        .crypto_key(&key.key)?
        .version(key_version)?;
    let response = config.client.asymmetric_sign(&version, message).await?;
    Ok(SignatureOutput {
        name: version.to_string(),
        protection_level: response.protection_level,
        signature: hex::encode(response.signature),
    })
}

pub async fn get_public_key(config: &Config, key: &KeyArgs, key_version: u64) -> Result<KeyOutput> {
    let version = config
        .key_ring(&key.key_ring)?
        .crypto_key(&key.key)?
        .version(key_version)?;
    let public_key = config.client.get_public_key(&version).await?;
    KeyOutput::new(public_key, version.to_string())
}
