// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use http_client::{BaseApiClient, HttpsToHttpRewriter};
use kms::client::{DEFAULT_ENDPOINT, MAX_RANDOM_BYTES};
use kms::types::{CryptoKeyVersionAlgorithm, ProtectionLevel};
use kms::{AccessTokenSource, KeyRingName, KmsClient, LocationName};

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "hsmtest",
    version,
    about = "Exercise HSM-backed Cloud KMS operations.",
    long_about = "hsmtest runs one Cloud KMS operation (key generation, random bytes, signing) against a location and key ring, and logs whether it succeeded. It is meant for checking by hand that an HSM-backed setup works end to end."
)]
pub struct Arguments {
    #[arg(
        short,
        long,
        help = "Suppress non-error output and set the log level to WARN."
    )]
    pub quiet: bool,

    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase verbosity level, can be used multiple times."
    )]
    pub verbose: u8,

    #[arg(
        long,
        short = 'z',
        action = ArgAction::SetTrue,
        help = "Use compact (one-line) format for output."
    )]
    pub compact: bool,

    #[arg(
        long,
        env = "HSMTEST_ENDPOINT",
        default_value = DEFAULT_ENDPOINT,
        help = "Base URL of the KMS API."
    )]
    pub endpoint: String,

    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Run requests over http:// instead of https://, e.g. against a local emulator."
    )]
    pub use_http: bool,

    #[arg(
        long,
        env = "HSMTEST_ACCESS_TOKEN",
        hide_env_values = true,
        conflicts_with = "access_token_file",
        help = "OAuth2 access token, e.g. from `gcloud auth print-access-token`. Without this or --access-token-file the metadata server is asked."
    )]
    pub access_token: Option<String>,

    #[arg(
        long,
        env = "HSMTEST_ACCESS_TOKEN_FILE",
        help = "File containing an OAuth2 access token."
    )]
    pub access_token_file: Option<PathBuf>,

    #[arg(
        long,
        env = "HSMTEST_REQUEST_TIMEOUT_SECS",
        default_value = "60",
        help = "Give up on any single request after this many seconds."
    )]
    pub request_timeout_secs: u64,

    #[arg(
        long,
        value_enum,
        env = "HSMTEST_PROTECTION_LEVEL",
        default_value_t = Protection::Hsm,
        help = "Protection level for generated keys and random bytes."
    )]
    pub protection_level: Protection,

    #[arg(
        value_name = "LOCATION",
        env = "HSMTEST_LOCATION",
        help = "Location to operate in, as projects/{project}/locations/{location}."
    )]
    pub location: LocationName,

    #[command(subcommand)]
    pub operation: Operation,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Operation {
    /// Generate an ECDSA signing key in the HSM and print its public key.
    GenerateEcdsa {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long, value_enum, default_value_t = Curve::P256, help = "Curve of the new key.")]
        curve: Curve,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Generate an RSA signing key in the HSM and print its public key.
    GenerateRsa {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long, value_enum, default_value_t = RsaBits::B2048, help = "Modulus size of the new key.")]
        bits: RsaBits,
        #[arg(long, value_enum, default_value_t = RsaPadding::Pkcs1, help = "Signature padding scheme.")]
        padding: RsaPadding,
        #[command(flatten)]
        wait: WaitArgs,
    },
    /// Read random bytes from the HSM and print them hex encoded.
    RandReader {
        #[arg(
            long,
            default_value_t = MAX_RANDOM_BYTES,
            help = "Number of bytes to request (8 to 1024)."
        )]
        length: u32,
    },
    /// Look up an existing key pair by label.
    FindKeypair {
        #[arg(long, env = "HSMTEST_KEY_RING", help = "Key ring id within LOCATION.")]
        key_ring: String,
        #[arg(value_name = "LABEL")]
        label: String,
    },
    /// Sign a message with a key version held in the HSM.
    Sign {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long, default_value_t = 1, help = "Key version to sign with.")]
        key_version: u64,
        #[command(flatten)]
        message: MessageArgs,
    },
    /// Print the public key of a key version.
    GetPublicKey {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long, default_value_t = 1, help = "Key version to read.")]
        key_version: u64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct KeyArgs {
    #[arg(long, env = "HSMTEST_KEY_RING", help = "Key ring id within LOCATION.")]
    pub key_ring: String,
    #[arg(value_name = "KEY", help = "Crypto key id within the key ring.")]
    pub key: String,
}

#[derive(Debug, Clone, Args)]
pub struct WaitArgs {
    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "How many times to check whether the new key version is enabled."
    )]
    pub wait_attempts: u32,
    #[arg(
        long,
        default_value_t = 1000,
        help = "Milliseconds between key version checks."
    )]
    pub wait_interval_ms: u64,
}

impl WaitArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct MessageArgs {
    #[arg(long, help = "Message to sign.")]
    pub message: Option<String>,
    #[arg(long, help = "File whose contents to sign.")]
    pub message_file: Option<PathBuf>,
}

impl MessageArgs {
    pub async fn read(&self) -> anyhow::Result<Vec<u8>> {
        match (&self.message, &self.message_file) {
            (Some(message), _) => Ok(message.as_bytes().to_vec()),
            (None, Some(path)) => tokio::fs::read(path)
                .await
                .with_context(|| format!("reading message from {path:?}")),
            (None, None) => anyhow::bail!("one of --message or --message-file is required"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protection {
    Hsm,
    Software,
}

impl From<Protection> for ProtectionLevel {
    fn from(value: Protection) -> Self {
        match value {
            Protection::Hsm => ProtectionLevel::Hsm,
            Protection::Software => ProtectionLevel::Software,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Curve {
    P256,
    P384,
    Secp256k1,
}

impl Curve {
    pub fn algorithm(self) -> CryptoKeyVersionAlgorithm {
        match self {
            Curve::P256 => CryptoKeyVersionAlgorithm::EcSignP256Sha256,
            Curve::P384 => CryptoKeyVersionAlgorithm::EcSignP384Sha384,
            Curve::Secp256k1 => CryptoKeyVersionAlgorithm::EcSignSecp256k1Sha256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RsaBits {
    #[value(name = "2048")]
    B2048,
    #[value(name = "3072")]
    B3072,
    #[value(name = "4096")]
    B4096,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RsaPadding {
    Pkcs1,
    Pss,
}

pub fn rsa_algorithm(bits: RsaBits, padding: RsaPadding) -> CryptoKeyVersionAlgorithm {
    use CryptoKeyVersionAlgorithm::*;
    match (padding, bits) {
        (RsaPadding::Pkcs1, RsaBits::B2048) => RsaSignPkcs12048Sha256,
        (RsaPadding::Pkcs1, RsaBits::B3072) => RsaSignPkcs13072Sha256,
        (RsaPadding::Pkcs1, RsaBits::B4096) => RsaSignPkcs14096Sha256,
        (RsaPadding::Pss, RsaBits::B2048) => RsaSignPss2048Sha256,
        (RsaPadding::Pss, RsaBits::B3072) => RsaSignPss3072Sha256,
        (RsaPadding::Pss, RsaBits::B4096) => RsaSignPss4096Sha256,
    }
}

impl Arguments {
    pub fn build_config(&self) -> anyhow::Result<Config> {
        let user_agent = format!("hsmtest/{}", env!("CARGO_PKG_VERSION"));
        let timeout = Duration::from_secs(self.request_timeout_secs);
        let api = BaseApiClient::new(&user_agent, Some(timeout)).context("building http client")?;
        let api = if self.use_http {
            HttpsToHttpRewriter::inject(api)
        } else {
            api
        };

        let tokens = match (&self.access_token, &self.access_token_file) {
            (Some(token), _) => AccessTokenSource::Static(token.clone()),
            (None, Some(path)) => AccessTokenSource::File(path.clone()),
            (None, None) => AccessTokenSource::metadata_server(api.clone()),
        };

        // key ring ids are validated up front so a typo fails before any call is made
        match &self.operation {
            Operation::GenerateEcdsa { key, .. }
            | Operation::GenerateRsa { key, .. }
            | Operation::Sign { key, .. }
            | Operation::GetPublicKey { key, .. } => {
                self.location
                    .key_ring(&key.key_ring)
                    .and_then(|ring| ring.crypto_key(&key.key))
                    .context("invalid key arguments")?;
            }
            Operation::FindKeypair { key_ring, .. } => {
                self.location
                    .key_ring(key_ring)
                    .context("invalid key ring")?;
            }
            Operation::RandReader { .. } => {}
        }

        Ok(Config {
            client: KmsClient::new(api, &self.endpoint, tokens),
            location: self.location.clone(),
            protection_level: self.protection_level.into(),
            operation: self.operation.clone(),
            fmt: OutputFormat {
                quiet: self.quiet,
                compact: self.compact,
            },
        })
    }
}

pub struct Config {
    pub client: KmsClient,
    pub location: LocationName,
    pub protection_level: ProtectionLevel,
    pub operation: Operation,
    pub fmt: OutputFormat,
}

impl Config {
    pub fn key_ring(&self, key_ring: &str) -> anyhow::Result<KeyRingName> {
        Ok(self.location.key_ring(key_ring)?)
    }
}
