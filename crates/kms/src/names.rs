// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud KMS resource names.
//!
//! Every name is a fixed sequence of `collection/id` pairs rooted at a
//! project, e.g. `projects/p/locations/l/keyRings/r/cryptoKeys/k`. Parsing
//! checks the collection names and the id syntax of each segment, so a value
//! of one of these types is always a well-formed path that can be appended
//! to the API's `/v1/` prefix as-is.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} name {input:?}: {reason}")]
pub struct ResourceNameError {
    pub kind: &'static str,
    pub input: String,
    pub reason: String,
}

impl ResourceNameError {
    fn new(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.to_owned(),
            reason: reason.into(),
        }
    }
}

/// `projects/{project}/locations/{location}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct LocationName {
    pub project: String,
    pub location: String,
}

/// `projects/{project}/locations/{location}/keyRings/{key_ring}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct KeyRingName {
    pub location: LocationName,
    pub key_ring: String,
}

/// `.../keyRings/{key_ring}/cryptoKeys/{crypto_key}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct CryptoKeyName {
    pub key_ring: KeyRingName,
    pub crypto_key: String,
}

/// `.../cryptoKeys/{crypto_key}/cryptoKeyVersions/{version}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct CryptoKeyVersionName {
    pub crypto_key: CryptoKeyName,
    pub version: u64,
}

impl LocationName {
    pub fn new(project: &str, location: &str) -> Result<Self, ResourceNameError> {
        let input = format!("projects/{project}/locations/{location}");
        input.parse()
    }

    pub fn key_ring(&self, key_ring: &str) -> Result<KeyRingName, ResourceNameError> {
        validate_id("key ring", key_ring)?;
        Ok(KeyRingName {
            location: self.clone(),
            key_ring: key_ring.to_owned(),
        })
    }
}

impl KeyRingName {
    pub fn crypto_key(&self, crypto_key: &str) -> Result<CryptoKeyName, ResourceNameError> {
        validate_id("crypto key", crypto_key)?;
        Ok(CryptoKeyName {
            key_ring: self.clone(),
            crypto_key: crypto_key.to_owned(),
        })
    }
}

impl CryptoKeyName {
    pub fn version(&self, version: u64) -> Result<CryptoKeyVersionName, ResourceNameError> {
        if version == 0 {
            return Err(ResourceNameError::new(
                "crypto key version",
                &format!("{self}/cryptoKeyVersions/0"),
                "versions start at 1",
            ));
        }
        Ok(CryptoKeyVersionName {
            crypto_key: self.clone(),
            version,
        })
    }
}

/// Key ring and crypto key ids: 1 to 63 characters from `[a-zA-Z0-9_-]`.
pub fn validate_id(kind: &'static str, id: &str) -> Result<(), ResourceNameError> {
    validate_chars(kind, id, "[a-zA-Z0-9_-]", |c| {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    })
}

/// Project ids, project numbers and domain-scoped ids (`example.com:proj`):
/// lowercase letters, digits, `-`, `.` and `:`, starting with a letter or digit.
pub fn validate_project(project: &str) -> Result<(), ResourceNameError> {
    validate_chars("project", project, "[a-z0-9.:-]", |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | ':')
    })?;
    if !project.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Err(ResourceNameError::new(
            "project",
            project,
            "must start with a lowercase letter or digit",
        ));
    }
    Ok(())
}

/// Location ids such as `us-east1`, `europe` or `global`.
pub fn validate_location(location: &str) -> Result<(), ResourceNameError> {
    validate_chars("location", location, "[a-z0-9-]", |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
    })
}

fn validate_chars(
    kind: &'static str,
    id: &str,
    allowed: &str,
    is_allowed: impl Fn(char) -> bool,
) -> Result<(), ResourceNameError> {
    if id.is_empty() || id.len() > 63 {
        return Err(ResourceNameError::new(
            kind,
            id,
            "id must be between 1 and 63 characters",
        ));
    }
    if let Some(c) = id.chars().find(|c| !is_allowed(*c)) {
        return Err(ResourceNameError::new(
            kind,
            id,
            format!("unexpected character {c:?}, ids may only contain {allowed}"),
        ));
    }
    Ok(())
}

/// Splits `input` into ids, checking that the collections are exactly `collections`.
fn split_segments<'a>(
    kind: &'static str,
    input: &'a str,
    collections: &[&str],
) -> Result<Vec<&'a str>, ResourceNameError> {
    let parts: Vec<&str> = input.split('/').collect();
    if parts.len() != collections.len() * 2 {
        return Err(ResourceNameError::new(
            kind,
            input,
            format!(
                "expected {}",
                collections
                    .iter()
                    .map(|c| format!("{c}/{{id}}"))
                    .collect::<Vec<_>>()
                    .join("/")
            ),
        ));
    }

    let mut ids = Vec::with_capacity(collections.len());
    for (pair, expected) in parts.chunks_exact(2).zip(collections) {
        if pair[0] != *expected {
            return Err(ResourceNameError::new(
                kind,
                input,
                format!("expected collection {expected:?}, found {:?}", pair[0]),
            ));
        }
        if pair[1].is_empty() {
            return Err(ResourceNameError::new(
                kind,
                input,
                format!("empty id after {expected:?}"),
            ));
        }
        ids.push(pair[1]);
    }
    Ok(ids)
}

impl FromStr for LocationName {
    type Err = ResourceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = split_segments("location", s, &["projects", "locations"])?;
        validate_project(ids[0])?;
        validate_location(ids[1])?;
        Ok(Self {
            project: ids[0].to_owned(),
            location: ids[1].to_owned(),
        })
    }
}

impl FromStr for KeyRingName {
    type Err = ResourceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ids = split_segments("key ring", s, &["projects", "locations", "keyRings"])?;
        validate_project(ids[0])?;
        validate_location(ids[1])?;
        validate_id("key ring", ids[2])?;
        Ok(Self {
            location: LocationName {
                project: ids[0].to_owned(),
                location: ids[1].to_owned(),
            },
            key_ring: ids[2].to_owned(),
        })
    }
}

impl FromStr for CryptoKeyName {
    type Err = ResourceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (parent, crypto_key) = s
            .rsplit_once("/cryptoKeys/")
            .ok_or_else(|| ResourceNameError::new("crypto key", s, "missing /cryptoKeys/"))?;
        let key_ring: KeyRingName = parent.parse()?;
        key_ring.crypto_key(crypto_key)
    }
}

impl FromStr for CryptoKeyVersionName {
    type Err = ResourceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (parent, version) = s.rsplit_once("/cryptoKeyVersions/").ok_or_else(|| {
            ResourceNameError::new("crypto key version", s, "missing /cryptoKeyVersions/")
        })?;
        let version = version.parse().map_err(|_| {
            ResourceNameError::new("crypto key version", s, "version must be a positive integer")
        })?;
        let crypto_key: CryptoKeyName = parent.parse()?;
        crypto_key.version(version)
    }
}

impl fmt::Display for LocationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/locations/{}", self.project, self.location)
    }
}

impl fmt::Display for KeyRingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/keyRings/{}", self.location, self.key_ring)
    }
}

impl fmt::Display for CryptoKeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/cryptoKeys/{}", self.key_ring, self.crypto_key)
    }
}

impl fmt::Display for CryptoKeyVersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/cryptoKeyVersions/{}", self.crypto_key, self.version)
    }
}
