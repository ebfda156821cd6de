// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRC32C (Castagnoli) end-to-end integrity checks, as the KMS API attaches
//! them to every request and response that carries key material, digests,
//! signatures or random data.

use tracing::warn;

use crate::error::KmsError;

pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Checks `data` against the checksum the service sent along with it.
///
/// A missing checksum is not an error: emulators and older API revisions omit
/// them. It is logged so that a production run without checks stands out.
pub fn verify(what: &str, data: &[u8], expected: Option<u32>) -> Result<(), KmsError> {
    let Some(expected) = expected else {
        warn!("no crc32c returned for {what}, skipping integrity check");
        return Ok(());
    };
    let actual = crc32c(data);
    if actual != expected {
        return Err(KmsError::Integrity {
            what: what.to_owned(),
            detail: format!("crc32c mismatch: expected {expected}, computed {actual}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // RFC 3720 B.4 check value for "123456789"
        assert_eq!(crc32c(b"123456789"), 0xe306_9283);
        assert_eq!(crc32c(b""), 0);
    }

    #[test]
    fn verify_detects_mismatch() {
        let sum = crc32c(b"random bytes");
        verify("data", b"random bytes", Some(sum)).unwrap();
        verify("data", b"random bytes", None).unwrap();

        let err = verify("data", b"random bytez", Some(sum)).unwrap_err();
        assert!(matches!(err, KmsError::Integrity { ref what, .. } if what == "data"));
    }
}
