// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Whether a request that failed with the given HTTP status code could succeed
/// if repeated unchanged. Nothing here retries automatically; the flag only ends
/// up in error messages so an operator knows whether rerunning makes sense.
pub fn is_retriable(code: u16) -> bool {
    match code {
        // Too Many Requests: KMS quota exhaustion (e.g. HSM operations per
        // minute) surfaces as RESOURCE_EXHAUSTED / 429.
        429 => true,

        // Internal Server Error: INTERNAL, sometimes transient.
        500 => true,

        // Service Unavailable: UNAVAILABLE, the canonical "try again later".
        503 => true,

        // Gateway Timeout: DEADLINE_EXCEEDED on the server side.
        504 => true,

        // 400 (INVALID_ARGUMENT, FAILED_PRECONDITION), 401, 403, 404, 409
        // (ALREADY_EXISTS) will fail the same way again.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_retriable;

    #[test]
    fn classifies_kms_statuses() {
        for code in [429, 500, 503, 504] {
            assert!(is_retriable(code), "{code} should be retriable");
        }
        for code in [400, 401, 403, 404, 409, 501] {
            assert!(!is_retriable(code), "{code} should not be retriable");
        }
    }
}
