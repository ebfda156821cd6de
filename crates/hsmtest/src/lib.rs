// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manual test harness for HSM-backed Cloud KMS operations.

pub mod operations;
pub mod opts;
pub mod output;

pub use opts::{Arguments, Config, Operation};
