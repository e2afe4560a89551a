// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document integrity — SHA-256 fingerprints of the submitted bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Fingerprint of a submitted document, optionally checked against a
/// reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-256 of the submitted bytes.
    pub sha256: String,
    /// SHA-256 of the reference document, when one was supplied.
    pub reference_sha256: Option<String>,
    /// `Some(true)` when the submission is byte-for-byte the reference.
    pub byte_identical: Option<bool>,
}

impl Fingerprint {
    pub fn of(document: &[u8], reference: Option<&[u8]>) -> Self {
        let sha256 = hash_bytes(document);
        let reference_sha256 = reference.map(hash_bytes);
        let byte_identical = reference_sha256.as_ref().map(|r| *r == sha256);
        Self {
            sha256,
            reference_sha256,
            byte_identical,
        }
    }
}
