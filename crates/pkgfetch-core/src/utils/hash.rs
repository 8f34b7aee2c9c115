//! Tarball integrity hashing.
//!
//! npm registries publish a Subresource Integrity string (`sha512-<base64>`)
//! and a legacy hex SHA-1 `shasum` for every tarball.

use crate::error::{FetchError, FetchResult};
use base64::{engine::general_purpose, Engine as _};
use sha1::Sha1;
use sha2::{Digest, Sha512};

const SHA512_PREFIX: &str = "sha512-";

/// Compute the `sha512-<base64>` integrity string of data
pub fn sha512_integrity(data: &[u8]) -> String {
    encode_sha512(Sha512::digest(data).as_slice())
}

/// Compute the hex SHA-1 of data
pub fn sha1_hex(data: &[u8]) -> String {
    format!("{:x}", Sha1::digest(data))
}

fn encode_sha512(digest: &[u8]) -> String {
    format!("{}{}", SHA512_PREFIX, general_purpose::STANDARD.encode(digest))
}

/// Both registry digests, fed one chunk at a time
#[derive(Clone, Default)]
pub struct IntegrityHasher {
    sha512: Sha512,
    sha1: Sha1,
}

impl IntegrityHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.sha512.update(chunk);
        self.sha1.update(chunk);
    }

    /// Check everything fed so far against the registry's integrity fields.
    ///
    /// A `sha512-` integrity string takes precedence; otherwise the SHA-1
    /// `shasum` is checked. Data with neither is accepted.
    pub fn verify(
        self,
        package: &str,
        integrity: Option<&str>,
        shasum: Option<&str>,
    ) -> FetchResult<()> {
        let mismatch = |expected: &str, actual: String| FetchError::IntegrityFailure {
            package: package.to_string(),
            expected: expected.to_string(),
            actual,
        };

        // Integrity strings may list several hashes separated by whitespace
        if let Some(expected) = integrity
            .into_iter()
            .flat_map(str::split_whitespace)
            .find(|candidate| candidate.starts_with(SHA512_PREFIX))
        {
            let actual = encode_sha512(self.sha512.finalize().as_slice());
            if actual != expected {
                return Err(mismatch(expected, actual));
            }
            return Ok(());
        }

        if let Some(expected) = shasum.filter(|s| !s.is_empty()) {
            let actual = format!("{:x}", self.sha1.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(mismatch(expected, actual));
            }
        }

        Ok(())
    }
}
