//! Content hashing: fixed-width BLAKE3 identifiers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width in bytes of a content hash (the BLAKE3 output width).
pub const HASH_WIDTH: usize = 32;

/// Errors from constructing a [`Hash`] out of external input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// A byte slice of the wrong length was offered.
    #[error("hash length mismatch: expected {HASH_WIDTH} bytes, got {got}")]
    HashLengthMismatch {
        /// Length of the rejected slice.
        got: usize,
    },

    /// A string is not full-width hex.
    #[error("malformed hash: {input:?}")]
    MalformedHash {
        /// The rejected input.
        input: String,
    },
}

/// A 32-byte BLAKE3 hash identifying a chunk's content. Used as the CAS key
/// and, rendered as lowercase hex, as the on-disk filename.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Hash([u8; HASH_WIDTH]);

impl Hash {
    /// Wrap raw hash bytes.
    pub fn new(bytes: [u8; HASH_WIDTH]) -> Self {
        Self(bytes)
    }

    /// Load a hash from a byte slice of exactly [`HASH_WIDTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; HASH_WIDTH] = bytes
            .try_into()
            .map_err(|_| HashError::HashLengthMismatch { got: bytes.len() })?;
        Ok(Self(arr))
    }

    /// Parse a hash from full-width hex (either case accepted).
    pub fn from_hex(input: &str) -> Result<Self, HashError> {
        let malformed = || HashError::MalformedHash {
            input: input.to_string(),
        };
        if input.len() != HASH_WIDTH * 2 {
            return Err(malformed());
        }
        let mut out = [0u8; HASH_WIDTH];
        let digits = input.as_bytes();
        for (i, byte) in out.iter_mut().enumerate() {
            let hi = hex_val(digits[2 * i]).ok_or_else(malformed)?;
            let lo = hex_val(digits[2 * i + 1]).ok_or_else(malformed)?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(out))
    }

    /// Return the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_WIDTH] {
        &self.0
    }
}

impl std::fmt::Display for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_val(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Compute the BLAKE3 hash of `data`.
pub fn sum(data: &[u8]) -> Hash {
    Hash(*blake3::hash(data).as_bytes())
}
