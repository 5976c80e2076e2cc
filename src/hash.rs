//! Keyed SHA-2 digests (HMAC, RFC 2104) rendered as lowercase hex.
//!
//! Used by the session layer to sign tokens, and exposed on its own for
//! applications that need tamper-evident identifiers.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Digest variant backing a [`KeyedHash`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashVariant {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashVariant {
    /// Digest size in bytes.
    #[must_use]
    pub fn output_len(self) -> usize {
        match self {
            HashVariant::Sha256 => 32,
            HashVariant::Sha384 => 48,
            HashVariant::Sha512 => 64,
        }
    }

    fn block_len(self) -> usize {
        match self {
            HashVariant::Sha256 => 64,
            HashVariant::Sha384 | HashVariant::Sha512 => 128,
        }
    }

    fn digest(self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            HashVariant::Sha256 => digest_parts::<Sha256>(parts),
            HashVariant::Sha384 => digest_parts::<Sha384>(parts),
            HashVariant::Sha512 => digest_parts::<Sha512>(parts),
        }
    }
}

impl fmt::Display for HashVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashVariant::Sha256 => f.write_str("sha256"),
            HashVariant::Sha384 => f.write_str("sha384"),
            HashVariant::Sha512 => f.write_str("sha512"),
        }
    }
}

impl FromStr for HashVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashVariant::Sha256),
            "sha384" => Ok(HashVariant::Sha384),
            "sha512" => Ok(HashVariant::Sha512),
            other => Err(format!("unknown hash variant '{other}'")),
        }
    }
}

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().as_slice().to_vec()
}

/// HMAC over a SHA-2 variant with a fixed secret key.
#[derive(Clone)]
pub struct KeyedHash {
    variant: HashVariant,
    inner_pad: Vec<u8>,
    outer_pad: Vec<u8>,
}

impl KeyedHash {
    pub fn new(key: impl AsRef<[u8]>, variant: HashVariant) -> Self {
        let key = key.as_ref();
        let block_len = variant.block_len();

        // Keys longer than a block are hashed first
        let mut padded_key = if key.len() > block_len {
            variant.digest(&[key])
        } else {
            key.to_vec()
        };
        padded_key.resize(block_len, 0);

        let inner_pad = padded_key.iter().map(|b| b ^ 0x36).collect();
        let outer_pad = padded_key.iter().map(|b| b ^ 0x5c).collect();
        Self {
            variant,
            inner_pad,
            outer_pad,
        }
    }

    #[must_use]
    pub fn variant(&self) -> HashVariant {
        self.variant
    }

    /// Raw MAC bytes for `input`.
    #[must_use]
    pub fn mac(&self, input: &[u8]) -> Vec<u8> {
        let inner = self.variant.digest(&[self.inner_pad.as_slice(), input]);
        self.variant.digest(&[self.outer_pad.as_slice(), inner.as_slice()])
    }

    /// Lowercase hex MAC of `input`.
    #[must_use]
    pub fn make(&self, input: &str) -> String {
        hex::encode(self.mac(input.as_bytes()))
    }

    /// Check `digest` against `make(input)` in constant time.
    #[must_use]
    pub fn verify(&self, input: &str, digest: &str) -> bool {
        let expected = self.make(input);
        expected.len() == digest.len()
            && expected
                .bytes()
                .zip(digest.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl fmt::Debug for KeyedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedHash")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}
