//! Canonical key encoding
//!
//! Keys are serialized with bincode and hashed with SHA-256. The first half
//! of the digest, hex encoded, is the key's stem: the catalog index and the
//! committed file name.

use crate::errors::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;

/// Length of a stem in hex characters
pub const STEM_LEN: usize = 32;

/// Fixed-width, filesystem-safe name derived from a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyStem(String);

impl KeyStem {
    /// Derive the stem of a key
    pub fn of<K: Serialize + ?Sized>(key: &K) -> Result<Self> {
        let encoded = match bincode::serialize(key) {
            Ok(bytes) => bytes,
            Err(e) => return Err(e.into()),
        };
        Ok(Self::from_encoded(&encoded))
    }

    /// Derive the stem of an already encoded key
    pub fn from_encoded(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(&digest[..STEM_LEN / 2]))
    }

    /// Recognise a file name written by the cache
    pub fn parse(name: &str) -> Option<Self> {
        let valid = name.len() == STEM_LEN
            && name
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for KeyStem {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for KeyStem {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
