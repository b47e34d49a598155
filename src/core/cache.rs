//! Cache key derivation shared by the persistent stores

use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Identifies one memoized call: the operation name plus a content digest
/// of its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    digest: String,
}

impl CacheKey {
    /// Hashes the structural JSON form of `args`, so `1` and `"1"` produce
    /// different keys. Arguments must serialize deterministically (no
    /// `HashMap`s).
    pub fn new<A: Serialize + ?Sized>(operation: &str, args: &A) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(args)?);

        Ok(Self {
            operation: operation.to_string(),
            digest: hex::encode(hasher.finalize()),
        })
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// `<operation>.<digest>.json`
    pub fn file_name(&self) -> String {
        format!("{}.{}.json", self.operation, self.digest)
    }

    /// Whether `name` has the shape [`CacheKey::file_name`] produces: a
    /// non-empty operation and a 64 character lowercase hex digest.
    pub fn is_entry_file_name(name: &str) -> bool {
        let Some(stem) = name.strip_suffix(".json") else {
            return false;
        };
        let Some((operation, digest)) = stem.rsplit_once('.') else {
            return false;
        };
        !operation.is_empty()
            && digest.len() == 64
            && digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}
