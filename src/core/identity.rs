//! Canonical configuration identity
//!
//! A configuration's identity is a SHA-256 digest over its extensions'
//! (name, commit) pairs in lexicographic name order. Submission order never
//! changes the digest; any change to a name or commit does. The hex digest
//! doubles as the API token for status polling and artifact download.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::extension::ResolvedExtension;

/// Canonical identity of one configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(String);

impl ConfigId {
    /// Parse a token as received from an API consumer
    ///
    /// Only 64-character lowercase hex strings are valid tokens.
    pub fn parse(token: &str) -> Option<Self> {
        let valid = token.len() == 64
            && token
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(token.to_string()))
    }

    /// The hex digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConfigId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the canonical identity of a configuration
///
/// Pure function; callers must pass extensions whose `commit` is already
/// resolved to an immutable revision. Hashing a branch name would let cache
/// entries go stale as the branch moves.
pub fn configuration_id(extensions: &[ResolvedExtension]) -> ConfigId {
    let mut sorted: Vec<&ResolvedExtension> = extensions.iter().collect();
    // Commit as tie-breaker keeps the digest order-independent even for
    // degenerate inputs that repeat a name.
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.commit.cmp(&b.commit)));

    let mut hasher = Sha256::new();
    for extension in sorted {
        hasher.update(extension.name.as_bytes());
        hasher.update(extension.commit.as_bytes());
    }

    ConfigId(hex::encode(hasher.finalize()))
}
