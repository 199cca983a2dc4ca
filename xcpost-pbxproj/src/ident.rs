//! Deterministic object identifiers.
//!
//! Xcode identifiers are 24 upper-case hex digits. New objects get an id derived from
//! a seed (object kind + path), so applying the same edit to the same document always
//! produces the same bytes.

use crate::error::EditError;
use crate::value::Dict;
use sha2::{Digest, Sha256};

const MAX_ATTEMPTS: u32 = 64;

fn candidate(seed: &str, attempt: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"xcpost:");
    hasher.update(seed.as_bytes());
    hasher.update(attempt.to_le_bytes());
    hex::encode_upper(&hasher.finalize()[..12])
}

/// Pick an id for `seed` that is not already a key of `objects`.
pub(crate) fn allocate(objects: &Dict, seed: &str) -> Result<String, EditError> {
    (0..MAX_ATTEMPTS)
        .map(|attempt| candidate(seed, attempt))
        .find(|id| !objects.contains_key(id))
        .ok_or_else(|| EditError::IdExhausted {
            seed: seed.to_string(),
        })
}
