//! Command handlers, one module per Redis command family.
//!
//! Every mutating handler follows the same shape: check the key's type,
//! build a `WriteBatch` that carries the type-tag write and the value
//! write/merge together, then issue the batch atomically so a reader never
//! observes a tag without its value or vice versa.

pub mod hashes;
pub mod keys;
pub mod lists;
pub mod server;
pub mod sets;
pub mod strings;

use crate::error::{RockdisError, Result};

pub fn parse_i64(bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(RockdisError::ExpectInteger)
}

/// Every command that takes a key checks it for emptiness before touching
/// the engine, mirroring the original's `checkRedisCall`/inline
/// `len(key) == 0` guards.
pub fn require_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        Err(RockdisError::WrongArgsNumber)
    } else {
        Ok(())
    }
}
