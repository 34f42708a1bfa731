//! Type dispatch: every handler that implies a type checks it here before
//! touching the value, reading the companion tag key rather than decoding
//! the (possibly large) envelope itself.

use crate::engine::{type_key, Engine};
use crate::error::{RockdisError, Result};
use crate::object::RedisType;

/// `None` means the key does not exist at all (`TYPE` reports `+none`).
pub fn get_type(engine: &Engine, key: &[u8]) -> Result<Option<RedisType>> {
    match engine.get(&type_key(key))? {
        None => Ok(None),
        Some(bytes) => {
            let tag = std::str::from_utf8(&bytes)
                .map_err(|_| RockdisError::Malformed("corrupt type tag".to_string()))?;
            RedisType::from_str(tag)
                .map(Some)
                .ok_or_else(|| RockdisError::Malformed(format!("unknown type tag {tag:?}")))
        }
    }
}

/// A new key (no tag yet) passes for any expected type; an existing key
/// with a different tag is a `WrongType` error.
pub fn check_type(engine: &Engine, key: &[u8], expected: RedisType) -> Result<()> {
    match get_type(engine, key)? {
        None => Ok(()),
        Some(actual) if actual.as_str() == expected.as_str() => Ok(()),
        Some(_) => Err(RockdisError::WrongType),
    }
}
