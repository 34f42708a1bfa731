//! DEL, EXISTS, TYPE, KEYS — operations that act on a key regardless of
//! the type of value it holds.

use crate::codec::Reply;
use crate::commands::require_key;
use crate::dispatch::get_type;
use crate::engine::{type_key, TYPE_PREFIX};
use crate::error::Result;
use crate::state::AppState;

pub fn del(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    let mut batch = state.engine.new_batch();
    let mut deleted = 0i64;
    for key in args {
        if get_type(&state.engine, key)?.is_some() {
            batch.delete(key);
            batch.delete(&type_key(key));
            deleted += 1;
        }
    }
    state.engine.write_batch(batch)?;
    Ok(Reply::Integer(deleted))
}

pub fn exists(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    let exists = get_type(&state.engine, &args[0])?.is_some();
    Ok(Reply::Integer(exists as i64))
}

pub fn type_cmd(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    let reply = match get_type(&state.engine, &args[0])? {
        Some(t) => Reply::Status(t.as_str().to_string()),
        None => Reply::Status("none".to_string()),
    };
    Ok(reply)
}

/// Only trailing-`*` prefix patterns are supported (`"*"` matches
/// everything); anything else is treated as an exact-match pattern since
/// the engine has no general glob matcher over its keyspace.
pub fn keys(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    let pattern = &args[0];
    let keys = if pattern == b"*" {
        state.engine.keys_from_prefix(b"")?
    } else if pattern.last() == Some(&b'*') {
        state.engine.keys_from_prefix(&pattern[..pattern.len() - 1])?
    } else if get_type(&state.engine, pattern)?.is_some() {
        vec![pattern.clone()]
    } else {
        Vec::new()
    };

    let items = keys
        .into_iter()
        .filter(|k| !k.starts_with(TYPE_PREFIX))
        .map(|k| Reply::Bulk(Some(k)))
        .collect();
    Ok(Reply::MultiBulk(items))
}
