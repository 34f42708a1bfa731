//! GET, SET, APPEND, GETSET, MGET, MSET, INCR/DECR and their BY variants.
//!
//! SET, GETSET and MSET replace the value outright (a direct `put` of a
//! fresh envelope); APPEND and the INCR family go through the merge
//! operator so concurrent writers never race on a read-modify-write.

use crate::codec::Reply;
use crate::commands::{parse_i64, require_key};
use crate::dispatch::check_type;
use crate::engine::type_key;
use crate::error::{RockdisError, Result};
use crate::object::{decode, encode, encode_operand, Operand, RedisType, StringOp, StringOperand, TypedPayload};
use crate::state::AppState;

fn read_string(state: &AppState, key: &[u8]) -> Result<Option<Vec<u8>>> {
    match state.engine.get(key)? {
        None => Ok(None),
        Some(bytes) => match decode(&bytes)?.data {
            TypedPayload::String(s) => Ok(Some(s)),
            _ => Err(RockdisError::WrongType),
        },
    }
}

fn put_string(state: &AppState, key: &[u8], value: Vec<u8>) -> Result<()> {
    let mut batch = state.engine.new_batch();
    batch.put(type_key(key), RedisType::String.as_str().as_bytes());
    batch.put(key, encode(&crate::object::RedisObject::new(TypedPayload::String(value))));
    state.engine.write_batch(batch)
}

pub fn get(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::String)?;
    match read_string(state, &args[0])? {
        Some(value) => {
            state.stats.hit();
            Ok(Reply::bulk(value))
        }
        None => {
            state.stats.miss();
            Ok(Reply::Bulk(None))
        }
    }
}

pub fn set(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    require_key(&args[1])?;
    put_string(state, &args[0], args[1].clone())?;
    Ok(Reply::ok())
}

pub fn append(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::String)?;
    let current_len = read_string(state, &args[0])?.map(|v| v.len()).unwrap_or(0);
    let operand = encode_operand(&Operand::String(StringOperand { op: StringOp::Append, data: args[1].clone() }));

    let mut batch = state.engine.new_batch();
    batch.put(type_key(&args[0]), RedisType::String.as_str().as_bytes());
    batch.merge(&args[0], operand);
    state.engine.write_batch(batch)?;

    Ok(Reply::Integer((current_len + args[1].len()) as i64))
}

pub fn getset(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::String)?;
    let old = read_string(state, &args[0])?;
    put_string(state, &args[0], args[1].clone())?;
    Ok(Reply::Bulk(old))
}

pub fn mget(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    let mut items = Vec::with_capacity(args.len());
    for key in args {
        let value = match state.engine.get(key)? {
            Some(bytes) => match decode(&bytes)?.data {
                TypedPayload::String(s) => Some(s),
                _ => None,
            },
            None => None,
        };
        items.push(Reply::Bulk(value));
    }
    Ok(Reply::MultiBulk(items))
}

pub fn mset(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(RockdisError::WrongArgsNumber);
    }
    let mut batch = state.engine.new_batch();
    for pair in args.chunks_exact(2) {
        require_key(&pair[0])?;
        require_key(&pair[1])?;
        batch.put(type_key(&pair[0]), RedisType::String.as_str().as_bytes());
        batch.put(&pair[0], encode(&crate::object::RedisObject::new(TypedPayload::String(pair[1].clone()))));
    }
    state.engine.write_batch(batch)?;
    Ok(Reply::ok())
}

fn incr_by(state: &AppState, key: &[u8], delta: i64) -> Result<Reply> {
    require_key(key)?;
    check_type(&state.engine, key, RedisType::String)?;
    let current = match read_string(state, key)? {
        Some(bytes) => parse_i64(&bytes).unwrap_or(0),
        None => 0,
    };
    let new_value = current.wrapping_add(delta);
    let operand = encode_operand(&Operand::String(StringOperand {
        op: StringOp::Incr,
        data: delta.to_string().into_bytes(),
    }));

    let mut batch = state.engine.new_batch();
    batch.put(type_key(key), RedisType::String.as_str().as_bytes());
    batch.merge(key, operand);
    state.engine.write_batch(batch)?;

    Ok(Reply::bulk(new_value.to_string().into_bytes()))
}

pub fn incr(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    incr_by(state, &args[0], 1)
}

pub fn decr(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    incr_by(state, &args[0], -1)
}

pub fn incrby(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    let delta = parse_i64(&args[1])?;
    incr_by(state, &args[0], delta)
}

pub fn decrby(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    let delta = parse_i64(&args[1])?;
    incr_by(state, &args[0], -delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::engine::Engine;
    use crate::stats::Stats;

    fn open_tmp() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DatabaseConfig::default();
        config.dbdir = dir.path().to_string_lossy().into_owned();
        let engine = Engine::open(&config).unwrap();
        (dir, AppState { engine, stats: std::sync::Arc::new(Stats::new()), info: crate::state::ServerInfo::for_test() })
    }

    #[test]
    fn set_then_get_round_trips() {
        let (_dir, state) = open_tmp();
        set(&state, &[b"k".to_vec(), b"v".to_vec()]).unwrap();
        assert_eq!(get(&state, &[b"k".to_vec()]).unwrap(), Reply::Bulk(Some(b"v".to_vec())));
    }

    #[test]
    fn get_missing_key_is_null_bulk() {
        let (_dir, state) = open_tmp();
        assert_eq!(get(&state, &[b"ghost".to_vec()]).unwrap(), Reply::Bulk(None));
    }

    #[test]
    fn append_reports_new_length_and_extends_value() {
        let (_dir, state) = open_tmp();
        set(&state, &[b"k".to_vec(), b"ab".to_vec()]).unwrap();
        let reply = append(&state, &[b"k".to_vec(), b"cd".to_vec()]).unwrap();
        assert_eq!(reply, Reply::Integer(4));
        assert_eq!(get(&state, &[b"k".to_vec()]).unwrap(), Reply::Bulk(Some(b"abcd".to_vec())));
    }

    #[test]
    fn getset_returns_previous_value() {
        let (_dir, state) = open_tmp();
        set(&state, &[b"k".to_vec(), b"old".to_vec()]).unwrap();
        let reply = getset(&state, &[b"k".to_vec(), b"new".to_vec()]).unwrap();
        assert_eq!(reply, Reply::Bulk(Some(b"old".to_vec())));
        assert_eq!(get(&state, &[b"k".to_vec()]).unwrap(), Reply::Bulk(Some(b"new".to_vec())));
    }

    #[test]
    fn end_to_end_incr_decr_append_matches_documented_example() {
        let (_dir, state) = open_tmp();
        set(&state, &[b"n".to_vec(), b"10".to_vec()]).unwrap();
        assert_eq!(incrby(&state, &[b"n".to_vec(), b"5".to_vec()]).unwrap(), Reply::Bulk(Some(b"15".to_vec())));
        assert_eq!(decr(&state, &[b"n".to_vec()]).unwrap(), Reply::Bulk(Some(b"14".to_vec())));
        append(&state, &[b"n".to_vec(), b"!".to_vec()]).unwrap();
        assert_eq!(get(&state, &[b"n".to_vec()]).unwrap(), Reply::Bulk(Some(b"14!".to_vec())));
    }

    #[test]
    fn mset_then_mget_preserves_order_and_nils_missing() {
        let (_dir, state) = open_tmp();
        mset(&state, &[b"a".to_vec(), b"1".to_vec(), b"b".to_vec(), b"2".to_vec()]).unwrap();
        let reply = mget(&state, &[b"a".to_vec(), b"missing".to_vec(), b"b".to_vec()]).unwrap();
        assert_eq!(
            reply,
            Reply::MultiBulk(vec![Reply::Bulk(Some(b"1".to_vec())), Reply::Bulk(None), Reply::Bulk(Some(b"2".to_vec()))])
        );
    }

    #[test]
    fn empty_key_is_rejected() {
        let (_dir, state) = open_tmp();
        assert!(matches!(get(&state, &[Vec::new()]), Err(RockdisError::WrongArgsNumber)));
        assert!(matches!(set(&state, &[Vec::new(), b"v".to_vec()]), Err(RockdisError::WrongArgsNumber)));
        assert!(matches!(set(&state, &[b"k".to_vec(), Vec::new()]), Err(RockdisError::WrongArgsNumber)));
    }

    #[test]
    fn get_on_wrong_type_errors() {
        let (_dir, state) = open_tmp();
        crate::commands::lists::rpush(&state, &[b"k".to_vec(), b"x".to_vec()]).unwrap();
        assert!(matches!(get(&state, &[b"k".to_vec()]), Err(RockdisError::WrongType)));
    }
}
