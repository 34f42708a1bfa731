//! HSET, HMSET, HGET, HMGET, HDEL, HEXISTS, HKEYS, HVALS, HLEN, HGETALL.

use crate::codec::Reply;
use crate::commands::require_key;
use crate::dispatch::check_type;
use crate::engine::type_key;
use crate::error::{RockdisError, Result};
use crate::object::{decode, encode_operand, HashOp, HashOperand, Operand, RedisType, TypedPayload};
use crate::state::AppState;

fn read_hash(state: &AppState, key: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    match state.engine.get(key)? {
        None => Ok(Vec::new()),
        Some(bytes) => match decode(&bytes)?.data {
            TypedPayload::Hash(pairs) => Ok(pairs),
            _ => Ok(Vec::new()),
        },
    }
}

fn set_fields(state: &AppState, key: &[u8], pairs: &[(&[u8], &[u8])]) -> Result<i64> {
    require_key(key)?;
    check_type(&state.engine, key, RedisType::Hash)?;
    let existing = read_hash(state, key)?;
    let mut new_fields = 0i64;
    for (field, _) in pairs {
        if !existing.iter().any(|(f, _)| f == field) {
            new_fields += 1;
        }
    }

    let mut batch = state.engine.new_batch();
    batch.put(type_key(key), RedisType::Hash.as_str().as_bytes());
    for (field, value) in pairs {
        let operand = encode_operand(&Operand::Hash(HashOperand {
            op: HashOp::Set,
            field: field.to_vec(),
            value: value.to_vec(),
        }));
        batch.merge(key, operand);
    }
    state.engine.write_batch(batch)?;
    Ok(new_fields)
}

pub fn hset(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    let created = set_fields(state, &args[0], &[(&args[1], &args[2])])?;
    Ok(Reply::Integer(created))
}

pub fn hmset(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(RockdisError::WrongArgsNumber);
    }
    let pairs: Vec<(&[u8], &[u8])> = args[1..].chunks_exact(2).map(|c| (c[0].as_slice(), c[1].as_slice())).collect();
    set_fields(state, &args[0], &pairs)?;
    Ok(Reply::ok())
}

pub fn hget(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let pairs = read_hash(state, &args[0])?;
    let value = pairs.into_iter().find(|(f, _)| f == &args[1]).map(|(_, v)| v);
    Ok(Reply::Bulk(value))
}

pub fn hmget(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let pairs = read_hash(state, &args[0])?;
    let items = args[1..]
        .iter()
        .map(|field| Reply::Bulk(pairs.iter().find(|(f, _)| f == field).map(|(_, v)| v.clone())))
        .collect();
    Ok(Reply::MultiBulk(items))
}

pub fn hdel(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let existing = read_hash(state, &args[0])?;
    let mut batch = state.engine.new_batch();
    let mut deleted = 0i64;
    for field in &args[1..] {
        if existing.iter().any(|(f, _)| f == field) {
            let operand = encode_operand(&Operand::Hash(HashOperand {
                op: HashOp::Delete,
                field: field.clone(),
                value: Vec::new(),
            }));
            batch.merge(&args[0], operand);
            deleted += 1;
        }
    }
    state.engine.write_batch(batch)?;
    Ok(Reply::Integer(deleted))
}

pub fn hexists(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let exists = read_hash(state, &args[0])?.iter().any(|(f, _)| f == &args[1]);
    Ok(Reply::Integer(exists as i64))
}

pub fn hkeys(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let items = read_hash(state, &args[0])?.into_iter().map(|(f, _)| Reply::Bulk(Some(f))).collect();
    Ok(Reply::MultiBulk(items))
}

pub fn hvals(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let items = read_hash(state, &args[0])?.into_iter().map(|(_, v)| Reply::Bulk(Some(v))).collect();
    Ok(Reply::MultiBulk(items))
}

pub fn hlen(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    Ok(Reply::Integer(read_hash(state, &args[0])?.len() as i64))
}

pub fn hgetall(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Hash)?;
    let mut items = Vec::new();
    for (field, value) in read_hash(state, &args[0])? {
        items.push(Reply::Bulk(Some(field)));
        items.push(Reply::Bulk(Some(value)));
    }
    Ok(Reply::MultiBulk(items))
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
    fn hset_reports_only_newly_created_fields() {
        let (_dir, state) = open_tmp();
        assert_eq!(hset(&state, &[b"h".to_vec(), b"f1".to_vec(), b"v1".to_vec()]).unwrap(), Reply::Integer(1));
        assert_eq!(hset(&state, &[b"h".to_vec(), b"f1".to_vec(), b"v2".to_vec()]).unwrap(), Reply::Integer(0));
        assert_eq!(hget(&state, &[b"h".to_vec(), b"f1".to_vec()]).unwrap(), Reply::Bulk(Some(b"v2".to_vec())));
    }

    #[test]
    fn hdel_counts_fields_that_actually_existed() {
        let (_dir, state) = open_tmp();
        hset(&state, &[b"h".to_vec(), b"f1".to_vec(), b"v1".to_vec()]).unwrap();
        let deleted = hdel(&state, &[b"h".to_vec(), b"f1".to_vec(), b"ghost".to_vec()]).unwrap();
        assert_eq!(deleted, Reply::Integer(1));
        assert_eq!(hexists(&state, &[b"h".to_vec(), b"f1".to_vec()]).unwrap(), Reply::Integer(0));
    }

    #[test]
    fn hgetall_interleaves_fields_and_values() {
        let (_dir, state) = open_tmp();
        hmset(&state, &[b"h".to_vec(), b"f1".to_vec(), b"v1".to_vec(), b"f2".to_vec(), b"v2".to_vec()]).unwrap();
        assert_eq!(hlen(&state, &[b"h".to_vec()]).unwrap(), Reply::Integer(2));
        let Reply::MultiBulk(items) = hgetall(&state, &[b"h".to_vec()]).unwrap() else { panic!() };
        assert_eq!(items.len(), 4);
    }
}
