//! SADD, SREM, SCARD, SISMEMBER, SMEMBERS.

use crate::codec::Reply;
use crate::commands::require_key;
use crate::dispatch::check_type;
use crate::engine::type_key;
use crate::error::Result;
use crate::object::{decode, encode_operand, Operand, RedisType, SetOp, SetOperand, TypedPayload};
use crate::state::AppState;

fn read_set(state: &AppState, key: &[u8]) -> Result<Vec<Vec<u8>>> {
    match state.engine.get(key)? {
        None => Ok(Vec::new()),
        Some(bytes) => match decode(&bytes)?.data {
            TypedPayload::Set(members) => Ok(members),
            _ => Ok(Vec::new()),
        },
    }
}

pub fn sadd(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Set)?;
    let existing = read_set(state, &args[0])?;
    let mut batch = state.engine.new_batch();
    batch.put(type_key(&args[0]), RedisType::Set.as_str().as_bytes());
    let mut added = 0i64;
    let mut seen_in_batch: Vec<&[u8]> = Vec::new();
    for member in &args[1..] {
        if !existing.iter().any(|m| m == member) && !seen_in_batch.contains(&member.as_slice()) {
            added += 1;
            seen_in_batch.push(member);
        }
        let operand = encode_operand(&Operand::Set(SetOperand { op: SetOp::Set, member: member.clone() }));
        batch.merge(&args[0], operand);
    }
    state.engine.write_batch(batch)?;
    Ok(Reply::Integer(added))
}

pub fn srem(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Set)?;
    let existing = read_set(state, &args[0])?;
    let mut batch = state.engine.new_batch();
    let mut removed = 0i64;
    for member in &args[1..] {
        if existing.iter().any(|m| m == member) {
            let operand = encode_operand(&Operand::Set(SetOperand { op: SetOp::Delete, member: member.clone() }));
            batch.merge(&args[0], operand);
            removed += 1;
        }
    }
    state.engine.write_batch(batch)?;
    Ok(Reply::Integer(removed))
}

pub fn scard(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Set)?;
    Ok(Reply::Integer(read_set(state, &args[0])?.len() as i64))
}

pub fn sismember(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Set)?;
    let is_member = read_set(state, &args[0])?.iter().any(|m| m == &args[1]);
    Ok(Reply::Integer(is_member as i64))
}

pub fn smembers(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::Set)?;
    let items = read_set(state, &args[0])?.into_iter().map(|m| Reply::Bulk(Some(m))).collect();
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
    fn sadd_counts_only_newly_inserted_members() {
        let (_dir, state) = open_tmp();
        assert_eq!(sadd(&state, &[b"s".to_vec(), b"a".to_vec(), b"a".to_vec(), b"b".to_vec()]).unwrap(), Reply::Integer(2));
        assert_eq!(sadd(&state, &[b"s".to_vec(), b"a".to_vec(), b"c".to_vec()]).unwrap(), Reply::Integer(1));
        assert_eq!(scard(&state, &[b"s".to_vec()]).unwrap(), Reply::Integer(3));
    }

    #[test]
    fn srem_counts_only_members_that_existed() {
        let (_dir, state) = open_tmp();
        sadd(&state, &[b"s".to_vec(), b"a".to_vec(), b"b".to_vec()]).unwrap();
        let removed = srem(&state, &[b"s".to_vec(), b"a".to_vec(), b"ghost".to_vec()]).unwrap();
        assert_eq!(removed, Reply::Integer(1));
        assert_eq!(sismember(&state, &[b"s".to_vec(), b"a".to_vec()]).unwrap(), Reply::Integer(0));
        assert_eq!(sismember(&state, &[b"s".to_vec(), b"b".to_vec()]).unwrap(), Reply::Integer(1));
    }
}
