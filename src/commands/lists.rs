//! LLEN, LINDEX, LRANGE, LPUSH, RPUSH, LPOP, RPOP.

use crate::codec::Reply;
use crate::commands::{parse_i64, require_key};
use crate::dispatch::check_type;
use crate::engine::type_key;
use crate::error::Result;
use crate::object::{decode, encode_operand, ListEnd, ListOp, ListOperand, Operand, RedisType, TypedPayload};
use crate::state::AppState;

fn read_list(state: &AppState, key: &[u8]) -> Result<Vec<Vec<u8>>> {
    match state.engine.get(key)? {
        None => Ok(Vec::new()),
        Some(bytes) => match decode(&bytes)?.data {
            TypedPayload::List(items) => Ok(items),
            _ => Ok(Vec::new()),
        },
    }
}

/// Maps a possibly-negative Redis index onto `0..len`, clamped at the
/// boundaries rather than treated as an error.
fn normalize_index(index: i64, len: usize) -> i64 {
    if index < 0 {
        index + len as i64
    } else {
        index
    }
}

fn push(state: &AppState, key: &[u8], values: &[Vec<u8>], end: ListEnd) -> Result<Reply> {
    require_key(key)?;
    check_type(&state.engine, key, RedisType::List)?;
    let mut len = read_list(state, key)?.len();

    let mut batch = state.engine.new_batch();
    batch.put(type_key(key), RedisType::List.as_str().as_bytes());
    for value in values {
        let operand = encode_operand(&Operand::List(ListOperand { op: ListOp::Insert, end, data: value.clone() }));
        batch.merge(key, operand);
        len += 1;
    }
    state.engine.write_batch(batch)?;
    Ok(Reply::Integer(len as i64))
}

pub fn lpush(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    push(state, &args[0], &args[1..], ListEnd::Front)
}

pub fn rpush(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    push(state, &args[0], &args[1..], ListEnd::Back)
}

fn pop(state: &AppState, key: &[u8], end: ListEnd) -> Result<Reply> {
    require_key(key)?;
    check_type(&state.engine, key, RedisType::List)?;
    let items = read_list(state, key)?;
    let popped = match end {
        ListEnd::Front => items.first(),
        ListEnd::Back => items.last(),
    };
    let Some(popped) = popped.cloned() else { return Ok(Reply::Bulk(None)) };

    let operand = encode_operand(&Operand::List(ListOperand { op: ListOp::Remove, end, data: Vec::new() }));
    let mut batch = state.engine.new_batch();
    batch.merge(key, operand);
    state.engine.write_batch(batch)?;
    Ok(Reply::Bulk(Some(popped)))
}

pub fn lpop(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    pop(state, &args[0], ListEnd::Front)
}

pub fn rpop(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    pop(state, &args[0], ListEnd::Back)
}

pub fn llen(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::List)?;
    Ok(Reply::Integer(read_list(state, &args[0])?.len() as i64))
}

pub fn lindex(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::List)?;
    let items = read_list(state, &args[0])?;
    let index = parse_i64(&args[1])?;
    let index = normalize_index(index, items.len());
    if index < 0 || index as usize >= items.len() {
        return Ok(Reply::Bulk(None));
    }
    Ok(Reply::Bulk(Some(items[index as usize].clone())))
}

pub fn lrange(state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    require_key(&args[0])?;
    check_type(&state.engine, &args[0], RedisType::List)?;
    let items = read_list(state, &args[0])?;
    let len = items.len();
    let start = normalize_index(parse_i64(&args[1])?, len).max(0) as usize;
    let stop = normalize_index(parse_i64(&args[2])?, len);
    if stop < 0 || start >= len || start as i64 > stop {
        return Ok(Reply::MultiBulk(Vec::new()));
    }
    let stop = (stop as usize).min(len - 1);
    let slice = items[start..=stop].iter().cloned().map(|v| Reply::Bulk(Some(v))).collect();
    Ok(Reply::MultiBulk(slice))
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
    fn rpush_appends_in_argument_order() {
        let (_dir, state) = open_tmp();
        rpush(&state, &[b"l".to_vec(), b"a".to_vec(), b"b".to_vec()]).unwrap();
        let Reply::MultiBulk(items) = lrange(&state, &[b"l".to_vec(), b"0".to_vec(), b"-1".to_vec()]).unwrap() else { panic!() };
        assert_eq!(items, vec![Reply::Bulk(Some(b"a".to_vec())), Reply::Bulk(Some(b"b".to_vec()))]);
    }

    #[test]
    fn lpush_each_value_lands_at_the_front() {
        let (_dir, state) = open_tmp();
        lpush(&state, &[b"l".to_vec(), b"a".to_vec(), b"b".to_vec()]).unwrap();
        let Reply::MultiBulk(items) = lrange(&state, &[b"l".to_vec(), b"0".to_vec(), b"-1".to_vec()]).unwrap() else { panic!() };
        assert_eq!(items, vec![Reply::Bulk(Some(b"b".to_vec())), Reply::Bulk(Some(b"a".to_vec()))]);
    }

    #[test]
    fn lpop_rpop_drain_from_each_end() {
        let (_dir, state) = open_tmp();
        rpush(&state, &[b"l".to_vec(), b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]).unwrap();
        assert_eq!(lpop(&state, &[b"l".to_vec()]).unwrap(), Reply::Bulk(Some(b"a".to_vec())));
        assert_eq!(rpop(&state, &[b"l".to_vec()]).unwrap(), Reply::Bulk(Some(b"c".to_vec())));
        assert_eq!(llen(&state, &[b"l".to_vec()]).unwrap(), Reply::Integer(1));
    }

    #[test]
    fn pop_on_empty_list_is_null_bulk() {
        let (_dir, state) = open_tmp();
        rpush(&state, &[b"l".to_vec(), b"only".to_vec()]).unwrap();
        rpop(&state, &[b"l".to_vec()]).unwrap();
        assert_eq!(rpop(&state, &[b"l".to_vec()]).unwrap(), Reply::Bulk(None));
    }

    #[test]
    fn lindex_supports_negative_offsets() {
        let (_dir, state) = open_tmp();
        rpush(&state, &[b"l".to_vec(), b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]).unwrap();
        assert_eq!(lindex(&state, &[b"l".to_vec(), b"-1".to_vec()]).unwrap(), Reply::Bulk(Some(b"c".to_vec())));
    }
}
