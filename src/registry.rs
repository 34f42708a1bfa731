//! Lower-cased command name to handler lookup, built once at startup.
//!
//! `arity` follows the teacher's convention: positive is the exact total
//! argument count including the command name itself, negative is a
//! minimum (`-2` means "2 or more").

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::codec::Reply;
use crate::commands;
use crate::error::{RockdisError, Result};
use crate::state::AppState;

pub type HandlerFn = fn(&AppState, &[Vec<u8>]) -> Result<Reply>;

pub struct Handler {
    pub name: &'static str,
    pub arity: i32,
    pub proc: HandlerFn,
}

impl Handler {
    fn arity_ok(&self, total_args: usize) -> bool {
        if self.arity >= 0 {
            total_args == self.arity as usize
        } else {
            total_args >= (-self.arity) as usize
        }
    }
}

pub static REGISTRY: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| {
    use commands::{hashes, keys, lists, server, sets, strings};

    [
        Handler { name: "ping", arity: 1, proc: server::ping },
        Handler { name: "select", arity: 2, proc: server::select },
        Handler { name: "info", arity: 1, proc: server::info },
        Handler { name: "del", arity: -2, proc: keys::del },
        Handler { name: "exists", arity: 2, proc: keys::exists },
        Handler { name: "type", arity: 2, proc: keys::type_cmd },
        Handler { name: "keys", arity: 2, proc: keys::keys },
        Handler { name: "get", arity: 2, proc: strings::get },
        Handler { name: "set", arity: 3, proc: strings::set },
        Handler { name: "append", arity: 3, proc: strings::append },
        Handler { name: "getset", arity: 3, proc: strings::getset },
        Handler { name: "mget", arity: -2, proc: strings::mget },
        Handler { name: "mset", arity: -3, proc: strings::mset },
        Handler { name: "incr", arity: 2, proc: strings::incr },
        Handler { name: "decr", arity: 2, proc: strings::decr },
        Handler { name: "incrby", arity: 3, proc: strings::incrby },
        Handler { name: "decrby", arity: 3, proc: strings::decrby },
        Handler { name: "llen", arity: 2, proc: lists::llen },
        Handler { name: "lindex", arity: 3, proc: lists::lindex },
        Handler { name: "lrange", arity: 4, proc: lists::lrange },
        Handler { name: "lpush", arity: -3, proc: lists::lpush },
        Handler { name: "rpush", arity: -3, proc: lists::rpush },
        Handler { name: "lpop", arity: 2, proc: lists::lpop },
        Handler { name: "rpop", arity: 2, proc: lists::rpop },
        Handler { name: "hset", arity: 4, proc: hashes::hset },
        Handler { name: "hmset", arity: -4, proc: hashes::hmset },
        Handler { name: "hget", arity: 3, proc: hashes::hget },
        Handler { name: "hmget", arity: -3, proc: hashes::hmget },
        Handler { name: "hdel", arity: 3, proc: hashes::hdel },
        Handler { name: "hexists", arity: 3, proc: hashes::hexists },
        Handler { name: "hkeys", arity: 2, proc: hashes::hkeys },
        Handler { name: "hvals", arity: 2, proc: hashes::hvals },
        Handler { name: "hlen", arity: 2, proc: hashes::hlen },
        Handler { name: "hgetall", arity: 2, proc: hashes::hgetall },
        Handler { name: "sadd", arity: -3, proc: sets::sadd },
        Handler { name: "srem", arity: -3, proc: sets::srem },
        Handler { name: "scard", arity: 2, proc: sets::scard },
        Handler { name: "sismember", arity: 3, proc: sets::sismember },
        Handler { name: "smembers", arity: 2, proc: sets::smembers },
    ]
    .into_iter()
    .map(|h| (h.name, h))
    .collect()
});

/// Looks up `name` and checks arity in one step, the way every connection
/// loop iteration needs it.
pub fn dispatch(state: &AppState, name: &str, args: &[Vec<u8>]) -> Result<Reply> {
    let handler = REGISTRY.get(name).ok_or(RockdisError::MethodNotSupported)?;
    let total_args = args.len() + 1;
    if !handler.arity_ok(total_args) {
        return Err(if handler.arity >= 0 && total_args < handler.arity as usize {
            RockdisError::NotEnoughArgs
        } else if handler.arity >= 0 {
            RockdisError::TooManyArgs
        } else {
            RockdisError::NotEnoughArgs
        });
    }
    (handler.proc)(state, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_is_method_not_supported() {
        assert!(REGISTRY.get("notacommand").is_none());
    }

    #[test]
    fn every_handler_name_matches_its_table_key() {
        for (name, handler) in REGISTRY.iter() {
            assert_eq!(*name, handler.name);
        }
    }

    #[test]
    fn fixed_arity_rejects_wrong_count() {
        let ping = &REGISTRY["ping"];
        assert!(ping.arity_ok(1));
        assert!(!ping.arity_ok(2));
    }

    #[test]
    fn variadic_arity_accepts_anything_at_or_above_minimum() {
        let del = &REGISTRY["del"];
        assert!(!del.arity_ok(1));
        assert!(del.arity_ok(2));
        assert!(del.arity_ok(10));
    }
}
