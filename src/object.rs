//! Typed envelope and merge-operand records, plus their wire-stable binary encoding.
//!
//! `RedisObject` wraps a `TypedPayload`, and `TypedPayload`'s own enum
//! discriminant (written first by `bincode`) is the recoverable type tag:
//! a merge operator can `peek_type` the first few bytes without decoding
//! the rest of the payload. The same holds for `Operand`, whose variant
//! tag tells a merge operator which per-type fold to apply.

use serde::{Deserialize, Serialize};

use crate::error::{RockdisError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisType {
    String,
    List,
    Hash,
    Set,
}

impl RedisType {
    pub fn as_str(self) -> &'static str {
        match self {
            RedisType::String => "string",
            RedisType::List => "list",
            RedisType::Hash => "hash",
            RedisType::Set => "set",
        }
    }

    pub fn from_str(s: &str) -> Option<RedisType> {
        match s {
            "string" => Some(RedisType::String),
            "list" => Some(RedisType::List),
            "hash" => Some(RedisType::Hash),
            "set" => Some(RedisType::Set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedPayload {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    Set(Vec<Vec<u8>>),
}

impl TypedPayload {
    pub fn empty_for(t: RedisType) -> TypedPayload {
        match t {
            RedisType::String => TypedPayload::String(Vec::new()),
            RedisType::List => TypedPayload::List(Vec::new()),
            RedisType::Hash => TypedPayload::Hash(Vec::new()),
            RedisType::Set => TypedPayload::Set(Vec::new()),
        }
    }

    pub fn object_type(&self) -> RedisType {
        match self {
            TypedPayload::String(_) => RedisType::String,
            TypedPayload::List(_) => RedisType::List,
            TypedPayload::Hash(_) => RedisType::Hash,
            TypedPayload::Set(_) => RedisType::Set,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisObject {
    pub data: TypedPayload,
}

impl RedisObject {
    pub fn new(data: TypedPayload) -> RedisObject {
        RedisObject { data }
    }

    pub fn empty(t: RedisType) -> RedisObject {
        RedisObject { data: TypedPayload::empty_for(t) }
    }

    pub fn object_type(&self) -> RedisType {
        self.data.object_type()
    }
}

pub fn encode(obj: &RedisObject) -> Vec<u8> {
    bincode::serialize(obj).expect("RedisObject encoding is infallible for owned byte vectors")
}

pub fn decode(bytes: &[u8]) -> Result<RedisObject> {
    bincode::deserialize(bytes).map_err(|e| RockdisError::Malformed(format!("corrupt envelope: {e}")))
}

// --- Merge operand records -------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringOp {
    Incr,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringOperand {
    pub op: StringOp,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListEnd {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListOp {
    Insert,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOperand {
    pub op: ListOp,
    pub end: ListEnd,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashOp {
    Set,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashOperand {
    pub op: HashOp,
    pub field: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOp {
    Set,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOperand {
    pub op: SetOp,
    pub member: Vec<u8>,
}

/// One merge operand, tagged by type so a single engine-wide merge
/// operator can dispatch to the right fold without a side-channel read
/// of the type-tag key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    String(StringOperand),
    List(ListOperand),
    Hash(HashOperand),
    Set(SetOperand),
}

impl Operand {
    pub fn object_type(&self) -> RedisType {
        match self {
            Operand::String(_) => RedisType::String,
            Operand::List(_) => RedisType::List,
            Operand::Hash(_) => RedisType::Hash,
            Operand::Set(_) => RedisType::Set,
        }
    }
}

pub fn encode_operand(op: &Operand) -> Vec<u8> {
    bincode::serialize(op).expect("Operand encoding is infallible for owned byte vectors")
}

pub fn decode_operand(bytes: &[u8]) -> Result<Operand> {
    bincode::deserialize(bytes).map_err(|e| RockdisError::Malformed(format!("corrupt operand: {e}")))
}
