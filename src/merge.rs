//! Per-type FullMerge/PartialMerge folds, and the glue that registers them
//! as a single engine-wide merge operator.
//!
//! RocksDB allows exactly one merge operator per column family, but the
//! four data types share one keyspace, so `full_merge`/`partial_merge`
//! dispatch internally on the tag carried by the existing envelope (or,
//! when absent, by the first operand — every operand in a merge group
//! was produced by a handler that already checked the key's type).

use std::collections::{HashMap, HashSet};

use crate::object::{
    decode, decode_operand, HashOp, ListEnd, ListOp, Operand, RedisObject, RedisType, SetOp,
    StringOp, TypedPayload,
};

/// Collapses an existing envelope (if any) plus pending operands into a
/// new envelope. Returns `None` when there is nothing to merge (no
/// existing value and no operands carry a usable type), matching
/// RocksDB's "merge failed" contract.
pub fn full_merge(existing: Option<&[u8]>, operands: &[Vec<u8>]) -> Option<Vec<u8>> {
    let existing_obj = match existing {
        Some(bytes) => Some(decode(bytes).ok()?),
        None => None,
    };
    let decoded_operands: Vec<Operand> = operands.iter().filter_map(|b| decode_operand(b).ok()).collect();

    let object_type = match &existing_obj {
        Some(obj) => obj.object_type(),
        None => decoded_operands.first()?.object_type(),
    };

    let mut payload = existing_obj
        .map(|obj| obj.data)
        .unwrap_or_else(|| TypedPayload::empty_for(object_type));

    let relevant = decoded_operands.iter().filter(|op| op.object_type() == object_type);

    match object_type {
        RedisType::String => fold_string(&mut payload, relevant),
        RedisType::List => fold_list(&mut payload, relevant),
        RedisType::Hash => fold_hash(&mut payload, relevant),
        RedisType::Set => fold_set(&mut payload, relevant),
    }

    Some(crate::object::encode(&RedisObject::new(payload)))
}

fn fold_string<'a>(payload: &mut TypedPayload, ops: impl Iterator<Item = &'a Operand>) {
    let TypedPayload::String(raw) = payload else { return };
    for op in ops {
        let Operand::String(op) = op else { continue };
        match op.op {
            StringOp::Incr => {
                let current = parse_i64(raw).unwrap_or(0);
                let Some(delta) = parse_i64(&op.data) else { continue };
                *raw = current.wrapping_add(delta).to_string().into_bytes();
            }
            StringOp::Append => {
                raw.extend_from_slice(&op.data);
            }
        }
    }
}

fn parse_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn fold_list<'a>(payload: &mut TypedPayload, ops: impl Iterator<Item = &'a Operand>) {
    let TypedPayload::List(items) = payload else { return };
    for op in ops {
        let Operand::List(op) = op else { continue };
        match op.op {
            ListOp::Insert => match op.end {
                ListEnd::Front => items.insert(0, op.data.clone()),
                ListEnd::Back => items.push(op.data.clone()),
            },
            ListOp::Remove => {
                if items.is_empty() {
                    continue;
                }
                match op.end {
                    ListEnd::Front => {
                        items.remove(0);
                    }
                    ListEnd::Back => {
                        items.pop();
                    }
                }
            }
        }
    }
}

fn fold_hash<'a>(payload: &mut TypedPayload, ops: impl Iterator<Item = &'a Operand>) {
    let TypedPayload::Hash(pairs) = payload else { return };
    let mut map: HashMap<Vec<u8>, Vec<u8>> = pairs.drain(..).collect();
    for op in ops {
        let Operand::Hash(op) = op else { continue };
        match op.op {
            HashOp::Set => {
                map.insert(op.field.clone(), op.value.clone());
            }
            HashOp::Delete => {
                map.remove(&op.field);
            }
        }
    }
    *pairs = map.into_iter().collect();
}

fn fold_set<'a>(payload: &mut TypedPayload, ops: impl Iterator<Item = &'a Operand>) {
    let TypedPayload::Set(members) = payload else { return };
    let mut set: HashSet<Vec<u8>> = members.drain(..).collect();
    for op in ops {
        let Operand::Set(op) = op else { continue };
        match op.op {
            SetOp::Set => {
                set.insert(op.member.clone());
            }
            SetOp::Delete => {
                set.remove(&op.member);
            }
        }
    }
    *members = set.into_iter().collect();
}

/// Attempts to coalesce two adjacent operands into one. Declining (by
/// returning `None`) just means the engine keeps both until FullMerge.
pub fn partial_merge(left: &[u8], right: &[u8]) -> Option<Vec<u8>> {
    let left = decode_operand(left).ok()?;
    let right = decode_operand(right).ok()?;

    let merged = match (&left, &right) {
        (Operand::String(l), Operand::String(r)) if l.op == StringOp::Incr && r.op == StringOp::Incr => {
            let a = parse_i64(&l.data)?;
            let b = parse_i64(&r.data)?;
            Operand::String(crate::object::StringOperand {
                op: StringOp::Incr,
                data: (a.wrapping_add(b)).to_string().into_bytes(),
            })
        }
        (Operand::String(l), Operand::String(r)) if l.op == StringOp::Append && r.op == StringOp::Append => {
            let mut data = l.data.clone();
            data.extend_from_slice(&r.data);
            Operand::String(crate::object::StringOperand { op: StringOp::Append, data })
        }
        (Operand::Hash(l), Operand::Hash(r)) if l.field == r.field => Operand::Hash(r.clone()),
        (Operand::Set(l), Operand::Set(r)) if l.member == r.member => Operand::Set(r.clone()),
        _ => return None,
    };
    Some(crate::object::encode_operand(&merged))
}

/// Engine-facing merge operator name, registered once at DB-open time.
pub const MERGE_OPERATOR_NAME: &str = "rockdis-typed-merge";

pub fn full_merge_fn(
    _new_key: &[u8],
    existing_val: Option<&[u8]>,
    operands: &rocksdb::MergeOperands,
) -> Option<Vec<u8>> {
    let operands: Vec<Vec<u8>> = operands.iter().map(|o| o.to_vec()).collect();
    full_merge(existing_val, &operands)
}

pub fn partial_merge_fn(
    _new_key: &[u8],
    _existing_val: Option<&[u8]>,
    operands: &rocksdb::MergeOperands,
) -> Option<Vec<u8>> {
    let mut iter = operands.iter();
    let mut acc = iter.next()?.to_vec();
    for next in iter {
        acc = partial_merge(&acc, next)?;
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{encode_operand, HashOperand, ListOperand, SetOperand, StringOperand};

    fn string_op(op: StringOp, data: &[u8]) -> Vec<u8> {
        encode_operand(&Operand::String(StringOperand { op, data: data.to_vec() }))
    }

    #[test]
    fn full_merge_over_absent_is_empty_of_type() {
        let op = encode_operand(&Operand::Set(SetOperand { op: SetOp::Set, member: b"m".to_vec() }));
        let merged = full_merge(None, &[op]).unwrap();
        let obj = decode(&merged).unwrap();
        assert_eq!(obj.data, TypedPayload::Set(vec![b"m".to_vec()]));
    }

    #[test]
    fn full_merge_over_absent_with_no_operands_is_none() {
        assert!(full_merge(None, &[]).is_none());
    }

    #[test]
    fn string_incr_then_append_matches_documented_example() {
        let existing = crate::object::encode(&RedisObject::new(TypedPayload::String(b"10".to_vec())));
        let ops = vec![
            string_op(StringOp::Incr, b"5"),
            string_op(StringOp::Incr, b"-1"),
            string_op(StringOp::Append, b"!"),
        ];
        let merged = full_merge(Some(&existing), &ops).unwrap();
        let obj = decode(&merged).unwrap();
        assert_eq!(obj.data, TypedPayload::String(b"14!".to_vec()));
    }

    #[test]
    fn string_incr_on_non_numeric_treats_existing_as_zero() {
        let existing = crate::object::encode(&RedisObject::new(TypedPayload::String(b"abc".to_vec())));
        let ops = vec![string_op(StringOp::Incr, b"5")];
        let merged = full_merge(Some(&existing), &ops).unwrap();
        let obj = decode(&merged).unwrap();
        assert_eq!(obj.data, TypedPayload::String(b"5".to_vec()));
    }

    #[test]
    fn list_insert_and_remove_both_ends() {
        let ops = vec![
            encode_operand(&Operand::List(ListOperand { op: ListOp::Insert, end: ListEnd::Back, data: b"a".to_vec() })),
            encode_operand(&Operand::List(ListOperand { op: ListOp::Insert, end: ListEnd::Back, data: b"b".to_vec() })),
            encode_operand(&Operand::List(ListOperand { op: ListOp::Insert, end: ListEnd::Front, data: b"z".to_vec() })),
            encode_operand(&Operand::List(ListOperand { op: ListOp::Remove, end: ListEnd::Back, data: Vec::new() })),
        ];
        let merged = full_merge(None, &ops).unwrap();
        let obj = decode(&merged).unwrap();
        assert_eq!(obj.data, TypedPayload::List(vec![b"z".to_vec(), b"a".to_vec()]));
    }

    #[test]
    fn hash_set_then_delete() {
        let ops = vec![
            encode_operand(&Operand::Hash(HashOperand { op: HashOp::Set, field: b"f1".to_vec(), value: b"v1".to_vec() })),
            encode_operand(&Operand::Hash(HashOperand { op: HashOp::Set, field: b"f1".to_vec(), value: b"v2".to_vec() })),
            encode_operand(&Operand::Hash(HashOperand { op: HashOp::Delete, field: b"f2".to_vec(), value: Vec::new() })),
        ];
        let merged = full_merge(None, &ops).unwrap();
        let obj = decode(&merged).unwrap();
        assert_eq!(obj.data, TypedPayload::Hash(vec![(b"f1".to_vec(), b"v2".to_vec())]));
    }

    #[test]
    fn set_add_duplicate_then_remove() {
        let ops = vec![
            encode_operand(&Operand::Set(SetOperand { op: SetOp::Set, member: b"a".to_vec() })),
            encode_operand(&Operand::Set(SetOperand { op: SetOp::Set, member: b"a".to_vec() })),
            encode_operand(&Operand::Set(SetOperand { op: SetOp::Set, member: b"b".to_vec() })),
            encode_operand(&Operand::Set(SetOperand { op: SetOp::Delete, member: b"a".to_vec() })),
        ];
        let merged = full_merge(None, &ops).unwrap();
        let obj = decode(&merged).unwrap();
        assert_eq!(obj.data, TypedPayload::Set(vec![b"b".to_vec()]));
    }

    #[test]
    fn partial_merge_hash_same_field_takes_right() {
        let left = encode_operand(&Operand::Hash(HashOperand { op: HashOp::Set, field: b"f".to_vec(), value: b"1".to_vec() }));
        let right = encode_operand(&Operand::Hash(HashOperand { op: HashOp::Set, field: b"f".to_vec(), value: b"2".to_vec() }));
        let merged = partial_merge(&left, &right).unwrap();
        assert_eq!(merged, right);
    }

    #[test]
    fn partial_merge_list_always_declines() {
        let a = encode_operand(&Operand::List(ListOperand { op: ListOp::Insert, end: ListEnd::Back, data: b"a".to_vec() }));
        let b = encode_operand(&Operand::List(ListOperand { op: ListOp::Insert, end: ListEnd::Back, data: b"b".to_vec() }));
        assert!(partial_merge(&a, &b).is_none());
    }

    #[test]
    fn partial_merge_string_incr_sums() {
        let left = string_op(StringOp::Incr, b"3");
        let right = string_op(StringOp::Incr, b"4");
        let merged = partial_merge(&left, &right).unwrap();
        let Operand::String(op) = decode_operand(&merged).unwrap() else { panic!("wrong variant") };
        assert_eq!(op.data, b"7");
    }
}
