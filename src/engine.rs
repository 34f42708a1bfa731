//! Narrow façade over the embedded LSM engine.
//!
//! Every method copies borrowed engine bytes into owned `Vec<u8>` before
//! returning; `rocksdb`'s own types (`Options`, `WriteBatch`, iterators)
//! are all RAII-scoped already, so the "release on every exit path"
//! requirement falls out of normal Rust ownership.

use std::sync::RwLock;

use rocksdb::{
    BlockBasedOptions, Cache, DBCompactionStyle, DBCompressionType, IteratorMode, Options, WriteBatch,
};

use crate::config::{CompactionStyle, Compression, DatabaseConfig};
use crate::error::{RockdisError, Result};
use crate::merge;

/// Reserved byte prefix for the type-tag companion key; chosen to be
/// collision-free with any literal user key in the flat keyspace.
pub const TYPE_PREFIX: &[u8] = b"__type__:";

pub fn type_key(key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(TYPE_PREFIX.len() + key.len());
    out.extend_from_slice(TYPE_PREFIX);
    out.extend_from_slice(key);
    out
}

pub struct Engine {
    db: RwLock<Option<rocksdb::DB>>,
}

impl Engine {
    pub fn open(config: &DatabaseConfig) -> Result<Engine> {
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.set_compression_type(compression_type(config.compression));
        opts.set_compaction_style(compaction_style(config.compaction_style));
        opts.set_max_open_files(config.max_open_files);
        opts.set_max_successive_merges(config.max_merge.max(0) as usize);
        opts.set_merge_operator(merge::MERGE_OPERATOR_NAME, merge::full_merge_fn, merge::partial_merge_fn);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_block_size(config.block_size as usize);
        block_opts.set_bloom_filter(config.bloom_filter as f64, true);
        if config.max_memory > 0 {
            let cache = Cache::new_lru_cache(config.max_memory as usize);
            block_opts.set_block_cache(&cache);
        }
        opts.set_block_based_table_factory(&block_opts);

        let db = rocksdb::DB::open(&opts, &config.dbdir)?;
        Ok(Engine { db: RwLock::new(Some(db)) })
    }

    fn with_db<T>(&self, f: impl FnOnce(&rocksdb::DB) -> Result<T>) -> Result<T> {
        let guard = self.db.read().expect("engine lock poisoned");
        match guard.as_ref() {
            Some(db) => f(db),
            None => Err(RockdisError::EngineDead),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_db(|db| Ok(db.get(key)?))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.with_db(|db| Ok(db.put(key, value)?))
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.with_db(|db| Ok(db.delete(key)?))
    }

    pub fn merge(&self, key: &[u8], operand: &[u8]) -> Result<()> {
        self.with_db(|db| Ok(db.merge(key, operand)?))
    }

    pub fn new_batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    pub fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        self.with_db(|db| Ok(db.write(batch)?))
    }

    /// Collects every key sharing `prefix`, stopping at the first key
    /// that no longer shares it (not a full-keyspace scan).
    pub fn keys_from_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.with_db(|db| {
            let mut out = Vec::new();
            let iter = db.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
            for item in iter {
                let (key, _value) = item?;
                if !key.starts_with(prefix) {
                    break;
                }
                out.push(key.to_vec());
            }
            Ok(out)
        })
    }

    pub fn property(&self, name: &str) -> Result<Option<String>> {
        self.with_db(|db| Ok(db.property_value(name)?))
    }

    /// Single-shot, idempotent: the second call finds nothing to drop.
    pub fn close(&self) {
        let mut guard = self.db.write().expect("engine lock poisoned");
        guard.take();
    }

    pub fn is_closed(&self) -> bool {
        self.db.read().expect("engine lock poisoned").is_none()
    }
}

fn compression_type(c: Compression) -> DBCompressionType {
    match c {
        Compression::No => DBCompressionType::None,
        Compression::Snappy => DBCompressionType::Snappy,
        Compression::Zlib => DBCompressionType::Zlib,
        Compression::Bzip2 => DBCompressionType::Bz2,
    }
}

fn compaction_style(s: CompactionStyle) -> DBCompactionStyle {
    match s {
        CompactionStyle::Level => DBCompactionStyle::Level,
        CompactionStyle::Universal => DBCompactionStyle::Universal,
    }
}
