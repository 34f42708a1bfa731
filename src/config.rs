//! Configuration file parsing.
//!
//! The file has exactly two flat sections, `[server]` and `[database]`,
//! one `key=value` per line. Not a general INI implementation: no nesting,
//! no quoting, no escape sequences, `#` starts a line comment.

use std::fs;
use std::path::Path;

use crate::error::{RockdisError, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub monitor_log: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: String::new(), port: 6379, monitor_log: false }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub dbdir: String,
    pub max_memory: u64,
    pub block_size: u64,
    pub create_if_missing: bool,
    pub bloom_filter: i32,
    pub compression: Compression,
    pub compaction_style: CompactionStyle,
    pub max_open_files: i32,
    pub max_merge: i32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            dbdir: "./data".to_string(),
            max_memory: 0,
            block_size: 4 * 1024,
            create_if_missing: true,
            bloom_filter: 10,
            compression: Compression::No,
            compaction_style: CompactionStyle::Level,
            max_open_files: -1,
            max_merge: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    No,
    Snappy,
    Zlib,
    Bzip2,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::No => "no",
            Compression::Snappy => "snappy",
            Compression::Zlib => "zlib",
            Compression::Bzip2 => "bzip2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionStyle {
    Level,
    Universal,
}

impl CompactionStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            CompactionStyle::Level => "level",
            CompactionStyle::Universal => "universal",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Loads `path`. A missing file is only fatal when the caller asked
    /// for a non-default path explicitly (see `load_or_default`).
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Used for the default `rockdis.conf`: falls back to defaults
    /// silently when the file simply isn't there.
    pub fn load_or_default(path: &Path, is_default_path: bool) -> Result<Config> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if is_default_path && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Config::default())
            }
            Err(e) => Err(RockdisError::Io(e)),
        }
    }

    fn parse(text: &str) -> Result<Config> {
        let mut config = Config::default();
        let mut section = String::new();

        for raw_line in text.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                section = line[1..line.len() - 1].trim().to_lowercase();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(RockdisError::Malformed(format!("expected key=value, got {raw_line:?}")));
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match section.as_str() {
                "server" => apply_server_key(&mut config.server, &key, value)?,
                "database" => apply_database_key(&mut config.database, &key, value)?,
                other => {
                    return Err(RockdisError::Malformed(format!("unknown section [{other}]")));
                }
            }
        }
        Ok(config)
    }
}

fn apply_server_key(server: &mut ServerConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "bind" => server.bind = value.to_string(),
        "port" => {
            server.port = value
                .parse()
                .map_err(|_| RockdisError::Malformed(format!("bad port {value:?}")))?
        }
        "monitor-log" => server.monitor_log = parse_bool(value)?,
        other => return Err(RockdisError::Malformed(format!("unknown server key {other:?}"))),
    }
    Ok(())
}

fn apply_database_key(db: &mut DatabaseConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "dbdir" => db.dbdir = value.to_string(),
        "max-memory" => db.max_memory = parse_size(value)?,
        "block-size" => db.block_size = parse_size(value)?,
        "create-if-missing" => db.create_if_missing = parse_bool(value)?,
        "bloom-filter" => {
            db.bloom_filter = value
                .parse()
                .map_err(|_| RockdisError::Malformed(format!("bad bloom-filter {value:?}")))?
        }
        "compression" => {
            db.compression = match value.to_lowercase().as_str() {
                "no" => Compression::No,
                "snappy" => Compression::Snappy,
                "zlib" => Compression::Zlib,
                "bzip2" => Compression::Bzip2,
                other => {
                    return Err(RockdisError::Malformed(format!("unknown compression {other:?}")))
                }
            }
        }
        "compaction-style" => {
            db.compaction_style = match value.to_lowercase().as_str() {
                "level" => CompactionStyle::Level,
                "universal" => CompactionStyle::Universal,
                other => {
                    return Err(RockdisError::Malformed(format!("unknown compaction-style {other:?}")))
                }
            }
        }
        "max-open-files" => {
            db.max_open_files = value
                .parse()
                .map_err(|_| RockdisError::Malformed(format!("bad max-open-files {value:?}")))?
        }
        "max-merge" => {
            db.max_merge = value
                .parse()
                .map_err(|_| RockdisError::Malformed(format!("bad max-merge {value:?}")))?
        }
        other => return Err(RockdisError::Malformed(format!("unknown database key {other:?}"))),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        other => Err(RockdisError::Malformed(format!("expected bool, got {other:?}"))),
    }
}

/// Parses a decimal count with an optional `k`/`m`/`g` suffix (powers of
/// 1024, case-insensitive). A bare number is bytes.
pub fn parse_size(value: &str) -> Result<u64> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RockdisError::Malformed("empty size".to_string()));
    }
    let (digits, unit) = match value.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&value[..value.len() - 1], Some(c.to_ascii_lowercase())),
        _ => (value, None),
    };
    let count: u64 = digits
        .parse()
        .map_err(|_| RockdisError::Malformed(format!("bad size {value:?}")))?;
    let multiplier: u64 = match unit {
        None => 1,
        Some('k') => 1024,
        Some('m') => 1024 * 1024,
        Some('g') => 1024 * 1024 * 1024,
        Some(other) => {
            return Err(RockdisError::Malformed(format!("unknown size suffix {other:?}")))
        }
    };
    Ok(count * multiplier)
}
