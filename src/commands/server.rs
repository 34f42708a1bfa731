//! PING, SELECT, INFO — commands that report on the server rather than a key.

use crate::codec::Reply;
use crate::commands::parse_i64;
use crate::error::Result;
use crate::state::AppState;

pub fn ping(_state: &AppState, _args: &[Vec<u8>]) -> Result<Reply> {
    Ok(Reply::Status("PONG".to_string()))
}

/// The engine is a single flat keyspace, so `SELECT` is a logical no-op;
/// every index is accepted, matching `RedisSelect` in the original server.
pub fn select(_state: &AppState, args: &[Vec<u8>]) -> Result<Reply> {
    parse_i64(&args[0])?;
    Ok(Reply::ok())
}

/// Number of trailing lines of `rocksdb.stats` to surface in `# Rocksdb`;
/// the full property is a multi-page human report, not line-oriented data.
const ROCKSDB_STATS_TAIL_LINES: usize = 8;

pub fn info(state: &AppState, _args: &[Vec<u8>]) -> Result<Reply> {
    let mut out = String::new();

    out.push_str("# Server\r\n");
    out.push_str(&format!("rockdis_version:{}\r\n", env!("CARGO_PKG_VERSION")));
    out.push_str(&format!("os:{}\r\n", std::env::consts::OS));
    out.push_str(&format!("process_id:{}\r\n", std::process::id()));
    out.push_str(&format!("tcp_port:{}\r\n", state.info.port));
    out.push_str(&format!("config_file:{}\r\n", state.info.config_path));
    out.push_str(&format!("uptime_in_seconds:{}\r\n", state.info.started_at.elapsed().as_secs()));
    out.push_str(&format!("connected_clients:{}\r\n", state.stats.connected_clients()));
    out.push_str(&format!("total_connections_received:{}\r\n", state.stats.total_connections_received()));
    out.push_str(&format!("total_commands_processed:{}\r\n", state.stats.total_commands_processed()));
    out.push_str(&format!("instantaneous_ops_per_sec:{:.2}\r\n", state.stats.instantaneous_qps()));
    out.push_str(&format!("keyspace_hits:{}\r\n", state.stats.keyspace_hits()));
    out.push_str(&format!("keyspace_misses:{}\r\n", state.stats.keyspace_misses()));

    out.push_str("# Runtime\r\n");
    let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    out.push_str(&format!("cpu_count:{cpus}\r\n"));
    out.push_str("active_tasks:unavailable\r\n");

    out.push_str("# Rocksdb\r\n");
    out.push_str(&format!("dbdir:{}\r\n", state.info.database.dbdir));
    out.push_str(&format!("block_size:{}\r\n", state.info.database.block_size));
    out.push_str(&format!("compression:{}\r\n", state.info.database.compression.as_str()));
    out.push_str(&format!("compaction_style:{}\r\n", state.info.database.compaction_style.as_str()));
    out.push_str(&format!("max_open_files:{}\r\n", state.info.database.max_open_files));
    out.push_str(&format!("max_merge:{}\r\n", state.info.database.max_merge));
    for prop in ["rocksdb.num-files-at-level0", "rocksdb.estimate-num-keys"] {
        if let Some(value) = state.engine.property(prop)? {
            out.push_str(&format!("{prop}:{}\r\n", value.trim()));
        }
    }
    if let Some(stats) = state.engine.property("rocksdb.stats")? {
        let tail: Vec<&str> = stats.lines().rev().take(ROCKSDB_STATS_TAIL_LINES).collect();
        out.push_str("rocksdb.stats:\r\n");
        for line in tail.into_iter().rev() {
            out.push_str(line.trim());
            out.push_str("\r\n");
        }
    }

    Ok(Reply::bulk(out.into_bytes()))
}
