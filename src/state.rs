//! Shared state handed to every command handler.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::engine::Engine;
use crate::stats::Stats;

/// Static facts fixed at startup that `INFO`'s `# Server`/`# Rocksdb`
/// sections report alongside the live counters in `Stats`.
pub struct ServerInfo {
    pub config_path: String,
    pub port: u16,
    pub started_at: Instant,
    pub database: crate::config::DatabaseConfig,
}

impl ServerInfo {
    pub fn new(config_path: String, config: &Config) -> ServerInfo {
        ServerInfo {
            config_path,
            port: config.server.port,
            started_at: Instant::now(),
            database: config.database.clone(),
        }
    }

    #[cfg(test)]
    pub fn for_test() -> ServerInfo {
        ServerInfo::new("rockdis.conf".to_string(), &Config::default())
    }
}

pub struct AppState {
    pub engine: Engine,
    pub stats: Arc<Stats>,
    pub info: ServerInfo,
}

pub type SharedState = Arc<AppState>;
