//! Connection and command counters, plus a coarse sliding QPS window.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

const QPS_WINDOW: Duration = Duration::from_secs(15 * 60);

pub struct Stats {
    connected_clients: AtomicI64,
    total_connections_received: AtomicU64,
    total_commands_processed: AtomicU64,
    keyspace_hits: AtomicU64,
    keyspace_misses: AtomicU64,
    window: RwLock<Window>,
}

struct Window {
    started_at: Instant,
    commands_at_start: u64,
}

impl Stats {
    pub fn new() -> Stats {
        Stats {
            connected_clients: AtomicI64::new(0),
            total_connections_received: AtomicU64::new(0),
            total_commands_processed: AtomicU64::new(0),
            keyspace_hits: AtomicU64::new(0),
            keyspace_misses: AtomicU64::new(0),
            window: RwLock::new(Window { started_at: Instant::now(), commands_at_start: 0 }),
        }
    }

    pub fn client_connected(&self) {
        self.connected_clients.fetch_add(1, Ordering::Relaxed);
        self.total_connections_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        self.connected_clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.total_commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit(&self) {
        self.keyspace_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.keyspace_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connected_clients(&self) -> i64 {
        self.connected_clients.load(Ordering::Relaxed)
    }

    pub fn total_connections_received(&self) -> u64 {
        self.total_connections_received.load(Ordering::Relaxed)
    }

    pub fn total_commands_processed(&self) -> u64 {
        self.total_commands_processed.load(Ordering::Relaxed)
    }

    pub fn keyspace_hits(&self) -> u64 {
        self.keyspace_hits.load(Ordering::Relaxed)
    }

    pub fn keyspace_misses(&self) -> u64 {
        self.keyspace_misses.load(Ordering::Relaxed)
    }

    /// Commands processed per second since the window last reset. The
    /// window itself is reset by a background task (see
    /// `spawn_qps_reset_task`), not by this read.
    pub fn instantaneous_qps(&self) -> f64 {
        let win = self.window.read().expect("stats lock poisoned");
        let elapsed = win.started_at.elapsed().as_secs_f64().max(1.0);
        (self.total_commands_processed() - win.commands_at_start) as f64 / elapsed
    }

    fn reset_window(&self) {
        let mut win = self.window.write().expect("stats lock poisoned");
        win.started_at = Instant::now();
        win.commands_at_start = self.total_commands_processed();
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new()
    }
}

/// Resets the QPS window every `QPS_WINDOW`. Holds only the `Arc<Stats>`
/// handle it needs, not the rest of `AppState`, and runs for the life of
/// the process — there is no cancellation, matching `conn::run`'s own
/// signal-driven tasks which simply end when the process does.
pub fn spawn_qps_reset_task(stats: Arc<Stats>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(QPS_WINDOW);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            stats.reset_window();
        }
    })
}
