use std::time::Duration;

use clap::Parser;

// Seat lists travel as 4-byte ids inside a single bounded payload
const MAX_SEATS: u32 = (crate::protocol::MAX_FIELD_LEN / 4) as u32;

/// Seat reservation server
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(env = "SEAT_PORT")]
    pub port: u16,

    /// Number of worker shards, defaults to the number of cores
    #[arg(long, env = "SEAT_SHARDS", value_parser = clap::value_parser!(u16).range(1..))]
    pub shards: Option<u16>,

    /// Connections a single shard may own at once
    #[arg(long, env = "SEAT_CLIENTS_PER_SHARD", default_value_t = 64, value_parser = clap::value_parser!(u32).range(1..))]
    pub clients_per_shard: u32,

    /// Number of seats in the table
    #[arg(long, env = "SEAT_COUNT", default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=MAX_SEATS as i64))]
    pub seats: u32,

    /// How long a shard waits for readiness before checking for shutdown
    #[arg(long, env = "SEAT_POLL_TIMEOUT_MS", default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_timeout_ms: u64,

    /// Secret used to key password digests, a random one is used when absent
    #[arg(long, env = "SEAT_PASSWORD_KEY", hide_env_values = true)]
    pub password_key: Option<String>,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            shards: None,
            clients_per_shard: 64,
            seats: 20,
            poll_timeout_ms: 100,
            password_key: None,
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards
            .map(usize::from)
            .unwrap_or_else(num_cpus::get)
            .max(1)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Seat reservation client
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct ClientArgs {
    /// Address of the server
    pub address: String,

    /// Port of the server
    pub port: u16,

    /// File of newline-delimited commands, stdin is used when absent
    pub file: Option<std::path::PathBuf>,
}
