use crate::domain::history::DEFAULT_CAPACITY;
use anyhow::ensure;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    pub server: ServerSettings,
    pub history: HistorySettings,
    pub clients: ClientSettings,
    pub timestamp: TimestampSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    /// Frames buffered per client before it is considered too slow and dropped
    pub queue_capacity: usize,
    /// Device frames waiting for the relay; further frames are dropped when full
    pub inbound_queue_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimestampSettings {
    /// strftime pattern applied to local time
    pub format: String,
}

impl RelayConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.host, self.server.port).parse()?)
    }

    fn validate(self) -> anyhow::Result<Self> {
        ensure!(self.history.capacity > 0, "history.capacity must be > 0");
        ensure!(
            self.clients.queue_capacity > 0,
            "clients.queue_capacity must be > 0"
        );
        ensure!(
            self.clients.inbound_queue_capacity > 0,
            "clients.inbound_queue_capacity must be > 0"
        );
        ensure!(
            !self.timestamp.format.is_empty(),
            "timestamp.format must not be empty"
        );
        Ok(self)
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000_i64)?
        .set_default("server.static_dir", "public")?
        .set_default("history.capacity", DEFAULT_CAPACITY as i64)?
        .set_default("clients.queue_capacity", 64_i64)?
        .set_default("clients.inbound_queue_capacity", 256_i64)?
        .set_default("timestamp.format", "%H:%M:%S")
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("RELAY")
        .separator("__")
        .try_parsing(true)
}

fn layered<F>(file: F, env: config::Environment) -> anyhow::Result<RelayConfig>
where
    F: config::Source + Send + Sync + 'static,
{
    let settings = defaults()?.add_source(file).add_source(env).build()?;

    settings.try_deserialize::<RelayConfig>()?.validate()
}

/// Defaults, then `config/relay.{toml,...}` if present, then `RELAY__*` env vars.
pub fn load_relay_config() -> anyhow::Result<RelayConfig> {
    layered(
        config::File::with_name("config/relay").required(false),
        environment(),
    )
}
