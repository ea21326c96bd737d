use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::TestServer;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_catch_up_len")]
    pub catch_up_len: usize,
    #[serde(default = "default_history_page")]
    pub history_page: usize,
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
    #[serde(default = "default_ping_count")]
    pub default_count: u32,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_optimize_count")]
    pub optimize_count: u32,
    #[serde(default = "default_optimize_delay_unit_ms")]
    pub optimize_delay_unit_ms: u64,
    #[serde(default = "default_servers")]
    pub servers: Vec<TestServer>,
}

fn default_api_port() -> u16 { 8000 }
fn default_history_capacity() -> usize { 1000 }
fn default_catch_up_len() -> usize { 20 }
fn default_history_page() -> usize { 50 }
fn default_observer_buffer() -> usize { 64 }
pub fn default_ping_count() -> u32 { 4 }
pub fn default_timeout_secs() -> u64 { 5 }
fn default_optimize_count() -> u32 { 2 }
fn default_optimize_delay_unit_ms() -> u64 { 1000 }

fn default_servers() -> Vec<TestServer> {
    let server = |id: &str, name: &str, host: &str, location: &str, flag: &str| TestServer {
        id: id.into(),
        name: name.into(),
        host: host.into(),
        location: location.into(),
        flag: flag.into(),
    };
    vec![
        server("1", "Google DNS", "8.8.8.8", "Global", "🌍"),
        server("2", "Cloudflare", "1.1.1.1", "Global", "🌍"),
        server("3", "OpenDNS", "208.67.222.222", "US", "🇺🇸"),
        server("4", "Quad9", "9.9.9.9", "Global", "🌍"),
        server("5", "Level3", "4.2.2.2", "US", "🇺🇸"),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            history_capacity: default_history_capacity(),
            catch_up_len: default_catch_up_len(),
            history_page: default_history_page(),
            observer_buffer: default_observer_buffer(),
            default_count: default_ping_count(),
            default_timeout_secs: default_timeout_secs(),
            optimize_count: default_optimize_count(),
            optimize_delay_unit_ms: default_optimize_delay_unit_ms(),
            servers: default_servers(),
        }
    }
}

impl ServerConfig {
    /// Reads the JSON config at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.history_capacity > 0, "history_capacity must be positive");
        ensure!(self.observer_buffer > 0, "observer_buffer must be positive");
        ensure!(
            self.catch_up_len <= self.history_capacity,
            "catch_up_len ({}) exceeds history_capacity ({})",
            self.catch_up_len,
            self.history_capacity
        );
        ensure!(self.default_timeout_secs > 0, "default_timeout_secs must be positive");
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn optimize_delay_unit(&self) -> Duration {
        Duration::from_millis(self.optimize_delay_unit_ms)
    }
}
