use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::broadcast::{Broadcaster, ObserverId, Subscription};
use crate::command::{ProbeCommand, SystemPing};
use crate::config::ServerConfig;
use crate::error::ProbeError;
use crate::models::{ProbeResult, TestServer};
use crate::optimizer::OptimizationSimulator;
use crate::probe::ProbeExecutor;
use crate::store::ResultStore;

/// Owns the history, the observer set and the probe pipeline. Every result
/// produced through it is published to live observers.
pub struct Engine {
    pub config: ServerConfig,
    store: Arc<ResultStore>,
    broadcaster: Broadcaster,
    executor: Arc<ProbeExecutor>,
    optimizer: OptimizationSimulator,
}

impl Engine {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_command(config, Arc::new(SystemPing::default()))
    }

    pub fn with_command(config: ServerConfig, command: Arc<dyn ProbeCommand>) -> Self {
        let store = Arc::new(ResultStore::new(config.history_capacity));
        let broadcaster = Broadcaster::new(
            Arc::clone(&store),
            config.catch_up_len,
            config.observer_buffer,
        );
        let executor = Arc::new(ProbeExecutor::new(command, Arc::clone(&store)));
        let optimizer = OptimizationSimulator::new(
            Arc::clone(&executor),
            config.optimize_count,
            config.default_timeout(),
            config.optimize_delay_unit(),
        );

        info!(
            "Engine ready: history capacity {}, catch-up {} results",
            store.capacity(),
            config.catch_up_len
        );

        Self {
            config,
            store,
            broadcaster,
            executor,
            optimizer,
        }
    }

    pub async fn measure(
        &self,
        host: &str,
        count: u32,
        timeout: Duration,
    ) -> Result<ProbeResult, ProbeError> {
        let measurement = self.executor.measure(host, count, timeout).await?;
        let result = measurement.result.clone();
        self.broadcaster.publish_measurement(measurement);
        Ok(result)
    }

    pub async fn optimize(&self, host: &str, level: u8) -> Result<ProbeResult, ProbeError> {
        let measurement = self.optimizer.optimize(host, level).await?;
        let result = measurement.result.clone();
        self.broadcaster.publish_measurement(measurement);
        Ok(result)
    }

    pub fn recent_history(&self, n: usize) -> Vec<ProbeResult> {
        self.store.recent(n)
    }

    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.broadcaster.unsubscribe(id);
    }

    pub fn observer_count(&self) -> usize {
        self.broadcaster.observer_count()
    }

    pub fn servers(&self) -> &[TestServer] {
        &self.config.servers
    }
}
