//! Simulated connection "optimization".
//!
//! Nothing here touches the network path. An optimization run is a baseline
//! probe, a fixed simulated processing delay and a second probe whose latency
//! is scaled by a declared factor. Consumers must treat the returned latency
//! as a presentation value, not a measurement.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::ProbeError;
use crate::models::ProbeResult;
use crate::probe::{Measurement, ProbeExecutor};

/// Highest level whose improvement factor is still positive.
pub const MAX_OPTIMIZATION_LEVEL: u8 = 6;
/// Lowest latency an optimized result may report, in milliseconds.
pub const LATENCY_FLOOR_MS: f64 = 5.0;

pub struct OptimizationSimulator {
    executor: Arc<ProbeExecutor>,
    probe_count: u32,
    probe_timeout: Duration,
    delay_unit: Duration,
}

impl OptimizationSimulator {
    pub fn new(
        executor: Arc<ProbeExecutor>,
        probe_count: u32,
        probe_timeout: Duration,
        delay_unit: Duration,
    ) -> Self {
        Self {
            executor,
            probe_count,
            probe_timeout,
            delay_unit,
        }
    }

    /// Baseline probe, `(1 + level)` delay units of simulated processing,
    /// then a second probe passed through [`apply_optimization`].
    ///
    /// The baseline is recorded as measured. For the second probe only the
    /// optimized result is recorded, so the history shows what observers saw.
    pub async fn optimize(&self, host: &str, level: u8) -> Result<Measurement, ProbeError> {
        if level == 0 || level > MAX_OPTIMIZATION_LEVEL {
            return Err(ProbeError::InvalidLevel {
                got: level,
                max: MAX_OPTIMIZATION_LEVEL,
            });
        }

        let baseline = self
            .executor
            .measure(host, self.probe_count, self.probe_timeout)
            .await?
            .result;

        tokio::time::sleep(simulated_delay(self.delay_unit, level)).await;

        let second = self
            .executor
            .probe(host, self.probe_count, self.probe_timeout)
            .await?;
        let optimized = apply_optimization(second, level);
        let seq = self.executor.record(&optimized);

        info!(
            "Optimization level {} for {}: baseline {:.1}ms -> reported {:.1}ms",
            level, host, baseline.latency, optimized.latency
        );
        Ok(Measurement {
            result: optimized,
            seq,
        })
    }
}

/// Multiplier applied to the second probe's latency.
pub fn improvement_factor(level: u8) -> f64 {
    0.7 - 0.1 * f64::from(level)
}

pub fn simulated_delay(unit: Duration, level: u8) -> Duration {
    unit * (1 + u32::from(level))
}

/// Scales a successful result's latency by [`improvement_factor`], never below
/// [`LATENCY_FLOOR_MS`], and flags it as optimized. Unsuccessful results keep
/// their sentinel metrics.
pub fn apply_optimization(result: ProbeResult, level: u8) -> ProbeResult {
    let latency = if result.is_success() {
        (result.latency * improvement_factor(level)).max(LATENCY_FLOOR_MS)
    } else {
        result.latency
    };
    ProbeResult {
        latency,
        optimized: true,
        ..result
    }
}
