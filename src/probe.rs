use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::command::ProbeCommand;
use crate::error::{ProbeError, ProbeFault};
use crate::models::{ProbeResult, ProbeStatus};
use crate::parser::parse_output;
use crate::store::{ResultStore, Seq};

pub const MAX_PROBE_COUNT: u32 = 100;
const MAX_HOST_LEN: usize = 253;

/// A result and, when it was kept in the history, its sequence number there.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub result: ProbeResult,
    pub seq: Option<Seq>,
}

/// Runs single probes against hosts and records completed ones in the store.
pub struct ProbeExecutor {
    command: Arc<dyn ProbeCommand>,
    store: Arc<ResultStore>,
}

impl ProbeExecutor {
    pub fn new(command: Arc<dyn ProbeCommand>, store: Arc<ResultStore>) -> Self {
        Self { command, store }
    }

    /// Probes `host` with `count` echoes, giving up after `timeout`.
    ///
    /// Only argument errors are returned as `Err`. Timeouts and process
    /// faults come back as results with a non-success status and sentinel
    /// metrics. Results of probes that ran to completion are appended to the
    /// store before returning.
    pub async fn measure(
        &self,
        host: &str,
        count: u32,
        timeout: Duration,
    ) -> Result<Measurement, ProbeError> {
        let result = self.probe(host, count, timeout).await?;
        let seq = self.record(&result);
        Ok(Measurement { result, seq })
    }

    /// Same as [`measure`](Self::measure) without touching the store.
    pub(crate) async fn probe(
        &self,
        host: &str,
        count: u32,
        timeout: Duration,
    ) -> Result<ProbeResult, ProbeError> {
        validate_host(host)?;
        if count == 0 || count > MAX_PROBE_COUNT {
            return Err(ProbeError::InvalidCount {
                got: count,
                max: MAX_PROBE_COUNT,
            });
        }
        if timeout.is_zero() {
            return Err(ProbeError::InvalidTimeout);
        }

        let argv = self.command.build(host, count);
        let result = match run_probe(&argv, timeout).await {
            Ok(output) => {
                let (latency, packet_loss) = parse_output(&output);
                ProbeResult::from_metrics(host, latency, packet_loss)
            }
            Err(fault @ ProbeFault::Timeout(_)) => {
                warn!("Probe to {} timed out: {}", host, fault);
                ProbeResult::unreachable(host, ProbeStatus::Timeout)
            }
            Err(fault) => {
                warn!("Probe to {} failed: {}", host, fault);
                ProbeResult::unreachable(host, ProbeStatus::Error)
            }
        };

        debug!(
            "Probe {} -> {:?} latency={:.1}ms loss={:.0}%",
            host, result.status, result.latency, result.packet_loss
        );
        Ok(result)
    }

    /// Appends results of completed probes (`success` or `failed`) to the
    /// store. Timeouts and faults are not kept.
    pub(crate) fn record(&self, result: &ProbeResult) -> Option<Seq> {
        match result.status {
            ProbeStatus::Success | ProbeStatus::Failed => Some(self.store.push(result.clone())),
            ProbeStatus::Timeout | ProbeStatus::Error => None,
        }
    }
}

/// Runs the probe process to completion and returns its decoded stdout.
/// The child is killed if it outlives `timeout`.
async fn run_probe(argv: &[String], timeout: Duration) -> Result<String, ProbeFault> {
    let (program, args) = argv.split_first().ok_or(ProbeFault::EmptyCommand)?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProbeFault::Spawn {
            program: program.clone(),
            source,
        })?;

    let mut stdout = child.stdout.take().ok_or_else(|| {
        ProbeFault::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "probe stdout was not captured",
        ))
    })?;

    let completion = async {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await?;
        child.wait().await?;
        Ok::<_, std::io::Error>(buf)
    };
    let outcome = tokio::time::timeout(timeout, completion).await;

    match outcome {
        Ok(Ok(buf)) => Ok(String::from_utf8(buf)?),
        Ok(Err(e)) => Err(ProbeFault::Io(e)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill probe {}: {}", program, e);
            }
            Err(ProbeFault::Timeout(timeout))
        }
    }
}

fn validate_host(host: &str) -> Result<(), ProbeError> {
    let valid = !host.is_empty()
        && host.len() <= MAX_HOST_LEN
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_' | '%'));
    if valid {
        Ok(())
    } else {
        Err(ProbeError::InvalidHost(host.to_string()))
    }
}
