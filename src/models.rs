use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Latency reported when a probe could not measure a round trip.
pub const UNREACHABLE_LATENCY: f64 = 999.0;
/// Packet loss reported alongside [`UNREACHABLE_LATENCY`].
pub const TOTAL_LOSS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Success,
    Failed,
    Timeout,
    Error,
}

/// Outcome of one probe. Never mutated once built; transforms return a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub host: String,
    pub latency: f64,
    pub packet_loss: f64,
    pub status: ProbeStatus,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    #[serde(default)]
    pub optimized: bool,
}

impl ProbeResult {
    /// Builds a result from parsed metrics. Status follows the latency:
    /// anything below the sentinel counts as a success.
    pub fn from_metrics(host: &str, latency: f64, packet_loss: f64) -> Self {
        let status = if latency < UNREACHABLE_LATENCY {
            ProbeStatus::Success
        } else {
            ProbeStatus::Failed
        };
        Self {
            host: host.to_string(),
            latency,
            packet_loss,
            status,
            timestamp: now_secs(),
            optimized: false,
        }
    }

    /// Sentinel result for probes that never produced usable output.
    pub fn unreachable(host: &str, status: ProbeStatus) -> Self {
        Self {
            host: host.to_string(),
            latency: UNREACHABLE_LATENCY,
            packet_loss: TOTAL_LOSS,
            status,
            timestamp: now_secs(),
            optimized: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ProbeStatus::Success
    }
}

/// Payload pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Event {
    Result(ProbeResult),
    History(Vec<ProbeResult>),
}

/// Entry of the static list of well-known probe targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestServer {
    pub id: String,
    pub name: String,
    pub host: String,
    pub location: String,
    pub flag: String,
}

pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tracks_latency() {
        assert_eq!(ProbeResult::from_metrics("a", 12.5, 0.0).status, ProbeStatus::Success);
        assert_eq!(ProbeResult::from_metrics("a", 999.0, 100.0).status, ProbeStatus::Failed);

        let timeout = ProbeResult::unreachable("a", ProbeStatus::Timeout);
        assert_eq!(timeout.latency, UNREACHABLE_LATENCY);
        assert_eq!(timeout.packet_loss, TOTAL_LOSS);
        assert!(!timeout.optimized);
    }

    #[test]
    fn event_is_tagged_by_kind() {
        let result = ProbeResult::from_metrics("8.8.8.8", 14.2, 0.0);
        let json = serde_json::to_value(Event::Result(result.clone())).unwrap();
        assert_eq!(json["kind"], "result");
        assert_eq!(json["value"]["host"], "8.8.8.8");
        assert_eq!(json["value"]["status"], "success");
        assert_eq!(json["value"]["packet_loss"], 0.0);

        let json = serde_json::to_value(Event::History(vec![result])).unwrap();
        assert_eq!(json["kind"], "history");
        assert_eq!(json["value"].as_array().map(Vec::len), Some(1));
    }
}
