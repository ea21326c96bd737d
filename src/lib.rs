//! Host latency probing with a bounded result history and live fan-out to
//! subscribed observers.

pub mod api;
pub mod broadcast;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod parser;
pub mod probe;
pub mod store;

pub use broadcast::{Broadcaster, ObserverId, Subscription};
pub use command::{build_probe_command, Platform, ProbeCommand, SystemPing};
pub use config::ServerConfig;
pub use engine::Engine;
pub use error::ProbeError;
pub use models::{Event, ProbeResult, ProbeStatus, TestServer};
pub use optimizer::OptimizationSimulator;
pub use parser::parse_output;
pub use probe::{Measurement, ProbeExecutor};
pub use store::ResultStore;
