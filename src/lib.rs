//! Peer Latency Probe
//!
//! Samples two latency signals against storage node peers: the wall-clock
//! cost of a TLS dial and the round-trip time of a single ICMP echo. Each
//! target is probed for a fixed number of rounds and every round is emitted
//! as one ordered line.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod dns;
pub mod echo;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod sampler;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ProbeError, Result};
pub use models::{Config, ConnectOutcome, EchoOutcome, NodeAddress, NodeId, Sample, Target, TargetFilter, TargetSet};
pub use client::{ConnectionTimer, DialTimer, Dialer, TlsDialer};
pub use echo::{EchoProber, IcmpEchoProber};
pub use output::{MemoryReporter, Reporter, StreamReporter};
pub use sampler::{cancel_pair, CancelHandle, CancelSignal, RunSummary, Sampler, SamplerConfig};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata embedded by `build.rs`
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_ROUNDS: u32 = 100;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
    pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(20);
    pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_TARGETS: &[&str] = &[
        "12PvuuRCUHBiqfDnmunUXfBhjGwGxgYVnEnibYXDdN9T1Pz3mqn@symbiont.spdns.de:28970",
        "1WLfM29uVTNfMGfRdjbesJrAow1UvnqYgW94CLrxtcCXPQ7m4f@storjnode000.dynv6.net:28967",
    ];
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MAX_ROUNDS: u32 = 10_000;
    pub const MAX_INTERVAL_SECONDS: f64 = 3600.0;
    pub const MAX_TIMEOUT_SECONDS: u64 = 300;
}
