//! Data models and structures for the peer latency probe

pub mod config;
pub mod sample;
pub mod target;

// Re-export main model types
pub use config::Config;
pub use sample::{ConnectOutcome, EchoOutcome, Sample};
pub use target::{NodeAddress, NodeId, Target, TargetFilter, TargetSet, Transport};
