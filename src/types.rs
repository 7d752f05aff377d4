//! Type definitions shared across modules

use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Sample stream format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<connect> : <echo>` lines under a per-target header
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(AppError::parse(format!("Unknown output format: {}", other))),
        }
    }
}

/// Latency classification used for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    /// Under 50ms
    Excellent,
    /// 50-150ms
    Good,
    /// 150-500ms
    Fair,
    /// Over 500ms
    Poor,
}

impl LatencyLevel {
    /// Classify a measured duration
    pub fn from_duration(duration: Duration) -> Self {
        let ms = duration.as_secs_f64() * 1000.0;
        if ms < 50.0 {
            Self::Excellent
        } else if ms < 150.0 {
            Self::Good
        } else if ms < 500.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}
