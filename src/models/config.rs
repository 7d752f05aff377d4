//! Configuration data model and validation

use crate::logging::LogFormat;
use crate::models::target::{TargetFilter, TargetSet};
use crate::types::{AppError, OutputFormat, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Targets as `NODE_ID@HOST:PORT`, probed in this order
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,

    /// Optional subset selection (node ID prefixes, hosts or `host:port`)
    #[serde(default)]
    pub target_filter: Vec<String>,

    /// Sampling rounds per target
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Delay before every round
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: f64,

    /// Bound on a single dial, including the TLS handshake
    #[serde(default = "default_dial_timeout_seconds")]
    pub dial_timeout_seconds: u64,

    /// Bound on a single echo probe
    #[serde(default = "default_echo_timeout_seconds")]
    pub echo_timeout_seconds: u64,

    /// Sample stream format
    #[serde(default)]
    pub format: OutputFormat,

    /// Prefix each line with the local date and time
    #[serde(default)]
    pub timestamps: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// PEM certificate chain presented to peers
    #[serde(default)]
    pub cert_path: Option<PathBuf>,

    /// PEM private key matching `cert_path`
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// Rendering of diagnostic log lines on stderr
    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            target_filter: Vec::new(),
            rounds: default_rounds(),
            interval_seconds: default_interval_seconds(),
            dial_timeout_seconds: default_dial_timeout_seconds(),
            echo_timeout_seconds: default_echo_timeout_seconds(),
            format: OutputFormat::default(),
            timestamps: false,
            enable_color: default_enable_color(),
            cert_path: None,
            key_path: None,
            log_format: LogFormat::default(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_seconds)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_seconds)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_secs(self.echo_timeout_seconds)
    }

    pub fn filter(&self) -> TargetFilter {
        TargetFilter::new(self.target_filter.iter().cloned())
    }

    /// Parse the configured targets and apply the filter
    pub fn target_set(&self) -> Result<TargetSet> {
        TargetSet::parse_all(&self.targets)?.filtered(&self.filter())
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(AppError::config("At least one target is required"));
        }

        for target in &self.targets {
            if target.trim().is_empty() {
                return Err(AppError::config("Target cannot be empty"));
            }
        }
        self.target_set()
            .map_err(|e| AppError::config(format!("Invalid target list: {}", e)))?;

        if self.rounds == 0 {
            return Err(AppError::config("Round count must be greater than 0"));
        }

        if self.rounds > crate::defaults::MAX_ROUNDS {
            return Err(AppError::config(format!(
                "Round count cannot exceed {}",
                crate::defaults::MAX_ROUNDS
            )));
        }

        if !self.interval_seconds.is_finite() || self.interval_seconds < 0.0 {
            return Err(AppError::config("Interval must be a non-negative number of seconds"));
        }

        if self.interval_seconds > crate::defaults::MAX_INTERVAL_SECONDS {
            return Err(AppError::config(format!(
                "Interval cannot exceed {} seconds",
                crate::defaults::MAX_INTERVAL_SECONDS
            )));
        }

        for (name, value) in [
            ("Dial timeout", self.dial_timeout_seconds),
            ("Echo timeout", self.echo_timeout_seconds),
        ] {
            if value == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
            if value > crate::defaults::MAX_TIMEOUT_SECONDS {
                return Err(AppError::config(format!(
                    "{} cannot exceed {} seconds",
                    name,
                    crate::defaults::MAX_TIMEOUT_SECONDS
                )));
            }
        }

        if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(AppError::config("Client certificate and key must be given together"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary key lookup, using the environment variable names
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(targets) = lookup("PROBE_TARGETS") {
            self.targets = split_list(&targets);
        }

        if let Some(filter) = lookup("PROBE_FILTER") {
            self.target_filter = split_list(&filter);
        }

        if let Some(rounds) = lookup("PROBE_ROUNDS") {
            self.rounds = rounds.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_ROUNDS value '{}': {}", rounds, e)))?;
        }

        if let Some(interval) = lookup("PROBE_INTERVAL_SECONDS") {
            self.interval_seconds = interval.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_INTERVAL_SECONDS value '{}': {}", interval, e)))?;
        }

        if let Some(timeout) = lookup("DIAL_TIMEOUT_SECONDS") {
            self.dial_timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid DIAL_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Some(timeout) = lookup("ECHO_TIMEOUT_SECONDS") {
            self.echo_timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ECHO_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Some(format) = lookup("PROBE_FORMAT") {
            self.format = format.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_FORMAT value '{}': {}", format, e)))?;
        }

        if let Some(enable_color) = lookup("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        if let Some(cert) = lookup("CLIENT_CERT_PATH") {
            self.cert_path = Some(PathBuf::from(cert.trim()));
        }

        if let Some(key) = lookup("CLIENT_KEY_PATH") {
            self.key_path = Some(PathBuf::from(key.trim()));
        }

        if let Some(log_format) = lookup("LOG_FORMAT") {
            self.log_format = log_format.parse()
                .map_err(|e| AppError::config(format!("Invalid LOG_FORMAT value '{}': {}", log_format, e)))?;
        }

        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Default value functions for serde
fn default_targets() -> Vec<String> {
    crate::defaults::DEFAULT_TARGETS
        .iter()
        .map(|&s| s.to_string())
        .collect()
}

fn default_rounds() -> u32 {
    crate::defaults::DEFAULT_ROUNDS
}

fn default_interval_seconds() -> f64 {
    crate::defaults::DEFAULT_INTERVAL.as_secs_f64()
}

fn default_dial_timeout_seconds() -> u64 {
    crate::defaults::DEFAULT_DIAL_TIMEOUT.as_secs()
}

fn default_echo_timeout_seconds() -> u64 {
    crate::defaults::DEFAULT_ECHO_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
