//! Structured diagnostic logging
//!
//! Standard output carries the sample stream, so every log line produced here
//! goes to standard error (or to an in-memory buffer in tests). The logger
//! supports:
//! - leveled, structured entries with arbitrary JSON fields
//! - console, JSON and compact renderings (`--log-format` / `LOG_FORMAT`)
//! - a per-run session ID and correlation IDs for grouped events
//! - a domain [`ProbeLogger`] for setup, per-target and per-round events

use crate::error::{AppError, ProbeError, Result};
use crate::models::{Config, Sample, Target};
use crate::sampler::RunSummary;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Per-round detail
    Debug = 1,
    /// Run and target milestones
    Info = 2,
    /// Probe failures and suspicious configuration
    Warn = 3,
    /// Failures that end the run
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Level name colored for terminals
    fn colored_name(&self) -> String {
        let name = format!("{:>5}", self.as_str());
        match self {
            LogLevel::Debug => name.cyan().to_string(),
            LogLevel::Info => name.green().to_string(),
            LogLevel::Warn => name.yellow().to_string(),
            LogLevel::Error => name.red().bold().to_string(),
        }
    }

    /// Minimum level implied by the verbosity flags
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            LogLevel::Debug
        } else if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

/// One structured log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Component that produced the entry
    pub logger: String,
    /// Groups the events of one target's sampling pass
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format
    #[default]
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Console => "console",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(AppError::parse(format!("Unknown log format: {}", other))),
        }
    }
}

/// Where rendered entries are written
#[derive(Debug, Clone)]
pub enum LogSink {
    Stderr,
    Buffer(Arc<Mutex<Vec<String>>>),
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
}

/// Leveled logger with a shared context
#[derive(Debug, Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    sink: LogSink,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Warn,
            use_color: false,
            format: LogFormat::Console,
            name: name.to_string(),
            sink: LogSink::Stderr,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger honoring the configured verbosity and format
    ///
    /// `use_color` is the already resolved terminal choice, not the raw
    /// `enable_color` setting.
    pub fn with_config(name: &str, config: &Config, use_color: bool) -> Self {
        Self {
            min_level: LogLevel::from_flags(config.verbose, config.debug),
            use_color,
            format: config.log_format,
            ..Self::new(name)
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_sink(&mut self, sink: LogSink) {
        self.sink = sink;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        if let Some(session_id) = &self.context.read().await.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        match &self.sink {
            LogSink::Stderr => {
                let _ = writeln!(io::stderr(), "{}", output);
            }
            LogSink::Buffer(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(output);
                }
            }
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level = if self.use_color {
            entry.level.colored_name()
        } else {
            format!("{:>5}", entry.level.as_str())
        };

        let mut output = format!("{} {} [{}] {}", timestamp, level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry
                .fields
                .iter()
                .filter(|(k, _)| k.as_str() != "session_id")
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            if !fields.is_empty() {
                output.push_str(&format!(" {{{}}}", fields.join(", ")));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        serde_json::to_string(entry).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                entry.message
            )
        })
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder for a single entry
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Attach the node ID and address of a target
    pub fn target(self, target: &Target) -> Self {
        self.field("node_id", target.id.as_str())
            .field("address", target.address.authority())
    }

    /// Attach a per-round failure
    pub fn probe_error(self, error: &ProbeError) -> Self {
        self.field("failure", error.kind())
            .field("detail", error.to_string())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for sampling events
#[derive(Debug, Clone)]
pub struct ProbeLogger {
    logger: Logger,
    session_id: String,
}

impl ProbeLogger {
    pub fn new(config: &Config, use_color: bool) -> Self {
        Self::from_logger(Logger::with_config("PROBE", config, use_color))
    }

    pub fn from_logger(logger: Logger) -> Self {
        Self {
            logger,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Announce the run and pin the session ID onto every later entry
    pub async fn log_run_start(&self, targets: usize, rounds: u32) {
        self.logger.set_session_id(self.session_id.clone()).await;
        self.logger
            .info(&format!("Sampling {} target(s) for {} round(s) each", targets, rounds))
            .field("targets", targets)
            .field("rounds", rounds)
            .log()
            .await;
    }

    /// Start a target's pass and return the correlation ID for its events
    pub async fn log_target_start(&self, index: usize, target: &Target) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.logger
            .info(&format!("Probing target {}: {}", index + 1, target))
            .correlation_id(&correlation_id)
            .target(target)
            .log()
            .await;
        correlation_id
    }

    pub async fn log_sample(&self, sample: &Sample, correlation_id: &str) {
        let mut builder = self
            .logger
            .debug(&format!("Round {} complete", sample.round))
            .correlation_id(correlation_id)
            .field("round", sample.round)
            .field("connect_ms", sample.connect.elapsed_ms())
            .field("connect_ok", sample.connect.is_success());
        if let Some(echo_ms) = sample.echo_ms() {
            builder = builder.field("echo_ms", echo_ms);
        }
        builder.log().await;

        if let Some(error) = sample.connect.error() {
            self.log_probe_failure("dial", sample.round, error, correlation_id).await;
        }
        if let Some(error) = sample.echo_error() {
            self.log_probe_failure("echo", sample.round, error, correlation_id).await;
        }
    }

    pub async fn log_probe_failure(&self, probe: &str, round: u32, error: &ProbeError, correlation_id: &str) {
        self.logger
            .warn(&format!("{} failed in round {}: {}", probe, round, error))
            .correlation_id(correlation_id)
            .field("probe", probe)
            .field("round", round)
            .probe_error(error)
            .log()
            .await;
    }

    pub async fn log_summary(&self, summary: &RunSummary) {
        for target in &summary.targets {
            self.logger
                .info(&format!(
                    "{}: {} sample(s), {} dial failure(s), {} echo failure(s)",
                    target.node_id, target.samples, target.connect_failures, target.echo_failures
                ))
                .field("node_id", target.node_id.as_str())
                .field("samples", target.samples)
                .field("connect_failures", target.connect_failures)
                .field("echo_failures", target.echo_failures)
                .log()
                .await;
        }

        self.logger
            .info(&format!(
                "Run finished: {} sample(s) in {:.1}s",
                summary.total_samples(),
                summary.duration.as_secs_f64()
            ))
            .field("duration_seconds", summary.duration.as_secs_f64())
            .log()
            .await;
    }
}
