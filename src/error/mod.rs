//! Error handling for the peer latency probe
//!
//! Two layers of errors exist. [`AppError`] covers everything that can stop a
//! run: bad configuration, setup failures, output failures and cancellation.
//! [`ProbeError`] covers the failure of a single connection or echo probe and
//! is always captured into the sample instead of being propagated.

use std::time::Duration;
use thiserror::Error;

/// Errors that terminate a run
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (targets, numbers, JSON)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Credential, TLS or prober construction failed
    #[error("Setup error: {0}")]
    Setup(String),

    /// I/O errors (output stream, files)
    #[error("I/O error: {0}")]
    Io(String),

    /// The run was cancelled before completing
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new setup error
    pub fn setup<S: Into<String>>(message: S) -> Self {
        Self::Setup(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new cancellation error
    pub fn cancelled<S: Into<String>>(message: S) -> Self {
        Self::Cancelled(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Parse(_) => "PARSE",
            Self::Setup(_) => "SETUP",
            Self::Io(_) => "IO",
            Self::Cancelled(_) => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Targets are written as NODE_ID@HOST:PORT.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input values.", msg)
            }
            Self::Setup(msg) => {
                format!("Could not prepare the dialer: {}\n\nSuggestion: Check the client certificate and key files, or omit them to use an ephemeral identity.", msg)
            }
            Self::Io(msg) => {
                format!("Output failed: {}\n\nSuggestion: Check that the output stream is still open.", msg)
            }
            Self::Cancelled(msg) => {
                format!("Run cancelled: {}", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Setup(_) => 4,
            Self::Io(_) => 5,
            Self::Cancelled(_) => 130,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Setup(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Cancelled(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<rustls::Error> for AppError {
    fn from(error: rustls::Error) -> Self {
        Self::setup(format!("TLS configuration error: {}", error))
    }
}

impl From<rcgen::Error> for AppError {
    fn from(error: rcgen::Error) -> Self {
        Self::setup(format!("Certificate generation error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single connection attempt or echo probe
///
/// These never leave the sampler; they are recorded in the sample and shown
/// inline in the output stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("timed out after {}", timeout_text(.0))]
    Timeout(Duration),

    #[error("address resolution failed: {0}")]
    Resolve(String),

    #[error("connection refused")]
    Refused,

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("host unreachable: {0}")]
    Unreachable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(String),
}

fn timeout_text(limit: &Duration) -> String {
    crate::output::format_duration(*limit)
}

impl ProbeError {
    /// Short marker word used in the output stream
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Resolve(_) => "resolve",
            Self::Refused => "refused",
            Self::Handshake(_) => "handshake",
            Self::Unreachable(_) => "unreachable",
            Self::PermissionDenied(_) => "permission",
            Self::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::ConnectionRefused => Self::Refused,
            ErrorKind::PermissionDenied => Self::PermissionDenied(error.to_string()),
            ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
                Self::Unreachable(error.to_string())
            }
            _ => Self::Io(error.to_string()),
        }
    }
}
