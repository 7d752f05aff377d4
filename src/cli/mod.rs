//! Command-line interface

use crate::logging::LogFormat;
use crate::types::OutputFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Peer Latency Probe - sample TLS dial time and ICMP echo time against storage nodes
#[derive(Parser, Debug, Clone)]
#[command(name = "plp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target to probe as NODE_ID@HOST:PORT (can be used multiple times)
    #[arg(long = "target", value_name = "ID@HOST:PORT", action = ArgAction::Append)]
    pub targets: Vec<String>,

    /// Only probe targets whose node ID starts with, or whose host equals, PATTERN
    #[arg(long = "only", value_name = "PATTERN", action = ArgAction::Append)]
    pub only: Vec<String>,

    /// Sampling rounds per target
    #[arg(short = 'n', long)]
    pub rounds: Option<u32>,

    /// Delay before every round, in seconds (fractions allowed, 0 disables)
    #[arg(short, long, value_name = "SECONDS", value_parser = parse_interval)]
    pub interval: Option<f64>,

    /// TLS dial timeout in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_duration)]
    pub dial_timeout: Option<u64>,

    /// Echo probe timeout in seconds
    #[arg(long, value_name = "SECONDS", value_parser = parse_duration)]
    pub echo_timeout: Option<u64>,

    /// Sample stream format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Prefix every output line with the local date and time
    #[arg(long)]
    pub timestamps: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// PEM certificate chain to present instead of an ephemeral identity
    #[arg(long, value_name = "PATH", requires = "key")]
    pub cert: Option<PathBuf>,

    /// PEM private key matching --cert
    #[arg(long, value_name = "PATH", requires = "cert")]
    pub key: Option<PathBuf>,

    /// Diagnostic log format on stderr
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// List the supported environment variables and exit
    #[arg(long, conflicts_with_all = ["show_config", "init_env"])]
    pub env_help: bool,

    /// Write an example .env file to the current directory and exit
    #[arg(long, conflicts_with = "show_config")]
    pub init_env: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.rounds == Some(0) {
            return Err("--rounds must be greater than 0".to_string());
        }

        if self.format == Some(OutputFormat::Json) && self.color {
            return Err("--color has no effect with --format json".to_string());
        }

        Ok(())
    }

    /// Explicit color choice, if any
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else {
            None
        }
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        self.color_override().unwrap_or_else(supports_color)
    }
}

/// Parse a timeout in whole seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > crate::defaults::MAX_TIMEOUT_SECONDS {
                Err(format!(
                    "Duration cannot exceed {} seconds",
                    crate::defaults::MAX_TIMEOUT_SECONDS
                ))
            } else {
                Ok(secs)
            }
        })
}

/// Parse an inter-round delay in (possibly fractional) seconds
fn parse_interval(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("Invalid interval: {}", s))?;

    if !secs.is_finite() || secs < 0.0 {
        Err("Interval must be a non-negative number of seconds".to_string())
    } else if secs > crate::defaults::MAX_INTERVAL_SECONDS {
        Err(format!(
            "Interval cannot exceed {} seconds",
            crate::defaults::MAX_INTERVAL_SECONDS
        ))
    } else {
        Ok(secs)
    }
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_basic() {
        let cli = Cli::parse_from(["plp", "--rounds", "5", "--interval", "0.5"]);
        assert_eq!(cli.rounds, Some(5));
        assert_eq!(cli.interval, Some(0.5));
        assert!(cli.targets.is_empty());
        assert!(!cli.verbose);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_unset_options_are_none() {
        let cli = Cli::parse_from(["plp"]);
        assert_eq!(cli.rounds, None);
        assert_eq!(cli.interval, None);
        assert_eq!(cli.dial_timeout, None);
        assert_eq!(cli.echo_timeout, None);
        assert_eq!(cli.format, None);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "plp",
            "--target", "abc@host1:28967",
            "--target", "def@host2:28968",
            "--only", "abc",
            "-n", "10",
            "-i", "0",
            "--dial-timeout", "15",
            "--echo-timeout", "2",
            "--format", "json",
            "--timestamps",
            "--no-color",
            "--cert", "chain.pem",
            "--key", "key.pem",
            "--verbose",
            "--debug",
            "--show-config",
            "--log-format", "compact",
        ]);

        assert_eq!(cli.targets, vec!["abc@host1:28967", "def@host2:28968"]);
        assert_eq!(cli.only, vec!["abc"]);
        assert_eq!(cli.rounds, Some(10));
        assert_eq!(cli.interval, Some(0.0));
        assert_eq!(cli.dial_timeout, Some(15));
        assert_eq!(cli.echo_timeout, Some(2));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(cli.timestamps);
        assert!(cli.no_color);
        assert_eq!(cli.cert.as_deref(), Some(std::path::Path::new("chain.pem")));
        assert_eq!(cli.key.as_deref(), Some(std::path::Path::new("key.pem")));
        assert!(cli.verbose);
        assert!(cli.debug);
        assert!(cli.show_config);
        assert_eq!(cli.log_format, Some(LogFormat::Compact));
        assert!(!cli.env_help);
        assert!(!cli.init_env);
    }

    #[test]
    fn test_env_subcommand_flags() {
        assert!(Cli::parse_from(["plp", "--env-help"]).env_help);
        assert!(Cli::parse_from(["plp", "--init-env"]).init_env);
        assert!(Cli::try_parse_from(["plp", "--env-help", "--init-env"]).is_err());
        assert!(Cli::try_parse_from(["plp", "--init-env", "--show-config"]).is_err());
        assert!(Cli::try_parse_from(["plp", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_cert_requires_key() {
        assert!(Cli::try_parse_from(["plp", "--cert", "chain.pem"]).is_err());
        assert!(Cli::try_parse_from(["plp", "--key", "key.pem"]).is_err());
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration("1").unwrap(), 1);
        assert_eq!(parse_duration("300").unwrap(), 300);

        assert!(parse_duration("0").is_err());
        assert!(parse_duration("301").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10.5").is_err());
        assert!(parse_duration("+10").is_err());
        assert!(parse_duration("0x10").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!(parse_interval("0").unwrap(), 0.0);
        assert_eq!(parse_interval("3").unwrap(), 3.0);
        assert_eq!(parse_interval("0.25").unwrap(), 0.25);

        assert!(parse_interval("-1").is_err());
        assert!(parse_interval("NaN").is_err());
        assert!(parse_interval("inf").is_err());
        assert!(parse_interval("3601").is_err());
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn test_cli_validation() {
        let conflict = Cli::parse_from(["plp", "--color", "--no-color"]);
        assert!(conflict
            .validate()
            .unwrap_err()
            .contains("Cannot specify both --color and --no-color"));

        let zero_rounds = Cli::parse_from(["plp", "--rounds", "0"]);
        assert!(zero_rounds.validate().is_err());

        let json_color = Cli::parse_from(["plp", "--format", "json", "--color"]);
        assert!(json_color.validate().is_err());

        let fine = Cli::parse_from(["plp", "--color"]);
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn test_color_override() {
        assert_eq!(Cli::parse_from(["plp", "--color"]).color_override(), Some(true));
        assert_eq!(Cli::parse_from(["plp", "--no-color"]).color_override(), Some(false));
        assert_eq!(Cli::parse_from(["plp"]).color_override(), None);

        assert!(!Cli::parse_from(["plp", "--no-color"]).use_colors());
        assert!(Cli::parse_from(["plp", "--color"]).use_colors());
    }
}
