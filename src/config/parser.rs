//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        // .env values land in the process environment without overriding it
        EnvManager::load_env_file(self.cli.debug)?;

        if self.cli.debug {
            for warning in EnvManager::validate_current_env() {
                eprintln!("{}", warning);
            }
        }

        self.build_with(|key| std::env::var(key).ok())
    }

    /// Build the configuration from defaults, a variable lookup and the CLI
    pub fn build_with<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.merge_from_lookup(lookup)?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if !self.cli.targets.is_empty() {
            config.targets = self.cli.targets.clone();
        }

        if !self.cli.only.is_empty() {
            config.target_filter = self.cli.only.clone();
        }

        if let Some(rounds) = self.cli.rounds {
            config.rounds = rounds;
        }

        if let Some(interval) = self.cli.interval {
            config.interval_seconds = interval;
        }

        if let Some(timeout) = self.cli.dial_timeout {
            config.dial_timeout_seconds = timeout;
        }

        if let Some(timeout) = self.cli.echo_timeout {
            config.echo_timeout_seconds = timeout;
        }

        if let Some(format) = self.cli.format {
            config.format = format;
        }

        if self.cli.timestamps {
            config.timestamps = true;
        }

        if let Some(enable_color) = self.cli.color_override() {
            config.enable_color = enable_color;
        }

        if let Some(log_format) = self.cli.log_format {
            config.log_format = log_format;
        }

        if let (Some(cert), Some(key)) = (&self.cli.cert, &self.cli.key) {
            config.cert_path = Some(cert.clone());
            config.key_path = Some(key.clone());
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!(
                "Applied CLI overrides: rounds={}, interval={}s, dial_timeout={}s, echo_timeout={}s",
                config.rounds, config.interval_seconds, config.dial_timeout_seconds, config.echo_timeout_seconds
            );
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Targets: {}", config.targets.join(", ")));
    if !config.target_filter.is_empty() {
        summary.push(format!("Filter: {}", config.target_filter.join(", ")));
    }
    summary.push(format!("Rounds: {}", config.rounds));
    summary.push(format!("Interval: {}s", config.interval_seconds));
    summary.push(format!("Dial Timeout: {}s", config.dial_timeout_seconds));
    summary.push(format!("Echo Timeout: {}s", config.echo_timeout_seconds));
    summary.push(format!("Format: {}", config.format));
    summary.push(format!("Timestamps: {}", config.timestamps));
    summary.push(format!("Color Output: {}", config.enable_color));
    match (&config.cert_path, &config.key_path) {
        (Some(cert), Some(key)) => {
            summary.push(format!("Client Identity: {} / {}", cert.display(), key.display()))
        }
        _ => summary.push("Client Identity: ephemeral".to_string()),
    }
    summary.push(format!("Log Format: {}", config.log_format));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
