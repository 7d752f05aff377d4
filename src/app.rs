//! Main application orchestration and execution

use crate::{
    cli::{supports_color, Cli},
    client::{ClientIdentity, DialTimer, TlsDialer},
    config::{display_config_summary, load_config},
    dns::HostResolver,
    echo::IcmpEchoProber,
    error::{AppError, Result},
    logging::ProbeLogger,
    models::{Config, TargetSet},
    output::{OutputFormatterFactory, StreamReporter},
    sampler::{CancelSignal, RunSummary, Sampler, SamplerConfig},
    types::OutputFormat,
};

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
    config: Config,
}

impl App {
    /// Validate the command line and resolve the full configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        let config = load_config(cli.clone())?;
        Ok(Self { cli, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `--show-config` was given
    pub fn cli_requests_config_only(&self) -> bool {
        self.cli.show_config
    }

    /// Effective color choice for the sample stream
    pub fn use_color(&self) -> bool {
        if self.config.format == OutputFormat::Json {
            return false;
        }
        match self.cli.color_override() {
            Some(enabled) => enabled,
            None => self.config.enable_color && supports_color(),
        }
    }

    /// Print the resolved configuration instead of probing
    pub fn show_config(&self) -> Result<()> {
        let targets = self.config.target_set()?;
        println!("{}", display_config_summary(&self.config));
        println!("Selected Targets ({}):", targets.len());
        for (index, target) in targets.iter().enumerate() {
            println!("  {}: {}", index + 1, target);
        }
        Ok(())
    }

    /// Build every component, then sample until done or cancelled
    ///
    /// Setup runs to completion before the first probe: a bad target list, an
    /// unreadable identity or a TLS configuration error ends the run without
    /// emitting anything.
    pub async fn run(self, cancel: CancelSignal) -> Result<RunSummary> {
        let config = &self.config;
        colored::control::set_override(self.use_color());

        if config.debug {
            eprintln!("{} v{}", crate::PKG_NAME, crate::VERSION);
            if let (Some(built), Some(commit)) = (crate::BUILD_TIME, crate::GIT_COMMIT) {
                eprintln!("Built {} from {}", built, commit);
            }
            eprintln!("{}", display_config_summary(config));
        }

        let logger = ProbeLogger::new(config, self.use_color());
        let targets: TargetSet = config.target_set()?;

        let identity = ClientIdentity::load_or_generate(
            config.cert_path.as_deref(),
            config.key_path.as_deref(),
        )?;
        logger
            .logger()
            .debug("Client identity ready")
            .field("chain_length", identity.cert_chain.len())
            .log()
            .await;

        let resolver = HostResolver::new();
        let dialer = TlsDialer::new(identity, resolver.clone(), config.dial_timeout())?;
        let prober = IcmpEchoProber::new(resolver, config.echo_timeout());

        let formatter = OutputFormatterFactory::create_formatter(config.format, self.use_color());
        let mut reporter = StreamReporter::stdout(formatter).with_timestamps(config.timestamps);

        let sampler = Sampler::new(DialTimer::new(dialer), prober, SamplerConfig::from(config))
            .with_logger(logger);
        sampler.run(&targets, &mut reporter, &cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_conflicting_flags_rejected() {
        let cli = Cli::parse_from(["plp", "--color", "--no-color"]);
        let result = App::new(cli);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_json_never_colored() {
        let cli = Cli::parse_from(["plp", "--format", "json", "--target", "abc@127.0.0.1:1"]);
        let app = App::new(cli).unwrap();
        assert!(!app.use_color());

        let cli = Cli::parse_from(["plp", "--no-color", "--target", "abc@127.0.0.1:1"]);
        let app = App::new(cli).unwrap();
        assert!(!app.use_color());
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_setup_before_probing() {
        let dir = tempfile::TempDir::new().unwrap();
        let cert = dir.path().join("missing-chain.pem");
        let key = dir.path().join("missing-key.pem");
        let cli = Cli::parse_from([
            "plp",
            "--target",
            "abc@127.0.0.1:1",
            "--cert",
            cert.to_str().unwrap(),
            "--key",
            key.to_str().unwrap(),
            "--interval",
            "0",
        ]);

        let app = App::new(cli).unwrap();
        let result = app.run(CancelSignal::never()).await;
        match result {
            Err(error) => assert_eq!(error.exit_code(), 4),
            Ok(_) => panic!("setup should have failed"),
        }
    }
}
