//! Peer Latency Probe - Main CLI Application
//!
//! Samples TLS dial time and ICMP echo time against storage node peers and
//! streams one line per round to standard output.

use clap::Parser;
use peer_latency_probe::{
    app::App,
    cli::Cli,
    config::EnvManager,
    error::{AppError, Result},
    sampler::cancel_pair,
};
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let use_color = cli.use_colors();

    let code = match run_application(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e.format_for_console(use_color));
            print_error_suggestions(&e);
            e.exit_code()
        }
    };

    // Exit without waiting on echo threads still blocked in their own timeout
    process::exit(code);
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    // These only touch the environment file, so they skip configuration loading
    if cli.env_help {
        print!("{}", EnvManager::display_env_help());
        return Ok(());
    }

    if cli.init_env {
        let path = Path::new(".env");
        EnvManager::save_example_env_file(path)?;
        eprintln!("Wrote example configuration to {}", path.display());
        return Ok(());
    }

    let app = App::new(cli)?;

    if app.cli_requests_config_only() {
        return app.show_config();
    }

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    app.run(signal).await.map(|_| ())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) | AppError::Validation(_) | AppError::Parse(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Targets are written as NODE_ID@HOST:PORT");
            eprintln!("  - Check PROBE_* variables in your environment or .env file");
            eprintln!("  - Run with --show-config to see the resolved settings");
            eprintln!("  - Run with --env-help to list the supported variables");
        }
        AppError::Setup(_) => {
            eprintln!();
            eprintln!("Setup help:");
            eprintln!("  - --cert and --key must point to readable PEM files");
            eprintln!("  - The key must match the first certificate in the chain");
            eprintln!("  - Omit both to use a freshly generated identity");
        }
        AppError::Io(_) => {
            eprintln!();
            eprintln!("The sample stream could not be written; was the output pipe closed?");
        }
        _ => {}
    }
}
