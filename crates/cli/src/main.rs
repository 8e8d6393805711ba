//! callprobe CLI - Main Entry Point
//!
//! Places test calls through the call-management API, routes them with DTMF
//! digits and verifies how they end.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use callprobe_client::{CallClient, TwilioClient};
use callprobe_common::ClientConfig;
use commands::{call, twilio, verify};

/// callprobe - contact-center call verification
#[derive(Parser)]
#[command(name = "callprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "callprobe.toml", global = true)]
    config: PathBuf,

    /// Call-management API base URL
    #[arg(long, env = "CALLPROBE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Call-management API token
    #[arg(long, env = "CALLPROBE_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, route and drop calls
    #[command(subcommand)]
    Call(call::CallCommands),

    /// Look calls up in Twilio
    #[command(subcommand)]
    Twilio(twilio::TwilioCommands),

    /// Create a call, route it and verify it completes
    Verify(verify::VerifyArgs),

    /// Show version information
    Version,
}

/// File, then environment, then command-line flags
fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::load(&cli.config)
        .with_context(|| format!("Failed to read {}", cli.config.display()))?;
    config.apply_env()?;

    if let Some(base_url) = &cli.base_url {
        config.call_api.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.call_api.token = Some(token.clone());
    }

    config.validate()?;
    Ok(config)
}

fn twilio_client(config: &ClientConfig) -> anyhow::Result<Option<TwilioClient>> {
    config
        .twilio
        .as_ref()
        .map(|twilio| TwilioClient::new(twilio, config.request_timeout()))
        .transpose()
        .map_err(Into::into)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    if let Commands::Version = cli.command {
        println!("callprobe v{}", callprobe_common::VERSION);
        return Ok(());
    }

    // A missing token is fatal before any command runs
    let config = load_config(&cli)?;
    let client = CallClient::from_config(&config)?;

    let passed = match cli.command {
        Commands::Call(cmd) => {
            call::execute(cmd, client, &config.poll, cli.format).await?;
            true
        }
        Commands::Twilio(cmd) => {
            let twilio = twilio_client(&config)?
                .context("Twilio is not configured (set TWILIO_ACCOUNT_SID and TWILIO_AUTH_TOKEN)")?;
            twilio::execute(cmd, twilio, &config.poll, cli.format).await?
        }
        Commands::Verify(args) => {
            let twilio = twilio_client(&config)?;
            verify::execute(args, client, twilio, &config.poll, cli.format).await?
        }
        Commands::Version => true,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use callprobe_common::CallStatus;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify() {
        let cli = Cli::try_parse_from([
            "callprobe",
            "verify",
            "4352005133",
            "0",
            "--max-attempts",
            "3",
            "--terminal",
            "completed,FAILED",
            "--repeat",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.number, "4352005133");
                assert_eq!(args.repeat, 2);
                assert_eq!(args.poll.max_attempts, Some(3));
                assert_eq!(args.poll.terminal, vec![CallStatus::Completed, CallStatus::Failed]);
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn test_verify_rejects_zero_repeat() {
        let result = Cli::try_parse_from(["callprobe", "verify", "4352005133", "0", "--repeat", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_create_defaults() {
        let cli = Cli::try_parse_from(["callprobe", "call", "create", "4352005133"]).unwrap();
        match cli.command {
            Commands::Call(call::CallCommands::Create { count, wait_on, timeout, .. }) => {
                assert_eq!(count, 1);
                assert_eq!(wait_on, CallStatus::Connected);
                assert_eq!(timeout, 120);
            }
            _ => panic!("expected call create"),
        }
    }
}
