//! quickcal CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use quickcal_client::cli::{self, AuthProvider, Cli, Command, ConfigAction};
use quickcal_client::commands::{self, Publishing, add::AddOptions};
use quickcal_client::config::ClientConfig;
use quickcal_client::error::ClientResult;
use quickcal_core::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(cli::normalize_args(std::env::args_os()));

    let config_path: PathBuf = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let loaded = if cli.config.is_some() {
        ClientConfig::load_from(&config_path)
    } else {
        ClientConfig::load()
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tracing_config = if cli.is_host() {
        TracingConfig::host()
    } else if cli.debug || config.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config, config_path).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: ClientConfig, config_path: PathBuf) -> ClientResult<ExitCode> {
    let timezone = || config.resolve_timezone(cli.timezone.as_deref());
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Add {
            text,
            dry_run,
            json,
        } => {
            let publishing = if dry_run {
                Publishing::Off
            } else {
                Publishing::Required
            };
            let flow = commands::build_flow(&config, timezone()?, publishing)?;
            let options = AddOptions { dry_run, json };
            commands::add::run(&flow, &cli::join_text(&text), options, &mut stdout).await
        }
        Command::Parse { text, descriptor } => {
            let flow = commands::build_flow(&config, timezone()?, Publishing::Off)?;
            commands::parse::run(&flow, &cli::join_text(&text), descriptor, &mut stdout).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Host => {
            let flow = commands::build_flow(&config, timezone()?, Publishing::BestEffort)?;
            commands::host::run(&flow).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Auth { provider } => match provider {
            #[cfg(feature = "google")]
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                let args = commands::auth::GoogleAuthArgs {
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                };
                commands::auth::google(args, &config, &config_path).await?;
                Ok(ExitCode::SUCCESS)
            }
        },
        Command::Config { action } => {
            match action {
                ConfigAction::Dump => commands::config::dump(&config, &config_path)?,
                ConfigAction::Validate => commands::config::validate(&config)?,
                ConfigAction::Path => commands::config::path(&config_path)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
