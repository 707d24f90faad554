//! eventlens entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use eventlens_background::cli::{Cli, Command};
use eventlens_background::{
    BackgroundConfig, BackgroundError, BackgroundResult, Session, TokenStatus,
    authorize, host,
};
use eventlens_core::{TracingConfig, TracingOutputFormat, init_tracing};
use eventlens_google::FileStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries frames when serving, so logs always go to stderr.
    let tracing = if cli.debug {
        TracingConfig::cli_debug()
    } else if matches!(cli.command, None | Some(Command::Serve)) {
        TracingConfig::native_host()
    } else {
        TracingConfig::default().with_format(TracingOutputFormat::Compact)
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> BackgroundResult<()> {
    let config = match cli.config {
        Some(ref path) => BackgroundConfig::load_from(path),
        None => BackgroundConfig::load(),
    }
    .map_err(BackgroundError::config)?;

    let google = config
        .google
        .to_google_config()
        .map_err(BackgroundError::config)?;
    let store_path = config.store_path();
    let store = Arc::new(FileStore::open(&store_path)?);
    let session = Arc::new(Session::new(&google, store)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            host::run(
                session,
                &config.relay,
                std::io::stdin(),
                std::io::stdout(),
            )
            .await?;
        }
        Command::Install => {
            let prompt = config.google.loopback_prompt()?;
            let calendars = authorize(&session, &prompt).await?;
            println!(
                "Authorized. {} calendars stored in {}",
                calendars.len(),
                store_path.display()
            );
        }
        Command::RefreshCalendars => {
            let calendars = session.refresh_calendars().await?;
            println!("Stored {} calendars", calendars.len());
        }
        Command::Validate => match session.validate_tokens().await? {
            TokenStatus::Valid => println!("Access token is valid"),
            TokenStatus::Refreshed => println!("Access token was rejected and has been refreshed"),
        },
    }

    Ok(())
}
