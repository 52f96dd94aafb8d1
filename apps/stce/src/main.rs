use clap::Parser;
use stce::cli::{cmd_init, cmd_promote, cmd_serve, cmd_status};
use stce::config::{Cli, Command};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(args) => cmd_serve(&cli.database, args).await,
        Command::Init { force } => cmd_init(&cli.database, force).map(|()| {
            println!("Initialized database at {}", cli.database.display());
        }),
        Command::Promote { username, revoke } => {
            cmd_promote(&cli.database, &username, revoke).map(|profile| {
                let verb = if profile.is_admin { "is now" } else { "is no longer" };
                println!("{} {verb} an admin", profile.username);
            })
        }
        Command::Status { json } => cmd_status(&cli.database, json).map(|report| {
            println!("{report}");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
