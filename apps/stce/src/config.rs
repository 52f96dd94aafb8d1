//! Command line and environment configuration.
//!
//! Every flag can also be set through an `STCE_*` environment variable.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "stce", version, about = "STCE club platform server")]
pub struct Cli {
    /// Path to the redb database file.
    #[arg(long, env = "STCE_DATABASE", default_value = "stce.redb", global = true)]
    pub database: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),

    /// Create an empty database.
    Init {
        /// Replace an existing database file.
        #[arg(long)]
        force: bool,
    },

    /// Grant (or with --revoke, withdraw) admin rights.
    Promote {
        username: String,

        #[arg(long)]
        revoke: bool,
    },

    /// Print row counts for every table.
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, env = "STCE_ADDR", default_value = "127.0.0.1:3000")]
    pub addr: SocketAddr,

    /// Where uploaded study resources are written.
    #[arg(long, env = "STCE_UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Access token signing secret. A random one is generated when unset,
    /// which invalidates issued tokens on every restart.
    #[arg(long, env = "STCE_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    #[arg(long, env = "STCE_TOKEN_TTL_SECS", default_value_t = stce_core::token::DEFAULT_TTL_SECS)]
    pub token_ttl_secs: u64,

    /// Allowed CORS origin. Any origin when unset.
    #[arg(long, env = "STCE_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Requests per second accepted on /auth routes.
    #[arg(long, env = "STCE_AUTH_RATE_PER_SEC", default_value_t = 10)]
    pub auth_rate_per_sec: u32,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["stce", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.addr.port(), 3000);
        assert_eq!(args.token_ttl_secs, 86_400);
        assert_eq!(args.auth_rate_per_sec, 10);
        assert_eq!(cli.database, PathBuf::from("stce.redb"));
    }

    #[test]
    fn database_flag_is_global() {
        let cli = Cli::try_parse_from(["stce", "promote", "kim", "--database", "x.redb"]).unwrap();
        assert_eq!(cli.database, PathBuf::from("x.redb"));
        assert!(matches!(
            cli.command,
            Command::Promote { ref username, revoke: false } if username == "kim"
        ));
    }
}
