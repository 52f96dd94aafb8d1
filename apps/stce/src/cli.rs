//! # CLI Commands
//!
//! One function per subcommand. Everything except `serve` is synchronous
//! and returns its output so tests can drive it directly.

use crate::api::{AppState, RouterOptions, router};
use crate::config::ServeArgs;
use axum::http::HeaderValue;
use stce_core::admin::AdminService;
use stce_core::model::MemberProfile;
use stce_core::token::random_secret;
use stce_core::{Hasher, StceError, TokenSigner, open_store};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] StceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} already exists (use --force to replace it)", .0.display())]
    AlreadyExists(PathBuf),

    #[error("{} does not exist (run `stce init` first)", .0.display())]
    Missing(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

// =============================================================================
// SERVE
// =============================================================================

pub async fn cmd_serve(database: &Path, args: ServeArgs) -> CliResult<()> {
    let secret = match args.token_secret {
        Some(secret) if !secret.is_empty() => secret,
        _ => {
            tracing::warn!("STCE_TOKEN_SECRET is not set; using a random secret, tokens will not survive a restart");
            random_secret()
        }
    };
    let cors_origin = args
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .map_err(|e| CliError::Config(format!("cors origin: {e}")))?;

    let store = Arc::new(open_store(database)?);
    tokio::fs::create_dir_all(&args.upload_dir).await?;
    let state = AppState::new(
        store,
        Hasher::default(),
        TokenSigner::new(secret.as_bytes(), args.token_ttl_secs),
        args.upload_dir.clone(),
    );
    let app = router(
        state,
        RouterOptions {
            cors_origin,
            auth_rate_per_sec: args.auth_rate_per_sec,
        },
    );

    let listener = TcpListener::bind(args.addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        database = %database.display(),
        uploads = %args.upload_dir.display(),
        "STCE server listening"
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("failed to listen for SIGTERM: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

// =============================================================================
// INIT / PROMOTE / STATUS
// =============================================================================

/// Create an empty database with every table.
pub fn cmd_init(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() {
        if !force {
            return Err(CliError::AlreadyExists(path.to_path_buf()));
        }
        std::fs::remove_file(path)?;
    }
    open_store(path)?;
    Ok(())
}

pub fn cmd_promote(path: &Path, username: &str, revoke: bool) -> CliResult<MemberProfile> {
    if !path.exists() {
        return Err(CliError::Missing(path.to_path_buf()));
    }
    let store = Arc::new(open_store(path)?);
    Ok(AdminService::new(store, Hasher::default()).set_admin(username, !revoke)?)
}

/// Row counts per table, as text or as a JSON object.
pub fn cmd_status(path: &Path, json: bool) -> CliResult<String> {
    if !path.exists() {
        return Err(CliError::Missing(path.to_path_buf()));
    }
    let counts = open_store(path)?.counts()?;
    if json {
        let map: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|c| (c.table.to_string(), c.rows.into()))
            .collect();
        return Ok(serde_json::to_string_pretty(&map)?);
    }

    let mut out = format!("Database: {}\n", path.display());
    for count in &counts {
        let _ = writeln!(out, "  {:<14} {}", count.table, count.rows);
    }
    Ok(out.trim_end().to_string())
}
