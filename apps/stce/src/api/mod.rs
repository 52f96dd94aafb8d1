//! # HTTP API
//!
//! axum router over the core services.
//!
//! - `/health`
//! - `/auth/{register,login}` (rate-limited)
//! - `/api/v1/{members,admin/members,announcements,teams,study}`

mod admin;
mod announcements;
mod auth;
pub mod error;
pub mod extract;
mod health;
mod members;
pub mod rate_limit;
mod study;
mod teams;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Router, middleware};
use error::ApiError;
use stce_core::admin::AdminService;
use stce_core::announcements::AnnouncementService;
use stce_core::members::MemberService;
use stce_core::study::{MAX_RESOURCE_BYTES, StudyService};
use stce_core::teams::TeamService;
use stce_core::{AuthService, Hasher, Store, TokenSigner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_RESOURCE_BYTES + 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub members: MemberService,
    pub admin: AdminService,
    pub announcements: AnnouncementService,
    pub teams: TeamService,
    pub study: StudyService,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        hasher: Hasher,
        signer: TokenSigner,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            auth: AuthService::new(store.clone(), hasher.clone(), signer),
            members: MemberService::new(store.clone()),
            admin: AdminService::new(store.clone(), hasher),
            announcements: AnnouncementService::new(store.clone()),
            teams: TeamService::new(store.clone()),
            study: StudyService::new(store, upload_dir),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// `None` allows any origin.
    pub cors_origin: Option<HeaderValue>,
    pub auth_rate_per_sec: u32,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            cors_origin: None,
            auth_rate_per_sec: 10,
        }
    }
}

/// Run a synchronous core call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> stce_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

fn cors(origin: Option<HeaderValue>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(60 * 60));
    match origin {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

pub fn router(state: AppState, options: RouterOptions) -> Router {
    let limiter = rate_limit::auth_limiter(options.auth_rate_per_sec);
    let auth_routes = auth::routes()
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit::throttle));

    let api = Router::new()
        .nest("/members", members::routes())
        .nest("/admin/members", admin::routes())
        .nest("/announcements", announcements::routes())
        .nest("/teams", teams::routes())
        .nest(
            "/study",
            study::routes().layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors(options.cors_origin)),
        )
        .with_state(state)
}
