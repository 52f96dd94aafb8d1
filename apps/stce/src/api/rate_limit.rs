//! Request throttling for the credential endpoints.
//!
//! Each peer address gets its own bucket, so one noisy client cannot lock
//! everybody else out of login.

use super::error::ApiError;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

pub type AuthLimiter = Arc<DefaultKeyedRateLimiter<IpAddr>>;

/// Tracked peers above which idle buckets are dropped.
const MAX_TRACKED_PEERS: usize = 10_000;

/// Key for requests that arrive without connection info.
const UNKNOWN_PEER: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Per-peer buckets refilled at `per_sec` requests per second. Zero is
/// treated as one.
pub fn auth_limiter(per_sec: u32) -> AuthLimiter {
    let rate = NonZeroU32::new(per_sec).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_second(rate)))
}

fn peer_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(UNKNOWN_PEER, |ConnectInfo(addr)| addr.ip())
}

pub async fn throttle(State(limiter): State<AuthLimiter>, req: Request, next: Next) -> Response {
    let peer = peer_ip(&req);
    if limiter.len() > MAX_TRACKED_PEERS {
        limiter.retain_recent();
    }
    if limiter.check_key(&peer).is_err() {
        tracing::warn!(path = %req.uri().path(), %peer, "auth rate limit exceeded");
        return ApiError::RateLimited.into_response();
    }
    next.run(req).await
}
