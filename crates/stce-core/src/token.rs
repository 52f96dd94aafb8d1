//! # Token Module
//!
//! Signed bearer tokens.
//!
//! Wire form: `base64url(json claims) "." base64url(mac)`, where the MAC is a
//! keyed BLAKE3 hash of the encoded claims. The key is derived from the
//! configured secret, so any secret length works.

use crate::error::{Result, StceError};
use crate::primitives::UserId;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

const KEY_CONTEXT: &str = "stce 2024-01 access token v1";

/// Default token lifetime: one day.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    /// Expiry as Unix seconds.
    pub exp: i64,
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: [u8; 32],
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let ttl_secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret),
            ttl: Duration::try_seconds(ttl_secs).unwrap_or(Duration::MAX),
        }
    }

    pub fn issue(&self, sub: UserId, username: &str, now: DateTime<Utc>) -> Result<String> {
        let exp = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp();
        let claims = Claims {
            sub,
            username: username.to_string(),
            exp,
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| StceError::Internal(format!("token encoding: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mac = self.mac(&payload);
        Ok(format!("{payload}.{}", URL_SAFE_NO_PAD.encode(mac.as_bytes())))
    }

    /// Check the signature and expiry. Every failure is `Unauthorized`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let invalid = || StceError::unauthorized("invalid token");
        let (payload, sig) = token.split_once('.').ok_or_else(invalid)?;
        let sig = URL_SAFE_NO_PAD.decode(sig).map_err(|_| invalid())?;
        let expected = self.mac(payload);
        if !bool::from(expected.as_bytes()[..].ct_eq(&sig[..])) {
            return Err(invalid());
        }

        let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| invalid())?;
        if claims.exp <= now.timestamp() {
            return Err(StceError::unauthorized("token expired"));
        }
        Ok(claims)
    }

    fn mac(&self, payload: &str) -> blake3::Hash {
        blake3::keyed_hash(&self.key, payload.as_bytes())
    }
}

/// A fresh random secret for when none is configured.
pub fn random_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
