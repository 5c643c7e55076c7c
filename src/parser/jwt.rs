use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::token::strip_bearer_scheme;
use crate::errors::{Result, WatchError};

/// base64url, padding optional
const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Deserialize)]
struct JwtClaims {
    exp: Option<Value>,
}

/// Read `exp` from the claims segment. The signature is not verified: the
/// token is replayed, not authenticated here.
pub fn decode_expiry(token: &str) -> Result<u64> {
    let raw = strip_bearer_scheme(token);
    let parts: Vec<&str> = raw.split('.').collect();
    if parts.len() != 3 {
        return Err(WatchError::MalformedToken(format!("expected 3 segments, got {}", parts.len())));
    }

    let decoded = JWT_SEGMENT
        .decode(parts[1])
        .map_err(|e| WatchError::MalformedToken(format!("base64 decode error: {}", e)))?;

    let claims = serde_json::from_slice::<JwtClaims>(&decoded)
        .map_err(|e| WatchError::MalformedToken(format!("invalid claims: {}", e)))?;

    match claims.exp {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| WatchError::MalformedToken(format!("exp is not a unix timestamp: {}", n))),
        Some(other) => Err(WatchError::MalformedToken(format!("exp is not a number: {}", other))),
        None => Err(WatchError::MalformedToken("exp claim missing".to_owned())),
    }
}

/// Claimed expiry, or `now + fallback_ttl` when the claims can't be read.
pub fn expiry_or_fallback(token: &str, now_unix_ts: u64, fallback_ttl_seconds: u64) -> u64 {
    match decode_expiry(token) {
        Ok(exp) => {
            debug!(expires_at = exp, "jwt parsed successfully");
            exp
        }
        Err(e) => {
            warn!("{}; assuming {}s lifetime", e, fallback_ttl_seconds);
            now_unix_ts + fallback_ttl_seconds
        }
    }
}
