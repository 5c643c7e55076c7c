use serde::{Deserialize, Serialize};

const BEARER_SCHEME: &str = "Bearer ";

/// Bearer credential with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    /// Raw credential, stored without the `Bearer ` scheme.
    pub value: String,
    /// UNIX TIMESTAMP
    pub exp_unix_ts: u64,
}

impl BearerToken {
    pub fn new(value: impl Into<String>, exp_unix_ts: u64) -> Self {
        Self {
            value: strip_bearer_scheme(&value.into()).to_owned(),
            exp_unix_ts,
        }
    }

    /// Usable while `now < exp - safety_margin`.
    pub fn is_usable_at(&self, now_unix_ts: u64, safety_margin_seconds: u64) -> bool {
        now_unix_ts < self.exp_unix_ts.saturating_sub(safety_margin_seconds)
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("{}{}", BEARER_SCHEME, self.value)
    }
}

/// Accepts `Bearer abc`, `bearer abc` or a bare `abc`.
pub fn strip_bearer_scheme(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.get(..BEARER_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_SCHEME) => trimmed[BEARER_SCHEME.len()..].trim_start(),
        _ => trimmed,
    }
}
