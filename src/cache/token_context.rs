use crate::cache::token::BearerToken;
use crate::helpers::time::now_u64;

/// Validity of the token a client holds, derived on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoToken,
    TokenValid,
    /// Inside the safety margin (or past expiry): must be refreshed before use.
    TokenExpiring,
}

/// Token held by a client together with the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct TokenContext {
    pub token: BearerToken,
    /// `exp - safety_margin`, unix seconds
    pub refresh_at_unix_ts: u64,
}

impl TokenContext {
    pub fn new(token: BearerToken, safety_margin_seconds: u64) -> Self {
        let refresh_at_unix_ts = token.exp_unix_ts.saturating_sub(safety_margin_seconds);
        Self {
            token,
            refresh_at_unix_ts,
        }
    }

    /// Check if token should be refreshed
    pub fn should_update(&self) -> bool {
        self.should_update_at(now_u64())
    }

    pub fn should_update_at(&self, now_unix_ts: u64) -> bool {
        now_unix_ts >= self.refresh_at_unix_ts
    }

    pub fn seconds_left(&self) -> i64 {
        self.token.exp_unix_ts as i64 - now_u64() as i64
    }
}

pub fn token_state(held: Option<&TokenContext>, now_unix_ts: u64) -> TokenState {
    match held {
        None => TokenState::NoToken,
        Some(ctx) if ctx.should_update_at(now_unix_ts) => TokenState::TokenExpiring,
        Some(_) => TokenState::TokenValid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_follows_margin() {
        let ctx = TokenContext::new(BearerToken::new("abc", 1_000), 60);
        assert_eq!(ctx.refresh_at_unix_ts, 940);
        assert_eq!(token_state(None, 0), TokenState::NoToken);
        assert_eq!(token_state(Some(&ctx), 939), TokenState::TokenValid);
        assert_eq!(token_state(Some(&ctx), 940), TokenState::TokenExpiring);
        assert_eq!(token_state(Some(&ctx), 1_200), TokenState::TokenExpiring);
    }
}
