use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatchError>;

/// Failures surfaced by the token lifecycle, the search client and the
/// collaborators around them.
#[derive(Debug, Error)]
pub enum WatchError {
    /// No outbound request carried a bearer credential inside the wait window.
    #[error("bearer token not found during page load")]
    TokenNotFound,

    /// The token's claims could not be read. Recovered by the client with the
    /// fallback lifetime, never surfaced from it.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("search request failed: {status}, {body}")]
    RequestFailed { status: StatusCode, body: String },

    #[error("product '{0}' not found")]
    ProductNotFound(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("browser automation failed: {0}")]
    Browser(String),

    #[error("watchlist error: {0}")]
    Watchlist(#[from] WatchlistError),

    #[error("email error: {0}")]
    Email(String),

    #[error("config error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("product id {0} already in watchlist")]
    AlreadyExists(String),

    #[error("watchlist io: {0}")]
    Io(#[from] std::io::Error),

    #[error("watchlist format: {0}")]
    Format(#[from] serde_json::Error),
}

impl From<chromiumoxide::error::CdpError> for WatchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        WatchError::Browser(err.to_string())
    }
}

impl From<lettre::error::Error> for WatchError {
    fn from(err: lettre::error::Error) -> Self {
        WatchError::Email(err.to_string())
    }
}

impl From<lettre::address::AddressError> for WatchError {
    fn from(err: lettre::address::AddressError) -> Self {
        WatchError::Email(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for WatchError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        WatchError::Email(err.to_string())
    }
}
