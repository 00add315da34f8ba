//! Errors raised while constructing the HTTP adapter.

use thiserror::Error;

/// Result alias for adapter construction.
pub type ClientResult<T> = Result<T, ClientError>;

/// Construction-time failures; request failures surface as `RemoteError`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL cannot carry a path.
    #[error("base URL cannot carry API paths")]
    UnsupportedBaseUrl {
        /// Rejected URL.
        url: String,
    },
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client")]
    Build {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}
