//! Unified error types for eggcache.
//!
//! The display prefixes double as stable error codes on the MCP surface.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the caching agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown request mode).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The request cannot be used as a cache key (only GET is storable).
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// The response cannot be stored (partial content).
    #[error("UNSUPPORTED_RESPONSE: {0}")]
    UnsupportedResponse(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Stored data could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A core asset could not be fetched or stored during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => -32602,
            Error::InvalidRequest(_) => -32003,
            Error::UnsupportedResponse(_) => -32004,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => -32002,
            Error::Network(_) => -32005,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::InstallFailed { .. } => -32009,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Network("connection refused".to_string());
        assert!(err.to_string().starts_with("NETWORK_ERROR"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_install_failed_display() {
        let err =
            Error::InstallFailed { url: "http://127.0.0.1:5000/static/manifest.json".into(), reason: "status 404".into() };
        assert_eq!(err.to_string(), "INSTALL_FAILED: http://127.0.0.1:5000/static/manifest.json: status 404");
    }

    #[test]
    fn test_install_failed_to_mcp_error() {
        let err =
            Error::InstallFailed { url: "http://127.0.0.1:5000/static/main_icon.webp".into(), reason: "status 404".into() };
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32009);
        assert!(mcp_err.message.starts_with("INSTALL_FAILED"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::InvalidUrl("not a url".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.message.contains("INVALID_URL"));
    }
}
