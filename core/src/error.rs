//! Error types for the cycle API client.
//!
//! # Design
//! `ApiError` is a closed set: every failed call maps to exactly one
//! variant. `Unauthorized` is split out of the 4xx range because callers
//! react to it (session expiry) differently from other client errors.
//! Non-success response bodies are not carried; the status code is the only
//! server-provided detail.
//!
//! `Display` is diagnostic and includes underlying messages. The copy shown
//! to users lives in `ApiError::user_message`.

use thiserror::Error;

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Base address plus path did not form a valid absolute URL.
    #[error("invalid request address")]
    InvalidAddress,

    /// The transport returned something that was not a well-formed HTTP response.
    #[error("invalid HTTP response")]
    InvalidResponse,

    /// The server returned 401.
    #[error("unauthorized")]
    Unauthorized,

    /// The server returned a 4xx status other than 401.
    #[error("client error: HTTP {0}")]
    ClientError(u16),

    /// The server returned a 5xx status.
    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// The server returned a status outside every classified range.
    #[error("unexpected status code: HTTP {0}")]
    UnexpectedStatus(u16),

    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("network request failed: {0}")]
    NetworkFailed(String),

    /// A success response body did not match the expected shape.
    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    /// The request body could not be serialized to JSON.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// Unreachable classification branch.
    #[error("unknown error")]
    Unknown,
}

impl ApiError {
    /// Human-readable message for display next to the failed action.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidAddress => "The server URL is invalid.".to_string(),
            ApiError::InvalidResponse => "The server returned an invalid response.".to_string(),
            ApiError::Unauthorized => {
                "Authentication failed. Please check your credentials.".to_string()
            }
            ApiError::ClientError(code) => {
                format!("There was a problem with your request (Error: {code}).")
            }
            ApiError::ServerError(code) => format!(
                "The server encountered an error (Error: {code}). Please try again later."
            ),
            ApiError::UnexpectedStatus(code) => {
                format!("The server returned an unexpected status code: {code}.")
            }
            ApiError::NetworkFailed(_) => {
                "Please check your internet connection and try again.".to_string()
            }
            ApiError::DecodingFailed(_) => {
                "There was an issue processing data from the server.".to_string()
            }
            ApiError::EncodingFailed(_) => {
                "There was an issue sending data to the server.".to_string()
            }
            ApiError::Unknown => "An unknown error occurred.".to_string(),
        }
    }

    /// True for `ClientError(404)`, which some lookups treat as "not created yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ClientError(404))
    }
}
