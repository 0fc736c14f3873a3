//! Error types shared by the catalog accessors and the HTTP source

use thiserror::Error;

use crate::cache::CacheError;

/// Errors that can occur while looking up catalog or price data
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Identifier failed validation before any lookup was attempted
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// The upstream source answered but had no usable data
    #[error("No data returned for {kind} {id}")]
    EmptyResponse { kind: String, id: String },

    /// The upstream source refused the request because of its quota
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// A previous rate limit stopped all further fetches for this run
    #[error("Fetching halted after an earlier rate limit")]
    Halted,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status code
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Upstream returned a field we could not interpret
    #[error("Invalid field in response: {0}")]
    InvalidField(String),

    /// Cache persistence failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl CatalogError {
    /// Shorthand for an empty upstream response
    pub fn empty(kind: impl ToString, id: impl ToString) -> Self {
        CatalogError::EmptyResponse {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether this error means no further fetches should be attempted
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, CatalogError::RateLimited(_) | CatalogError::Halted)
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, CatalogError>;
