//! Error types for the traveler engine
//!
//! Every failure is scoped to a single request. Route handlers translate
//! these into responses with [`TravelerError::into_status_code_and_body`].

use hyper::StatusCode;

/// Main error type for traveler operations
#[derive(Debug, thiserror::Error)]
pub enum TravelerError {
    /// Lookup (local store or directory) produced no match
    #[error("{0} is not found")]
    NotFound(String),

    /// Lookup produced more than one match
    #[error("{0} is not unique")]
    Ambiguous(String),

    /// A sub-resource named in the request (a work, a share entry) is absent
    #[error("{0} not found")]
    Missing(String),

    /// Requested status code is not part of the document's lifecycle
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Requested status change is not a legal edge
    #[error("invalid status change from {from} to {to}")]
    InvalidTransition { from: f64, to: f64 },

    /// The access resolver denied the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No authenticated session
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TravelerError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Lookup misses are caller input problems
            Self::NotFound(_) => StatusCode::BAD_REQUEST,
            Self::Ambiguous(_) => StatusCode::BAD_REQUEST,
            Self::Missing(_) => StatusCode::NOT_FOUND,
            Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::FORBIDDEN,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }

    /// True for the two single-entry lookup failures
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Ambiguous(_))
    }
}

impl From<mongodb::error::Error> for TravelerError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for TravelerError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON encode error: {}", err))
    }
}

impl From<bson::oid::Error> for TravelerError {
    fn from(err: bson::oid::Error) -> Self {
        Self::BadRequest(format!("invalid object id: {}", err))
    }
}

impl From<serde_json::Error> for TravelerError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

/// Result type alias for traveler operations
pub type Result<T> = std::result::Result<T, TravelerError>;
