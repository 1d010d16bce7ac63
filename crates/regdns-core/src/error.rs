//! Error types for regdns
//!
//! Validation problems found by `check` are not errors; they are reported as
//! [`CheckFailure`](crate::resource::CheckFailure) values. Everything here is
//! fatal for the operation that produced it.

use thiserror::Error;

/// Result type alias for regdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for regdns
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The signing key could not be decoded
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// A resource operation arrived before the provider was configured
    #[error("Provider is not configured")]
    NotConfigured,

    /// The type token does not name a known resource kind
    #[error("Unknown resource type: {0}")]
    UnknownKind(String),

    /// The remote service answered with something other than HTTP 200
    #[error("API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// The remote service has no entity with the requested identifier
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote service returned a response that breaks its contract
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A property value has a shape the resource model cannot represent
    #[error("Malformed value for '{key}': {message}")]
    MalformedValue {
        /// Property key
        key: String,
        /// What was wrong with it
        message: String,
    },

    /// A required property is absent from the property map
    #[error("Missing required property '{0}'")]
    MissingProperty(String),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid key error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create an unknown kind error
    pub fn unknown_kind(token: impl Into<String>) -> Self {
        Self::UnknownKind(token.into())
    }

    /// Create a remote API error
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a malformed value error
    pub fn malformed_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a missing property error
    pub fn missing_property(key: impl Into<String>) -> Self {
        Self::MissingProperty(key.into())
    }

    /// Create an HTTP transport error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error should abort startup rather than a single operation
    pub fn is_startup_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidKey(_))
    }
}
