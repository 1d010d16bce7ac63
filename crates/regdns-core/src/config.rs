//! Configuration types for regdns
//!
//! The provider is configured once, before any resource operation, with
//! either a raw API token or an Ed25519 private key. When both are supplied
//! the private key wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL of the registrar API
pub const DEFAULT_API_URL: &str = "https://api.regdns.net";

/// Default HTTP timeout for API requests, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credential used to authenticate against the registrar
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Credential {
    /// Pre-issued bearer token, used as-is
    ApiToken(String),
    /// Hex-encoded Ed25519 private key, exchanged for a token at configure time
    PrivateKey(String),
}

impl Credential {
    /// Pick a credential from the two optional sources
    ///
    /// Empty strings count as absent. The private key is preferred.
    pub fn resolve(
        api_token: Option<String>,
        private_key: Option<String>,
    ) -> Result<Self, crate::Error> {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        match (non_empty(api_token), non_empty(private_key)) {
            (_, Some(key)) => Ok(Credential::PrivateKey(key)),
            (Some(token), None) => Ok(Credential::ApiToken(token)),
            (None, None) => Err(crate::Error::config(
                "either an API token or a private key is required",
            )),
        }
    }

    /// Credential kind, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::ApiToken(_) => "api_token",
            Credential::PrivateKey(_) => "private_key",
        }
    }
}

// Custom Debug implementation that hides the secret
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(match self {
            Credential::ApiToken(_) => "ApiToken",
            Credential::PrivateKey(_) => "PrivateKey",
        })
        .field(&"<REDACTED>")
        .finish()
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// How to authenticate
    pub credential: Credential,

    /// Registrar API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Create a configuration with default endpoint and timeout
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Override the API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the HTTP timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_url.is_empty() {
            return Err(crate::Error::config("API URL cannot be empty"));
        }
        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "API URL must use HTTP or HTTPS scheme. Got: {}",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        match &self.credential {
            Credential::ApiToken(token) if token.is_empty() => {
                Err(crate::Error::config("API token cannot be empty"))
            }
            Credential::PrivateKey(key) if key.is_empty() => {
                Err(crate::Error::config("private key cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
