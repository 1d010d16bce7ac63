//! reqwest implementation of [`RegistrarApi`]
//!
//! The bearer token is installed as a default header when the client is
//! built, so a constructed `HttpRegistrarApi` never changes afterwards and
//! can be shared by concurrent operations.

use async_trait::async_trait;
use regdns_core::traits::{Domain, RecordPayload, RegistrarApi, RemoteRecord};
use regdns_core::{Credential, Error, ProviderConfig, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::{SigningIdentity, authenticate};

/// Wrapper shared by every listing endpoint
#[derive(Debug, Deserialize)]
struct Records<T> {
    records: Vec<T>,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    records: &'a [RecordPayload],
}

#[derive(Debug, Serialize)]
struct NameserversBody<'a> {
    nameservers: &'a [String],
}

/// Accept exactly HTTP 200; anything else becomes `Error::Api` with the body
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    tracing::warn!("Registrar answered {}: {}", status.as_u16(), body);
    Err(Error::api(status.as_u16(), body))
}

fn build_client(timeout: Duration, token: Option<&str>) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::config("API token contains characters not allowed in a header"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("regdns/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))
}

/// Registrar REST API client
///
/// # Security
///
/// The Debug implementation does NOT expose the bearer token; the header
/// value is also marked sensitive.
#[derive(Clone)]
pub struct HttpRegistrarApi {
    base_url: String,
    base: Url,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRegistrarApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistrarApi")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl HttpRegistrarApi {
    /// Build a client that presents an already issued bearer token
    pub fn with_token(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::config("API token cannot be empty"));
        }
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::config(format!("API URL is not a valid base URL: {base_url}")))?;
        Ok(Self {
            base_url,
            base,
            client: build_client(timeout, Some(token))?,
        })
    }

    /// Resolve the configured credential into a ready client
    ///
    /// A private key is exchanged for a token through the challenge/login
    /// handshake first; an API token is used directly.
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let token = match &config.credential {
            Credential::ApiToken(token) => token.clone(),
            Credential::PrivateKey(key) => {
                let identity = SigningIdentity::from_hex(key)?;
                let anonymous = build_client(timeout, None)?;
                authenticate(&anonymous, config.base_url(), &identity).await?
            }
        };

        tracing::info!(
            "Connected to {} using {}",
            config.base_url(),
            config.credential.kind()
        );
        Self::with_token(config.base_url(), &token, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL below `/api/v0/domains`
    ///
    /// Each segment is percent-encoded, so identifiers containing `/`, `?`
    /// or `#` cannot address another endpoint. Dot segments are refused.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(Error::malformed_value(
                "id",
                format!("'{bad}' cannot be used as a path segment"),
            ));
        }

        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| Error::config("API URL cannot carry a path"))?;
            path.pop_if_empty().extend(["api", "v0", "domains"]).extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("{what} failed: {e}")))?;
        check_status(response).await
    }

    async fn records<T: DeserializeOwned>(&self, response: Response, what: &str) -> Result<Vec<T>> {
        let body: Records<T> = response
            .json()
            .await
            .map_err(|e| Error::malformed_response(format!("{what}: {e}")))?;
        Ok(body.records)
    }
}

#[async_trait]
impl RegistrarApi for HttpRegistrarApi {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        let url = self.url(&["domains"])?;
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(url), "domain listing").await?;
        self.records(response, "domain listing").await
    }

    async fn list_records(&self, domain_id: &str) -> Result<Vec<RemoteRecord>> {
        let url = self.url(&[domain_id, "dns", "records"])?;
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(url), "record listing").await?;
        self.records(response, "record listing").await
    }

    async fn upsert_records(
        &self,
        domain_id: &str,
        records: &[RecordPayload],
    ) -> Result<Vec<RemoteRecord>> {
        let url = self.url(&[domain_id, "dns", "records"])?;
        tracing::debug!("POST {} ({} record(s))", url, records.len());
        let request = self.client.post(url).json(&UpsertBody { records });
        let response = self.send(request, "record upsert").await?;
        self.records(response, "record upsert").await
    }

    async fn delete_record(&self, domain_id: &str, record_id: &str) -> Result<()> {
        let url = self.url(&[domain_id, "dns", "records", record_id])?;
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(url), "record deletion").await?;
        Ok(())
    }

    async fn set_nameservers(&self, domain_id: &str, nameservers: &[String]) -> Result<()> {
        let url = self.url(&[domain_id, "nameservers"])?;
        tracing::debug!("PATCH {} -> {:?}", url, nameservers);
        let request = self.client.patch(url).json(&NameserversBody { nameservers });
        self.send(request, "nameserver update").await?;
        Ok(())
    }
}
