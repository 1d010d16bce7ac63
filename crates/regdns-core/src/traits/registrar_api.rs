// # Registrar API Trait
//
// The seam between the reconciliation engine and the registrar's REST API.
//
// ## Implementations
//
// - HTTP: `regdns-client` crate (`HttpRegistrarApi`)
// - Tests: recording doubles in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use regdns_core::RegistrarApi;
//
// let records = api.list_records("example.com").await?;
// api.delete_record("example.com", "42").await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// A raw DNS record object as returned by the registrar
pub type RemoteRecord = Map<String, Value>;

/// A domain as returned by the registrar's domain listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Registrar-side domain identifier
    #[serde(deserialize_with = "id_from_json")]
    pub id: String,
    /// Fully qualified domain name
    #[serde(default)]
    pub domain_name: String,
    /// Nameservers currently assigned to the domain
    #[serde(default)]
    pub nameservers: Vec<String>,
}

/// Record body sent to the batch create/update endpoint
///
/// Records without an `id` are created; records carrying one are updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub value: String,
    pub ttl: i64,
}

/// Render a remote identifier as a string
///
/// The registrar may encode identifiers as strings or integers.
pub fn remote_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_from_json<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    remote_id(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier {value}")))
}

/// Trait for registrar API implementations
///
/// One method per remote endpoint. Implementations must:
/// - attach the session credential to every call
/// - treat any status other than HTTP 200 as `Error::Api` carrying status and body
/// - perform exactly one HTTP attempt per call (no retries)
///
/// # Thread Safety
///
/// Implementations are shared across concurrently running operations and
/// must not mutate shared state per call.
#[async_trait]
pub trait RegistrarApi: Send + Sync {
    /// List all domains on the account
    ///
    /// ```http
    /// GET /api/v0/domains/domains
    /// ```
    async fn list_domains(&self) -> Result<Vec<Domain>>;

    /// List all DNS records of a domain
    ///
    /// ```http
    /// GET /api/v0/domains/{domain_id}/dns/records
    /// ```
    async fn list_records(&self, domain_id: &str) -> Result<Vec<RemoteRecord>>;

    /// Create or update a batch of records, returning the stored records
    ///
    /// ```http
    /// POST /api/v0/domains/{domain_id}/dns/records
    /// {"records": [{"id"?, "type", "name", "value", "ttl"}]}
    /// ```
    async fn upsert_records(
        &self,
        domain_id: &str,
        records: &[RecordPayload],
    ) -> Result<Vec<RemoteRecord>>;

    /// Delete a record by identifier
    ///
    /// ```http
    /// DELETE /api/v0/domains/{domain_id}/dns/records/{record_id}
    /// ```
    async fn delete_record(&self, domain_id: &str, record_id: &str) -> Result<()>;

    /// Replace the nameserver list of a domain
    ///
    /// ```http
    /// PATCH /api/v0/domains/{domain_id}/nameservers
    /// {"nameservers": [...]}
    /// ```
    async fn set_nameservers(&self, domain_id: &str, nameservers: &[String]) -> Result<()>;
}
