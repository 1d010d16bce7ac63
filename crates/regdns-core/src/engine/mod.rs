//! Reconciliation engine
//!
//! The `ReconcileEngine` implements the resource lifecycle for every
//! [`ResourceKind`]:
//! - `check`: validate declared inputs (advisory, never fatal)
//! - `diff`: decide whether recorded and declared state differ
//! - `create` / `update` / `delete`: push declared state to the registrar
//! - `read`: pull the registrar's current truth back into a property map
//!
//! ## Architecture
//!
//! ```text
//!   host request (type token + property maps)
//!                     │
//!                     ▼
//!          ┌──────────────────────┐
//!          │   ReconcileEngine    │── ResourceKind::from_token (unknown → fatal)
//!          └──────────────────────┘
//!                     │ exhaustive match on kind
//!                     ▼
//!          ┌──────────────────────┐
//!          │ dyn RegistrarApi     │── one HTTP call per step, no retries
//!          └──────────────────────┘
//! ```
//!
//! The engine owns no state. Operations are independent futures and may run
//! concurrently; ordering between operations on the same identifier is the
//! registrar's concern.

pub mod schema;

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::resource::kind::{dns_record, name_server_set};
use crate::resource::{
    CheckResult, CreateResult, DiffResult, PropertyMap, PropertyValue, ReadResult, ResourceKind,
    check_ttl,
};
use crate::traits::{RecordPayload, RegistrarApi, RemoteRecord, remote_id};

pub use schema::schema;

/// Core reconciliation engine
///
/// Cheap to clone; clones share the underlying API client.
#[derive(Clone)]
pub struct ReconcileEngine {
    api: Arc<dyn RegistrarApi>,
}

impl std::fmt::Debug for ReconcileEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileEngine").finish_non_exhaustive()
    }
}

impl ReconcileEngine {
    /// Create an engine driving the given registrar API
    pub fn new(api: Arc<dyn RegistrarApi>) -> Self {
        Self { api }
    }

    /// Validate declared inputs
    ///
    /// Failures are advisory and returned alongside the inputs; only an
    /// unknown type token is fatal.
    pub fn check(&self, token: &str, news: PropertyMap) -> Result<CheckResult> {
        let kind = ResourceKind::from_token(token)?;
        let failures = match kind {
            ResourceKind::DnsRecord => check_ttl(&news).into_iter().collect(),
            ResourceKind::NameServerSet => Vec::new(),
        };

        if !failures.is_empty() {
            debug!("{} check reported {} failure(s)", kind, failures.len());
        }

        Ok(CheckResult {
            inputs: news,
            failures,
        })
    }

    /// Validate declared inputs straight from wire JSON
    ///
    /// Values the property model cannot represent are reported as failures
    /// on their key instead of aborting, so a non-integer `ttl` yields the
    /// same single `ttl` failure as an out-of-range one.
    pub fn check_json(&self, token: &str, news: &Value) -> Result<CheckResult> {
        ResourceKind::from_token(token)?;
        let (news, mut failures) = PropertyMap::from_json_partial(news)?;

        let mut checked = self.check(token, news)?;
        checked
            .failures
            .retain(|failure| !failures.iter().any(|r| r.property == failure.property));
        failures.append(&mut checked.failures);
        checked.failures = failures;
        Ok(checked)
    }

    /// Compare recorded and declared state
    ///
    /// Every key of `news` that is absent from `olds` or carries a different
    /// value is reported as forcing a replacement. Keys dropped from `news`
    /// are not reported.
    pub fn diff(&self, token: &str, olds: &PropertyMap, news: &PropertyMap) -> Result<DiffResult> {
        let kind = ResourceKind::from_token(token)?;
        let replaces = match kind {
            ResourceKind::DnsRecord | ResourceKind::NameServerSet => changed_keys(olds, news),
        };

        debug!("{} diff: {} key(s) force replacement", kind, replaces.len());
        Ok(DiffResult {
            changed: !replaces.is_empty(),
            replaces,
        })
    }

    /// Create a resource instance at the registrar
    pub async fn create(&self, token: &str, props: PropertyMap) -> Result<CreateResult> {
        let kind = ResourceKind::from_token(token)?;
        let id = match kind {
            ResourceKind::DnsRecord => {
                let domain_id = props.require_str(dns_record::DOMAIN_ID)?;
                let payload = record_payload(None, &props)?;
                let stored = self.api.upsert_records(domain_id, &[payload]).await?;

                let first = stored.first().ok_or_else(|| {
                    Error::malformed_response("record creation returned no records")
                })?;
                first.get("id").and_then(remote_id).ok_or_else(|| {
                    Error::malformed_response("created record has no usable id")
                })?
            }
            ResourceKind::NameServerSet => {
                let domain_id = props.require_str(name_server_set::DOMAIN_ID)?;
                let servers = props.require_string_list(name_server_set::SERVERS)?;
                self.api.set_nameservers(domain_id, servers).await?;
                uuid::Uuid::new_v4().to_string()
            }
        };

        info!("Created {} {}", kind, id);
        Ok(CreateResult {
            id,
            properties: props,
        })
    }

    /// Update a resource instance in place at the registrar
    ///
    /// DNS records send `olds` merged with `news`; nameserver sets send
    /// `news` alone. The returned map is exactly what was sent.
    pub async fn update(
        &self,
        token: &str,
        id: &str,
        olds: &PropertyMap,
        news: &PropertyMap,
    ) -> Result<PropertyMap> {
        let kind = ResourceKind::from_token(token)?;
        let properties = match kind {
            ResourceKind::DnsRecord => {
                let merged = PropertyMap::merge(olds, news);
                let domain_id = merged.require_str(dns_record::DOMAIN_ID)?;
                let payload = record_payload(Some(id), &merged)?;
                self.api.upsert_records(domain_id, &[payload]).await?;
                merged
            }
            ResourceKind::NameServerSet => {
                let domain_id = news.require_str(name_server_set::DOMAIN_ID)?;
                let servers = news.require_string_list(name_server_set::SERVERS)?;
                self.api.set_nameservers(domain_id, servers).await?;
                news.clone()
            }
        };

        info!("Updated {} {}", kind, id);
        Ok(properties)
    }

    /// Remove a resource instance
    ///
    /// Nameserver sets have no remote lifecycle; deleting one never touches
    /// the registrar and the domain keeps its last nameservers.
    pub async fn delete(&self, token: &str, id: &str, props: &PropertyMap) -> Result<()> {
        let kind = ResourceKind::from_token(token)?;
        match kind {
            ResourceKind::DnsRecord => {
                let domain_id = props.require_str(dns_record::DOMAIN_ID)?;
                self.api.delete_record(domain_id, id).await?;
                info!("Deleted {} {}", kind, id);
            }
            ResourceKind::NameServerSet => {
                debug!("Delete of {} {} is a no-op", kind, id);
            }
        }
        Ok(())
    }

    /// Refresh a resource instance from the registrar
    pub async fn read(&self, token: &str, id: &str, props: &PropertyMap) -> Result<ReadResult> {
        let kind = ResourceKind::from_token(token)?;
        let properties = match kind {
            ResourceKind::DnsRecord => {
                let domain_id = props.require_str(dns_record::DOMAIN_ID)?;
                let records = self.api.list_records(domain_id).await?;
                let record = records
                    .iter()
                    .find(|record| record.get("id").and_then(remote_id).as_deref() == Some(id))
                    .ok_or_else(|| {
                        Error::not_found(format!("DNS record {id} in domain {domain_id}"))
                    })?;
                project_record(props, record)?
            }
            ResourceKind::NameServerSet => {
                let domain_id = props.require_str(name_server_set::DOMAIN_ID)?;
                let domains = self.api.list_domains().await?;
                let domain = domains
                    .into_iter()
                    .find(|domain| domain.id == domain_id)
                    .ok_or_else(|| Error::not_found(format!("domain {domain_id}")))?;

                PropertyMap::new()
                    .with(name_server_set::DOMAIN_ID, domain.id)
                    .with(name_server_set::SERVERS, domain.nameservers)
            }
        };

        debug!("Read {} {}", kind, id);
        Ok(ReadResult {
            id: id.to_string(),
            properties,
        })
    }
}

/// Keys of `news` that are new or changed relative to `olds`, in key order
fn changed_keys(olds: &PropertyMap, news: &PropertyMap) -> Vec<String> {
    news.iter()
        .filter(|(key, value)| olds.get(key) != Some(*value))
        .map(|(key, _)| key.to_string())
        .collect()
}

fn record_payload(id: Option<&str>, props: &PropertyMap) -> Result<RecordPayload> {
    Ok(RecordPayload {
        id: id.map(str::to_string),
        record_type: props.require_str(dns_record::TYPE)?.to_string(),
        name: props.require_str(dns_record::NAME)?.to_string(),
        value: props.require_str(dns_record::VALUE)?.to_string(),
        ttl: props.require_int(dns_record::TTL)?,
    })
}

/// Overlay the remote record on the caller's map
///
/// Only keys the caller already declared are refreshed; remote-only fields
/// such as `id` are never introduced.
fn project_record(props: &PropertyMap, record: &RemoteRecord) -> Result<PropertyMap> {
    props
        .iter()
        .map(|(key, declared)| -> Result<(String, PropertyValue)> {
            let value = match record.get(key) {
                Some(remote) => PropertyValue::from_remote_scalar(key, remote)?,
                None => declared.clone(),
            };
            Ok((key.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn changed_keys_ignores_removed_and_equal() {
        let olds = PropertyMap::new().with("a", 1).with("b", 2).with("c", 3);
        let news = PropertyMap::new().with("a", 1).with("b", 5).with("d", "x");
        assert_eq!(changed_keys(&olds, &news), ["b", "d"]);
        assert!(changed_keys(&news, &news).is_empty());
    }

    #[test]
    fn projection_keeps_declared_keys_only() {
        let props = PropertyMap::new()
            .with("domainId", "example.com")
            .with("name", "www")
            .with("ttl", 3600);
        let record = json!({"id": 12, "name": "www2", "ttl": 7200, "value": "1.2.3.4"});

        let projected = project_record(&props, record.as_object().unwrap()).unwrap();
        assert_eq!(
            projected,
            PropertyMap::new()
                .with("domainId", "example.com")
                .with("name", "www2")
                .with("ttl", 7200)
        );
    }

    #[test]
    fn projection_rejects_unexpected_json() {
        let props = PropertyMap::new().with("ttl", 3600);
        let record = json!({"ttl": {"seconds": 3600}});
        let err = project_record(&props, record.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::MalformedValue { ref key, .. } if key == "ttl"));
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl RegistrarApi for Unreachable {
        async fn list_domains(&self) -> Result<Vec<crate::traits::Domain>> {
            unreachable!()
        }
        async fn list_records(&self, _: &str) -> Result<Vec<RemoteRecord>> {
            unreachable!()
        }
        async fn upsert_records(&self, _: &str, _: &[RecordPayload]) -> Result<Vec<RemoteRecord>> {
            unreachable!()
        }
        async fn delete_record(&self, _: &str, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn set_nameservers(&self, _: &str, _: &[String]) -> Result<()> {
            unreachable!()
        }
    }

    #[test]
    fn check_json_reports_unrepresentable_ttl_once() {
        let engine = ReconcileEngine::new(Arc::new(Unreachable));
        let token = ResourceKind::DnsRecord.token();

        for ttl in [json!(1.5), json!(1e20), json!(true), json!(null), json!("3600")] {
            let checked = engine
                .check_json(&token, &json!({"name": "www", "ttl": ttl}))
                .unwrap();
            assert_eq!(checked.failures.len(), 1, "{ttl}");
            assert_eq!(checked.failures[0].property, "ttl");
            assert_eq!(checked.inputs.get("name"), Some(&PropertyValue::from("www")));
        }

        let checked = engine.check_json(&token, &json!({"ttl": 3600.0})).unwrap();
        assert!(checked.failures.is_empty());
        assert_eq!(checked.inputs.require_int("ttl").unwrap(), 3600);

        assert!(matches!(
            engine.check_json("regdns:index:Nope", &json!({})),
            Err(Error::UnknownKind(_))
        ));
    }

    #[test]
    fn payload_requires_record_fields() {
        let props = PropertyMap::new().with("type", "A").with("name", "www").with("ttl", 3600);
        assert!(matches!(
            record_payload(None, &props),
            Err(Error::MissingProperty(ref k)) if k == "value"
        ));
    }
}
