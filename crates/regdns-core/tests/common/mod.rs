//! Test doubles and common utilities for engine contract tests
//!
//! `FakeRegistrar` keeps an in-memory copy of the registrar's state and
//! records every call so tests can assert on what went over the wire.

#![allow(dead_code)]

use regdns_core::error::{Error, Result};
use regdns_core::traits::{Domain, RecordPayload, RegistrarApi, RemoteRecord};
use regdns_core::{PropertyMap, ReconcileEngine};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One recorded API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListDomains,
    ListRecords(String),
    Upsert(String, Vec<RecordPayload>),
    Delete(String, String),
    SetNameservers(String, Vec<String>),
}

#[derive(Default)]
struct State {
    domains: Vec<Domain>,
    records: HashMap<String, Vec<RemoteRecord>>,
    next_id: u64,
    calls: Vec<Call>,
    failure: Option<(u16, String)>,
}

/// An in-memory registrar that tracks calls
#[derive(Clone, Default)]
pub struct FakeRegistrar {
    state: Arc<Mutex<State>>,
}

impl FakeRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain with its current nameservers
    pub fn with_domain(self, id: &str, nameservers: &[&str]) -> Self {
        self.state.lock().unwrap().domains.push(Domain {
            id: id.to_string(),
            domain_name: format!("{id}.test"),
            nameservers: nameservers.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Make every subsequent call fail with the given status and body
    pub fn fail_with(&self, status: u16, body: &str) {
        self.state.lock().unwrap().failure = Some((status, body.to_string()));
    }

    /// Replace a stored record field, simulating out-of-band drift
    pub fn drift(&self, domain_id: &str, record_id: &str, key: &str, value: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get_mut(domain_id)
            .and_then(|records| records.iter_mut().find(|r| r["id"] == json!(record_id)))
            .expect("record exists");
        record.insert(key.to_string(), value);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn records(&self, domain_id: &str) -> Vec<RemoteRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(domain_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn nameservers(&self, domain_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .domains
            .iter()
            .find(|d| d.id == domain_id)
            .map(|d| d.nameservers.clone())
            .unwrap_or_default()
    }

    /// Build an engine backed by this registrar
    pub fn engine(&self) -> ReconcileEngine {
        ReconcileEngine::new(Arc::new(self.clone()))
    }

    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.failure {
            Some((status, body)) => Err(Error::api(*status, body.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RegistrarApi for FakeRegistrar {
    async fn list_domains(&self) -> Result<Vec<Domain>> {
        self.record(Call::ListDomains)?;
        Ok(self.state.lock().unwrap().domains.clone())
    }

    async fn list_records(&self, domain_id: &str) -> Result<Vec<RemoteRecord>> {
        self.record(Call::ListRecords(domain_id.to_string()))?;
        Ok(self.records(domain_id))
    }

    async fn upsert_records(
        &self,
        domain_id: &str,
        records: &[RecordPayload],
    ) -> Result<Vec<RemoteRecord>> {
        self.record(Call::Upsert(domain_id.to_string(), records.to_vec()))?;

        let mut state = self.state.lock().unwrap();
        let mut stored = Vec::new();
        for payload in records {
            let id = match &payload.id {
                Some(id) => id.clone(),
                None => {
                    state.next_id += 1;
                    format!("rec-{}", state.next_id)
                }
            };
            let record = json!({
                "id": id,
                "type": payload.record_type,
                "name": payload.name,
                "value": payload.value,
                "ttl": payload.ttl,
                "prio": null,
            })
            .as_object()
            .cloned()
            .unwrap();

            let zone = state.records.entry(domain_id.to_string()).or_default();
            zone.retain(|r| r["id"] != json!(id));
            zone.push(record.clone());
            stored.push(record);
        }
        Ok(stored)
    }

    async fn delete_record(&self, domain_id: &str, record_id: &str) -> Result<()> {
        self.record(Call::Delete(domain_id.to_string(), record_id.to_string()))?;
        let mut state = self.state.lock().unwrap();
        if let Some(zone) = state.records.get_mut(domain_id) {
            zone.retain(|r| r["id"] != json!(record_id));
        }
        Ok(())
    }

    async fn set_nameservers(&self, domain_id: &str, nameservers: &[String]) -> Result<()> {
        self.record(Call::SetNameservers(
            domain_id.to_string(),
            nameservers.to_vec(),
        ))?;
        let mut state = self.state.lock().unwrap();
        if let Some(domain) = state.domains.iter_mut().find(|d| d.id == domain_id) {
            domain.nameservers = nameservers.to_vec();
        }
        Ok(())
    }
}

pub const DNS_RECORD: &str = "regdns:index:DnsRecord";
pub const NAME_SERVER_SET: &str = "regdns:index:NameServerSet";

/// Declared properties of a typical A record
pub fn www_record(domain_id: &str) -> PropertyMap {
    PropertyMap::new()
        .with("domainId", domain_id)
        .with("type", "A")
        .with("name", "www")
        .with("value", "1.2.3.4")
        .with("ttl", 3600)
}

/// Declared properties of a nameserver set
pub fn name_servers(domain_id: &str, servers: &[&str]) -> PropertyMap {
    PropertyMap::new().with("domainId", domain_id).with(
        "servers",
        servers.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
    )
}
