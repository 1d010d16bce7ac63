// # Schema
//
// Static description of the resource kinds advertised to the host.

use serde_json::{Value, json};

use crate::resource::ResourceKind;
use crate::resource::kind::{NAMESPACE, dns_record, name_server_set};

/// Version reported to the host
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn kind_schema(kind: ResourceKind) -> Value {
    match kind {
        ResourceKind::DnsRecord => json!({
            "description": "A DNS record in a registrar-hosted zone",
            "inputProperties": {
                (dns_record::DOMAIN_ID): {"type": "string", "description": "Registrar domain identifier"},
                (dns_record::TYPE): {"type": "string", "description": "Record type, e.g. A, CNAME, TXT"},
                (dns_record::NAME): {"type": "string", "description": "Record name relative to the domain"},
                (dns_record::VALUE): {"type": "string", "description": "Record content"},
                (dns_record::TTL): {"type": "integer", "description": "Time to live in seconds (3600..=2592001)"},
            },
            "requiredInputs": [
                dns_record::DOMAIN_ID,
                dns_record::TYPE,
                dns_record::NAME,
                dns_record::VALUE,
                dns_record::TTL,
            ],
        }),
        ResourceKind::NameServerSet => json!({
            "description": "The nameservers assigned to a registrar domain",
            "inputProperties": {
                (name_server_set::DOMAIN_ID): {"type": "string", "description": "Registrar domain identifier"},
                (name_server_set::SERVERS): {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Ordered nameserver host names",
                },
            },
            "requiredInputs": [name_server_set::DOMAIN_ID, name_server_set::SERVERS],
        }),
    }
}

/// Describe every resource kind and the provider version. No I/O.
pub fn schema() -> Value {
    let resources: serde_json::Map<String, Value> = ResourceKind::ALL
        .into_iter()
        .map(|kind| (kind.token(), kind_schema(kind)))
        .collect();

    json!({
        "name": NAMESPACE,
        "version": VERSION,
        "resources": resources,
    })
}
