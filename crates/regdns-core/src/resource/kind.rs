// # Resource Kinds
//
// The two entity types regdns manages. Type tokens follow the
// `<namespace>:index:<Name>` convention used by the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Namespace prefix of every resource type token
pub const NAMESPACE: &str = "regdns";

/// Property keys of a DNS record
pub mod dns_record {
    pub const DOMAIN_ID: &str = "domainId";
    pub const TYPE: &str = "type";
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";
    pub const TTL: &str = "ttl";
}

/// Property keys of a nameserver set
pub mod name_server_set {
    pub const DOMAIN_ID: &str = "domainId";
    pub const SERVERS: &str = "servers";
}

/// Closed set of manageable resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A single DNS record inside a domain's zone
    DnsRecord,
    /// The nameserver list attached to a domain
    NameServerSet,
}

impl ResourceKind {
    /// All kinds, in schema order
    pub const ALL: [ResourceKind; 2] = [ResourceKind::DnsRecord, ResourceKind::NameServerSet];

    /// Short name used inside the type token
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::DnsRecord => "DnsRecord",
            ResourceKind::NameServerSet => "NameServerSet",
        }
    }

    /// Full type token, e.g. `regdns:index:DnsRecord`
    pub fn token(self) -> String {
        format!("{}:index:{}", NAMESPACE, self.name())
    }

    /// Resolve a type token. Anything but an exact match is an unknown kind.
    pub fn from_token(token: &str) -> Result<Self> {
        let mut parts = token.splitn(3, ':');
        let (Some(namespace), Some("index"), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::unknown_kind(token));
        };
        if namespace != NAMESPACE {
            return Err(Error::unknown_kind(token));
        }

        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::unknown_kind(token))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s)
    }
}
