//! Resource model
//!
//! - [`ResourceKind`]: the closed set of manageable entity types
//! - [`PropertyMap`] / [`PropertyValue`]: typed declared or observed state
//! - Operation results returned by the [`ReconcileEngine`](crate::ReconcileEngine)

pub mod kind;
pub mod property;

pub use kind::{NAMESPACE, ResourceKind};
pub use property::{PropertyMap, PropertyValue};

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Smallest TTL the registrar accepts, in seconds
pub const MIN_TTL: i64 = 3600;

/// Largest TTL the registrar accepts, in seconds
pub const MAX_TTL: i64 = 2_592_001;

/// Closed range of accepted TTL values
pub const TTL_RANGE: RangeInclusive<i64> = MIN_TTL..=MAX_TTL;

/// A single advisory validation failure produced by `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// Offending property key
    pub property: String,
    /// Human-readable reason
    pub reason: String,
}

impl CheckFailure {
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of `check`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Inputs as they should be recorded
    pub inputs: PropertyMap,
    /// Validation failures; empty when the inputs are acceptable
    pub failures: Vec<CheckFailure>,
}

/// Outcome of `diff`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Whether anything changed
    pub changed: bool,
    /// Keys whose change forces a replacement, in key order
    pub replaces: Vec<String>,
}

/// Outcome of `create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResult {
    /// External identifier of the new instance
    pub id: String,
    /// Properties recorded for the instance
    pub properties: PropertyMap,
}

/// Outcome of `read`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResult {
    /// External identifier of the instance
    pub id: String,
    /// Refreshed properties
    pub properties: PropertyMap,
}

/// Validate a DNS record TTL
///
/// Returns a failure tagged `ttl` when the value is missing, not an integer,
/// or outside [`TTL_RANGE`].
pub fn check_ttl(props: &PropertyMap) -> Option<CheckFailure> {
    let key = kind::dns_record::TTL;
    match props.get(key) {
        None => Some(CheckFailure::new(key, "ttl is required")),
        Some(value) => match value.as_int() {
            None => Some(CheckFailure::new(key, "ttl must be an integer")),
            Some(ttl) if !TTL_RANGE.contains(&ttl) => Some(CheckFailure::new(
                key,
                format!("ttl must be between {MIN_TTL} and {MAX_TTL} seconds, got {ttl}"),
            )),
            Some(_) => None,
        },
    }
}
