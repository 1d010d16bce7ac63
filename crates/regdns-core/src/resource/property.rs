// # Property Maps
//
// Typed representation of a resource's declared or observed state. Values
// are converted from wire JSON at the boundary; shapes the model cannot
// represent are rejected there instead of deep inside the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::CheckFailure;
use crate::{Error, Result};

/// Largest float magnitude below which every integral value is exact (2^53)
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// A single property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Plain string
    String(String),
    /// Integer
    Int(i64),
    /// Ordered list of strings
    StringList(Vec<String>),
}

impl PropertyValue {
    /// Convert a wire JSON value supplied by the host
    ///
    /// Accepts strings, integral numbers and arrays whose elements are all
    /// strings. Hosts that encode numbers as doubles send `3600.0`, which
    /// is taken as the integer it denotes. Booleans, nulls, fractional or
    /// out-of-range floats, objects and mixed arrays are rejected.
    pub fn from_json(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT)
                        .map(|f| f as i64)
                })
                .map(Self::Int)
                .ok_or_else(|| Error::malformed_value(key, format!("{n} is not an integer"))),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::malformed_value(key, "array elements must be strings")
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::StringList),
            other => Err(Error::malformed_value(
                key,
                format!("unsupported JSON value {other}"),
            )),
        }
    }

    /// Convert a scalar read back from the remote service
    ///
    /// Only strings and integers that fit in 32 bits are valid; anything
    /// else means the remote service broke its contract.
    pub fn from_remote_scalar(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(|v| Self::Int(i64::from(v)))
                .ok_or_else(|| {
                    Error::malformed_value(key, format!("{n} is not a 32-bit integer"))
                }),
            other => Err(Error::malformed_value(
                key,
                format!("unexpected remote value {other}"),
            )),
        }
    }

    /// Wire JSON form
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Int(i) => Value::from(*i),
            Self::StringList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            Self::StringList(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        Self::StringList(items)
    }
}

/// Ordered, string-keyed property map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a wire JSON object. `null` is treated as an empty map.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(object) => object
                .iter()
                .map(|(key, value)| -> Result<(String, PropertyValue)> {
                    Ok((key.clone(), PropertyValue::from_json(key, value)?))
                })
                .collect(),
            other => Err(Error::malformed_value(
                "<properties>",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Convert a wire JSON object, setting aside values the model cannot
    /// represent
    ///
    /// Each rejected key is left out of the map and reported as a
    /// [`CheckFailure`] on that key. Only a non-object input is an error.
    pub fn from_json_partial(value: &Value) -> Result<(Self, Vec<CheckFailure>)> {
        let object = match value {
            Value::Null => return Ok((Self::new(), Vec::new())),
            Value::Object(object) => object,
            other => {
                return Err(Error::malformed_value(
                    "<properties>",
                    format!("expected an object, got {other}"),
                ));
            }
        };

        let mut map = Self::new();
        let mut rejected = Vec::new();
        for (key, value) in object {
            match PropertyValue::from_json(key, value) {
                Ok(value) => map.insert(key.clone(), value),
                Err(Error::MalformedValue { message, .. }) => {
                    rejected.push(CheckFailure::new(key.clone(), message))
                }
                Err(other) => rejected.push(CheckFailure::new(key.clone(), other.to_string())),
            }
        }
        Ok((map, rejected))
    }

    /// Wire JSON form
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `news` on top of `olds`: keys in `news` win, keys only in
    /// `olds` are kept.
    pub fn merge(olds: &PropertyMap, news: &PropertyMap) -> PropertyMap {
        let mut merged = olds.clone();
        for (key, value) in &news.0 {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// String property that must be present
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::missing_property(key))?
            .as_str()
            .ok_or_else(|| Error::malformed_value(key, "expected a string"))
    }

    /// Integer property that must be present
    pub fn require_int(&self, key: &str) -> Result<i64> {
        self.get(key)
            .ok_or_else(|| Error::missing_property(key))?
            .as_int()
            .ok_or_else(|| Error::malformed_value(key, "expected an integer"))
    }

    /// String-list property that must be present
    pub fn require_string_list(&self, key: &str) -> Result<&[String]> {
        self.get(key)
            .ok_or_else(|| Error::missing_property(key))?
            .as_string_list()
            .ok_or_else(|| Error::malformed_value(key, "expected a list of strings"))
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_supported_json_shapes() {
        let map = PropertyMap::from_json(&json!({
            "name": "www",
            "ttl": 3600,
            "servers": ["ns1.example.net", "ns2.example.net"],
        }))
        .unwrap();

        assert_eq!(map.require_str("name").unwrap(), "www");
        assert_eq!(map.require_int("ttl").unwrap(), 3600);
        assert_eq!(
            map.require_string_list("servers").unwrap(),
            ["ns1.example.net", "ns2.example.net"]
        );
        assert_eq!(map.to_json()["ttl"], json!(3600));
    }

    #[test]
    fn rejects_unsupported_json_shapes() {
        for bad in [
            json!({"flag": true}),
            json!({"ttl": 1.5}),
            json!({"nested": {"a": 1}}),
            json!({"mixed": ["a", 1]}),
            json!({"nothing": null}),
        ] {
            let err = PropertyMap::from_json(&bad).unwrap_err();
            assert!(matches!(err, Error::MalformedValue { .. }), "{bad}");
        }
        assert!(PropertyMap::from_json(&json!([1, 2])).is_err());
        assert!(PropertyMap::from_json(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn integral_floats_are_integers() {
        assert_eq!(
            PropertyValue::from_json("ttl", &json!(3600.0)).unwrap(),
            PropertyValue::Int(3600)
        );
        for bad in [json!(1.5), json!(1e20), json!(-0.25)] {
            assert!(PropertyValue::from_json("ttl", &bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn partial_conversion_sets_aside_bad_keys() {
        let (map, rejected) = PropertyMap::from_json_partial(&json!({
            "name": "www",
            "ttl": 1.5,
            "flag": true,
        }))
        .unwrap();

        assert_eq!(map, PropertyMap::new().with("name", "www"));
        let keys: Vec<_> = rejected.iter().map(|f| f.property.as_str()).collect();
        assert_eq!(keys, ["flag", "ttl"]);
        assert!(rejected[1].reason.contains("not an integer"));

        assert!(PropertyMap::from_json_partial(&json!("x")).is_err());
        assert!(PropertyMap::from_json_partial(&Value::Null).unwrap().0.is_empty());
    }

    #[test]
    fn remote_scalars_must_be_strings_or_i32() {
        assert_eq!(
            PropertyValue::from_remote_scalar("ttl", &json!(86400)).unwrap(),
            PropertyValue::Int(86400)
        );
        assert_eq!(
            PropertyValue::from_remote_scalar("value", &json!("1.2.3.4")).unwrap(),
            PropertyValue::from("1.2.3.4")
        );
        assert!(PropertyValue::from_remote_scalar("ttl", &json!(5_000_000_000_i64)).is_err());
        assert!(PropertyValue::from_remote_scalar("ttl", &json!(1.5)).is_err());
        assert!(PropertyValue::from_remote_scalar("value", &json!(["x"])).is_err());
        assert!(PropertyValue::from_remote_scalar("value", &json!(false)).is_err());
    }

    #[test]
    fn merge_prefers_new_values() {
        let olds = PropertyMap::new().with("a", 1).with("b", 2);
        let news = PropertyMap::new().with("b", 3);

        let merged = PropertyMap::merge(&olds, &news);
        assert_eq!(merged, PropertyMap::new().with("a", 1).with("b", 3));
    }

    #[test]
    fn require_reports_missing_and_mistyped() {
        let map = PropertyMap::new().with("ttl", "soon");
        assert!(matches!(
            map.require_str("name"),
            Err(Error::MissingProperty(ref k)) if k == "name"
        ));
        assert!(matches!(
            map.require_int("ttl"),
            Err(Error::MalformedValue { ref key, .. }) if key == "ttl"
        ));
    }

    #[test]
    fn keys_are_ordered() {
        let map = PropertyMap::new().with("value", "x").with("domainId", "d").with("ttl", 3600);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["domainId", "ttl", "value"]);
    }
}
