//! Typed access to the table property sidecar.
//!
//! Every key the codec writes lives under
//! [`PROPERTY_NAMESPACE`](crate::types::PROPERTY_NAMESPACE). Keys that
//! were previously written under another name carry that name as a legacy
//! fallback for reads; writes always use the current name.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::descriptor::PartitionStrategy;
use crate::error::CodecError;
use crate::schema::Schema;
use crate::types::{CompressionType, Format};

/// A value that can be stored as a single property string.
pub trait PropertyValue: Sized {
    fn to_property(&self) -> String;

    /// Parse a stored value; the error is a short reason.
    fn from_property(raw: &str) -> Result<Self, String>;
}

/// A property key bound to its value type.
pub struct PropertyKey<T> {
    name: &'static str,
    legacy_name: Option<&'static str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn legacy_name(&self) -> Option<&'static str> {
        self.legacy_name
    }
}

/// A property key with a declared default applied when the key is absent.
pub struct DefaultedKey<T> {
    pub key: PropertyKey<T>,
    default: fn() -> T,
}

impl<T> DefaultedKey<T> {
    pub fn default_value(&self) -> T {
        (self.default)()
    }
}

/// Codec identifier; absent means the catalog-wide default codec.
pub const COMPRESSION_TYPE: DefaultedKey<CompressionType> = DefaultedKey {
    key: PropertyKey {
        name: "kite.compression.type",
        legacy_name: None,
        _marker: PhantomData,
    },
    default: default_compression,
};

/// Storage container format identifier.
pub const FORMAT: PropertyKey<Format> = PropertyKey {
    name: "kite.format",
    legacy_name: None,
    _marker: PhantomData,
};

/// Location of an externally stored schema definition.
pub const SCHEMA_URL: PropertyKey<Url> = PropertyKey {
    name: "kite.schema.url",
    legacy_name: Some("avro.schema.url"),
    _marker: PhantomData,
};

/// Avro JSON of a schema given inline; kept so decode reproduces it exactly.
pub const SCHEMA_LITERAL: PropertyKey<Schema> = PropertyKey {
    name: "kite.schema.literal",
    legacy_name: Some("avro.schema.literal"),
    _marker: PhantomData,
};

/// Rendered partition strategy.
pub const PARTITION_EXPRESSION: PropertyKey<PartitionStrategy> = PropertyKey {
    name: "kite.partition.expression",
    legacy_name: Some("cdk.partition.expression"),
    _marker: PhantomData,
};

/// Comma-separated names of custom descriptor properties stored alongside.
pub const CUSTOM_PROPERTY_NAMES: DefaultedKey<Vec<String>> = DefaultedKey {
    key: PropertyKey {
        name: "kite.custom.property.names",
        legacy_name: Some("cdk.custom.property.names"),
        _marker: PhantomData,
    },
    default: Vec::new,
};

fn default_compression() -> CompressionType {
    CompressionType::default()
}

/// Whether `name` is a legacy name of a key the codec reads.
pub fn is_legacy_key(name: &str) -> bool {
    [
        COMPRESSION_TYPE.key.legacy_name,
        FORMAT.legacy_name,
        SCHEMA_URL.legacy_name,
        SCHEMA_LITERAL.legacy_name,
        PARTITION_EXPRESSION.legacy_name,
        CUSTOM_PROPERTY_NAMES.key.legacy_name,
    ]
    .into_iter()
    .flatten()
    .any(|legacy| legacy == name)
}

/// String-keyed table properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a typed property, falling back to the legacy key name.
    pub fn get<T: PropertyValue>(&self, key: &PropertyKey<T>) -> Result<Option<T>, CodecError> {
        let (stored_under, raw) = match self.lookup(key) {
            Some(found) => found,
            None => return Ok(None),
        };
        T::from_property(raw)
            .map(Some)
            .map_err(|reason| CodecError::InvalidProperty {
                key: stored_under.to_string(),
                value: raw.to_string(),
                reason,
            })
    }

    /// Read a typed property, applying the key's declared default if absent.
    pub fn get_or_default<T: PropertyValue>(&self, key: &DefaultedKey<T>) -> Result<T, CodecError> {
        match self.get(&key.key)? {
            Some(value) => Ok(value),
            None => {
                debug!(key = key.key.name, "property absent, using declared default");
                Ok(key.default_value())
            }
        }
    }

    /// Write a typed property under its current key name, dropping any legacy copy.
    pub fn set<T: PropertyValue>(&mut self, key: &PropertyKey<T>, value: &T) {
        if let Some(legacy) = key.legacy_name {
            self.0.remove(legacy);
        }
        self.0.insert(key.name.to_string(), value.to_property());
    }

    /// Remove a property under both its current and legacy names.
    pub fn remove<T>(&mut self, key: &PropertyKey<T>) -> Option<String> {
        let legacy = key.legacy_name.and_then(|legacy| self.0.remove(legacy));
        self.0.remove(key.name).or(legacy)
    }

    pub fn contains<T>(&self, key: &PropertyKey<T>) -> bool {
        self.lookup(key).is_some()
    }

    /// Raw string stored under a key, by current or legacy name.
    pub fn get_str<T>(&self, key: &PropertyKey<T>) -> Option<&str> {
        self.lookup(key).map(|(_, raw)| raw)
    }

    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert_raw(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn remove_raw(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn lookup<T>(&self, key: &PropertyKey<T>) -> Option<(&'static str, &str)> {
        if let Some(raw) = self.0.get(key.name) {
            return Some((key.name, raw.as_str()));
        }
        let legacy = key.legacy_name?;
        let raw = self.0.get(legacy)?;
        warn!(key = key.name, legacy, "reading property from legacy key");
        Some((legacy, raw.as_str()))
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PropertyValue for CompressionType {
    fn to_property(&self) -> String {
        self.name().to_string()
    }

    fn from_property(raw: &str) -> Result<Self, String> {
        raw.parse().map_err(|e| format!("{e}"))
    }
}

impl PropertyValue for Format {
    fn to_property(&self) -> String {
        self.name().to_string()
    }

    fn from_property(raw: &str) -> Result<Self, String> {
        raw.parse().map_err(|e| format!("{e}"))
    }
}

impl PropertyValue for Url {
    fn to_property(&self) -> String {
        self.as_str().to_string()
    }

    fn from_property(raw: &str) -> Result<Self, String> {
        Url::parse(raw).map_err(|e| e.to_string())
    }
}

impl PropertyValue for Vec<String> {
    fn to_property(&self) -> String {
        self.join(",")
    }

    fn from_property(raw: &str) -> Result<Self, String> {
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl PropertyValue for Schema {
    fn to_property(&self) -> String {
        self.to_json().to_string()
    }

    fn from_property(raw: &str) -> Result<Self, String> {
        Schema::parse_str(raw).map_err(|e| e.to_string())
    }
}

impl PropertyValue for PartitionStrategy {
    fn to_property(&self) -> String {
        self.to_expression()
    }

    fn from_property(raw: &str) -> Result<Self, String> {
        PartitionStrategy::parse_expression(raw).map_err(|e| format!("{e}"))
    }
}
