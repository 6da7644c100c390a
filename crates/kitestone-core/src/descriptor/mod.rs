//! Dataset descriptors: the immutable logical description of a dataset.

pub mod partition;

use std::collections::BTreeMap;

use url::Url;

use crate::error::{DescriptorError, Error};
use crate::io::resolver::SchemaResolver;
use crate::schema::Schema;
use crate::types::{CompressionType, Format, is_reserved_property};

pub use partition::{FieldPartitioner, PartitionKind, PartitionStrategy};

/// Schema, storage location, format, compression and partitioning of a dataset.
///
/// Built once through [`DescriptorBuilder`]; an update is a new descriptor,
/// usually derived with [`DatasetDescriptor::to_builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    schema: Schema,
    schema_uri: Option<Url>,
    location: Option<Url>,
    format: Format,
    compression_type: CompressionType,
    partition_strategy: Option<PartitionStrategy>,
    properties: BTreeMap<String, String>,
}

impl DatasetDescriptor {
    pub fn builder() -> DescriptorBuilder {
        DescriptorBuilder::default()
    }

    /// A builder pre-populated with this descriptor's values.
    pub fn to_builder(&self) -> DescriptorBuilder {
        DescriptorBuilder {
            schema: Some(self.schema.clone()),
            schema_uri: self.schema_uri.clone(),
            location: self.location.clone(),
            format: Some(self.format),
            compression_type: Some(self.compression_type),
            partition_strategy: self.partition_strategy.clone(),
            properties: self.properties.clone(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The URI the schema was loaded from, if it was not given inline.
    pub fn schema_uri(&self) -> Option<&Url> {
        self.schema_uri.as_ref()
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }

    pub fn partition_strategy(&self) -> Option<&PartitionStrategy> {
        self.partition_strategy.as_ref()
    }

    pub fn is_partitioned(&self) -> bool {
        self.partition_strategy
            .as_ref()
            .is_some_and(|strategy| !strategy.is_empty())
    }

    /// Custom key/value properties attached by the dataset's owner.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Builder for [`DatasetDescriptor`].
#[derive(Debug, Default, Clone)]
pub struct DescriptorBuilder {
    schema: Option<Schema>,
    schema_uri: Option<Url>,
    location: Option<Url>,
    format: Option<Format>,
    compression_type: Option<CompressionType>,
    partition_strategy: Option<PartitionStrategy>,
    properties: BTreeMap<String, String>,
}

impl DescriptorBuilder {
    /// Set an inline schema. Clears any schema URI set earlier.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self.schema_uri = None;
        self
    }

    /// Load the schema from `uri` and remember where it came from.
    pub fn schema_uri(self, resolver: &dyn SchemaResolver, uri: Url) -> Result<Self, Error> {
        let schema = resolver.resolve(&uri)?;
        Ok(self.resolved_schema_uri(uri, schema))
    }

    /// Set a schema that was already resolved from `uri`.
    pub(crate) fn resolved_schema_uri(mut self, uri: Url, schema: Schema) -> Self {
        self.schema = Some(schema);
        self.schema_uri = Some(uri);
        self
    }

    pub fn location(mut self, location: Url) -> Self {
        self.location = Some(location);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn compression_type(mut self, compression_type: CompressionType) -> Self {
        self.compression_type = Some(compression_type);
        self
    }

    pub fn partition_strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.partition_strategy = Some(strategy);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Validate and produce the descriptor.
    pub fn build(self) -> Result<DatasetDescriptor, Error> {
        let schema = self.schema.ok_or(DescriptorError::MissingSchema)?;
        if schema.as_record().is_none() {
            return Err(crate::error::SchemaError::UnsupportedType {
                path: "<root>".to_string(),
                type_name: schema.type_name(),
            }
            .into());
        }
        schema.validate()?;

        // An empty strategy carries no information; normalise it away so
        // descriptors compare equal after a round trip.
        let partition_strategy = self.partition_strategy.filter(|s| !s.is_empty());
        if let Some(strategy) = &partition_strategy {
            strategy.validate(&schema)?;
        }

        for name in self.properties.keys() {
            check_property_name(name)?;
        }

        Ok(DatasetDescriptor {
            schema,
            schema_uri: self.schema_uri,
            location: self.location,
            format: self.format.unwrap_or_default(),
            compression_type: self.compression_type.unwrap_or_default(),
            partition_strategy,
            properties: self.properties,
        })
    }
}

/// Custom property names are stored as a comma-separated list.
fn check_property_name(name: &str) -> Result<(), DescriptorError> {
    let invalid = |reason| DescriptorError::InvalidPropertyName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains(',') {
        return Err(invalid("name contains ','"));
    }
    if name.trim() != name {
        return Err(invalid("name has leading or trailing whitespace"));
    }
    if is_reserved_property(name) {
        return Err(DescriptorError::ReservedPropertyName(name.to_string()));
    }
    Ok(())
}
