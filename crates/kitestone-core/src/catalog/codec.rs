//! Descriptor ⇄ table record translation.

use tracing::debug;
use url::Url;

use super::properties::{
    COMPRESSION_TYPE, CUSTOM_PROPERTY_NAMES, FORMAT, PARTITION_EXPRESSION, Properties,
    SCHEMA_LITERAL, SCHEMA_URL,
};
use super::{Column, TableRecord};
use crate::descriptor::{DatasetDescriptor, PartitionStrategy};
use crate::error::{CodecError, Result};
use crate::io::resolver::SchemaResolver;
use crate::schema::Schema;
use crate::schema::convert::{from_columns, to_columns};
use crate::schema::type_string::same_type;
use crate::types::Format;

/// Builds table records from descriptors and reads them back.
///
/// The resolver is used only by [`decode`](Self::decode), to load schemas
/// referenced by a schema-location property. Inline schemas are stored as
/// Avro JSON under `kite.schema.literal`; tables without either property are
/// read from their columns alone.
pub struct DescriptorCodec<R> {
    resolver: R,
}

impl<R: SchemaResolver> DescriptorCodec<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Produce the catalog table record for `descriptor`.
    pub fn encode(
        &self,
        namespace: &str,
        name: &str,
        descriptor: &DatasetDescriptor,
        external: bool,
    ) -> Result<TableRecord> {
        let mut table = TableRecord::new(namespace, name);
        if external && descriptor.location().is_none() {
            return Err(CodecError::MissingRequiredLocation {
                table: table.qualified_name(),
                detail: "external tables need a data location".to_string(),
            }
            .into());
        }

        table.columns = to_columns(descriptor.schema())?;
        table.location = descriptor.location().map(Url::to_string);
        table.external = external;

        let format = descriptor.format();
        table.serialization_lib = Some(format.serialization_lib().to_string());
        table.input_format = Some(format.input_format().to_string());
        table.output_format = Some(format.output_format().to_string());
        table.properties.set(&FORMAT, &format);

        // Written even when it is the default, so a later default change does
        // not silently alter existing tables.
        table
            .properties
            .set(&COMPRESSION_TYPE.key, &descriptor.compression_type());

        match descriptor.schema_uri() {
            Some(uri) => table.properties.set(&SCHEMA_URL, uri),
            None => table.properties.set(&SCHEMA_LITERAL, descriptor.schema()),
        }

        if let Some(strategy) = descriptor.partition_strategy() {
            table.properties.set(&PARTITION_EXPRESSION, strategy);
            table.partition_keys = strategy.partition_columns(descriptor.schema())?;
        }

        write_custom_properties(&mut table.properties, descriptor)?;

        debug!(
            table = %table.qualified_name(),
            columns = table.columns.len(),
            format = %format,
            "encoded descriptor"
        );
        Ok(table)
    }

    /// Reconstruct the descriptor a table record describes.
    pub fn decode(&self, table: &TableRecord) -> Result<DatasetDescriptor> {
        let props = &table.properties;
        let format = decode_format(table)?;
        let location = decode_location(table)?;

        if table.external && location.is_none() {
            return Err(CodecError::MissingRequiredLocation {
                table: table.qualified_name(),
                detail: "external table has no location".to_string(),
            }
            .into());
        }

        let schema_url = props.get(&SCHEMA_URL)?;
        let literal = match schema_url {
            Some(_) => None,
            None => props.get(&SCHEMA_LITERAL)?,
        };
        if table.columns.is_empty() && schema_url.is_none() && literal.is_none() {
            return Err(CodecError::MissingRequiredLocation {
                table: table.qualified_name(),
                detail: "table has no columns and no schema location".to_string(),
            }
            .into());
        }

        let mut builder = DatasetDescriptor::builder()
            .format(format)
            .compression_type(props.get_or_default(&COMPRESSION_TYPE)?);

        builder = match (schema_url, literal) {
            (Some(uri), _) => {
                let schema = self.resolver.resolve(&uri)?;
                check_columns_match(table, uri.as_str(), &schema)?;
                builder.resolved_schema_uri(uri, schema)
            }
            (None, Some(schema)) => {
                check_columns_match(table, &format!("property {}", SCHEMA_LITERAL.name()), &schema)?;
                builder.schema(with_column_comments(schema, &table.columns))
            }
            (None, None) => builder.schema(from_columns(&table.name, &table.columns)?),
        };

        if let Some(location) = location {
            builder = builder.location(location);
        }

        let strategy = match props.get(&PARTITION_EXPRESSION)? {
            Some(strategy) => Some(strategy),
            None if table.is_partitioned() => {
                debug!(
                    table = %table.qualified_name(),
                    "no partition expression, using identity partitioners over partition keys"
                );
                Some(PartitionStrategy::from_partition_columns(&table.partition_keys))
            }
            None => None,
        };
        if let Some(strategy) = strategy {
            builder = builder.partition_strategy(strategy);
        }

        for name in props.get_or_default(&CUSTOM_PROPERTY_NAMES)? {
            if let Some(value) = props.get_raw(&name) {
                builder = builder.property(name.clone(), value);
            }
        }

        let descriptor = builder.build()?;
        debug!(table = %table.qualified_name(), format = %format, "decoded table record");
        Ok(descriptor)
    }
}

fn decode_format(table: &TableRecord) -> Result<Format> {
    if let Some(format) = table.properties.get(&FORMAT)? {
        return Ok(format);
    }
    table
        .serialization_lib
        .as_deref()
        .and_then(Format::from_serialization_lib)
        .ok_or_else(|| {
            CodecError::UnknownFormat {
                table: table.qualified_name(),
                serialization_lib: table.serialization_lib.clone(),
            }
            .into()
        })
}

fn decode_location(table: &TableRecord) -> Result<Option<Url>> {
    let Some(raw) = table.location.as_deref() else {
        return Ok(None);
    };
    match Url::parse(raw) {
        Ok(url) => Ok(Some(url)),
        // Bare absolute paths are accepted as local files.
        Err(_) if raw.starts_with('/') => Url::from_file_path(raw).map(Some).map_err(|()| {
            invalid_location(table, raw, "not a valid file path".to_string())
        }),
        Err(e) => Err(invalid_location(table, raw, e.to_string())),
    }
}

fn invalid_location(table: &TableRecord, raw: &str, reason: String) -> crate::error::Error {
    CodecError::InvalidLocation {
        table: table.qualified_name(),
        location: raw.to_string(),
        reason,
    }
    .into()
}

/// A stored schema must describe the same columns as the table. Comments are
/// not compared.
fn check_columns_match(table: &TableRecord, location: &str, schema: &Schema) -> Result<()> {
    let expected = to_columns(schema)?;
    let mismatch = |detail: String| -> crate::error::Error {
        CodecError::SchemaMismatch {
            table: table.qualified_name(),
            location: location.to_string(),
            detail,
        }
        .into()
    };

    if expected.len() != table.columns.len() {
        return Err(mismatch(format!(
            "schema has {} columns, table has {}",
            expected.len(),
            table.columns.len()
        )));
    }
    for (position, (want, have)) in expected.iter().zip(&table.columns).enumerate() {
        if !same_shape(want, have) {
            return Err(mismatch(format!(
                "column {position} is '{}: {}' in the schema but '{}: {}' in the table",
                want.name, want.data_type, have.name, have.data_type
            )));
        }
    }
    Ok(())
}

fn same_shape(a: &Column, b: &Column) -> bool {
    a.name == b.name && same_type(&a.data_type, &b.data_type)
}

/// Column comments may be edited in the catalog; they win over stored docs.
fn with_column_comments(mut schema: Schema, columns: &[Column]) -> Schema {
    if let Schema::Record(record) = &mut schema {
        for (field, column) in record.fields.iter_mut().zip(columns) {
            field.doc = column.comment.clone();
        }
    }
    schema
}

/// Replace the custom descriptor properties stored in `props` with those of
/// `descriptor`, including the names list.
pub(crate) fn write_custom_properties(
    props: &mut Properties,
    descriptor: &DatasetDescriptor,
) -> Result<()> {
    for name in props.get_or_default(&CUSTOM_PROPERTY_NAMES)? {
        props.remove_raw(&name);
    }
    props.remove(&CUSTOM_PROPERTY_NAMES.key);

    let custom = descriptor.properties();
    if custom.is_empty() {
        return Ok(());
    }
    for (name, value) in custom {
        props.insert_raw(name.clone(), value.clone());
    }
    let names: Vec<String> = custom.keys().cloned().collect();
    props.set(&CUSTOM_PROPERTY_NAMES.key, &names);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ResolveError, SchemaError};
    use crate::io::resolver::StaticSchemaResolver;
    use crate::schema::RecordSchema;
    use crate::types::CompressionType;

    fn user_schema() -> Schema {
        RecordSchema::builder("User")
            .required("id", Schema::Long)
            .required("username", Schema::String)
            .optional("email", Schema::String)
            .end()
    }

    /// A schema that `from_columns` reproduces exactly for a table named `events`.
    fn events_schema() -> Schema {
        RecordSchema::builder("events")
            .field(crate::schema::Field::new("id", Schema::Long).with_doc("event id"))
            .required("data", Schema::String)
            .optional("note", Schema::String)
            .end()
    }

    fn schema_uri() -> Url {
        Url::parse("resource:schema/user.avsc").unwrap()
    }

    fn codec() -> DescriptorCodec<StaticSchemaResolver> {
        DescriptorCodec::new(StaticSchemaResolver::new().with(schema_uri(), user_schema()))
    }

    fn uri_descriptor() -> DatasetDescriptor {
        DatasetDescriptor::builder()
            .resolved_schema_uri(schema_uri(), user_schema())
            .location(Url::parse("file:/tmp/data/users").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_encode_writes_columns_and_properties() {
        let table = codec().encode("default", "users", &uri_descriptor(), false).unwrap();

        let columns: Vec<(&str, &str)> = table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        assert_eq!(
            columns,
            vec![("id", "bigint"), ("username", "string"), ("email", "nullable<string>")]
        );
        assert_eq!(table.location.as_deref(), Some("file:///tmp/data/users"));
        assert_eq!(table.properties.get_raw("kite.compression.type"), Some("snappy"));
        assert_eq!(table.properties.get_raw("kite.format"), Some("avro"));
        assert_eq!(
            table.properties.get_raw("kite.schema.url"),
            Some("resource:schema/user.avsc")
        );
        assert!(!table.properties.contains(&SCHEMA_LITERAL));
        assert_eq!(
            table.serialization_lib.as_deref(),
            Some(Format::Avro.serialization_lib())
        );
        assert!(!table.is_partitioned());
    }

    #[test]
    fn test_inline_schema_omits_schema_url() {
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .build()
            .unwrap();
        let table = codec().encode("ns", "events", &descriptor, false).unwrap();
        assert!(!table.properties.contains(&SCHEMA_URL));
        assert_eq!(
            table.properties.get(&SCHEMA_LITERAL).unwrap().as_ref(),
            Some(descriptor.schema())
        );
    }

    /// Details with no column representation survive through the stored literal.
    fn detailed_schema() -> Schema {
        Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Test",
                "namespace": "org.kitestone.test",
                "doc": "test records",
                "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "data", "type": "string"},
                    {"name": "data2", "type": ["string", "null"], "default": ""},
                    {"name": "color", "type": {"type": "enum", "name": "Color", "symbols": ["RED", "GREEN"]}},
                    {"name": "hash", "type": {"type": "fixed", "name": "Md5", "size": 16}},
                    {"name": "count", "type": "int", "default": 0}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_inline_round_trip_keeps_full_schema() {
        let descriptor = DatasetDescriptor::builder()
            .schema(detailed_schema())
            .build()
            .unwrap();
        let codec = codec();
        let table = codec.encode("ns", "test", &descriptor, false).unwrap();
        assert_eq!(table.columns[2], Column::new("data2", "nullable<string>"));
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_schema_literal_must_match_columns() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(detailed_schema())
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "test", &descriptor, false).unwrap();
        table.columns[0].data_type = "string".to_string();
        match codec.decode(&table).unwrap_err() {
            Error::Codec(CodecError::SchemaMismatch { location, detail, .. }) => {
                assert_eq!(location, "property kite.schema.literal");
                assert!(detail.contains("id"), "{detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_schema_literal_matches_other_spellings() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(detailed_schema())
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "test", &descriptor, false).unwrap();
        table.columns[0].data_type = "BIGINT".to_string();
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_catalog_comments_override_literal_docs() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(detailed_schema())
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "test", &descriptor, false).unwrap();
        table.columns[1].comment = Some("payload".to_string());
        let decoded = codec.decode(&table).unwrap();
        assert_eq!(decoded.schema().field("data").unwrap().doc.as_deref(), Some("payload"));
        assert_eq!(decoded.schema().as_record().unwrap().name, "Test");
    }

    #[test]
    fn test_table_without_literal_reads_columns() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(detailed_schema())
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "test", &descriptor, false).unwrap();
        table.properties.remove(&SCHEMA_LITERAL);
        let decoded = codec.decode(&table).unwrap();
        let record = decoded.schema().as_record().unwrap();
        assert_eq!(record.name, "test");
        assert_eq!(record.fields[3].schema, Schema::String);
    }

    #[test]
    fn test_legacy_schema_literal_key() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(detailed_schema())
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "test", &descriptor, false).unwrap();
        let literal = table.properties.remove(&SCHEMA_LITERAL).unwrap();
        table.properties.insert_raw("avro.schema.literal", literal);
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_inline_round_trip() {
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .location(Url::parse("hdfs://nn:8020/warehouse/events").unwrap())
            .format(Format::Parquet)
            .compression_type(CompressionType::Lz4)
            .build()
            .unwrap();
        let codec = codec();
        let table = codec.encode("ns", "events", &descriptor, true).unwrap();
        assert!(table.external);
        assert_eq!(table.columns[0].comment.as_deref(), Some("event id"));
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_uri_round_trip() {
        let codec = codec();
        let descriptor = uri_descriptor();
        let table = codec.encode("default", "users", &descriptor, false).unwrap();
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_absent_compression_decodes_as_default() {
        let codec = codec();
        let mut table = codec.encode("default", "users", &uri_descriptor(), false).unwrap();
        table.properties.remove(&COMPRESSION_TYPE.key);
        let decoded = codec.decode(&table).unwrap();
        assert_eq!(decoded.compression_type(), CompressionType::Snappy);
    }

    #[test]
    fn test_partitioned_round_trip() {
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .partition_strategy(
                PartitionStrategy::new()
                    .hash("id", "id_hash", 16)
                    .identity("data", "data_part"),
            )
            .build()
            .unwrap();
        let codec = codec();
        let table = codec.encode("ns", "events", &descriptor, false).unwrap();
        assert_eq!(
            table.properties.get_raw("kite.partition.expression"),
            Some(r#"[hash("id", "id_hash", 16), identity("data", "data_part")]"#)
        );
        let keys: Vec<(&str, &str)> = table
            .partition_keys
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        assert_eq!(keys, vec![("id_hash", "int"), ("data_part", "string")]);
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_partition_keys_without_expression() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .partition_strategy(PartitionStrategy::new().identity("data", "data"))
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "events", &descriptor, false).unwrap();
        table.properties.remove(&PARTITION_EXPRESSION);
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_custom_properties_round_trip() {
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .property("owner", "data-eng")
            .property("retention.days", "30")
            .build()
            .unwrap();
        let codec = codec();
        let mut table = codec.encode("ns", "events", &descriptor, false).unwrap();
        assert_eq!(
            table.properties.get_raw("kite.custom.property.names"),
            Some("owner,retention.days")
        );
        assert_eq!(table.properties.get_raw("owner"), Some("data-eng"));

        // Properties written by other tools are not picked up.
        table.properties.insert_raw("transient_lastDdlTime", "1700000000");
        assert_eq!(codec.decode(&table).unwrap(), descriptor);
    }

    #[test]
    fn test_external_requires_location() {
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .build()
            .unwrap();
        let err = codec().encode("ns", "events", &descriptor, true).unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::MissingRequiredLocation { .. })
        ));

        let mut table = codec().encode("ns", "events", &descriptor, false).unwrap();
        table.external = true;
        assert!(matches!(
            codec().decode(&table).unwrap_err(),
            Error::Codec(CodecError::MissingRequiredLocation { .. })
        ));
    }

    #[test]
    fn test_no_columns_and_no_schema_url() {
        let mut table = TableRecord::new("ns", "empty");
        table.properties.set(&FORMAT, &Format::Avro);
        assert!(matches!(
            codec().decode(&table).unwrap_err(),
            Error::Codec(CodecError::MissingRequiredLocation { .. })
        ));
    }

    #[test]
    fn test_schema_mismatch() {
        let codec = codec();
        let mut table = codec.encode("default", "users", &uri_descriptor(), false).unwrap();
        table.columns[1].data_type = "int".to_string();
        match codec.decode(&table).unwrap_err() {
            Error::Codec(CodecError::SchemaMismatch { detail, location, .. }) => {
                assert_eq!(location, "resource:schema/user.avsc");
                assert!(detail.contains("username"), "{detail}");
            }
            other => panic!("unexpected error: {other}"),
        }

        table.columns.pop();
        assert!(matches!(
            codec.decode(&table).unwrap_err(),
            Error::Codec(CodecError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_schema_mismatch_ignores_comments() {
        let codec = codec();
        let mut table = codec.encode("default", "users", &uri_descriptor(), false).unwrap();
        table.columns[0].comment = Some("edited in the catalog".to_string());
        assert!(codec.decode(&table).is_ok());
    }

    #[test]
    fn test_legacy_schema_url_key() {
        let codec = codec();
        let mut table = codec.encode("default", "users", &uri_descriptor(), false).unwrap();
        let url = table.properties.remove(&SCHEMA_URL).unwrap();
        table.properties.insert_raw("avro.schema.url", url);
        assert_eq!(codec.decode(&table).unwrap(), uri_descriptor());
    }

    #[test]
    fn test_unresolvable_schema_url() {
        let codec = DescriptorCodec::new(StaticSchemaResolver::new());
        let table = codec.encode("default", "users", &uri_descriptor(), false).unwrap();
        assert!(matches!(
            codec.decode(&table).unwrap_err(),
            Error::Resolve(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn test_format_from_serialization_lib() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .format(Format::Parquet)
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "events", &descriptor, false).unwrap();
        table.properties.remove(&FORMAT);
        assert_eq!(codec.decode(&table).unwrap().format(), Format::Parquet);

        table.serialization_lib = Some("org.example.UnknownSerDe".to_string());
        assert!(matches!(
            codec.decode(&table).unwrap_err(),
            Error::Codec(CodecError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_invalid_compression_property() {
        let codec = codec();
        let mut table = codec.encode("default", "users", &uri_descriptor(), false).unwrap();
        table.properties.insert_raw("kite.compression.type", "zstd");
        assert!(matches!(
            codec.decode(&table).unwrap_err(),
            Error::Codec(CodecError::InvalidProperty { .. })
        ));
    }

    #[test]
    fn test_location_parsing() {
        let codec = codec();
        let descriptor = DatasetDescriptor::builder()
            .schema(events_schema())
            .build()
            .unwrap();
        let mut table = codec.encode("ns", "events", &descriptor, false).unwrap();

        table.location = Some("/warehouse/events".to_string());
        let decoded = codec.decode(&table).unwrap();
        assert_eq!(decoded.location().unwrap().as_str(), "file:///warehouse/events");

        table.location = Some("warehouse/events".to_string());
        assert!(matches!(
            codec.decode(&table).unwrap_err(),
            Error::Codec(CodecError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn test_unsupported_column_type() {
        let codec = codec();
        let mut table = TableRecord::new("ns", "legacy");
        table.properties.set(&FORMAT, &Format::Avro);
        table.columns.push(Column::new("amount", "decimal(10,2)"));
        assert!(matches!(
            codec.decode(&table).unwrap_err(),
            Error::Schema(SchemaError::UnsupportedType { .. })
        ));
    }
}
