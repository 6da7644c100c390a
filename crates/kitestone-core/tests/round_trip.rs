//! Integration tests: descriptor ⇄ table round trips and column evolution,
//! using the schema resources shipped with the crate.

use std::path::PathBuf;

use serde_json::json;
use url::Url;

use kitestone_core::catalog::evolve::compute_and_apply;
use kitestone_core::catalog::{Column, DescriptorCodec, TableRecord};
use kitestone_core::descriptor::DatasetDescriptor;
use kitestone_core::error::{Error, EvolutionError};
use kitestone_core::io::resolver::FsSchemaResolver;
use kitestone_core::provider::{CatalogClient, InMemoryCatalog, MetadataProvider};
use kitestone_core::schema::convert::to_columns;
use kitestone_core::schema::{RecordSchema, Schema};
use kitestone_core::types::CompressionType;

fn resolver() -> FsSchemaResolver {
    FsSchemaResolver::new(vec![
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources"),
    ])
}

fn codec() -> DescriptorCodec<FsSchemaResolver> {
    DescriptorCodec::new(resolver())
}

fn user_descriptor(compression: Option<CompressionType>) -> DatasetDescriptor {
    let mut builder = DatasetDescriptor::builder()
        .schema_uri(&resolver(), Url::parse("resource:schema/user.avsc").unwrap())
        .unwrap()
        .location(Url::parse("file:/tmp/data/test_table").unwrap());
    if let Some(compression) = compression {
        builder = builder.compression_type(compression);
    }
    builder.build().unwrap()
}

fn test_schema(with_data2: bool) -> Schema {
    let builder = RecordSchema::builder("Test")
        .required("id", Schema::Long)
        .required("data", Schema::String);
    if with_data2 {
        builder.nullable("data2", Schema::String, json!("")).end()
    } else {
        builder.end()
    }
}

fn test_table() -> TableRecord {
    let original = DatasetDescriptor::builder()
        .schema(test_schema(false))
        .build()
        .unwrap();
    codec().encode("ns", "test", &original, false).unwrap()
}

fn updated_descriptor() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .schema(test_schema(true))
        .build()
        .unwrap()
}

#[test]
fn test_round_trip_descriptor() {
    let codec = codec();
    let original = user_descriptor(None);
    let table = codec.encode("test_ns", "test_table", &original, true).unwrap();

    assert!(table.external);
    assert_eq!(table.properties.get_raw("kite.compression.type"), Some("snappy"));
    assert_eq!(codec.decode(&table).unwrap(), original);
}

#[test]
fn test_round_trip_descriptor_no_compression_property() {
    let codec = codec();
    let original = user_descriptor(None);
    let mut table = codec.encode("test_ns", "test_table", &original, true).unwrap();
    assert_eq!(
        table.properties.remove_raw("kite.compression.type").as_deref(),
        Some("snappy")
    );

    assert_eq!(codec.decode(&table).unwrap(), original);
}

#[test]
fn test_round_trip_descriptor_with_compression_type() {
    let codec = codec();
    let original = user_descriptor(Some(CompressionType::Deflate));
    let table = codec.encode("test_ns", "test_table", &original, true).unwrap();
    assert_eq!(table.properties.get_raw("kite.compression.type"), Some("deflate"));

    let result = codec.decode(&table).unwrap();
    assert_eq!(result.compression_type(), CompressionType::Deflate);
    assert_eq!(result, original);
}

#[test]
fn test_user_schema_columns() {
    let table = codec()
        .encode("test_ns", "test_table", &user_descriptor(None), true)
        .unwrap();
    assert_eq!(
        table.columns,
        vec![
            Column::new("username", "string").with_comment("unique login name"),
            Column::new("favorite_color", "nullable<string>"),
            Column::new("created_at", "bigint"),
            Column::new("tags", "array<string>"),
            Column::new("attributes", "map<string,nullable<string>>"),
        ]
    );
}

#[test]
fn test_update_changes_ddl() {
    let mut table = test_table();
    let before = table.clone();
    let updated = updated_descriptor();

    compute_and_apply(&mut table, &updated).unwrap();

    assert_eq!(table.columns, to_columns(updated.schema()).unwrap());
    assert_eq!(
        table.columns,
        vec![
            Column::new("id", "bigint"),
            Column::new("data", "string"),
            Column::new("data2", "nullable<string>"),
        ]
    );
    assert_eq!(table.serialization_lib, before.serialization_lib);

    // The stored schema is the only property that follows the new shape.
    let mut properties = table.properties.clone();
    assert_eq!(
        properties.remove_raw("kite.schema.literal"),
        Some(updated.schema().to_json().to_string())
    );
    let mut before_properties = before.properties.clone();
    before_properties.remove_raw("kite.schema.literal");
    assert_eq!(properties, before_properties);
    assert_eq!(codec().decode(&table).unwrap(), updated);
}

#[test]
fn test_round_trip_inline_schema() {
    let codec = codec();
    let original = updated_descriptor();
    let table = codec.encode("ns", "test", &original, false).unwrap();
    assert_eq!(codec.decode(&table).unwrap(), original);

    let field = original.schema().field("data2").unwrap();
    assert_eq!(field.schema, Schema::Union(vec![Schema::String, Schema::Null]));
    assert_eq!(field.default, Some(json!("")));
}

#[test]
fn test_update_is_idempotent() {
    let mut table = test_table();
    let updated = updated_descriptor();
    compute_and_apply(&mut table, &updated).unwrap();
    let first = serde_json::to_vec(&table).unwrap();

    let diff = compute_and_apply(&mut table, &updated).unwrap();
    assert!(diff.is_empty());
    assert_eq!(serde_json::to_vec(&table).unwrap(), first);
}

#[test]
fn test_incompatible_changes_leave_table_unmodified() {
    let dropped = RecordSchema::builder("Test")
        .required("id", Schema::Long)
        .end();
    let replaced = RecordSchema::builder("Test")
        .required("id", Schema::Long)
        .optional("data2", Schema::String)
        .end();
    let retyped = RecordSchema::builder("Test")
        .required("id", Schema::String)
        .required("data", Schema::String)
        .end();

    for schema in [dropped, replaced, retyped] {
        let mut table = test_table();
        let before = table.clone();
        let descriptor = DatasetDescriptor::builder().schema(schema).build().unwrap();
        let err = compute_and_apply(&mut table, &descriptor).unwrap_err();
        assert!(
            matches!(err, Error::Evolution(EvolutionError::IncompatibleSchemaChange { .. })),
            "{err}"
        );
        assert_eq!(table, before);
    }
}

#[test]
fn test_provider_lifecycle() {
    let provider = MetadataProvider::new(InMemoryCatalog::new(), resolver()).with_external(true);
    let original = user_descriptor(None);

    provider.create("test_ns", "users", &original).unwrap();
    assert_eq!(provider.load("test_ns", "users").unwrap(), original);

    // Tables pinned to an external schema are not evolved through columns.
    let err = provider
        .update("test_ns", "users", &user_descriptor(Some(CompressionType::Lz4)))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Evolution(EvolutionError::PinnedSchemaNotEvolvable { .. })
    ));
    assert_eq!(provider.client().get_table("test_ns", "users").unwrap().version, 1);

    assert!(provider.delete("test_ns", "users").unwrap());
    assert!(provider.list("test_ns").unwrap().is_empty());
}
