//! Error types for all kitestone operations.

use std::io;
use thiserror::Error;

/// Top-level error type for kitestone operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Evolution(#[from] EvolutionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unsupported type '{type_name}' at field '{path}'")]
    UnsupportedType { path: String, type_name: String },

    #[error("duplicate field name '{name}' in record '{record}'")]
    DuplicateField { record: String, name: String },

    #[error("invalid schema: {0}")]
    Invalid(String),

    #[error("invalid type string '{type_string}' for column '{column}': {reason}")]
    InvalidTypeString {
        column: String,
        type_string: String,
        reason: String,
    },

    #[error("schema JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor has no schema")]
    MissingSchema,

    #[error("partitioner '{partition}' references missing field '{source_field}'")]
    UnknownPartitionSource {
        partition: String,
        source_field: String,
    },

    #[error("hash partitioner '{partition}' needs at least one bucket")]
    InvalidBucketCount { partition: String },

    #[error("duplicate partition name: {0}")]
    DuplicatePartitionName(String),

    #[error("invalid partition expression '{expression}': {reason}")]
    InvalidPartitionExpression { expression: String, reason: String },

    #[error("property name '{0}' is reserved for table metadata")]
    ReservedPropertyName(String),

    #[error("invalid property name '{name}': {reason}")]
    InvalidPropertyName { name: String, reason: &'static str },

    #[error("unknown format: {0}")]
    UnknownFormat(String),

    #[error("unknown compression type: {0}")]
    UnknownCompression(String),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(
        "schema at {location} does not match the columns of table {table}: {detail}"
    )]
    SchemaMismatch {
        table: String,
        location: String,
        detail: String,
    },

    #[error("missing required location for table {table}: {detail}")]
    MissingRequiredLocation { table: String, detail: String },

    #[error("unknown format for table {table}: serialization lib {serialization_lib:?}")]
    UnknownFormat {
        table: String,
        serialization_lib: Option<String>,
    },

    #[error("invalid value for property '{key}': '{value}' ({reason})")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid location '{location}' for table {table}: {reason}")]
    InvalidLocation {
        table: String,
        location: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error("incompatible schema change for column '{column}': {reason}")]
    IncompatibleSchemaChange {
        column: String,
        old_type: Option<String>,
        new_type: Option<String>,
        reason: String,
    },

    #[error("table {table} is pinned to the external schema at {location} and cannot be evolved")]
    PinnedSchemaNotEvolvable { table: String, location: String },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unsupported schema URI scheme '{scheme}' in {uri}")]
    UnsupportedScheme { scheme: String, uri: String },

    #[error("schema not found: {0}")]
    NotFound(String),

    #[error("I/O error reading {uri}: {source}")]
    Io {
        uri: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse schema at {uri}: {reason}")]
    Parse { uri: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table not found: {namespace}.{name}")]
    TableNotFound { namespace: String, name: String },

    #[error("table already exists: {namespace}.{name}")]
    TableAlreadyExists { namespace: String, name: String },

    #[error("version mismatch: expected {expected}, actual {actual}")]
    VersionMismatch { expected: u64, actual: u64 },
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cannot change {attribute} of dataset {namespace}.{name}: {old} -> {new}")]
    ImmutableChange {
        namespace: String,
        name: String,
        attribute: &'static str,
        old: String,
        new: String,
    },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
