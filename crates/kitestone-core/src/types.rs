//! Core types: storage formats, compression codecs and reserved namespaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::properties::is_legacy_key;
use crate::error::DescriptorError;

/// Namespace prefix for every table property written by the codec.
pub const PROPERTY_NAMESPACE: &str = "kite.";

/// Namespace prefix used by the previous generation of writers. Read-only.
pub const LEGACY_PROPERTY_NAMESPACE: &str = "cdk.";

/// Storage container format of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Avro,
    Parquet,
    Csv,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Avro, Format::Parquet, Format::Csv];

    /// Identifier stored in table properties.
    pub fn name(self) -> &'static str {
        match self {
            Format::Avro => "avro",
            Format::Parquet => "parquet",
            Format::Csv => "csv",
        }
    }

    /// Catalog serialization library for this format.
    pub fn serialization_lib(self) -> &'static str {
        match self {
            Format::Avro => "org.apache.hadoop.hive.serde2.avro.AvroSerDe",
            Format::Parquet => "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe",
            Format::Csv => "org.apache.hadoop.hive.serde2.lazy.LazySimpleSerDe",
        }
    }

    pub fn input_format(self) -> &'static str {
        match self {
            Format::Avro => "org.apache.hadoop.hive.ql.io.avro.AvroContainerInputFormat",
            Format::Parquet => "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat",
            Format::Csv => "org.apache.hadoop.mapred.TextInputFormat",
        }
    }

    pub fn output_format(self) -> &'static str {
        match self {
            Format::Avro => "org.apache.hadoop.hive.ql.io.avro.AvroContainerOutputFormat",
            Format::Parquet => "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat",
            Format::Csv => "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat",
        }
    }

    /// Reverse lookup from a catalog serialization library.
    pub fn from_serialization_lib(lib: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|format| format.serialization_lib() == lib)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Format::ALL
            .into_iter()
            .find(|format| format.name() == lower)
            .ok_or_else(|| DescriptorError::UnknownFormat(s.to_string()))
    }
}

/// Compression codec applied to a dataset's data files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// The catalog-wide default codec.
    #[default]
    Snappy,
    Deflate,
    Bzip2,
    Lz4,
    Uncompressed,
}

impl CompressionType {
    pub const ALL: [CompressionType; 5] = [
        CompressionType::Snappy,
        CompressionType::Deflate,
        CompressionType::Bzip2,
        CompressionType::Lz4,
        CompressionType::Uncompressed,
    ];

    /// Codec identifier stored under `kite.compression.type`.
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::Snappy => "snappy",
            CompressionType::Deflate => "deflate",
            CompressionType::Bzip2 => "bzip2",
            CompressionType::Lz4 => "lz4",
            CompressionType::Uncompressed => "uncompressed",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionType {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        CompressionType::ALL
            .into_iter()
            .find(|codec| codec.name() == lower)
            .ok_or_else(|| DescriptorError::UnknownCompression(s.to_string()))
    }
}

/// Whether a property name is reserved for the codec: either in one of its
/// namespaces or the legacy name of a key it reads.
pub fn is_reserved_property(name: &str) -> bool {
    name.starts_with(PROPERTY_NAMESPACE)
        || name.starts_with(LEGACY_PROPERTY_NAMESPACE)
        || is_legacy_key(name)
}
