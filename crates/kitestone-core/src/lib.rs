//! # Kitestone
//!
//! Translation between logical dataset descriptors and metastore table
//! records.
//!
//! A [`DatasetDescriptor`](descriptor::DatasetDescriptor) describes a dataset:
//! its record schema, storage location, format, compression and partitioning.
//! A [`TableRecord`](catalog::TableRecord) is the catalog's view of the same
//! dataset: ordered typed columns plus a string property sidecar. The
//! [`DescriptorCodec`](catalog::DescriptorCodec) converts between the two
//! without loss, and [`catalog::evolve`] updates an existing table in place
//! when the dataset's schema grows.
//!
//! ## Quick Start
//!
//! ```
//! use kitestone_core::catalog::DescriptorCodec;
//! use kitestone_core::catalog::evolve::compute_and_apply;
//! use kitestone_core::descriptor::DatasetDescriptor;
//! use kitestone_core::io::resolver::StaticSchemaResolver;
//! use kitestone_core::schema::{RecordSchema, Schema};
//! use serde_json::json;
//!
//! let codec = DescriptorCodec::new(StaticSchemaResolver::new());
//!
//! let schema = RecordSchema::builder("events")
//!     .required("id", Schema::Long)
//!     .required("data", Schema::String)
//!     .end();
//! let descriptor = DatasetDescriptor::builder().schema(schema).build().unwrap();
//!
//! // Descriptor to table and back.
//! let mut table = codec.encode("default", "events", &descriptor, false).unwrap();
//! assert_eq!(table.properties.get_raw("kite.compression.type"), Some("snappy"));
//! assert_eq!(codec.decode(&table).unwrap(), descriptor);
//!
//! // Append a nullable column.
//! let evolved = descriptor
//!     .to_builder()
//!     .schema(
//!         RecordSchema::builder("events")
//!             .required("id", Schema::Long)
//!             .required("data", Schema::String)
//!             .nullable("data2", Schema::String, json!(""))
//!             .end(),
//!     )
//!     .build()
//!     .unwrap();
//! let diff = compute_and_apply(&mut table, &evolved).unwrap();
//! assert_eq!(diff.len(), 1);
//! assert_eq!(table.columns[2].data_type, "nullable<string>");
//! assert_eq!(codec.decode(&table).unwrap(), evolved);
//! ```

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod io;
pub mod provider;
pub mod schema;
pub mod types;
