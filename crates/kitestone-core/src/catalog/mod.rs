//! Catalog-side table record: columns, property sidecar, location and storage
//! format, plus the codec and evolution engine that operate on it.
//!
//! A `TableRecord` is a plain value owned by the caller. The codec builds one
//! from a descriptor, reads one back into a descriptor, and the evolution
//! engine mutates one in place; none of them retain it.

pub mod codec;
pub mod evolve;
pub mod properties;

use serde::{Deserialize, Serialize};

pub use codec::DescriptorCodec;
pub use evolve::{ColumnChange, ColumnDiff};
pub use properties::Properties;

/// A catalog-native column: name, type string, optional comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// In-memory representation of a metastore table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub namespace: String,
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_keys: Vec<Column>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// External tables leave the data lifecycle to their owner; dropping the
    /// table does not delete data.
    #[serde(default)]
    pub external: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization_lib: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl TableRecord {
    /// An empty record with no columns, properties or storage information.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// `namespace.name`, used in errors and logs.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_partitioned(&self) -> bool {
        !self.partition_keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_empty() {
        let table = TableRecord::new("ns", "events");
        assert_eq!(table.qualified_name(), "ns.events");
        assert!(table.columns.is_empty());
        assert!(table.properties.is_empty());
        assert!(!table.external);
        assert!(!table.is_partitioned());
    }

    #[test]
    fn test_column_lookup() {
        let mut table = TableRecord::new("ns", "t");
        table.columns.push(Column::new("id", "bigint").with_comment("key"));
        assert_eq!(table.column("id").unwrap().comment.as_deref(), Some("key"));
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut table = TableRecord::new("ns", "t");
        table.columns.push(Column::new("id", "bigint"));
        table.location = Some("file:///tmp/t".to_string());

        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["columns"][0]["type"], "bigint");
        assert!(value["columns"][0].get("comment").is_none());
        assert!(value.get("partition_keys").is_none());

        let back: TableRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let table: TableRecord = serde_json::from_str(
            r#"{"namespace": "ns", "name": "t", "columns": [{"name": "id", "type": "int"}]}"#,
        )
        .unwrap();
        assert_eq!(table.columns, vec![Column::new("id", "int")]);
        assert!(table.properties.is_empty());
        assert_eq!(table.location, None);
    }
}
