//! Logical schema type system: record/field trees with primitive, union and
//! nested types, plus conversion to and from catalog columns.
//!
//! The tree mirrors Avro's type model. A union that contains `null` is a
//! *nullable* type; evolution only appends nullable (or defaulted) fields.

pub mod convert;
pub mod json;
pub mod type_string;

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use crate::error::SchemaError;

/// A node in the logical type tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum(EnumSchema),
    Fixed(FixedSchema),
    Array(Box<Schema>),
    /// Map with string keys and values of the boxed type.
    Map(Box<Schema>),
    Record(RecordSchema),
    Union(Vec<Schema>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub name: String,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSchema {
    pub name: String,
    pub size: usize,
}

/// A named record with an ordered list of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
}

/// A single record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// Field documentation; carried as the catalog column comment.
    pub doc: Option<String>,
    /// JSON default value used when reading data written without this field.
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            doc: None,
            default: None,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether readers can fill this field for data written before it existed.
    pub fn is_evolvable(&self) -> bool {
        self.schema.is_nullable() || self.default.is_some()
    }
}

impl Schema {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Int => "int".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Float => "float".to_string(),
            Schema::Double => "double".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::String => "string".to_string(),
            Schema::Enum(e) => format!("enum {}", e.name),
            Schema::Fixed(f) => format!("fixed {}", f.name),
            Schema::Array(_) => "array".to_string(),
            Schema::Map(_) => "map".to_string(),
            Schema::Record(r) => format!("record {}", r.name),
            Schema::Union(branches) => {
                let names: Vec<String> = branches.iter().map(Schema::type_name).collect();
                format!("union[{}]", names.join(", "))
            }
        }
    }

    /// A union with a `null` branch.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Schema::Union(branches) if branches.contains(&Schema::Null))
    }

    /// Branches of a union other than `null`; a non-union yields itself.
    pub fn non_null_branches(&self) -> Vec<&Schema> {
        match self {
            Schema::Union(branches) => branches.iter().filter(|b| **b != Schema::Null).collect(),
            other => vec![other],
        }
    }

    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self {
            Schema::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a top-level field of a record schema.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.as_record()
            .and_then(|record| record.fields.iter().find(|f| f.name == name))
    }

    /// Check structural invariants: unique field names per record level,
    /// well-formed unions and enums.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            Schema::Record(record) => {
                let mut seen = HashSet::new();
                for field in &record.fields {
                    if !seen.insert(field.name.as_str()) {
                        return Err(SchemaError::DuplicateField {
                            record: record.name.clone(),
                            name: field.name.clone(),
                        });
                    }
                    field.schema.validate()?;
                }
                Ok(())
            }
            Schema::Union(branches) => {
                if branches.is_empty() {
                    return Err(SchemaError::Invalid("empty union".to_string()));
                }
                let mut seen = HashSet::new();
                for branch in branches {
                    if matches!(branch, Schema::Union(_)) {
                        return Err(SchemaError::Invalid(
                            "unions may not directly contain other unions".to_string(),
                        ));
                    }
                    if !seen.insert(branch.type_name()) {
                        return Err(SchemaError::Invalid(format!(
                            "duplicate union branch {}",
                            branch.type_name()
                        )));
                    }
                    branch.validate()?;
                }
                Ok(())
            }
            Schema::Enum(e) => {
                let mut seen = HashSet::new();
                for symbol in &e.symbols {
                    if !seen.insert(symbol.as_str()) {
                        return Err(SchemaError::Invalid(format!(
                            "duplicate symbol '{symbol}' in enum {}",
                            e.name
                        )));
                    }
                }
                Ok(())
            }
            Schema::Array(items) => items.validate(),
            Schema::Map(values) => values.validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&json::to_json(self).to_string())
    }
}

// ---------------------------------------------------------------------------
// RecordBuilder
// ---------------------------------------------------------------------------

/// Builder for record schemas, in the style of Avro's `SchemaBuilder`.
pub struct RecordBuilder {
    record: RecordSchema,
}

impl RecordSchema {
    pub fn builder(name: &str) -> RecordBuilder {
        RecordBuilder {
            record: RecordSchema {
                name: name.to_string(),
                namespace: None,
                doc: None,
                fields: Vec::new(),
            },
        }
    }
}

impl RecordBuilder {
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.record.namespace = Some(namespace.to_string());
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.record.doc = Some(doc.to_string());
        self
    }

    /// Append an arbitrary field.
    pub fn field(mut self, field: Field) -> Self {
        self.record.fields.push(field);
        self
    }

    /// Append a non-nullable field without a default.
    pub fn required(self, name: &str, schema: Schema) -> Self {
        self.field(Field::new(name, schema))
    }

    /// Append a `[null, T]` field defaulting to null.
    pub fn optional(self, name: &str, schema: Schema) -> Self {
        self.field(Field::new(name, Schema::Union(vec![Schema::Null, schema])).with_default(Value::Null))
    }

    /// Append a `[T, null]` field with a non-null default.
    pub fn nullable(self, name: &str, schema: Schema, default: Value) -> Self {
        self.field(Field::new(name, Schema::Union(vec![schema, Schema::Null])).with_default(default))
    }

    pub fn end(self) -> Schema {
        Schema::Record(self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_field_order() {
        let schema = RecordSchema::builder("Test")
            .required("id", Schema::Long)
            .required("data", Schema::String)
            .nullable("data2", Schema::String, json!(""))
            .end();
        let names: Vec<&str> = schema
            .as_record()
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["id", "data", "data2"]);
    }

    #[test]
    fn test_nullable_detection() {
        assert!(Schema::Union(vec![Schema::Null, Schema::Int]).is_nullable());
        assert!(Schema::Union(vec![Schema::Int, Schema::Null]).is_nullable());
        assert!(!Schema::Union(vec![Schema::Int, Schema::String]).is_nullable());
        assert!(!Schema::Int.is_nullable());
    }

    #[test]
    fn test_field_evolvable() {
        assert!(Field::new("a", Schema::Union(vec![Schema::Null, Schema::Int])).is_evolvable());
        assert!(Field::new("b", Schema::Int).with_default(json!(0)).is_evolvable());
        assert!(!Field::new("c", Schema::Int).is_evolvable());
    }

    #[test]
    fn test_validate_duplicate_field() {
        let schema = RecordSchema::builder("Dup")
            .required("id", Schema::Long)
            .required("id", Schema::String)
            .end();
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { ref name, .. } if name == "id"));
    }

    #[test]
    fn test_validate_duplicate_in_nested_record() {
        let inner = RecordSchema::builder("Inner")
            .required("x", Schema::Int)
            .required("x", Schema::Int)
            .end();
        let schema = RecordSchema::builder("Outer").required("inner", inner).end();
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_same_name_at_different_levels_is_fine() {
        let inner = RecordSchema::builder("Inner").required("id", Schema::Int).end();
        let schema = RecordSchema::builder("Outer")
            .required("id", Schema::Long)
            .required("inner", inner)
            .end();
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_validate_nested_union_rejected() {
        let schema = Schema::Union(vec![
            Schema::Null,
            Schema::Union(vec![Schema::Int, Schema::String]),
        ]);
        assert!(schema.validate().is_err());
        assert!(Schema::Union(vec![]).validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_enum_symbol() {
        let schema = Schema::Enum(EnumSchema {
            name: "Color".to_string(),
            symbols: vec!["RED".to_string(), "RED".to_string()],
        });
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_field_lookup() {
        let schema = RecordSchema::builder("Test")
            .required("id", Schema::Long)
            .end();
        assert_eq!(schema.field("id").unwrap().schema, Schema::Long);
        assert!(schema.field("missing").is_none());
        assert!(Schema::Long.field("id").is_none());
    }
}
