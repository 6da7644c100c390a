//! Conversion between logical schemas and ordered catalog column lists.
//!
//! Top-level field docs travel as column comments in both directions. Nested
//! record names, field defaults other than null, enum symbols and fixed sizes
//! have no column representation and are not recovered by [`from_columns`];
//! tables written by the codec also store the full schema, so this only
//! affects tables created by other tools.

use serde_json::Value;

use super::type_string::{self, TypeNode};
use super::{Field, RecordSchema, Schema};
use crate::catalog::Column;
use crate::error::SchemaError;

/// Convert a record schema into catalog columns, preserving field order.
pub fn to_columns(schema: &Schema) -> Result<Vec<Column>, SchemaError> {
    let record = schema.as_record().ok_or_else(|| SchemaError::UnsupportedType {
        path: "<root>".to_string(),
        type_name: schema.type_name(),
    })?;

    record
        .fields
        .iter()
        .map(|field| {
            Ok(Column {
                name: field.name.clone(),
                data_type: to_type_node(&field.schema, &field.name)?.to_string(),
                comment: field.doc.clone(),
            })
        })
        .collect()
}

/// Convert catalog columns into a record schema named `record_name`.
pub fn from_columns(record_name: &str, columns: &[Column]) -> Result<Schema, SchemaError> {
    let mut fields = Vec::with_capacity(columns.len());
    for column in columns {
        let schema = from_type_string(&column.name, &column.data_type)?;
        let default = schema.is_nullable().then_some(Value::Null);
        fields.push(Field {
            name: column.name.clone(),
            schema,
            doc: column.comment.clone(),
            default,
        });
    }

    let schema = Schema::Record(RecordSchema {
        name: record_name.to_string(),
        namespace: None,
        doc: None,
        fields,
    });
    schema.validate()?;
    Ok(schema)
}

/// Catalog type string for a single logical type.
pub fn to_type_string(schema: &Schema, path: &str) -> Result<String, SchemaError> {
    Ok(to_type_node(schema, path)?.to_string())
}

/// Logical type for a column's catalog type string.
pub fn from_type_string(column: &str, type_string: &str) -> Result<Schema, SchemaError> {
    let node = type_string::parse(type_string).map_err(|reason| SchemaError::InvalidTypeString {
        column: column.to_string(),
        type_string: type_string.to_string(),
        reason,
    })?;
    from_type_node(&node, column)
}

fn unsupported(path: &str, type_name: impl Into<String>) -> SchemaError {
    SchemaError::UnsupportedType {
        path: path.to_string(),
        type_name: type_name.into(),
    }
}

fn to_type_node(schema: &Schema, path: &str) -> Result<TypeNode, SchemaError> {
    Ok(match schema {
        Schema::Null => return Err(unsupported(path, "null")),
        Schema::Boolean => TypeNode::primitive("boolean"),
        Schema::Int => TypeNode::primitive("int"),
        Schema::Long => TypeNode::primitive("bigint"),
        Schema::Float => TypeNode::primitive("float"),
        Schema::Double => TypeNode::primitive("double"),
        Schema::String | Schema::Enum(_) => TypeNode::primitive("string"),
        Schema::Bytes | Schema::Fixed(_) => TypeNode::primitive("binary"),
        Schema::Array(items) => {
            TypeNode::Array(Box::new(to_type_node(items, &format!("{path}.element"))?))
        }
        Schema::Map(values) => TypeNode::Map(
            Box::new(TypeNode::primitive("string")),
            Box::new(to_type_node(values, &format!("{path}.value"))?),
        ),
        Schema::Record(record) => {
            if record.fields.is_empty() {
                return Err(unsupported(path, schema.type_name()));
            }
            let fields = record
                .fields
                .iter()
                .map(|f| Ok((f.name.clone(), to_type_node(&f.schema, &format!("{path}.{}", f.name))?)))
                .collect::<Result<Vec<_>, SchemaError>>()?;
            TypeNode::Struct(fields)
        }
        Schema::Union(branches) => {
            let non_null: Vec<&Schema> = branches.iter().filter(|b| **b != Schema::Null).collect();
            let inner = match non_null.as_slice() {
                [] => return Err(unsupported(path, schema.type_name())),
                [single] => to_type_node(single, path)?,
                many => {
                    let mut nodes = Vec::with_capacity(many.len());
                    for branch in many {
                        if matches!(branch, Schema::Union(_)) {
                            return Err(unsupported(path, schema.type_name()));
                        }
                        let node = to_type_node(branch, path)?;
                        // Branches that render alike cannot be told apart on decode.
                        if nodes.contains(&node) {
                            return Err(unsupported(path, schema.type_name()));
                        }
                        nodes.push(node);
                    }
                    TypeNode::Union(nodes)
                }
            };
            if matches!(inner, TypeNode::Nullable(_)) {
                return Err(unsupported(path, schema.type_name()));
            }
            if non_null.len() < branches.len() {
                TypeNode::Nullable(Box::new(inner))
            } else {
                inner
            }
        }
    })
}

fn from_type_node(node: &TypeNode, path: &str) -> Result<Schema, SchemaError> {
    Ok(match node {
        TypeNode::Primitive { name, .. } => match name.as_str() {
            "boolean" => Schema::Boolean,
            "tinyint" | "smallint" | "int" | "integer" => Schema::Int,
            "bigint" | "long" => Schema::Long,
            "float" => Schema::Float,
            "double" => Schema::Double,
            "string" | "char" | "varchar" => Schema::String,
            "binary" => Schema::Bytes,
            _ => return Err(unsupported(path, node.to_string())),
        },
        TypeNode::Array(items) => {
            Schema::Array(Box::new(from_type_node(items, &format!("{path}.element"))?))
        }
        TypeNode::Map(key, value) => {
            if from_type_node(key, &format!("{path}.key"))? != Schema::String {
                return Err(unsupported(path, node.to_string()));
            }
            Schema::Map(Box::new(from_type_node(value, &format!("{path}.value"))?))
        }
        TypeNode::Struct(fields) => {
            let fields = fields
                .iter()
                .map(|(name, field_node)| {
                    let schema = from_type_node(field_node, &format!("{path}.{name}"))?;
                    let default = schema.is_nullable().then_some(Value::Null);
                    Ok(Field {
                        name: name.clone(),
                        schema,
                        doc: None,
                        default,
                    })
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            Schema::Record(RecordSchema {
                name: record_name_for(path),
                namespace: None,
                doc: None,
                fields,
            })
        }
        TypeNode::Union(branches) => Schema::Union(
            branches
                .iter()
                .map(|b| match b {
                    TypeNode::Union(_) | TypeNode::Nullable(_) => {
                        Err(unsupported(path, node.to_string()))
                    }
                    other => from_type_node(other, path),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        TypeNode::Nullable(inner) => match from_type_node(inner, path)? {
            Schema::Union(branches) if branches.contains(&Schema::Null) => {
                return Err(unsupported(path, node.to_string()));
            }
            Schema::Union(branches) => {
                let mut all = Vec::with_capacity(branches.len() + 1);
                all.push(Schema::Null);
                all.extend(branches);
                Schema::Union(all)
            }
            other => Schema::Union(vec![Schema::Null, other]),
        },
    })
}

/// Record name for a struct column: the last path segment.
fn record_name_for(path: &str) -> String {
    path.rsplit('.').next().unwrap_or(path).to_string()
}
