//! Avro JSON schema text: parsing and rendering.
//!
//! Named types (records, enums, fixed) may be referenced by name after their
//! first definition. Rendering emits a name reference for every repeated
//! occurrence so the output parses back.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::{EnumSchema, Field, FixedSchema, RecordSchema, Schema};
use crate::error::SchemaError;

impl Schema {
    /// Parse Avro schema JSON text.
    pub fn parse_str(text: &str) -> Result<Schema, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Schema::from_json(&value)
    }

    /// Parse an Avro schema from a JSON value.
    pub fn from_json(value: &Value) -> Result<Schema, SchemaError> {
        let mut parser = Parser::default();
        let schema = parser.parse(value, None)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn to_json(&self) -> Value {
        to_json(self)
    }
}

#[derive(Default)]
struct Parser {
    named: HashMap<String, Schema>,
}

impl Parser {
    fn parse(&mut self, value: &Value, namespace: Option<&str>) -> Result<Schema, SchemaError> {
        match value {
            Value::String(name) => self.parse_name(name, namespace),
            Value::Array(branches) => {
                let branches = branches
                    .iter()
                    .map(|b| self.parse(b, namespace))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Schema::Union(branches))
            }
            Value::Object(obj) => self.parse_object(obj, namespace),
            other => Err(SchemaError::Invalid(format!("not a schema: {other}"))),
        }
    }

    fn parse_name(&self, name: &str, namespace: Option<&str>) -> Result<Schema, SchemaError> {
        if let Some(primitive) = primitive(name) {
            return Ok(primitive);
        }
        let qualified = qualify(name, namespace);
        self.named
            .get(&qualified)
            .or_else(|| self.named.get(name))
            .cloned()
            .ok_or_else(|| SchemaError::Invalid(format!("unknown type: {name}")))
    }

    fn parse_object(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::Invalid("schema object has no \"type\"".to_string()))?;

        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} or {"type": [...]} wraps another schema.
            nested => return self.parse(nested, namespace),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, namespace),
            "enum" => {
                let (name, full_name) = named(obj, namespace)?;
                let symbols = obj
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| SchemaError::Invalid(format!("enum {name} has no symbols")))?
                    .iter()
                    .map(|s| {
                        s.as_str().map(str::to_string).ok_or_else(|| {
                            SchemaError::Invalid(format!("enum {name} has a non-string symbol"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let schema = Schema::Enum(EnumSchema { name, symbols });
                self.register(full_name, &schema)?;
                Ok(schema)
            }
            "fixed" => {
                let (name, full_name) = named(obj, namespace)?;
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| SchemaError::Invalid(format!("fixed {name} has no size")))?;
                let schema = Schema::Fixed(FixedSchema {
                    name,
                    size: size as usize,
                });
                self.register(full_name, &schema)?;
                Ok(schema)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| SchemaError::Invalid("array has no items".to_string()))?;
                Ok(Schema::Array(Box::new(self.parse(items, namespace)?)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| SchemaError::Invalid("map has no values".to_string()))?;
                Ok(Schema::Map(Box::new(self.parse(values, namespace)?)))
            }
            // Primitive in object form, possibly carrying a logicalType that
            // does not change the underlying representation.
            other => self.parse_name(other, namespace),
        }
    }

    fn parse_record(
        &mut self,
        obj: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaError> {
        let (name, full_name) = named(obj, namespace)?;
        let record_namespace = obj
            .get("namespace")
            .and_then(Value::as_str)
            .map(str::to_string);
        let field_namespace = record_namespace.clone().or_else(|| namespace.map(str::to_string));

        let raw_fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::Invalid(format!("record {name} has no fields")))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for raw in raw_fields {
            let field_name = raw
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::Invalid(format!("record {name} has a nameless field")))?;
            let field_type = raw.get("type").ok_or_else(|| {
                SchemaError::Invalid(format!("field {name}.{field_name} has no type"))
            })?;
            fields.push(Field {
                name: field_name.to_string(),
                schema: self.parse(field_type, field_namespace.as_deref())?,
                doc: raw.get("doc").and_then(Value::as_str).map(str::to_string),
                default: raw.get("default").cloned(),
            });
        }

        let schema = Schema::Record(RecordSchema {
            name,
            namespace: record_namespace,
            doc: obj.get("doc").and_then(Value::as_str).map(str::to_string),
            fields,
        });
        self.register(full_name, &schema)?;
        Ok(schema)
    }

    fn register(&mut self, full_name: String, schema: &Schema) -> Result<(), SchemaError> {
        if self.named.contains_key(&full_name) {
            return Err(SchemaError::Invalid(format!("type redefined: {full_name}")));
        }
        self.named.insert(full_name, schema.clone());
        Ok(())
    }
}

fn primitive(name: &str) -> Option<Schema> {
    Some(match name {
        "null" => Schema::Null,
        "boolean" => Schema::Boolean,
        "int" => Schema::Int,
        "long" => Schema::Long,
        "float" => Schema::Float,
        "double" => Schema::Double,
        "bytes" => Schema::Bytes,
        "string" => Schema::String,
        _ => return None,
    })
}

fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !name.contains('.') && !ns.is_empty() => format!("{ns}.{name}"),
        _ => name.to_string(),
    }
}

/// Returns the simple name and the namespace-qualified name of a named type.
fn named(
    obj: &Map<String, Value>,
    namespace: Option<&str>,
) -> Result<(String, String), SchemaError> {
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::Invalid("named type has no name".to_string()))?;
    let ns = obj.get("namespace").and_then(Value::as_str).or(namespace);
    Ok((name.to_string(), qualify(name, ns)))
}

/// Render a schema as Avro JSON.
pub fn to_json(schema: &Schema) -> Value {
    render(schema, &mut HashSet::new())
}

fn render(schema: &Schema, emitted: &mut HashSet<String>) -> Value {
    match schema {
        Schema::Null => Value::from("null"),
        Schema::Boolean => Value::from("boolean"),
        Schema::Int => Value::from("int"),
        Schema::Long => Value::from("long"),
        Schema::Float => Value::from("float"),
        Schema::Double => Value::from("double"),
        Schema::Bytes => Value::from("bytes"),
        Schema::String => Value::from("string"),
        Schema::Enum(e) => {
            if !emitted.insert(e.name.clone()) {
                return Value::from(e.name.as_str());
            }
            serde_json::json!({"type": "enum", "name": e.name, "symbols": e.symbols})
        }
        Schema::Fixed(f) => {
            if !emitted.insert(f.name.clone()) {
                return Value::from(f.name.as_str());
            }
            serde_json::json!({"type": "fixed", "name": f.name, "size": f.size})
        }
        Schema::Array(items) => {
            serde_json::json!({"type": "array", "items": render(items, emitted)})
        }
        Schema::Map(values) => {
            serde_json::json!({"type": "map", "values": render(values, emitted)})
        }
        Schema::Union(branches) => {
            Value::Array(branches.iter().map(|b| render(b, emitted)).collect())
        }
        Schema::Record(record) => {
            let full_name = qualify(&record.name, record.namespace.as_deref());
            if !emitted.insert(full_name.clone()) {
                return Value::from(full_name);
            }
            let mut obj = Map::new();
            obj.insert("type".to_string(), Value::from("record"));
            obj.insert("name".to_string(), Value::from(record.name.as_str()));
            if let Some(ns) = &record.namespace {
                obj.insert("namespace".to_string(), Value::from(ns.as_str()));
            }
            if let Some(doc) = &record.doc {
                obj.insert("doc".to_string(), Value::from(doc.as_str()));
            }
            let fields = record
                .fields
                .iter()
                .map(|field| {
                    let mut f = Map::new();
                    f.insert("name".to_string(), Value::from(field.name.as_str()));
                    f.insert("type".to_string(), render(&field.schema, emitted));
                    if let Some(doc) = &field.doc {
                        f.insert("doc".to_string(), Value::from(doc.as_str()));
                    }
                    if let Some(default) = &field.default {
                        f.insert("default".to_string(), default.clone());
                    }
                    Value::Object(f)
                })
                .collect();
            obj.insert("fields".to_string(), Value::Array(fields));
            Value::Object(obj)
        }
    }
}
