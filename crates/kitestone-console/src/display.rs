use kitestone_core::catalog::{Column, ColumnChange, TableRecord};
use kitestone_core::descriptor::DatasetDescriptor;
use serde_json::{Value, json};

use crate::executor::CommandResult;

/// Output mode for rendering command results.
pub enum OutputMode {
    /// Human-readable output.
    Pretty,
    /// Machine-parseable JSON (one JSON object per result on stdout).
    Json,
}

/// Render a command result to stdout in the given mode.
pub fn render(result: &CommandResult, mode: &OutputMode) {
    match result {
        CommandResult::Table { table, written } => match (mode, written) {
            (OutputMode::Pretty, Some(path)) => {
                println!("Wrote table {} to {}.", table.qualified_name(), path.display())
            }
            (OutputMode::Pretty, None) => print_table(table),
            (OutputMode::Json, Some(path)) => println!(
                "{}",
                json!({"ok": true, "table": table.qualified_name(), "path": path.display().to_string()})
            ),
            (OutputMode::Json, None) => print_json(&json!({"table": table})),
        },
        CommandResult::Descriptor(descriptor) => match mode {
            OutputMode::Pretty => print_descriptor(descriptor),
            OutputMode::Json => print_json(&descriptor_json(descriptor)),
        },
        CommandResult::Diff { diff, written } => match mode {
            OutputMode::Pretty => {
                if diff.is_empty() {
                    println!("No changes.");
                } else {
                    for change in diff.changes() {
                        println!("  {change}");
                    }
                    println!("({} change(s))", diff.len());
                }
                if let Some(path) = written {
                    println!("Wrote {}.", path.display());
                }
            }
            OutputMode::Json => {
                let changes: Vec<Value> = diff.changes().iter().map(change_json).collect();
                println!(
                    "{}",
                    json!({
                        "changes": changes,
                        "path": written.as_ref().map(|p| p.display().to_string()),
                    })
                );
            }
        },
        CommandResult::Columns(columns) => match mode {
            OutputMode::Pretty => print_columns(columns),
            OutputMode::Json => println!("{}", json!({"columns": columns})),
        },
        CommandResult::Types(parsed) => match mode {
            OutputMode::Pretty => {
                for (input, canonical, schema) in parsed {
                    println!("{input}");
                    println!("  catalog: {canonical}");
                    println!("  logical: {}", schema.to_json());
                }
            }
            OutputMode::Json => {
                let items: Vec<Value> = parsed
                    .iter()
                    .map(|(input, canonical, schema)| {
                        json!({"input": input, "type": canonical, "schema": schema.to_json()})
                    })
                    .collect();
                println!("{}", json!({"types": items}));
            }
        },
    }
}

/// Render an error in the given mode (always to stderr).
pub fn render_error(err: &dyn std::fmt::Display, mode: &OutputMode) {
    match mode {
        OutputMode::Pretty => eprintln!("Error: {err}"),
        OutputMode::Json => eprintln!("{}", json!({"error": err.to_string()})),
    }
}

pub fn descriptor_json(descriptor: &DatasetDescriptor) -> Value {
    json!({
        "schema": descriptor.schema().to_json(),
        "schema_uri": descriptor.schema_uri().map(|u| u.as_str()),
        "location": descriptor.location().map(|u| u.as_str()),
        "format": descriptor.format().name(),
        "compression_type": descriptor.compression_type().name(),
        "partition_strategy": descriptor.partition_strategy().map(|s| s.to_expression()),
        "properties": descriptor.properties(),
    })
}

fn change_json(change: &ColumnChange) -> Value {
    match change {
        ColumnChange::Add(column) => json!({"add": column}),
        ColumnChange::UpdateComment { position, comment } => {
            json!({"update_comment": {"position": position, "comment": comment}})
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error formatting output: {e}"),
    }
}

fn print_table(table: &TableRecord) {
    match serde_json::to_string_pretty(table) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error formatting table: {e}"),
    }
}

fn print_columns(columns: &[Column]) {
    if columns.is_empty() {
        println!("No columns.");
        return;
    }
    let width = columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for column in columns {
        match &column.comment {
            Some(comment) => println!("  {:width$}  {}  -- {}", column.name, column.data_type, comment),
            None => println!("  {:width$}  {}", column.name, column.data_type),
        }
    }
    println!("({} column(s))", columns.len());
}

fn print_descriptor(descriptor: &DatasetDescriptor) {
    match descriptor.schema_uri() {
        Some(uri) => println!("Schema:      {uri}"),
        None => println!("Schema:      (inline)"),
    }
    match descriptor.location() {
        Some(location) => println!("Location:    {location}"),
        None => println!("Location:    (none)"),
    }
    println!("Format:      {}", descriptor.format());
    println!("Compression: {}", descriptor.compression_type());
    match descriptor.partition_strategy() {
        Some(strategy) => println!("Partitions:  {strategy}"),
        None => println!("Partitions:  (none)"),
    }
    for (name, value) in descriptor.properties() {
        println!("Property:    {name} = {value}");
    }
    print_json(&descriptor.schema().to_json());
}
