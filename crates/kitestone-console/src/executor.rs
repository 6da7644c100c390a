use std::path::{Path, PathBuf};

use kitestone_core::catalog::evolve::{compute_and_apply, compute_diff};
use kitestone_core::catalog::{Column, ColumnDiff, DescriptorCodec, TableRecord};
use kitestone_core::config::CatalogConfig;
use kitestone_core::descriptor::{DatasetDescriptor, PartitionStrategy};
use kitestone_core::error::Error as CoreError;
use kitestone_core::io::resolver::FsSchemaResolver;
use kitestone_core::schema::Schema;
use kitestone_core::schema::convert::{from_type_string, to_columns, to_type_string};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::commands::Command;

/// Errors surfaced by console commands.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Kitestone(#[from] CoreError),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: invalid table record: {source}")]
    TableFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid URI '{uri}': {source}")]
    Uri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
}

/// Structured result from executing a command.
pub enum CommandResult {
    /// Table record produced by ENCODE. `written` is set when it went to a file.
    Table {
        table: TableRecord,
        written: Option<PathBuf>,
    },
    /// Descriptor read by DECODE.
    Descriptor(DatasetDescriptor),
    /// Changes computed by EVOLVE.
    Diff {
        diff: ColumnDiff,
        written: Option<PathBuf>,
    },
    /// Columns of a validated schema.
    Columns(Vec<Column>),
    /// Parsed type strings: (input, canonical type string, logical schema).
    Types(Vec<(String, String, Schema)>),
}

/// Execute a command with the given configuration.
pub fn execute(cmd: Command, config: &CatalogConfig) -> Result<CommandResult, ConsoleError> {
    let codec = DescriptorCodec::new(config.resolver());
    match cmd {
        Command::Encode {
            name,
            namespace,
            schema,
            schema_uri,
            location,
            format,
            compression,
            partition,
            properties,
            external,
            out,
        } => {
            let mut builder = DatasetDescriptor::builder()
                .format(format.unwrap_or(config.default_format))
                .compression_type(compression.unwrap_or_default());
            builder = match (schema, schema_uri) {
                (Some(path), _) => builder.schema(read_schema(&path)?),
                (None, Some(uri)) => builder.schema_uri(codec.resolver(), parse_uri(&uri)?)?,
                (None, None) => builder,
            };
            if let Some(location) = location {
                builder = builder.location(parse_uri(&location)?);
            }
            if let Some(expression) = partition {
                builder = builder.partition_strategy(
                    PartitionStrategy::parse_expression(&expression).map_err(CoreError::from)?,
                );
            }
            for (key, value) in properties {
                builder = builder.property(key, value);
            }
            let descriptor = builder.build()?;

            let namespace = namespace.unwrap_or_else(|| config.namespace.clone());
            let table = codec.encode(&namespace, &name, &descriptor, external || config.external)?;
            if let Some(path) = &out {
                write_table(path, &table)?;
            }
            Ok(CommandResult::Table {
                table,
                written: out,
            })
        }
        Command::Decode { table } => {
            let table = read_table(&table)?;
            Ok(CommandResult::Descriptor(codec.decode(&table)?))
        }
        Command::Evolve {
            table: table_path,
            schema,
            dry_run,
            out,
        } => exec_evolve(&codec, &table_path, &schema, dry_run, out),
        Command::Validate { schema } => {
            let schema = read_schema(&schema)?;
            // A descriptor build runs the same checks the codec relies on.
            DatasetDescriptor::builder().schema(schema.clone()).build()?;
            Ok(CommandResult::Columns(to_columns(&schema).map_err(CoreError::from)?))
        }
        Command::Types { type_strings } => {
            let mut parsed = Vec::with_capacity(type_strings.len());
            for input in type_strings {
                let schema = from_type_string(&input, &input).map_err(CoreError::from)?;
                let canonical = to_type_string(&schema, &input).map_err(CoreError::from)?;
                parsed.push((input, canonical, schema));
            }
            Ok(CommandResult::Types(parsed))
        }
    }
}

fn exec_evolve(
    codec: &DescriptorCodec<FsSchemaResolver>,
    table_path: &Path,
    schema_path: &Path,
    dry_run: bool,
    out: Option<PathBuf>,
) -> Result<CommandResult, ConsoleError> {
    let mut table = read_table(table_path)?;
    let current = codec.decode(&table)?;
    let descriptor = current.to_builder().schema(read_schema(schema_path)?).build()?;

    if dry_run {
        let diff = compute_diff(&table, &descriptor)?;
        return Ok(CommandResult::Diff {
            diff,
            written: None,
        });
    }

    let before = table.clone();
    let diff = compute_and_apply(&mut table, &descriptor)?;
    let target = out.unwrap_or_else(|| table_path.to_path_buf());
    if table == before && target == table_path {
        debug!(path = %target.display(), "table already up to date");
        return Ok(CommandResult::Diff {
            diff,
            written: None,
        });
    }
    write_table(&target, &table)?;
    Ok(CommandResult::Diff {
        diff,
        written: Some(target),
    })
}

fn parse_uri(raw: &str) -> Result<Url, ConsoleError> {
    Url::parse(raw).map_err(|source| ConsoleError::Uri {
        uri: raw.to_string(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String, ConsoleError> {
    std::fs::read_to_string(path).map_err(|source| ConsoleError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn read_schema(path: &Path) -> Result<Schema, ConsoleError> {
    let text = read_file(path)?;
    Schema::parse_str(&text).map_err(|e| CoreError::from(e).into())
}

pub fn read_table(path: &Path) -> Result<TableRecord, ConsoleError> {
    serde_json::from_str(&read_file(path)?).map_err(|source| ConsoleError::TableFile {
        path: path.display().to_string(),
        source,
    })
}

fn write_table(path: &Path, table: &TableRecord) -> Result<(), ConsoleError> {
    let mut text = serde_json::to_string_pretty(table).map_err(|source| ConsoleError::TableFile {
        path: path.display().to_string(),
        source,
    })?;
    text.push('\n');
    std::fs::write(path, text).map_err(|source| ConsoleError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), table = %table.qualified_name(), "wrote table record");
    Ok(())
}
