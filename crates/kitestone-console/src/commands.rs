use std::path::PathBuf;

use clap::Subcommand;
use kitestone_core::types::{CompressionType, Format};

/// A console subcommand.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a catalog table record from a dataset description.
    Encode {
        /// Table name.
        name: String,

        /// Namespace (defaults to the configured namespace).
        #[arg(short, long)]
        namespace: Option<String>,

        /// Avro schema file to embed as columns.
        #[arg(long, conflicts_with = "schema_uri", required_unless_present = "schema_uri")]
        schema: Option<PathBuf>,

        /// Schema location URI to resolve and reference from the table.
        #[arg(long)]
        schema_uri: Option<String>,

        /// Data location URI.
        #[arg(short, long)]
        location: Option<String>,

        #[arg(short, long)]
        format: Option<Format>,

        #[arg(short, long)]
        compression: Option<CompressionType>,

        /// Partition expression, e.g. '[hash("id", "id_hash", 16)]'.
        #[arg(short, long)]
        partition: Option<String>,

        /// Custom property as KEY=VALUE (can be repeated).
        #[arg(long = "property", value_parser = parse_property)]
        properties: Vec<(String, String)>,

        /// Create an external table.
        #[arg(long)]
        external: bool,

        /// Write the table record here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Read a table record file back into a dataset description.
    Decode {
        /// Table record JSON file.
        table: PathBuf,
    },

    /// Evolve a table record file to a new Avro schema.
    Evolve {
        /// Table record JSON file.
        table: PathBuf,

        /// New Avro schema file.
        schema: PathBuf,

        /// Show the changes without writing the table record.
        #[arg(long)]
        dry_run: bool,

        /// Write the evolved record here instead of over the input file.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check an Avro schema file and show its catalog columns.
    Validate {
        schema: PathBuf,
    },

    /// Parse catalog type strings and show their canonical form.
    Types {
        #[arg(required = true)]
        type_strings: Vec<String>,
    },
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
