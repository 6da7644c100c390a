use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use kitestone_core::config::CatalogConfig;
use tracing::debug;

mod commands;
mod display;
mod executor;

use commands::Command;
use display::OutputMode;

/// Kitestone console: encode, decode and evolve catalog table records.
#[derive(Parser, Debug)]
#[command(name = "kitestone", version)]
struct Cli {
    /// Config file (default: ~/.config/kitestone/config.toml if present).
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Output results as machine-parseable JSON.
    #[arg(short, long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kitestone").join("config.toml"))
}

fn load_config(explicit: Option<&Path>) -> Result<CatalogConfig, kitestone_core::error::Error> {
    if let Some(path) = explicit {
        return CatalogConfig::from_file(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => CatalogConfig::from_file(&path),
        _ => Ok(CatalogConfig::default()),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    process::exit(run(cli));
}

/// Run one command.
///
/// Returns exit code: 0 = success, 1 = error.
fn run(cli: Cli) -> i32 {
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Pretty
    };

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            display::render_error(&e, &mode);
            return 1;
        }
    };
    debug!(?config, "loaded configuration");

    match executor::execute(cli.command, &config) {
        Ok(result) => {
            display::render(&result, &mode);
            0
        }
        Err(e) => {
            display::render_error(&e, &mode);
            1
        }
    }
}
