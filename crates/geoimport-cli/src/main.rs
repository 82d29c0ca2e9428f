//! Command-line interface for `geoimport`, a diagnostic tool for the import
//! format resolution engine.
//!
//! This binary reports how the [`geoimport_core`] library would handle an input
//! without importing anything.
//!
//! # Architecture
//!
//! The CLI is built using [`clap`] for argument parsing and [`tracing`] for structured logging.
//! It parses arguments, configures logging, and delegates to command handlers.
//!
//! # Available Commands
//!
//! - `formats` - List the registered extensions, vector stores and grid formats
//! - `resolve` - Report which format reads a file

mod display;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_log::LogTracer;
use tracing_subscriber::FmtSubscriber;

use geoimport_core::config::{DEFAULT_PREFERRED_GRID_FORMAT, ResolverConfig};
use geoimport_core::error::ImportError;
use geoimport_core::resolver::FormatResolver;
use geoimport_core_common::InputDescriptor;

#[derive(Parser)]
#[command(
    name = "geoimport",
    version,
    about = "Inspect how geospatial inputs are resolved for import"
)]
/// Command-line arguments and options for the `geoimport` CLI.
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug (DEBUG level) logging output with detailed diagnostics.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the `geoimport` CLI.
#[derive(Subcommand)]
enum Commands {
    /// Lists the registered extensions, vector stores and grid formats.
    Formats,

    /// Reports which format handler reads a file.
    Resolve {
        /// Path to the file to resolve.
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Grid format that wins when several grid formats claim the file.
        #[arg(long, value_name = "NAME", default_value = DEFAULT_PREFERRED_GRID_FORMAT)]
        preferred_grid_format: String,
    },
}

/// Entry point for the `geoimport` command-line interface.
///
/// # Errors
///
/// Returns an error if command execution fails or if the logging system cannot be initialized.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity flags
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // Bridge logs from the `log` crate to the `tracing` ecosystem.
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Formats => {
            display::display_formats(&FormatResolver::with_builtin_formats());
        },
        Commands::Resolve {
            input,
            preferred_grid_format,
        } => {
            info!("Resolving {}", input.display());
            let resolver = FormatResolver::with_builtin_formats().with_config(ResolverConfig {
                preferred_grid_format,
            });
            handle_resolve(&resolver, &input)?;
        },
    }

    Ok(())
}

/// Name of the handler resolving `path`, if any.
fn resolve_name(resolver: &FormatResolver, path: &Path) -> Result<Option<String>, ImportError> {
    Ok(resolver
        .resolve(&InputDescriptor::file(path))?
        .map(|handler| handler.name().to_string()))
}

fn handle_resolve(resolver: &FormatResolver, path: &Path) -> Result<()> {
    match resolve_name(resolver, path) {
        Ok(Some(name)) => println!("{}: {name}", path.display()),
        Ok(None) => println!("{}: No format found", path.display()),
        Err(e) => {
            if let Some(suggestion) = e.recovery_suggestion() {
                eprintln!("Hint: {suggestion}");
            }
            return Err(anyhow!(e.user_message()));
        },
    }
    Ok(())
}
