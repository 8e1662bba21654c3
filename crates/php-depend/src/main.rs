//! php-depend command-line entry point.
//!
//! Parses the given PHP files into one linked model and reports what it
//! holds.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use php_depend::{load_config, Config, Engine};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "php-depend")]
#[command(about = "Parse PHP sources into a linked program model", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// PHP source files, analyzed in the order given
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}", e);
                return ExitCode::from(2);
            }
        },
        None => Config::default(),
    };

    let mut engine = Engine::new(config);
    if let Err(e) = engine.analyze_paths(&cli.files) {
        tracing::error!("Aborted: {}", e);
        return ExitCode::FAILURE;
    }

    let collisions = engine.method_errors();
    for error in &collisions {
        tracing::warn!("{}", error);
    }

    let builder = engine.builder();
    println!(
        "{} namespaces, {} types, {} functions, {} failed files, {} trait collisions",
        builder.namespaces().count(),
        builder.types().count(),
        builder.functions().count(),
        engine.errors().len(),
        collisions.len()
    );
    ExitCode::SUCCESS
}
