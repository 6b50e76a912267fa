mod cli;
mod display;
mod error;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, RunCommand};
use climapolicy::config::Config;
use log::debug;

use crate::error::CliResult;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config = match args.config.as_deref() {
        Some(path) => read_config_from_toml(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?,
        None => read_default_config()?,
    };
    let config = args.apply_source(config);
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config)?;
    }
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    // macOS: ~/Library/Application Support/climapolicy/config.toml
    dirs::config_dir().map(|dir| dir.join("climapolicy").join("config.toml"))
}

fn read_config_from_toml(path: &Path) -> CliResult<Config> {
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Reads the config from the user's config directory. A missing file means the defaults.
fn read_default_config() -> CliResult<Config> {
    let Some(path) = default_config_path() else {
        return Ok(Config::default());
    };
    match read_config_from_toml(&path) {
        Err(error::CliError::IOError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(Config::default())
        }
        other => other,
    }
}
