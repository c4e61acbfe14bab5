pub mod retry;

use anyhow::{Context, Result};
use config::builder::{ConfigBuilder, DefaultState};
use config::{Environment, File};
use std::path::Path;
use tracing::info;

use crate::models::common::Config;

/// Loads `.env` (if any), then the optional YAML file, then environment
/// variables. Nested keys use a double underscore, e.g. `RPC__MAX_ATTEMPTS`.
pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    if dotenv::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }

    let config_path = file_name.as_ref();
    info!("Config path: {}", config_path.to_string_lossy());

    let builder = config::Config::builder()
        .add_source(File::from(config_path).required(false))
        .add_source(Environment::default().separator("__").try_parsing(true));

    build_config(builder)
}

fn build_config(builder: ConfigBuilder<DefaultState>) -> Result<Config> {
    let config: Config = builder
        .build()
        .context("failed to read config sources")?
        .try_deserialize()
        .context("failed to parse config")?;

    config.validate().context("invalid config")?;

    Ok(config)
}

/// Reduces a raw `swap_coin` value such as `"100000 ukrw"` to its amount.
///
/// Only spaces and lowercase ASCII letters are removed. Uppercase denoms or
/// exponents pass through untouched.
pub fn strip_swap_coin_amount(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != ' ' && !c.is_ascii_lowercase())
        .collect()
}

pub(crate) fn strip_html(error: &str) -> String {
    // If the error contains HTML tags, extract just the text content
    if error.contains("<!doctype html>") || error.contains("<html>") {
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        error.to_string()
    }
}
