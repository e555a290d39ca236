mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, io::ErrorKind};
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Loads the configuration file and applies environment overrides.
pub async fn load() -> Result<Config> {
    let explicit_path = env::var("CONFIG_PATH").ok();
    let mut config = load_from(explicit_path.as_deref()).await?;

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;

    Ok(config)
}

/// Reads the YAML file at `path`, or `config.yaml` when no path is given.
///
/// A missing `config.yaml` falls back to built-in defaults, but an explicitly
/// named file must exist.
pub async fn load_from(path: Option<&str>) -> Result<Config> {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    debug!("Loading configuration from: {}", config_path);

    match tokio::fs::read_to_string(config_path).await {
        Ok(config_str) => parse(&config_str),
        Err(e) if e.kind() == ErrorKind::NotFound && path.is_none() => {
            debug!("No configuration file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn parse(config_str: &str) -> Result<Config> {
    // An empty document deserializes to unit, not to an empty mapping.
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(config_str)?)
}

/// Applies `OLLAMA_DEFAULT_MODEL`, `OLLAMA_API` and `PORT`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(model) = lookup("OLLAMA_DEFAULT_MODEL") {
        config.llm.model = model;
    }

    if let Some(base_url) = lookup("OLLAMA_API") {
        config.llm.base_url = base_url;
    }

    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("Invalid PORT value: '{}'", port)))?;
    }

    Ok(())
}

/// Parses a listening port given as the first startup argument.
pub fn parse_port_argument(arg: &str) -> Option<u16> {
    arg.trim().parse().ok()
}
