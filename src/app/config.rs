//! TOML configuration file loading
//!
//! Values from the file only fill arguments the command line left unset.
//! Without `--config-file` the default location
//! `<config_dir>/Msgpipe/msgpipe.toml` is used when it exists.
//!
//! ```toml
//! mode = "http"
//! workers = 3
//! limit = 10
//! interval-ms = 500
//! log-level = "debug"
//!
//! [[requests]]
//! url = "https://example.com/health"
//! ```

use crate::app::args::Args;
use crate::core::error_handling::ContextualError;
use crate::core::validation::{validate_http_url, validate_positive_int};
use crate::http::HttpPollRequest;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Problem with the configuration file or a value in it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// `<config_dir>/Msgpipe/msgpipe.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Msgpipe").join("msgpipe.toml"))
}

/// Load the configuration file into `args`
///
/// Returns the path that was loaded, or `None` when no file applies. An
/// explicitly named file must exist; the default one is optional.
pub async fn load_config_file(args: &mut Args) -> Result<Option<PathBuf>, ConfigError> {
    let path = match args.config_file.clone() {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::new(format!(
                    "The specified configuration file does not exist: {}",
                    path.display()
                )));
            }
            path
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
        ConfigError::new(format!(
            "Error reading configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    apply_config_str(args, &contents, &path)?;
    Ok(Some(path))
}

/// Parse `contents` as TOML and apply it to `args`
pub fn apply_config_str(args: &mut Args, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table = toml::from_str::<toml::Table>(contents).map_err(|e| {
        ConfigError::new(format!(
            "Error parsing configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    apply_toml_values(args, &table).map_err(|e| {
        ConfigError::new(format!(
            "Error in configuration file {}: {}",
            path.display(),
            e
        ))
    })
}

fn positive(config: &toml::Table, key: &str) -> Result<Option<usize>, ConfigError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .as_integer()
                .ok_or_else(|| ConfigError::new(format!("'{}' must be an integer", key)))?;
            validate_positive_int(&raw.to_string())
                .map(Some)
                .map_err(|e| ConfigError::new(format!("'{}': {}", key, e)))
        }
    }
}

fn non_negative(config: &toml::Table, key: &str) -> Result<Option<u64>, ConfigError> {
    match config.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ConfigError::new(format!("'{}' must be a non-negative integer", key))),
    }
}

fn string(config: &toml::Table, key: &str) -> Option<String> {
    config.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Fill unset fields of `args` from a parsed configuration table
pub fn apply_toml_values(args: &mut Args, config: &toml::Table) -> Result<(), ConfigError> {
    if args.mode.is_none() {
        args.mode = string(config, "mode");
    }
    if args.workers.is_none() {
        args.workers = positive(config, "workers")?;
    }
    if args.limit.is_none() {
        args.limit = positive(config, "limit")?;
    }
    if args.producers.is_none() {
        args.producers = positive(config, "producers")?;
    }
    if args.messages.is_none() {
        args.messages = positive(config, "messages")?;
    }
    if args.interval.is_none() {
        args.interval = non_negative(config, "interval-ms")?.map(Duration::from_millis);
    }
    if args.stage_delay.is_none() {
        args.stage_delay = non_negative(config, "stage-delay-ms")?.map(Duration::from_millis);
    }
    if args.run_secs.is_none() {
        args.run_secs = non_negative(config, "run-secs")?;
    }
    if args.grace_secs.is_none() {
        args.grace_secs = non_negative(config, "grace-secs")?;
    }

    if let Some(color) = config.get("color").and_then(|v| v.as_bool()) {
        args.config_color = Some(color);
    }
    if args.log_level.is_none() {
        args.log_level = string(config, "log-level");
    }
    if args.log_file.is_none() {
        args.log_file = string(config, "log-file").map(PathBuf::from);
    }
    if args.log_format.is_none() {
        args.log_format = string(config, "log-format");
    }

    if let Some(requests) = config.get("requests") {
        let requests: Vec<HttpPollRequest> = requests
            .clone()
            .try_into()
            .map_err(|e| ConfigError::new(format!("invalid [[requests]] entry: {}", e)))?;
        for request in &requests {
            validate_http_url(&request.url).map_err(ConfigError::new)?;
        }
        args.requests = requests;
    }

    Ok(())
}
