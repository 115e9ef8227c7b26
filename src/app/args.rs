//! Command-line arguments for the driver binary
//!
//! Every tunable is an `Option` so a configuration file can fill in what the
//! command line left out; see `app::config`.

use crate::app::config::ConfigError;
use crate::core::validation::{validate_http_url, validate_millis, validate_positive_int};
use crate::http::HttpPollRequest;
use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub const DEFAULT_PRODUCERS: usize = 10;
pub const DEFAULT_MESSAGES_PER_PRODUCER: usize = 3;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RUN_SECS: u64 = 20;
pub const DEFAULT_GRACE_SECS: u64 = 4;

/// Which consumer the driver wires up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DriverMode {
    /// Text messages through a channel queue
    #[default]
    Text,
    /// Text consumer on a stub queue that invents its own messages
    Stub,
    /// Poll requests through a channel queue
    Http,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "msgpipe")]
#[command(about = "Run producers and a worker-pool consumer over a shared message queue")]
#[command(version)]
#[command(after_help = " * can be specified multiple times")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Consumer to run
    #[arg(short = 'm', long = "mode", value_name = "MODE", value_parser = ["text", "stub", "http"])]
    pub mode: Option<String>,

    /// Concurrent worker loops
    #[arg(short = 'w', long = "workers", value_name = "COUNT", value_parser = validate_positive_int)]
    pub workers: Option<usize>,

    /// Maximum messages in flight across all workers
    #[arg(short = 'n', long = "limit", value_name = "COUNT", value_parser = validate_positive_int)]
    pub limit: Option<usize>,

    /// Number of producer tasks
    #[arg(short = 'p', long = "producers", value_name = "COUNT", value_parser = validate_positive_int)]
    pub producers: Option<usize>,

    /// Messages pushed by each producer
    #[arg(short = 'M', long = "messages", value_name = "COUNT", value_parser = validate_positive_int)]
    pub messages: Option<usize>,

    /// Pause between pushes of one producer
    #[arg(short = 'i', long = "interval-ms", value_name = "MILLIS", value_parser = validate_millis)]
    pub interval: Option<Duration>,

    /// Simulated work per stage
    #[arg(short = 'd', long = "stage-delay-ms", value_name = "MILLIS", value_parser = validate_millis)]
    pub stage_delay: Option<Duration>,

    /// Seconds to run before a graceful stop
    #[arg(short = 't', long = "run-secs", value_name = "SECONDS")]
    pub run_secs: Option<u64>,

    /// Seconds to wait for workers after stop before forcing them
    #[arg(long = "grace-secs", value_name = "SECONDS")]
    pub grace_secs: Option<u64>,

    /// URLs to poll in http mode*
    #[arg(short = 'u', long = "url", value_name = "URL", value_parser = validate_http_url, action = ArgAction::Append)]
    pub urls: Vec<String>,

    /// Force coloured output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Colour preference from the configuration file
    #[arg(skip)]
    pub config_color: Option<bool>,

    /// Requests from `[[requests]]` tables of the configuration file
    #[arg(skip)]
    pub requests: Vec<HttpPollRequest>,
}

/// Fully resolved driver parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    pub mode: DriverMode,
    /// `None` keeps the mode's factory default
    pub workers: Option<usize>,
    /// `None` keeps the mode's factory default
    pub limit: Option<usize>,
    pub producers: usize,
    pub messages_per_producer: usize,
    pub interval: Duration,
    pub stage_delay: Duration,
    pub run_for: Duration,
    pub grace: Duration,
    pub requests: Vec<HttpPollRequest>,
}

impl Args {
    /// Whether terminal output should be coloured
    ///
    /// `--no-color` beats `--color`, which beats the file, which beats TTY
    /// detection.
    pub fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        if self.color {
            return true;
        }
        self.config_color
            .unwrap_or_else(|| std::io::stdout().is_terminal())
    }

    /// Log file to write, with the magic values `none` and `-` disabling it
    pub fn log_file_path(&self) -> Option<&str> {
        self.log_file
            .as_deref()
            .and_then(|p| p.to_str())
            .filter(|p| !p.eq_ignore_ascii_case("none") && *p != "-")
    }

    /// Resolve defaults and turn the arguments into driver settings
    pub fn driver_settings(&self) -> Result<DriverSettings, ConfigError> {
        let mode = match self.mode.as_deref() {
            Some(name) => DriverMode::from_str(name).map_err(|_| {
                let known: Vec<String> = DriverMode::iter().map(|m| m.to_string()).collect();
                ConfigError::new(format!(
                    "Unknown mode '{}' (expected one of: {})",
                    name,
                    known.join(", ")
                ))
            })?,
            None => DriverMode::default(),
        };

        let mut requests: Vec<HttpPollRequest> = self
            .urls
            .iter()
            .map(|url| HttpPollRequest::get(url.clone()))
            .collect();
        requests.extend(self.requests.iter().cloned());

        Ok(DriverSettings {
            mode,
            workers: self.workers,
            limit: self.limit,
            producers: self.producers.unwrap_or(DEFAULT_PRODUCERS),
            messages_per_producer: self.messages.unwrap_or(DEFAULT_MESSAGES_PER_PRODUCER),
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
            stage_delay: self.stage_delay.unwrap_or(DEFAULT_STAGE_DELAY),
            run_for: Duration::from_secs(self.run_secs.unwrap_or(DEFAULT_RUN_SECS)),
            grace: Duration::from_secs(self.grace_secs.unwrap_or(DEFAULT_GRACE_SECS)),
            requests,
        })
    }
}
