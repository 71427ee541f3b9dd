//! Common CLI flags for logging

use std::io;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when neither `--log-filter` nor `-v` is given.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// CLI config for the logging related subset of options.
#[derive(Debug, Clone, clap::Parser)]
pub struct LoggingConfig {
    /// Logs: filter directive
    ///
    /// Configures log severity level filter, by target.
    ///
    /// Simplest options: error, warn, info, debug, trace
    ///
    /// Levels for different modules can be specified. For example
    /// `debug,hyper::proto::h1=info` specifies debug logging for all modules
    /// except for the `hyper::proto::h1` module which will only display info
    /// level logging.
    ///
    /// Overridden by `-v`.
    #[clap(long = "log-filter", env = "LOG_FILTER")]
    pub log_filter: Option<String>,

    /// Logs: filter short-hand
    ///
    /// Convenient way to set log severity level filter.
    /// Overrides `--log-filter`.
    ///
    /// -v   'info'
    ///
    /// -vv  'debug,hyper::proto::h1=info,h2=info'
    ///
    /// -vvv 'trace,hyper::proto::h1=info,h2=info'
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub log_verbose_count: u8,

    /// Logs: message format
    ///
    /// Logs are written to stderr; stdout carries the run report.
    #[clap(
        long = "log-format",
        env = "LOG_FORMAT",
        value_enum,
        default_value = "full"
    )]
    pub log_format: LogFormat,
}

/// Log message format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable, single line
    Full,
    /// Human-readable, shorter single line
    Compact,
    /// Machine-parseable JSON, one object per line
    Json,
}

impl LoggingConfig {
    /// The filter directive in effect, `-v` taking precedence over
    /// `--log-filter`.
    pub fn filter_directive(&self) -> String {
        match self.log_verbose_count {
            0 => self
                .log_filter
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            1 => "info".to_string(),
            2 => "debug,hyper::proto::h1=info,h2=info".to_string(),
            _ => "trace,hyper::proto::h1=info,h2=info".to_string(),
        }
    }

    /// Install a global `tracing` subscriber configured from these flags.
    pub fn install_global_subscriber(&self) -> Result<(), anyhow::Error> {
        let filter = EnvFilter::try_new(self.filter_directive())
            .with_context(|| format!("invalid log filter `{}`", self.filter_directive()))?;

        let builder = fmt().with_env_filter(filter).with_writer(io::stderr);

        let installed = match self.log_format {
            LogFormat::Full => builder.try_init(),
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };

        installed.map_err(|e| anyhow::anyhow!("setting global subscriber failed: {e}"))
    }
}
