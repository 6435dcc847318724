//! Logging configuration and initialization.
//!
//! Structured logging with:
//! - Presets (production, verbose, debug, trace, quiet)
//! - Per-target level overrides via `--log target=level`
//! - JSON output for log aggregation
//! - `RUST_LOG` taking precedence when set

use clap::Args;
use std::collections::BTreeMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const TARGET_PREFIX: &str = "pristine::";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Startup and warnings only
    #[default]
    Production,
    /// One line per request
    Verbose,
    Debug,
    Trace,
    /// Warnings and errors only
    Quiet,
}

/// Logging flags shared by the binary's CLI.
#[derive(Args, Debug, Clone, Default)]
pub struct LogArgs {
    /// Log every request
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Enable trace logging for everything
    #[arg(long)]
    pub trace: bool,

    /// Warnings and errors only
    #[arg(short, long)]
    pub quiet: bool,

    /// Set the level of one target (e.g. "server=debug"). Repeatable.
    /// Targets are prefixed with "pristine::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL")]
    pub overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    pub format: LogFormat,
}

/// Resolved logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    pub overrides: BTreeMap<String, Level>,
    pub format: LogFormat,
}

impl From<&LogArgs> for LogConfig {
    fn from(args: &LogArgs) -> Self {
        // The quietest flag given wins
        let preset = if args.quiet {
            LogPreset::Quiet
        } else if args.trace {
            LogPreset::Trace
        } else if args.debug {
            LogPreset::Debug
        } else if args.verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        let overrides = args
            .overrides
            .iter()
            .flat_map(|arg| arg.split(','))
            .filter_map(|part| {
                let (target, level) = part.split_once('=')?;
                let level = level.trim().parse::<Level>().ok()?;
                Some((full_target(target.trim()), level))
            })
            .collect();

        Self {
            preset,
            overrides,
            format: args.format,
        }
    }
}

/// "server" -> "pristine::server"; crate targets like "tower_http" pass through.
fn full_target(target: &str) -> String {
    if target.starts_with(TARGET_PREFIX) || target == "tower_http" {
        target.to_string()
    } else {
        format!("{TARGET_PREFIX}{target}")
    }
}

impl LogConfig {
    fn directives(&self) -> Vec<String> {
        let base: &[&str] = match self.preset {
            LogPreset::Production => &[
                "pristine::startup=info",
                "pristine::server=warn",
                "tower_http=warn",
            ],
            LogPreset::Verbose => &["pristine=info", "tower_http=info"],
            LogPreset::Debug => &["pristine=debug", "tower_http=debug"],
            LogPreset::Trace => &["pristine=trace", "tower_http=trace"],
            LogPreset::Quiet => &["pristine=warn", "tower_http=error"],
        };

        let mut directives: Vec<String> = base.iter().map(|d| d.to_string()).collect();
        directives.extend(
            self.overrides
                .iter()
                .map(|(target, level)| format!("{}={}", target, level.as_str().to_ascii_lowercase())),
        );
        directives
    }

    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        EnvFilter::try_new(self.directives().join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_file(false).with_line_number(false))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true).with_span_events(FmtSpan::CLOSE))
                .init();
        }
    }
}
