//! Logging setup
//!
//! `RUST_LOG` controls filtering (`info` when unset). Three output formats:
//! a coloured line format for terminals, the compact fmt layer, and JSON for
//! log collectors.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target store timings are reported under
pub const TIMING_TARGET: &str = "crimson::timing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    fn as_str(self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [LogFormat::Pretty, LogFormat::Compact, LogFormat::Json]
            .into_iter()
            .find(|format| s.eq_ignore_ascii_case(format.as_str()))
            .ok_or_else(|| format!("unknown log format '{}', expected pretty, compact or json", s))
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// ANSI colours; ignored by the JSON format
    pub ansi: bool,
    pub show_target: bool,
    /// Source `file:line` of each event
    pub show_file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            ansi: true,
            show_target: true,
            show_file: true,
        }
    }
}

impl LogConfig {
    pub fn with_format(format: LogFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().event_format(LineFormatter::new(&config)))
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(config.ansi)
                    .with_target(config.show_target)
                    .with_file(config.show_file)
                    .with_line_number(config.show_file),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.show_target)
                    .with_file(config.show_file)
                    .with_line_number(config.show_file)
                    .with_current_span(true),
            )
            .try_init(),
    };

    if let Err(e) = installed {
        eprintln!("logger already initialised: {}", e);
    }
}

/// Reports how long a store operation took when dropped
pub struct Timer {
    operation: &'static str,
    table: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(operation: &'static str, table: &'static str) -> Self {
        Self {
            operation,
            table,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        tracing::trace!(
            target: TIMING_TARGET,
            operation = self.operation,
            table = self.table,
            elapsed_ms = self.elapsed().as_secs_f64() * 1000.0,
            "store operation finished"
        );
    }
}

/// `2024-01-01 12:00:00.000 [INFO] target src/file.rs:42 message fields`
struct LineFormatter {
    ansi: bool,
    show_target: bool,
    show_file: bool,
}

impl LineFormatter {
    fn new(config: &LogConfig) -> Self {
        Self {
            ansi: config.ansi,
            show_target: config.show_target,
            show_file: config.show_file,
        }
    }

    fn location(file: Option<&str>, line: Option<u32>) -> Option<String> {
        let file = file?;
        Some(match line {
            Some(line) => format!("{}:{}", file, line),
            None => file.to_string(),
        })
    }

    fn level_tag(&self, level: Level, writer: &mut Writer<'_>) -> fmt::Result {
        if !self.ansi {
            return write!(writer, "[{}]", level);
        }
        let colour = match level {
            Level::ERROR => 31,
            Level::WARN => 33,
            Level::INFO => 32,
            Level::DEBUG => 34,
            Level::TRACE => 35,
        };
        write!(writer, "\x1b[{}m[{}]\x1b[0m", colour, level)
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        write!(writer, "{} ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))?;
        self.level_tag(*meta.level(), &mut writer)?;
        if self.show_target {
            write!(writer, " {}", meta.target())?;
        }
        if self.show_file {
            if let Some(location) = Self::location(meta.file(), meta.line()) {
                write!(writer, " {}", location)?;
            }
        }
        write!(writer, " ")?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    #[test]
    fn test_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.ansi);
        assert!(config.show_file);

        let json = LogConfig::with_format(LogFormat::Json);
        assert_eq!(json.format, LogFormat::Json);
        assert!(json.show_target);
    }

    #[test]
    fn test_location() {
        assert_eq!(
            LineFormatter::location(Some("src/protocol/server.rs"), Some(42)).as_deref(),
            Some("src/protocol/server.rs:42")
        );
        assert_eq!(LineFormatter::location(Some("lib.rs"), None).as_deref(), Some("lib.rs"));
        assert!(LineFormatter::location(None, Some(7)).is_none());
    }

    #[test]
    fn test_timer_measures() {
        let timer = Timer::new("select", "users");
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed() >= Duration::from_millis(2));
    }
}
