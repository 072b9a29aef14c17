use std::{
    fs::{self, File},
    io::{self, IsTerminal},
    path::Path,
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Name of the error log inside the configured log directory.
pub const ERROR_LOG_FILE: &str = "backend-error.log";

// --- Formatter ---

struct LocalFmt;

impl<S, N> FormatEvent<S, N> for LocalFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        if ansi {
            write!(writer, "\x1b[2m")?
        }
        write!(writer, "{} ", Local::now().format("%Y-%m-%dT%H:%M:%S%z"))?;
        if ansi {
            write!(writer, "\x1b[0m")?
        }

        let (pre, post) = if ansi {
            match *meta.level() {
                Level::ERROR => ("\x1b[1;31m", "\x1b[0m"),
                Level::WARN => ("\x1b[1;33m", "\x1b[0m"),
                Level::INFO => ("\x1b[1;32m", "\x1b[0m"),
                Level::DEBUG => ("\x1b[1;34m", "\x1b[0m"),
                Level::TRACE => ("\x1b[1;35m", "\x1b[0m"),
            }
        } else {
            ("", "")
        };
        write!(writer, "| {}{:>5}{} | ", pre, meta.level(), post)?;

        if ansi {
            write!(writer, "\x1b[36m{}\x1b[0m | ", meta.target())?;
        } else {
            write!(writer, "{} | ", meta.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `RUST_LOG` when set, otherwise `level` from the config file.
fn make_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'")),
    }
}

fn open_error_log(log_dir: &Path) -> Result<File> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory '{}'", log_dir.display()))?;
    let path = log_dir.join(ERROR_LOG_FILE);
    File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file '{}'", path.display()))
}

/// Initializes logging. Call once at startup.
///
/// - Console: stderr, so JSON on stdout stays clean. Colored when attached to
///   a terminal. Level from `RUST_LOG`, else `level`.
/// - File: `ERROR` records only, appended to `<log_dir>/backend-error.log`
///   when `log_dir` is given.
pub fn init_logging(
    level: &str,
    log_dir: Option<&Path>,
) -> Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(LocalFmt)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_filter(make_filter(level)?);

    let file_layer = log_dir
        .map(open_error_log)
        .transpose()?
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .event_format(LocalFmt)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_filter(LevelFilter::ERROR)
        });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")
}
