use docrelay_config::Environment;
use std::io::{Error, Write};
use std::sync::{Once, OnceLock};
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, InitError},
};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// The key used in json logs to identify the pipeline emitting the line.
const PIPELINE_KEY_IN_LOG: &str = "pipeline";

/// Directory receiving rolling log files in production.
const LOG_DIR: &str = "logs";

/// Maximum number of rolled log files kept on disk.
const MAX_LOG_FILES: usize = 5;

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Keeps the non-blocking file writer alive. Dropping it flushes pending log lines.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Call this once at the beginning of a test and set `ENABLE_TRACING=1` to see logs:
///
/// ENABLE_TRACING=1 cargo test <test_name>
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Prod logs go to files, tests want the terminal.
            Environment::Dev.set();
            let _log_flusher = init_tracing("test").expect("failed to initialize test tracing");
        }
    });
}

static PIPELINE_NAME: OnceLock<String> = OnceLock::new();

/// Returns the pipeline name attached to json log lines, if one was set.
pub fn pipeline_name() -> Option<&'static str> {
    PIPELINE_NAME.get().map(|s| s.as_str())
}

/// Writer adding the pipeline name to every json line that does not carry one.
struct PipelineInjectingWriter<W> {
    inner: W,
}

impl<W> Write for PipelineInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(pipeline) = pipeline_name()
            && let Ok(line) = std::str::from_utf8(buf)
            && let Ok(serde_json::Value::Object(mut map)) =
                serde_json::from_str::<serde_json::Value>(line)
            && !map.contains_key(PIPELINE_KEY_IN_LOG)
        {
            map.insert(
                PIPELINE_KEY_IN_LOG.to_string(),
                serde_json::Value::String(pipeline.to_string()),
            );

            if let Ok(mut modified) = serde_json::to_string(&map) {
                if line.ends_with('\n') {
                    modified.push('\n');
                }

                // The caller only cares that its whole buffer was consumed.
                self.inner.write_all(modified.as_bytes())?;
                return Ok(buf.len());
            }
        }

        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Initializes tracing for the application.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_pipeline(app_name, None)
}

/// Initializes tracing, tagging json log lines with `pipeline` when provided.
///
/// Production-like environments write daily rolling json files, development writes
/// pretty output to the terminal. The level defaults to `info` unless `RUST_LOG` is set.
pub fn init_tracing_with_pipeline(
    app_name: &str,
    pipeline: Option<String>,
) -> Result<LogFlusher, TracingError> {
    if let Some(pipeline) = pipeline {
        let _ = PIPELINE_NAME.set(pipeline);
    }

    // Routes records of libraries using the `log` crate into tracing.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || PipelineInjectingWriter {
                inner: file_appender.make_writer(),
            })
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(true)
        .with_target(true)
        .compact()
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Logs panics before handing them to the previously installed hook.
fn set_tracing_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log_panic(panic_info);
        previous_hook(panic_info);
    }));
}

fn log_panic(panic_info: &PanicHookInfo) {
    let payload = panic_info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic_info.payload().downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload");
    let location = panic_info.location().map(|location| location.to_string());

    // Capturing only succeeds when RUST_BACKTRACE or RUST_LIB_BACKTRACE enables it.
    let backtrace = Backtrace::capture();
    let backtrace = (backtrace.status() == BacktraceStatus::Captured).then_some(backtrace);

    tracing::error!(
        panic.payload = payload,
        panic.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        "a panic occurred",
    );
}
