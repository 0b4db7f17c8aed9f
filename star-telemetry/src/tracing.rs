use std::io;
use std::sync::Once;

use star_config::Environment;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to install the log bridge: {0}")]
    LogTracer(#[from] SetLoggerError),

    #[error("failed to install the global tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the non-blocking writer alive.
///
/// Buffered log lines are flushed when this value is dropped, so it must live until `main`
/// returns.
#[must_use = "dropping the flusher stops log output"]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global tracing subscriber for `app_name`.
///
/// Development builds get human-readable output, production builds emit one JSON object per
/// line. Records produced through the `log` crate are forwarded into tracing.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    LogTracer::init()?;

    let (writer, guard) = tracing_appender::non_blocking(io::stdout());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match Environment::load() {
        Ok(Environment::Prod) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_writer(writer),
                )
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(writer))
                .try_init()?;
        }
    }

    tracing::info!(app = app_name, "tracing initialized");

    Ok(LogFlusher { _guard: guard })
}

static INIT_TEST_TRACING: Once = Once::new();

/// Installs a test subscriber when `ENABLE_TRACING` is set.
///
/// Safe to call from every test; only the first call has an effect.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_err() {
            return;
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
