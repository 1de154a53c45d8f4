use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use ::tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Honours `RUST_LOG` and falls back to `info`. Output goes to stderr in the
/// compact format so it never interleaves with data streamed on stdout.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info")?,
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Default test directives, one per workspace crate target
const TEST_FILTER: &str = "filestash_cache=debug,filestash_utils=debug";

/// Initialize tracing for tests
///
/// Output is captured by the test harness. Safe to call from every test: a
/// subscriber installed by an earlier test is kept.
pub fn init_for_tests() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(TEST_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}

/// Create a span for a single cache operation
pub fn cache_span(operation: &'static str, stem: &str) -> Span {
    span!(Level::DEBUG, "cache_op", operation = operation, stem = %stem)
}

/// Emit a structured event for cache lookups
pub fn cache_event(stem: &str, hit: bool, operation: &str) {
    if hit {
        debug!(
            stem = %stem,
            operation = %operation,
            "cache_hit"
        );
    } else {
        debug!(
            stem = %stem,
            operation = %operation,
            "cache_miss"
        );
    }
}
