use std::time::{Duration, Instant};

/// Initialize logging for a given demo.
///
/// Pacing decisions are traced from multiple threads, so thread names are
/// included in the output.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_thread_names(true)
                .compact(),
        )
        .init();
}

/// Milliseconds elapsed between `start` and `at`, for printing.
pub fn millis_since(start: Instant, at: Instant) -> f64 {
    at.saturating_duration_since(start).as_secs_f64() * 1000.0
}

/// Expected span of `calls` back-to-back calls at the given spacing.
pub fn expected_span(per_request: Duration, calls: u32) -> Duration {
    per_request * calls.saturating_sub(1)
}
