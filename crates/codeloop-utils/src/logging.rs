//! Tracing subscriber initialisation
//!
//! Library crates only emit `tracing` events; the binary installs the
//! subscriber once at startup.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, single line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// Build the default filter used when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("codeloop=debug,info")
            } else {
                EnvFilter::try_new("codeloop=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr so that stdout stays reserved for command output.
/// Verbose mode adds targets and span close events (with durations).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    verbose: bool,
    format: LogFormat,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = default_filter(verbose);
    let span_events = if verbose {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(verbose)
                        .with_span_events(span_events),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_thread_names(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_span_events(span_events)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span wrapping one refinement run
#[must_use]
pub fn refine_span(max_steps: u32, trajectory_window: usize) -> tracing::Span {
    tracing::info_span!("refine", max_steps, trajectory_window)
}

/// Span wrapping one generation step
#[must_use]
pub fn step_span(step: u32) -> tracing::Span {
    tracing::info_span!("step", step)
}
