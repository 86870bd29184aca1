use envmatrix_core::ENVMATRIX_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// `ENVMATRIX_LOG` takes precedence; otherwise the level follows the number
/// of `-v` flags given on the command line.
pub fn init(verbosity: u8) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(ENVMATRIX_LOG_VAR)
        .or_else(|_| EnvFilter::try_new(default_directive(verbosity)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Filter directive for a given `-v` count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one environment run
pub fn environment_span(name: &str) -> Span {
    span!(Level::INFO, "env", name = %name)
}
