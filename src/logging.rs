//! Tracing setup for the command-line tools.

use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr.
///
/// `verbosity` counts `-v` flags: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
/// `RUST_LOG`, when set, takes precedence.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,gdrive_transfer={}", level)));

    // A second initialisation (e.g. from tests) is not an error worth reporting.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
