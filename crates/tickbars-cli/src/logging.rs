//! Log output for the binary
//!
//! Libraries only emit `tracing` events; the subscriber is installed here.

use tickbars_config::AppConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, logging to stderr
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(app: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(app.log_level.as_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if app.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
