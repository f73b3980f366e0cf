//! Tracing initialisation for skymark.
//!
//! Call [`init_tracing`] once at process startup to wire up the `tracing`
//! subscriber every crate in the workspace logs through.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `SKYMARK_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global `tracing` subscriber.
///
/// Safe to call more than once: later calls are no-ops, so library tests
/// and embedding applications cannot trip over each other.
pub fn init_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let use_json = std::env::var("SKYMARK_LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A second initialisation must be a no-op rather than a panic.
    #[test]
    fn repeated_init_is_safe() {
        init_tracing();
        init_tracing();
    }
}
