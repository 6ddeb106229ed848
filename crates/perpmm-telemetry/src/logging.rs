//! Logging initialization for the worker.
//!
//! The configured level is scoped to the `perpmm_*` crates so dependency
//! chatter (hyper, reqwest, redis) stays at `warn` unless the operator
//! asks for it. `RUST_LOG` overrides everything.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Crates covered by a bare level like `debug`.
const WORKER_CRATES: [&str; 8] = [
    "perpmm_core",
    "perpmm_ladder",
    "perpmm_venue",
    "perpmm_executor",
    "perpmm_settlement",
    "perpmm_feed",
    "perpmm_telemetry",
    "perpmm_worker",
];

/// Subscriber output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable output for local runs.
    Text,
    /// JSON lines for log shipping.
    Json,
}

impl LogFormat {
    /// `PERPMM_LOG_FORMAT` wins; otherwise hosted deployments
    /// (`RUST_ENV=production`) get JSON and everything else gets text.
    fn resolve() -> Self {
        match std::env::var("PERPMM_LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            Ok("text") | Ok("pretty") => Self::Text,
            _ => {
                let production = std::env::var("RUST_ENV")
                    .map(|v| v == "production")
                    .unwrap_or(false);
                if production {
                    Self::Json
                } else {
                    Self::Text
                }
            }
        }
    }
}

/// Expand the `log_level` config value into filter directives.
///
/// A bare level (`debug`) is applied to the worker's own crates with
/// dependencies pinned at `warn`; anything containing `,` or `=` is
/// treated as a full directive set and passed through untouched.
fn expand_directives(configured: &str) -> String {
    let configured = configured.trim();
    if configured.contains(',') || configured.contains('=') {
        return configured.to_string();
    }

    let mut directives = String::from("warn");
    for krate in WORKER_CRATES {
        directives.push_str(&format!(",{krate}={configured}"));
    }
    directives
}

fn build_filter(configured: &str) -> TelemetryResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = expand_directives(configured);
    directives.parse().map_err(|e| {
        TelemetryError::LoggingInit(format!("bad log_level {configured:?} ({directives}): {e}"))
    })
}

/// Install the global subscriber.
///
/// `configured_level` comes from the worker's `log_level` config key and
/// may be a bare level or a full directive set. Fails on unparseable
/// directives so a typo surfaces at startup instead of as silence.
pub fn init_logging(configured_level: &str) -> TelemetryResult<()> {
    let filter = build_filter(configured_level)?;

    match LogFormat::resolve() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(true))
            .init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_is_scoped_to_worker_crates() {
        let directives = expand_directives("debug");
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("perpmm_executor=debug"));
        assert!(directives.contains("perpmm_worker=debug"));
        assert!(!directives.contains("hyper"));
        assert!(directives.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn test_directive_set_passes_through() {
        let raw = "info,perpmm_executor=trace";
        assert_eq!(expand_directives(raw), raw);
    }

    #[test]
    fn test_garbage_directives_fail_to_parse() {
        // An empty level after `=` must not survive to runtime.
        assert!(expand_directives("perpmm_worker=").parse::<EnvFilter>().is_err());
    }
}
