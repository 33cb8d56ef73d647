//! Tracing setup for the HTTP server and the refresh scheduler.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Filter directives used when `RUST_LOG` is unset. The configured level
/// applies to this service's crates; sqlx statement logging is capped at
/// warn so a refresh pass does not emit one query line per sub-zone, and
/// the HTTP client internals stay quiet below warn.
fn default_directives(level: &str) -> String {
    format!("{level},sqlx::query=warn,hyper=warn,reqwest=warn")
}

/// Installs the global tracing subscriber.
///
/// Span close events stay enabled in both formats so request handlers and
/// refresh passes report their duration on completion.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse_as_a_filter() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("sqlx::query=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
