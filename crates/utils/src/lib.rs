use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const FALLBACK_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `default_filter` (usually `global.log_level` from
/// the config file). A filter that fails to parse falls back to `info`.
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_or_fallback(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();
}

fn filter_or_fallback(directives: &str) -> EnvFilter {
    let directives = directives.trim();
    if directives.is_empty() {
        return EnvFilter::new(FALLBACK_FILTER);
    }
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{directives}': {e}; using '{FALLBACK_FILTER}'");
        EnvFilter::new(FALLBACK_FILTER)
    })
}

#[cfg(test)]
mod tests {
    use super::filter_or_fallback;

    #[test]
    fn valid_directives_are_kept() {
        let filter = filter_or_fallback("warn,stash::proxy=debug");
        let rendered = filter.to_string();
        assert!(rendered.contains("stash::proxy=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn empty_or_broken_directives_fall_back() {
        assert_eq!(filter_or_fallback("  ").to_string(), "info");
        assert_eq!(filter_or_fallback("stash=loudest").to_string(), "info");
    }
}
