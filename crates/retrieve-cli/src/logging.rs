//! Logging setup
//!
//! Events go to stderr so that stdout stays clean for block bytes and JSON.
//! `RUST_LOG` wins when set; otherwise `--debug` or the configured
//! `log_level` picks the level for this binary and the core library.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
pub fn init(log_level: &str, debug: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level, debug)));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_directives(log_level: &str, debug: bool) -> String {
    let level = if debug { "debug" } else { log_level };
    format!("retrieve_core={},retrieve={}", level, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives("warn", false),
            "retrieve_core=warn,retrieve=warn"
        );
    }

    #[test]
    fn test_debug_flag_wins_over_level() {
        assert_eq!(
            default_directives("warn", true),
            "retrieve_core=debug,retrieve=debug"
        );
    }
}
