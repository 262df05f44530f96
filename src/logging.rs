//! Tracing bootstrap for hosts embedding the forge.
//!
//! Library crates only emit `tracing` events; installing a subscriber is the
//! host's call. Output always goes to stderr so stdout stays free for
//! descriptors and reports.

use tracing_subscriber::EnvFilter;

use crate::config::{ForgeConfig, DEFAULT_LOG_FILTER};

/// Installs a global fmt subscriber. Returns `false` when one was already set.
pub fn init_logging(config: &ForgeConfig) -> bool {
    let filter = EnvFilter::try_new(config.log_filter())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.log_json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::init_logging;
    use crate::config::ForgeConfig;

    #[test]
    fn second_install_is_refused() {
        let config = ForgeConfig {
            log_filter: Some("not a [valid filter".to_string()),
            ..ForgeConfig::default()
        };

        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
