//! Shared configuration and logging setup for the pilot-bar binaries.

pub mod config;
pub mod error;

pub use config::{
    Config, EndpointsConfig, ModulesConfig, UpdateConfig, ValidationResult, WaybarConfig,
};
pub use error::ConfigError;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `default_level`. Output goes to stderr; stdout belongs to the binaries.
pub fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
