//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NoConfigDir => "No config directory available. Set XDG_CONFIG_HOME.",
            ConfigError::Read { .. } => "Configuration file could not be read.",
            ConfigError::Parse { .. } => "Configuration file is malformed. Check your settings.",
            ConfigError::Serialize(_) | ConfigError::Write { .. } => {
                "Configuration could not be saved."
            }
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert!(ConfigError::NoConfigDir.user_message().contains("XDG_CONFIG_HOME"));
        let err = ConfigError::Invalid("update.max_attempts: At least one attempt is required".into());
        assert_eq!(err.user_message(), "Invalid configuration. Check your settings.");
        assert!(err.to_string().contains("update.max_attempts"));
    }
}
