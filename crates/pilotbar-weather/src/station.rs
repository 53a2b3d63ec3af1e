//! ICAO station identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StationIdError;

/// Station used when neither the CLI, the config nor the cache names one.
pub const DEFAULT_STATION: &str = "KCGI";

/// A validated 4-character ICAO station identifier, always uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Validate and normalize a user-supplied identifier.
    pub fn parse(input: &str) -> Result<Self, StationIdError> {
        let icao = input.trim().to_ascii_uppercase();
        if icao.len() != 4 {
            return Err(StationIdError::WrongLength(icao));
        }
        if !icao.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StationIdError::InvalidCharacters(icao));
        }
        Ok(Self(icao))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The built-in fallback station.
    pub fn fallback() -> Self {
        Self(DEFAULT_STATION.to_string())
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StationId {
    type Err = StationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StationId {
    type Error = StationIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}
