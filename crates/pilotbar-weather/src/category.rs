//! Flight-category classification from ceiling and visibility.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Visibility;

/// Standard flight categories, ordered from best to worst so that `max`
/// picks the more restrictive one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightCategory {
    /// Ceiling above 3000 ft (or none) and visibility above 5 mi
    #[default]
    Vfr,
    /// Ceiling 1000-3000 ft or visibility 3-5 mi
    Mvfr,
    /// Ceiling 500-999 ft or visibility 1 to under 3 mi
    Ifr,
    /// Ceiling below 500 ft or visibility below 1 mi
    Lifr,
}

impl FlightCategory {
    /// Classify a ceiling (`None` = no ceiling) and a visibility. Each
    /// dimension is rated on its own and the worse rating wins.
    pub fn classify(ceiling_ft: Option<u32>, visibility: Visibility) -> Self {
        Self::for_ceiling(ceiling_ft).max(Self::for_visibility(visibility))
    }

    pub fn for_ceiling(ceiling_ft: Option<u32>) -> Self {
        match ceiling_ft {
            None => Self::Vfr,
            Some(ft) if ft < 500 => Self::Lifr,
            Some(ft) if ft < 1000 => Self::Ifr,
            Some(ft) if ft <= 3000 => Self::Mvfr,
            Some(_) => Self::Vfr,
        }
    }

    pub fn for_visibility(visibility: Visibility) -> Self {
        match visibility.miles() {
            None => Self::Vfr,
            Some(sm) if sm < 1.0 => Self::Lifr,
            Some(sm) if sm < 3.0 => Self::Ifr,
            Some(sm) if sm <= 5.0 => Self::Mvfr,
            Some(_) => Self::Vfr,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vfr => "VFR",
            Self::Mvfr => "MVFR",
            Self::Ifr => "IFR",
            Self::Lifr => "LIFR",
        }
    }
}

impl fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
