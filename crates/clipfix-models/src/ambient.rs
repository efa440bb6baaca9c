//! Ambient noise categories.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Background noise bed mixed under the voice track.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AmbientNoise {
    /// Quiet office room tone
    #[default]
    Office,
    /// Busy cafe murmur
    Cafe,
    /// Domestic interior
    Home,
    /// Outdoor air and distant traffic
    Outdoor,
    /// No ambient mixing
    None,
}

impl AmbientNoise {
    pub const ALL: &'static [AmbientNoise] = &[
        AmbientNoise::Office,
        AmbientNoise::Cafe,
        AmbientNoise::Home,
        AmbientNoise::Outdoor,
        AmbientNoise::None,
    ];

    /// Categories backed by an audio asset.
    pub const MIXABLE: &'static [AmbientNoise] = &[
        AmbientNoise::Office,
        AmbientNoise::Cafe,
        AmbientNoise::Home,
        AmbientNoise::Outdoor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AmbientNoise::Office => "office",
            AmbientNoise::Cafe => "cafe",
            AmbientNoise::Home => "home",
            AmbientNoise::Outdoor => "outdoor",
            AmbientNoise::None => "none",
        }
    }

    /// Whether ambient mixing is disabled.
    pub fn is_none(&self) -> bool {
        matches!(self, AmbientNoise::None)
    }
}

impl fmt::Display for AmbientNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AmbientNoise {
    type Err = AmbientNoiseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "office" => Ok(AmbientNoise::Office),
            "cafe" => Ok(AmbientNoise::Cafe),
            "home" => Ok(AmbientNoise::Home),
            "outdoor" => Ok(AmbientNoise::Outdoor),
            "none" => Ok(AmbientNoise::None),
            _ => Err(AmbientNoiseParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown ambient noise category: {0}")]
pub struct AmbientNoiseParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_names() {
        for noise in AmbientNoise::ALL {
            assert_eq!(noise.as_str().parse::<AmbientNoise>().unwrap(), *noise);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("CAFE".parse::<AmbientNoise>().unwrap(), AmbientNoise::Cafe);
        assert_eq!(" Outdoor ".parse::<AmbientNoise>().unwrap(), AmbientNoise::Outdoor);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("rainforest".parse::<AmbientNoise>().is_err());
    }

    #[test]
    fn test_default_is_office() {
        assert_eq!(AmbientNoise::default(), AmbientNoise::Office);
        assert!(!AmbientNoise::MIXABLE.contains(&AmbientNoise::None));
    }
}
