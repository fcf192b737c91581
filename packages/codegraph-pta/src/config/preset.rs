//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// 0-CFA, primitive holders merged, tight budgets
    Fast,

    /// 1-object-sensitive, no heap cloning
    Balanced,

    /// 2-object-sensitive with a 1-deep heap context
    Thorough,
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("Fast".parse::<Preset>().unwrap(), Preset::Fast);
        assert_eq!("thorough".parse::<Preset>().unwrap(), Preset::Thorough);
        assert!(matches!(
            "custom".parse::<Preset>(),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
