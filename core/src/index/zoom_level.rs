use std::{fmt::Display, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Named precision tiers. Each tier is bound to the finest cell resolution a
/// covering may use. Finer coverings produce fewer false positives but need
/// more ranges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomLevel {
    #[default]
    High,
    Medium,
    Low,
}

impl ZoomLevel {
    pub fn depth(self) -> u8 {
        match self {
            ZoomLevel::High => 13,
            ZoomLevel::Medium => 8,
            ZoomLevel::Low => 3,
        }
    }
}

impl Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoomLevel::High => write!(f, "high"),
            ZoomLevel::Medium => write!(f, "medium"),
            ZoomLevel::Low => write!(f, "low"),
        }
    }
}

impl FromStr for ZoomLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(ZoomLevel::High),
            "medium" => Ok(ZoomLevel::Medium),
            "low" => Ok(ZoomLevel::Low),
            _ => bail!("Unknown zoom level `{s}'. Expected `high', `medium' or `low'."),
        }
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, ResultAssertion};

    use super::ZoomLevel;

    #[test]
    fn depths_are_ordered() {
        assert!(ZoomLevel::High.depth() > ZoomLevel::Medium.depth());
        assert!(ZoomLevel::Medium.depth() > ZoomLevel::Low.depth());
        assert_that!(ZoomLevel::default()).is_equal_to(ZoomLevel::High);
    }

    #[test]
    fn parse() {
        assert_that!("high".parse::<ZoomLevel>().unwrap()).is_equal_to(ZoomLevel::High);
        assert_that!("MEDIUM".parse::<ZoomLevel>().unwrap()).is_equal_to(ZoomLevel::Medium);
        assert_that!(ZoomLevel::Low.to_string().parse::<ZoomLevel>().unwrap())
            .is_equal_to(ZoomLevel::Low);
        assert_that!("ultra".parse::<ZoomLevel>()).is_err();
    }
}
