//! # Level of Detail
//!
//! Ring resolution and sample stride per quality level.

use crate::error::{MeshError, MeshResult};
use config::constants::{
    LOD_HIGH_POINTS_PER_SIDE, LOD_HIGH_STRIDE, LOD_LOW_POINTS_PER_SIDE, LOD_LOW_STRIDE,
    LOD_MEDIUM_POINTS_PER_SIDE, LOD_MEDIUM_STRIDE, MAX_POINTS_PER_SIDE, MIN_POINTS_PER_SIDE,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality level of a swept mesh.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lod {
    /// Coarse preview
    Low,
    /// Interactive default
    #[default]
    Medium,
    /// Every sample, finest rings
    High,
}

impl Lod {
    /// All levels, coarsest first.
    pub const ALL: [Lod; 3] = [Lod::Low, Lod::Medium, Lod::High];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lod::Low => "low",
            Lod::Medium => "medium",
            Lod::High => "high",
        }
    }
}

impl fmt::Display for Lod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lod {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Lod::Low),
            "medium" => Ok(Lod::Medium),
            "high" => Ok(Lod::High),
            other => Err(MeshError::invalid_request(format!("unknown LOD: {}", other))),
        }
    }
}

/// Ring resolution and stride for one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LodSettings {
    /// Points on each semicircular cap; rings have twice as many
    pub points_per_side: u32,
    /// Keep every `stride`-th active sample
    pub stride: usize,
}

impl LodSettings {
    /// Creates validated settings.
    pub fn new(points_per_side: u32, stride: usize) -> MeshResult<Self> {
        let settings = Self {
            points_per_side,
            stride,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the point count range and a non-zero stride.
    pub fn validate(&self) -> MeshResult<()> {
        if !(MIN_POINTS_PER_SIDE..=MAX_POINTS_PER_SIDE).contains(&self.points_per_side) {
            return Err(MeshError::invalid_request(format!(
                "points_per_side must be in {}..={}: {}",
                MIN_POINTS_PER_SIDE, MAX_POINTS_PER_SIDE, self.points_per_side
            )));
        }
        if self.stride == 0 {
            return Err(MeshError::invalid_request("stride must be at least 1"));
        }
        Ok(())
    }
}

/// Settings for every [`Lod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LodTable {
    /// Settings for [`Lod::Low`]
    pub low: LodSettings,
    /// Settings for [`Lod::Medium`]
    pub medium: LodSettings,
    /// Settings for [`Lod::High`]
    pub high: LodSettings,
}

impl Default for LodTable {
    fn default() -> Self {
        Self {
            low: LodSettings {
                points_per_side: LOD_LOW_POINTS_PER_SIDE,
                stride: LOD_LOW_STRIDE,
            },
            medium: LodSettings {
                points_per_side: LOD_MEDIUM_POINTS_PER_SIDE,
                stride: LOD_MEDIUM_STRIDE,
            },
            high: LodSettings {
                points_per_side: LOD_HIGH_POINTS_PER_SIDE,
                stride: LOD_HIGH_STRIDE,
            },
        }
    }
}

impl LodTable {
    /// Returns the settings for `lod`.
    pub fn settings(&self, lod: Lod) -> LodSettings {
        match lod {
            Lod::Low => self.low,
            Lod::Medium => self.medium,
            Lod::High => self.high,
        }
    }

    /// Validates each level.
    ///
    /// Finer levels must not use fewer points or a larger stride than
    /// coarser ones, so vertex counts grow with the level.
    pub fn validate(&self) -> MeshResult<()> {
        for lod in Lod::ALL {
            self.settings(lod).validate()?;
        }
        for pair in Lod::ALL.windows(2) {
            let (coarse, fine) = (self.settings(pair[0]), self.settings(pair[1]));
            if fine.points_per_side < coarse.points_per_side || fine.stride > coarse.stride {
                return Err(MeshError::invalid_request(format!(
                    "LOD {} must be at least as detailed as {}",
                    pair[1], pair[0]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = LodTable::default();
        assert_eq!(table.settings(Lod::Low), LodSettings::new(6, 4).unwrap());
        assert_eq!(table.settings(Lod::Medium), LodSettings::new(8, 2).unwrap());
        assert_eq!(table.settings(Lod::High), LodSettings::new(12, 1).unwrap());
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        assert!(LodSettings::new(1, 1).is_err());
        assert!(LodSettings::new(6, 0).is_err());
    }

    #[test]
    fn test_table_rejects_inverted_levels() {
        let table = LodTable {
            high: LodSettings::new(4, 1).unwrap(),
            ..LodTable::default()
        };
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("HIGH".parse::<Lod>().unwrap(), Lod::High);
        assert!("ultra".parse::<Lod>().is_err());
        assert_eq!(Lod::Low.to_string(), "low");
        assert_eq!(Lod::default(), Lod::Medium);
    }
}
