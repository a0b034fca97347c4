//! # Feedstock Profiles
//!
//! Cross-section of the raw material fed into the toolhead.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape of the feedstock cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedstockShape {
    /// Square rod; the characteristic dimension is the side length
    Square,
    /// Round wire; the characteristic dimension is the diameter
    Circular,
}

/// Feedstock geometry.
///
/// # Example
///
/// ```rust
/// use bead_model::FeedstockProfile;
///
/// // Half-inch square bar
/// let bar = FeedstockProfile::square(12.7).unwrap();
/// assert!((bar.cross_section_area_mm2() - 161.29).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedstockProfile {
    shape: FeedstockShape,
    dimension_mm: f64,
    cross_section_area_mm2: f64,
}

impl FeedstockProfile {
    /// Creates a profile from a shape and its characteristic dimension.
    pub fn new(shape: FeedstockShape, dimension_mm: f64) -> ModelResult<Self> {
        if !dimension_mm.is_finite() || dimension_mm <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "feedstock dimension",
                format!("must be positive and finite: {}", dimension_mm),
            ));
        }

        let cross_section_area_mm2 = match shape {
            FeedstockShape::Square => dimension_mm * dimension_mm,
            FeedstockShape::Circular => PI * dimension_mm * dimension_mm / 4.0,
        };

        Ok(Self {
            shape,
            dimension_mm,
            cross_section_area_mm2,
        })
    }

    /// Square rod with the given side length.
    pub fn square(side_mm: f64) -> ModelResult<Self> {
        Self::new(FeedstockShape::Square, side_mm)
    }

    /// Round wire with the given diameter.
    pub fn circular(diameter_mm: f64) -> ModelResult<Self> {
        Self::new(FeedstockShape::Circular, diameter_mm)
    }

    /// Returns the shape.
    #[inline]
    pub fn shape(&self) -> FeedstockShape {
        self.shape
    }

    /// Returns the characteristic dimension (mm).
    #[inline]
    pub fn dimension_mm(&self) -> f64 {
        self.dimension_mm
    }

    /// Returns the cross-sectional area (mm^2). Always positive.
    #[inline]
    pub fn cross_section_area_mm2(&self) -> f64 {
        self.cross_section_area_mm2
    }
}
