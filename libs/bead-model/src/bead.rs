//! # Bead Cross-Section
//!
//! The capsule model of deposited material: a rectangular segment of length
//! `L` and thickness `T` closed by two semicircular ends of radius `R`, so
//! that `area = pi * R^2 + L * T`.

use crate::calibration::Calibration;
use crate::error::{ModelError, ModelResult};
use config::constants::MIN_BEAD_LENGTH_MM;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Capsule parameters of the bead.
///
/// # Example
///
/// ```rust
/// use bead_model::BeadCrossSection;
///
/// let bead = BeadCrossSection::new(2.0, 1.0).unwrap();
/// assert_eq!(bead.width_mm(), 4.0);
/// assert!((bead.semicircle_floor_mm2() - std::f64::consts::PI).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeadCrossSection {
    length_mm: f64,
    radius_mm: f64,
}

impl BeadCrossSection {
    /// Creates a cross-section. `L` must be positive, `R` non-negative.
    pub fn new(length_mm: f64, radius_mm: f64) -> ModelResult<Self> {
        if !length_mm.is_finite() || length_mm <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "length_mm",
                format!("must be positive and finite: {}", length_mm),
            ));
        }
        if !radius_mm.is_finite() || radius_mm < 0.0 {
            return Err(ModelError::invalid_parameter(
                "radius_mm",
                format!("must be non-negative and finite: {}", radius_mm),
            ));
        }
        Ok(Self {
            length_mm,
            radius_mm,
        })
    }

    /// Rectangular segment length `L` (mm).
    #[inline]
    pub fn length_mm(&self) -> f64 {
        self.length_mm
    }

    /// Semicircular end radius `R` (mm).
    #[inline]
    pub fn radius_mm(&self) -> f64 {
        self.radius_mm
    }

    /// Full bead width `L + 2R` (mm).
    #[inline]
    pub fn width_mm(&self) -> f64 {
        self.length_mm + 2.0 * self.radius_mm
    }

    /// Area of the two semicircular ends, `pi * R^2`.
    ///
    /// Areas below this floor have no real thickness under the model.
    #[inline]
    pub fn semicircle_floor_mm2(&self) -> f64 {
        PI * self.radius_mm * self.radius_mm
    }

    /// Area for a given thickness, `pi * R^2 + L * T`.
    #[inline]
    pub fn area_for_thickness(&self, thickness_mm: f64) -> f64 {
        self.semicircle_floor_mm2() + self.length_mm * thickness_mm
    }

    /// Returns the cross-section widened by the calibration's width
    /// multiplier.
    ///
    /// The full width `L + 2R` is scaled while the end radius is kept, so
    /// only the rectangular segment changes. The segment never shrinks
    /// below [`MIN_BEAD_LENGTH_MM`].
    pub fn calibrated(&self, calibration: &Calibration) -> Self {
        let width = calibration.effective_width(self.width_mm());
        Self {
            length_mm: (width - 2.0 * self.radius_mm).max(MIN_BEAD_LENGTH_MM),
            radius_mm: self.radius_mm,
        }
    }
}
