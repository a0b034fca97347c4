//! # Bead Model
//!
//! Deposition samples and the physics of the deposited bead.
//!
//! ## Architecture
//!
//! ```text
//! SampleSeries + FeedstockProfile + Calibration
//!     → VolumeCalculator → AugmentedSamples → bead-mesh
//! ```
//!
//! ## Model
//!
//! - **Area**: conservation of mass, `feed * feedstock_area / path`,
//!   then `* correction_factor + area_offset`
//! - **Thickness**: capsule cross-section, `T = (A - pi * R^2) / L`
//! - **Calibration**: versioned store; every change bumps the version
//!
//! ## Usage
//!
//! ```rust
//! use bead_model::{
//!     BeadCrossSection, Calibration, FeedstockProfile, SampleSeries, ToolpathSample,
//!     VolumeCalculator,
//! };
//! use glam::DVec3;
//!
//! let series = SampleSeries::new(vec![
//!     ToolpathSample::new(0, DVec3::ZERO, 100.0, 200.0),
//!     ToolpathSample::new(1, DVec3::new(10.0, 0.0, 0.0), 100.0, 200.0),
//! ])
//! .unwrap();
//!
//! let augmented = VolumeCalculator::default().process_samples(
//!     &series,
//!     &FeedstockProfile::square(12.7).unwrap(),
//!     &BeadCrossSection::new(2.0, 1.0).unwrap(),
//!     &Calibration::identity(),
//! );
//! assert_eq!(augmented.summary().active, 2);
//! ```

pub mod bead;
pub mod calibration;
pub mod cancel;
pub mod error;
pub mod feedstock;
pub mod sample;
pub mod volume;

pub use bead::BeadCrossSection;
pub use calibration::{Calibration, CalibrationLoad, CalibrationSource, CalibrationStore};
pub use cancel::{CancelToken, Cancelled, LatestRequest};
pub use error::{CalibrationError, ModelError, ModelResult};
pub use feedstock::{FeedstockProfile, FeedstockShape};
pub use sample::{Column, SampleSeries, ToolpathSample};
pub use volume::{
    calculate_bead_area, AugmentedSample, AugmentedSamples, Degenerate, ProcessingSummary,
    SampleFlags, VolumeCalculator, VolumeConfig,
};
