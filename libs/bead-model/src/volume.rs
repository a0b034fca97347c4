//! # Volume Calculator
//!
//! Physics model for the deposited bead. By conservation of mass the
//! material entering the toolhead per unit time equals the material laid
//! down along the path:
//!
//! ```text
//! feed_velocity * feedstock_area = bead_area * path_velocity
//! ```
//!
//! The calibrated area is then split over the capsule model,
//! `area = pi * R^2 + L * T`, to recover the bead thickness `T`.

use crate::bead::BeadCrossSection;
use crate::calibration::Calibration;
use crate::cancel::{CancelToken, Cancelled};
use crate::error::{ModelError, ModelResult};
use crate::feedstock::FeedstockProfile;
use crate::sample::{SampleSeries, ToolpathSample};
use config::constants::{
    CANCEL_CHECK_INTERVAL, DEFAULT_MAX_THICKNESS_MM, DEFAULT_MIN_THICKNESS_MM,
};
use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The area is below `pi * R^2`, so no real rectangular extension solves
/// the capsule model.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("bead area {area_mm2} mm2 is below the semicircular floor {floor_mm2} mm2")]
pub struct Degenerate {
    /// The offending area
    pub area_mm2: f64,
    /// `pi * R^2` for the bead in use
    pub floor_mm2: f64,
}

/// Computes the calibrated bead cross-sectional area for one sample.
///
/// Returns `None` when the sample deposits nothing: `path_velocity <= 0`,
/// `feed_velocity < 0`, a non-positive feedstock area, or a non-finite
/// result. A negative calibrated area (large negative offset) is floored
/// at zero.
///
/// # Example
///
/// ```rust
/// use bead_model::{calculate_bead_area, Calibration};
///
/// let area = calculate_bead_area(100.0, 200.0, 161.29, &Calibration::identity()).unwrap();
/// assert!((area - 80.645).abs() < 1e-9);
///
/// assert!(calculate_bead_area(100.0, 0.0, 161.29, &Calibration::identity()).is_none());
/// ```
pub fn calculate_bead_area(
    feed_velocity: f64,
    path_velocity: f64,
    feedstock_area_mm2: f64,
    calibration: &Calibration,
) -> Option<f64> {
    if !(path_velocity > 0.0) || !(feed_velocity >= 0.0) || !(feedstock_area_mm2 > 0.0) {
        return None;
    }

    let raw_area = feed_velocity * feedstock_area_mm2 / path_velocity;
    let area = calibration.apply_area(raw_area);
    if !area.is_finite() {
        return None;
    }
    Some(area.max(0.0))
}

/// Thickness bounds applied by the [`VolumeCalculator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Thickness assigned to degenerate samples (mm)
    pub min_thickness_mm: f64,
    /// Optional upper clamp guarding against sensor noise (mm)
    pub max_thickness_mm: Option<f64>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min_thickness_mm: DEFAULT_MIN_THICKNESS_MM,
            max_thickness_mm: DEFAULT_MAX_THICKNESS_MM,
        }
    }
}

impl VolumeConfig {
    /// Creates a validated configuration.
    pub fn new(min_thickness_mm: f64, max_thickness_mm: Option<f64>) -> ModelResult<Self> {
        if !min_thickness_mm.is_finite() || min_thickness_mm <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "min_thickness_mm",
                format!("must be positive and finite: {}", min_thickness_mm),
            ));
        }
        if let Some(max) = max_thickness_mm {
            if !(max >= min_thickness_mm) {
                return Err(ModelError::invalid_parameter(
                    "max_thickness_mm",
                    format!("must be >= min_thickness_mm ({}): {}", min_thickness_mm, max),
                ));
            }
        }
        Ok(Self {
            min_thickness_mm,
            max_thickness_mm,
        })
    }
}

/// Per-sample diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFlags {
    /// Non-finite position or velocity; the sample is excluded
    pub invalid: bool,
    /// Area below the semicircular floor; thickness set to the minimum
    pub degenerate: bool,
    /// Thickness clamped to the configured maximum
    pub clamped: bool,
}

/// A sample augmented with its bead geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentedSample {
    /// Position of the sample in its series
    pub index: usize,
    /// Sequence index from ingestion
    pub sequence: u64,
    /// Tool position (mm)
    pub position: DVec3,
    /// Calibrated bead area, `None` when no material is deposited
    pub bead_area_mm2: Option<f64>,
    /// Bead thickness (mm); zero for inactive samples
    pub thickness_mm: f64,
    /// Diagnostics
    pub flags: SampleFlags,
}

impl AugmentedSample {
    /// Returns true if the sample deposits material.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.bead_area_mm2.is_some()
    }
}

/// Counts gathered while augmenting a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    /// Samples with a bead area
    pub active: usize,
    /// Samples without deposition (including invalid ones)
    pub inactive: usize,
    /// Samples excluded for non-finite values
    pub invalid: usize,
    /// Samples whose thickness fell back to the minimum
    pub degenerate: usize,
    /// Samples whose thickness hit the maximum
    pub clamped: usize,
}

/// Order-preserving augmented view over a [`SampleSeries`].
///
/// Carries the calibrated cross-section the thicknesses were solved
/// against and the calibration version used.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedSamples {
    samples: Vec<AugmentedSample>,
    bead: BeadCrossSection,
    calibration_version: u64,
    summary: ProcessingSummary,
}

impl AugmentedSamples {
    /// Returns all samples in input order.
    #[inline]
    pub fn samples(&self) -> &[AugmentedSample] {
        &self.samples
    }

    /// Iterates over samples that deposit material.
    pub fn active(&self) -> impl Iterator<Item = &AugmentedSample> {
        self.samples.iter().filter(|s| s.is_active())
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if there are no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The calibrated cross-section used for the thickness solve.
    #[inline]
    pub fn bead(&self) -> &BeadCrossSection {
        &self.bead
    }

    /// Calibration version the view was computed under.
    #[inline]
    pub fn calibration_version(&self) -> u64 {
        self.calibration_version
    }

    /// Per-category counts.
    #[inline]
    pub fn summary(&self) -> &ProcessingSummary {
        &self.summary
    }
}

/// Bead area and thickness calculator.
///
/// # Example
///
/// ```rust
/// use bead_model::{BeadCrossSection, VolumeCalculator};
///
/// let calculator = VolumeCalculator::default();
/// let bead = BeadCrossSection::new(2.0, 1.0).unwrap();
///
/// let thickness = calculator.calculate_bead_thickness(80.645, &bead).unwrap();
/// assert!((thickness - 38.75).abs() < 0.01);
///
/// assert!(calculator.calculate_bead_thickness(1.0, &bead).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct VolumeCalculator {
    config: VolumeConfig,
    check_interval: usize,
}

impl Default for VolumeCalculator {
    fn default() -> Self {
        Self::new(VolumeConfig::default())
    }
}

impl VolumeCalculator {
    /// Creates a calculator with the given bounds.
    pub fn new(config: VolumeConfig) -> Self {
        Self {
            config,
            check_interval: CANCEL_CHECK_INTERVAL,
        }
    }

    /// Sets how many samples are processed between cancellation checks.
    pub fn with_check_interval(mut self, samples: usize) -> Self {
        self.check_interval = samples.max(1);
        self
    }

    /// Returns the thickness bounds.
    #[inline]
    pub fn config(&self) -> &VolumeConfig {
        &self.config
    }

    /// See [`calculate_bead_area`].
    #[inline]
    pub fn calculate_bead_area(
        &self,
        feed_velocity: f64,
        path_velocity: f64,
        feedstock_area_mm2: f64,
        calibration: &Calibration,
    ) -> Option<f64> {
        calculate_bead_area(feed_velocity, path_velocity, feedstock_area_mm2, calibration)
    }

    /// Solves `T = (area - pi * R^2) / L`, clamped to the configured
    /// maximum.
    ///
    /// Returns [`Degenerate`] when the area is below `pi * R^2`; callers
    /// substitute the configured minimum thickness and flag the sample.
    pub fn calculate_bead_thickness(
        &self,
        area_mm2: f64,
        bead: &BeadCrossSection,
    ) -> Result<f64, Degenerate> {
        self.solve_thickness(area_mm2, bead).map(|(thickness, _)| thickness)
    }

    /// Returns the (possibly clamped) thickness and whether it was clamped.
    fn solve_thickness(
        &self,
        area_mm2: f64,
        bead: &BeadCrossSection,
    ) -> Result<(f64, bool), Degenerate> {
        let floor_mm2 = bead.semicircle_floor_mm2();
        if !(area_mm2 >= floor_mm2) {
            return Err(Degenerate {
                area_mm2,
                floor_mm2,
            });
        }

        let thickness = (area_mm2 - floor_mm2) / bead.length_mm();
        Ok(match self.config.max_thickness_mm {
            Some(max) if thickness > max => (max, true),
            _ => (thickness, false),
        })
    }

    /// Augments one sample. `bead` must already be calibrated.
    pub fn augment(
        &self,
        index: usize,
        sample: &ToolpathSample,
        bead: &BeadCrossSection,
        feedstock_area_mm2: f64,
        calibration: &Calibration,
    ) -> AugmentedSample {
        let mut flags = SampleFlags::default();
        let mut thickness_mm = 0.0;

        let bead_area_mm2 = if sample.is_finite() {
            self.calculate_bead_area(
                sample.feed_velocity,
                sample.path_velocity,
                feedstock_area_mm2,
                calibration,
            )
        } else {
            log::trace!("sample {} excluded: non-finite position or velocity", index);
            flags.invalid = true;
            None
        };

        if let Some(area) = bead_area_mm2 {
            match self.solve_thickness(area, bead) {
                Ok((thickness, clamped)) => {
                    flags.clamped = clamped;
                    thickness_mm = thickness;
                }
                Err(_) => {
                    flags.degenerate = true;
                    thickness_mm = self.config.min_thickness_mm;
                }
            }
        }

        AugmentedSample {
            index,
            sequence: sample.sequence,
            position: sample.position,
            bead_area_mm2,
            thickness_mm,
            flags,
        }
    }

    /// Augments a whole series with bead area and thickness.
    ///
    /// Pure and order-preserving: identical inputs give identical output.
    pub fn process_samples(
        &self,
        series: &SampleSeries,
        feedstock: &FeedstockProfile,
        bead: &BeadCrossSection,
        calibration: &Calibration,
    ) -> AugmentedSamples {
        let samples = self.augment_chunks(series, feedstock, bead, calibration, None);
        // Only cancellation yields None
        self.finish(samples.unwrap_or_default(), bead, calibration)
    }

    /// Like [`VolumeCalculator::process_samples`], polling `cancel` once
    /// per chunk of samples (default [`CANCEL_CHECK_INTERVAL`]).
    pub fn process_samples_cancellable(
        &self,
        series: &SampleSeries,
        feedstock: &FeedstockProfile,
        bead: &BeadCrossSection,
        calibration: &Calibration,
        cancel: &CancelToken,
    ) -> Result<AugmentedSamples, Cancelled> {
        cancel.check()?;
        let samples = self
            .augment_chunks(series, feedstock, bead, calibration, Some(cancel))
            .ok_or(Cancelled)?;
        Ok(self.finish(samples, bead, calibration))
    }

    fn augment_chunks(
        &self,
        series: &SampleSeries,
        feedstock: &FeedstockProfile,
        bead: &BeadCrossSection,
        calibration: &Calibration,
        cancel: Option<&CancelToken>,
    ) -> Option<Vec<AugmentedSample>> {
        let calibrated = bead.calibrated(calibration);
        let feedstock_area = feedstock.cross_section_area_mm2();

        let chunks: Option<Vec<Vec<AugmentedSample>>> = series
            .samples()
            .par_chunks(self.check_interval)
            .enumerate()
            .map(|(chunk, samples)| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return None;
                }
                let base = chunk * self.check_interval;
                Some(
                    samples
                        .iter()
                        .enumerate()
                        .map(|(offset, sample)| {
                            self.augment(
                                base + offset,
                                sample,
                                &calibrated,
                                feedstock_area,
                                calibration,
                            )
                        })
                        .collect(),
                )
            })
            .collect();

        chunks.map(|chunks| chunks.into_iter().flatten().collect())
    }

    fn finish(
        &self,
        samples: Vec<AugmentedSample>,
        bead: &BeadCrossSection,
        calibration: &Calibration,
    ) -> AugmentedSamples {
        let mut summary = ProcessingSummary::default();
        for sample in &samples {
            if sample.is_active() {
                summary.active += 1;
            } else {
                summary.inactive += 1;
            }
            summary.invalid += usize::from(sample.flags.invalid);
            summary.degenerate += usize::from(sample.flags.degenerate);
            summary.clamped += usize::from(sample.flags.clamped);
        }

        if summary.invalid > 0 {
            log::warn!(
                "{} of {} samples excluded for non-finite position or velocity",
                summary.invalid,
                samples.len()
            );
        }
        log::debug!(
            "augmented {} samples: {} active, {} inactive, {} degenerate, {} clamped",
            samples.len(),
            summary.active,
            summary.inactive,
            summary.degenerate,
            summary.clamped
        );

        AugmentedSamples {
            samples,
            bead: bead.calibrated(calibration),
            calibration_version: calibration.version,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn scenario_a() -> (SampleSeries, FeedstockProfile, BeadCrossSection) {
        let series = SampleSeries::new(
            (0..3)
                .map(|i| {
                    ToolpathSample::new(i, DVec3::new(10.0 * i as f64, 0.0, 0.0), 100.0, 200.0)
                })
                .collect(),
        )
        .unwrap();
        (
            series,
            FeedstockProfile::square(12.7).unwrap(),
            BeadCrossSection::new(2.0, 1.0).unwrap(),
        )
    }

    #[test]
    fn test_area_inactive_cases() {
        let identity = Calibration::identity();
        assert!(calculate_bead_area(100.0, 0.0, 10.0, &identity).is_none());
        assert!(calculate_bead_area(100.0, -5.0, 10.0, &identity).is_none());
        assert!(calculate_bead_area(-1.0, 10.0, 10.0, &identity).is_none());
        assert!(calculate_bead_area(f64::NAN, 10.0, 10.0, &identity).is_none());
        assert!(calculate_bead_area(f64::INFINITY, 10.0, 10.0, &identity).is_none());
        assert!(calculate_bead_area(1.0, 10.0, 0.0, &identity).is_none());
    }

    #[test]
    fn test_area_zero_feed_is_active_and_zero() {
        let area = calculate_bead_area(0.0, 10.0, 10.0, &Calibration::identity());
        assert_eq!(area, Some(0.0));
    }

    #[test]
    fn test_area_applies_calibration() {
        let calibration = Calibration::new(1.0, 2.0, 1.5).unwrap();
        let area = calculate_bead_area(10.0, 10.0, 4.0, &calibration).unwrap();
        assert_relative_eq!(area, 9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_area_negative_offset_floors_at_zero() {
        let calibration = Calibration::new(1.0, 1.0, -100.0).unwrap();
        assert_eq!(calculate_bead_area(1.0, 1.0, 1.0, &calibration), Some(0.0));
    }

    #[test]
    fn test_thickness_degenerate_below_floor() {
        let calculator = VolumeCalculator::default();
        let bead = BeadCrossSection::new(2.0, 1.0).unwrap();
        let err = calculator.calculate_bead_thickness(3.0, &bead).unwrap_err();
        assert_relative_eq!(err.floor_mm2, PI, epsilon = 1e-12);
    }

    #[test]
    fn test_thickness_at_floor_is_zero() {
        let calculator = VolumeCalculator::default();
        let bead = BeadCrossSection::new(2.0, 1.0).unwrap();
        assert_eq!(calculator.calculate_bead_thickness(PI, &bead), Ok(0.0));
    }

    #[test]
    fn test_thickness_clamped_to_max() {
        let calculator = VolumeCalculator::new(VolumeConfig::new(0.1, Some(10.0)).unwrap());
        let bead = BeadCrossSection::new(2.0, 1.0).unwrap();
        assert_eq!(calculator.calculate_bead_thickness(80.645, &bead), Ok(10.0));
    }

    #[test]
    fn test_volume_config_validation() {
        assert!(VolumeConfig::new(0.0, None).is_err());
        assert!(VolumeConfig::new(1.0, Some(0.5)).is_err());
        assert!(VolumeConfig::new(0.1, Some(0.1)).is_ok());
    }

    #[test]
    fn test_scenario_a_area_and_thickness() {
        let (series, feedstock, bead) = scenario_a();
        let augmented = VolumeCalculator::default().process_samples(
            &series,
            &feedstock,
            &bead,
            &Calibration::identity(),
        );

        assert_eq!(augmented.len(), 3);
        for sample in augmented.samples() {
            assert_relative_eq!(sample.bead_area_mm2.unwrap(), 80.645, epsilon = 1e-9);
            assert_relative_eq!(sample.thickness_mm, (80.645 - PI) / 2.0, epsilon = 1e-9);
            assert!((sample.thickness_mm - 38.75).abs() < 0.01);
        }
        assert_eq!(augmented.summary().active, 3);
    }

    #[test]
    fn test_scenario_a_clamped_flag() {
        let (series, feedstock, bead) = scenario_a();
        let calculator = VolumeCalculator::new(VolumeConfig::new(0.05, Some(20.0)).unwrap());
        let augmented =
            calculator.process_samples(&series, &feedstock, &bead, &Calibration::identity());
        assert!(augmented.samples().iter().all(|s| s.flags.clamped));
        assert!(augmented.samples().iter().all(|s| s.thickness_mm == 20.0));
        assert_eq!(augmented.summary().clamped, 3);
    }

    #[test]
    fn test_degenerate_samples_use_min_thickness() {
        let series = SampleSeries::new(vec![
            ToolpathSample::new(0, DVec3::ZERO, 0.0, 10.0),
            ToolpathSample::new(1, DVec3::X, 0.0, 10.0),
        ])
        .unwrap();
        let calculator = VolumeCalculator::default();
        let augmented = calculator.process_samples(
            &series,
            &FeedstockProfile::square(1.0).unwrap(),
            &BeadCrossSection::new(2.0, 1.0).unwrap(),
            &Calibration::identity(),
        );
        for sample in augmented.samples() {
            assert!(sample.is_active());
            assert!(sample.flags.degenerate);
            assert_eq!(sample.thickness_mm, DEFAULT_MIN_THICKNESS_MM);
        }
    }

    #[test]
    fn test_invalid_samples_excluded() {
        let series = SampleSeries::new(vec![
            ToolpathSample::new(0, DVec3::ZERO, 100.0, 200.0),
            ToolpathSample::new(1, DVec3::new(f64::NAN, 0.0, 0.0), 100.0, 200.0),
            ToolpathSample::new(2, DVec3::X, 100.0, 200.0),
        ])
        .unwrap();
        let (_, feedstock, bead) = scenario_a();
        let augmented = VolumeCalculator::default().process_samples(
            &series,
            &feedstock,
            &bead,
            &Calibration::identity(),
        );

        let flags: Vec<bool> = augmented.samples().iter().map(|s| s.flags.invalid).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert!(!augmented.samples()[1].is_active());
        assert_eq!(augmented.summary().invalid, 1);
        assert_eq!(augmented.summary().active, 2);
    }

    #[test]
    fn test_process_preserves_order_and_indices() {
        let samples: Vec<ToolpathSample> = (0..10_000u64)
            .map(|i| ToolpathSample::new(i * 2, DVec3::new(i as f64 * 0.1, 0.0, 0.0), 100.0, 200.0))
            .collect();
        let series = SampleSeries::new(samples).unwrap();
        let (_, feedstock, bead) = scenario_a();
        let augmented = VolumeCalculator::default().process_samples(
            &series,
            &feedstock,
            &bead,
            &Calibration::identity(),
        );

        for (i, sample) in augmented.samples().iter().enumerate() {
            assert_eq!(sample.index, i);
            assert_eq!(sample.sequence, i as u64 * 2);
        }
    }

    #[test]
    fn test_process_is_deterministic() {
        let (series, feedstock, bead) = scenario_a();
        let calibration = Calibration::new(1.3, 0.9, 0.5).unwrap();
        let calculator = VolumeCalculator::default();
        let a = calculator.process_samples(&series, &feedstock, &bead, &calibration);
        let b = calculator.process_samples(&series, &feedstock, &bead, &calibration);
        assert_eq!(a, b);
    }

    #[test]
    fn test_process_records_calibrated_bead_and_version() {
        let (series, feedstock, bead) = scenario_a();
        let calibration = Calibration {
            version: 7,
            ..Calibration::new(1.5, 1.0, 0.0).unwrap()
        };
        let augmented =
            VolumeCalculator::default().process_samples(&series, &feedstock, &bead, &calibration);
        assert_eq!(augmented.calibration_version(), 7);
        assert_relative_eq!(augmented.bead().width_mm(), 6.0, epsilon = 1e-12);
        // Widening keeps the area, so the bead gets thinner
        let expected = (80.645 - PI) / 4.0;
        assert_relative_eq!(augmented.samples()[0].thickness_mm, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_cancelled_processing() {
        let (series, feedstock, bead) = scenario_a();
        let token = CancelToken::new();
        token.cancel();
        let result = VolumeCalculator::default().process_samples_cancellable(
            &series,
            &feedstock,
            &bead,
            &Calibration::identity(),
            &token,
        );
        assert_eq!(result.unwrap_err(), Cancelled);
    }

    #[test]
    fn test_uncancelled_processing_matches_plain() {
        let (series, feedstock, bead) = scenario_a();
        let calculator = VolumeCalculator::default();
        let plain =
            calculator.process_samples(&series, &feedstock, &bead, &Calibration::identity());
        let cancellable = calculator
            .process_samples_cancellable(
                &series,
                &feedstock,
                &bead,
                &Calibration::identity(),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(plain, cancellable);
    }
}
