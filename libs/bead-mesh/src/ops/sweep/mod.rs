//! # Bead Sweep
//!
//! Sweeps capsule rings along the active samples and stitches consecutive
//! rings into triangles.
//!
//! ## Algorithm
//!
//! 1. Keep active samples (those with a bead area)
//! 2. Subsample by the LOD stride, always keeping the last active sample
//! 3. Travel direction at each kept sample points at the next one; short
//!    hops reuse the previous direction
//! 4. One ring of `2 * points_per_side` vertices per kept sample
//! 5. Stitch ring `i` to ring `i + 1` unless the hop between them is
//!    shorter than the displacement epsilon
//!
//! Ends are left open.

mod lod;


pub use lod::{Lod, LodSettings, LodTable};

use crate::color::ColorProvider;
use crate::error::{MeshError, MeshResult};
use crate::mesh::MeshBuffer;
use crate::primitives::{CrossSectionGenerator, RingFrame};
use bead_model::{AugmentedSample, AugmentedSamples, CancelToken};
use config::constants::{
    EngineConfig, CANCEL_CHECK_INTERVAL, DISPLACEMENT_EPSILON, MAX_VERTICES, PARALLEL_MIN_BATCH,
};
use glam::DVec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How ring colours are derived from the colour provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorStrategy {
    /// Each ring takes the value of the sample it sits on
    #[default]
    PerRing,
    /// Each ring takes the mean over the samples its stride window covers
    WindowMean,
}

/// Sweep tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Ring resolution and stride per level
    pub lod_table: LodTable,
    /// Hops shorter than this (mm) count as stationary
    pub displacement_epsilon: f64,
    /// Preferred thickness axis of the rings
    pub up_hint: DVec3,
    /// Ring colouring
    pub color_strategy: ColorStrategy,
    /// Rings generated between cancellation checks
    pub cancel_check_interval: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lod_table: LodTable::default(),
            displacement_epsilon: DISPLACEMENT_EPSILON,
            up_hint: DVec3::Z,
            color_strategy: ColorStrategy::PerRing,
            cancel_check_interval: CANCEL_CHECK_INTERVAL,
        }
    }
}

impl SweepConfig {
    /// Takes the displacement epsilon and check interval from an engine
    /// configuration.
    pub fn from_engine(engine: &EngineConfig) -> Self {
        Self {
            displacement_epsilon: engine.displacement_epsilon,
            cancel_check_interval: engine.cancel_check_interval,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> MeshResult<()> {
        self.lod_table.validate()?;
        if !self.displacement_epsilon.is_finite() || self.displacement_epsilon <= 0.0 {
            return Err(MeshError::invalid_request(format!(
                "displacement_epsilon must be positive: {}",
                self.displacement_epsilon
            )));
        }
        if !self.up_hint.is_finite() {
            return Err(MeshError::invalid_request("up_hint must be finite"));
        }
        if self.cancel_check_interval == 0 {
            return Err(MeshError::invalid_request(
                "cancel_check_interval must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Turns augmented samples into a swept bead mesh.
///
/// # Example
///
/// ```rust
/// use bead_mesh::{ConstantColor, Lod, MeshSweeper};
/// use bead_model::{
///     BeadCrossSection, Calibration, FeedstockProfile, SampleSeries, ToolpathSample,
///     VolumeCalculator,
/// };
/// use glam::DVec3;
///
/// let series = SampleSeries::new(
///     (0..3)
///         .map(|i| ToolpathSample::new(i, DVec3::new(10.0 * i as f64, 0.0, 0.0), 100.0, 200.0))
///         .collect(),
/// )
/// .unwrap();
/// let augmented = VolumeCalculator::default().process_samples(
///     &series,
///     &FeedstockProfile::square(12.7).unwrap(),
///     &BeadCrossSection::new(2.0, 1.0).unwrap(),
///     &Calibration::identity(),
/// );
///
/// let mesh = MeshSweeper::default()
///     .generate_mesh(&augmented, &ConstantColor(0.0), Lod::High)
///     .unwrap()
///     .unwrap();
/// assert_eq!(mesh.vertex_count(), 3 * 24);
/// assert_eq!(mesh.face_count(), 2 * 24 * 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeshSweeper {
    config: SweepConfig,
}

impl MeshSweeper {
    /// Creates a sweeper with a validated configuration.
    pub fn new(config: SweepConfig) -> MeshResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweeps the active samples into a mesh.
    ///
    /// Returns `Ok(None)` when there is nothing to extrude: fewer than two
    /// active samples, or no two kept samples far enough apart to give a
    /// travel direction.
    pub fn generate_mesh(
        &self,
        samples: &AugmentedSamples,
        colors: &dyn ColorProvider,
        lod: Lod,
    ) -> MeshResult<Option<MeshBuffer>> {
        self.sweep(samples, colors, lod, None)
    }

    /// Like [`MeshSweeper::generate_mesh`], aborting with
    /// [`MeshError::Cancelled`] once `cancel` is set.
    pub fn generate_mesh_cancellable(
        &self,
        samples: &AugmentedSamples,
        colors: &dyn ColorProvider,
        lod: Lod,
        cancel: &CancelToken,
    ) -> MeshResult<Option<MeshBuffer>> {
        self.sweep(samples, colors, lod, Some(cancel))
    }

    fn sweep(
        &self,
        samples: &AugmentedSamples,
        colors: &dyn ColorProvider,
        lod: Lod,
        cancel: Option<&CancelToken>,
    ) -> MeshResult<Option<MeshBuffer>> {
        let check = |position: usize| -> MeshResult<()> {
            match cancel {
                Some(token) if position % self.config.cancel_check_interval == 0 => {
                    Ok(token.check()?)
                }
                _ => Ok(()),
            }
        };
        check(0)?;

        let active: Vec<&AugmentedSample> = samples.active().collect();
        if active.len() < 2 {
            log::debug!(
                "{} active of {} samples: nothing to extrude",
                active.len(),
                samples.len()
            );
            return Ok(None);
        }

        let settings = self.config.lod_table.settings(lod);
        let kept = select_stride(active.len(), settings.stride);
        let positions: Vec<DVec3> = kept.iter().map(|&k| active[k].position).collect();

        let hops: Vec<Option<DVec3>> = positions
            .windows(2)
            .map(|pair| hop_direction(pair[1] - pair[0], self.config.displacement_epsilon))
            .collect();
        let Some(directions) = travel_directions(&hops) else {
            log::debug!(
                "{} kept samples never move more than {} mm: nothing to extrude",
                kept.len(),
                self.config.displacement_epsilon
            );
            return Ok(None);
        };

        let generator = CrossSectionGenerator::new(settings.points_per_side)?;
        let ring_size = generator.ring_size();
        let vertex_count = kept.len().saturating_mul(ring_size);
        if vertex_count > MAX_VERTICES {
            return Err(MeshError::TooManyVertices {
                count: vertex_count,
                max: MAX_VERTICES,
            });
        }

        let ring_colors = self.ring_colors(&active, &kept, colors, &check)?;

        let bead = samples.bead();
        let up_hint = self.config.up_hint;
        let rings: Vec<Vec<DVec3>> = (0..kept.len())
            .into_par_iter()
            .with_min_len(PARALLEL_MIN_BATCH)
            .map(|r| -> MeshResult<Vec<DVec3>> {
                check(r)?;
                let frame = RingFrame::new(directions[r], up_hint)
                    .ok_or_else(|| MeshError::degenerate("travel direction collapsed"))?;
                Ok(generator.ring_in_frame(
                    positions[r],
                    &frame,
                    active[kept[r]].thickness_mm,
                    bead.length_mm(),
                    bead.radius_mm(),
                ))
            })
            .collect::<MeshResult<_>>()?;

        let stitched = hops.iter().filter(|hop| hop.is_some()).count();
        let mut mesh = MeshBuffer::with_capacity(vertex_count, stitched * ring_size * 2);
        let bases: Vec<u32> = rings
            .iter()
            .zip(&ring_colors)
            .map(|(ring, &color)| mesh.add_ring(ring, color))
            .collect();

        let n = ring_size as u32;
        for (r, hop) in hops.iter().enumerate() {
            if hop.is_none() {
                continue;
            }
            let (a, b) = (bases[r], bases[r + 1]);
            for j in 0..n {
                let j_next = (j + 1) % n;
                mesh.add_face(a + j, a + j_next, b + j);
                mesh.add_face(a + j_next, b + j_next, b + j);
            }
        }

        log::debug!(
            "swept {} rings of {} at LOD {}: {} faces, {} stationary hops skipped",
            rings.len(),
            ring_size,
            lod,
            mesh.face_count(),
            hops.len() - stitched
        );

        Ok(Some(mesh))
    }

    /// One finite colour per kept sample.
    fn ring_colors(
        &self,
        active: &[&AugmentedSample],
        kept: &[usize],
        colors: &dyn ColorProvider,
        check: &dyn Fn(usize) -> MeshResult<()>,
    ) -> MeshResult<Vec<f64>> {
        let mut values = Vec::with_capacity(kept.len());
        for (r, &start) in kept.iter().enumerate() {
            check(r)?;
            let value = match self.config.color_strategy {
                ColorStrategy::PerRing => colors.get(active[start].index),
                ColorStrategy::WindowMean => {
                    let end = kept.get(r + 1).copied().unwrap_or(start + 1);
                    mean_finite(active[start..end].iter().map(|s| colors.get(s.index)))
                }
            };
            values.push(value);
        }
        carry_forward(&mut values);
        Ok(values)
    }
}

/// Indices of every `stride`-th item plus the last one.
pub(crate) fn select_stride(len: usize, stride: usize) -> Vec<usize> {
    let mut kept: Vec<usize> = (0..len).step_by(stride.max(1)).collect();
    if let Some(&last) = kept.last() {
        if last + 1 != len {
            kept.push(len - 1);
        }
    }
    kept
}

/// Unit direction of a hop, or `None` if it is stationary.
///
/// Hops no longer than `epsilon` are stationary, and so are hops whose
/// length is not finite: a finite displacement can still overflow `length()`.
pub(crate) fn hop_direction(hop: DVec3, epsilon: f64) -> Option<DVec3> {
    if hop.length() > epsilon {
        hop.try_normalize()
    } else {
        None
    }
}

/// Direction at each of `hops.len() + 1` rings.
///
/// A ring takes the direction of its outgoing hop; stationary hops and the
/// last ring reuse the previous direction, and leading stationary rings
/// borrow the first valid one. `None` if no hop has a direction.
pub(crate) fn travel_directions(hops: &[Option<DVec3>]) -> Option<Vec<DVec3>> {
    let mut current = hops.iter().flatten().next().copied()?;
    let mut directions = Vec::with_capacity(hops.len() + 1);
    for hop in hops {
        if let Some(direction) = hop {
            current = *direction;
        }
        directions.push(current);
    }
    directions.push(current);
    Some(directions)
}

fn mean_finite(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Replaces non-finite values with the previous finite one (0.0 if none).
pub(crate) fn carry_forward(values: &mut [f64]) {
    let mut last = 0.0;
    for value in values {
        if value.is_finite() {
            last = *value;
        } else {
            *value = last;
        }
    }
}
