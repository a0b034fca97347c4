//! # Capsule Cross-Section
//!
//! Generates the ring of vertices for one bead cross-section: a rectangle
//! of width `L` and height `T` closed on both sides by semicircular caps of
//! radius `R` (flattened to the bead thickness).
//!
//! ## Layout
//!
//! In the local frame, `x` runs along `right` and `y` along `up`. The right
//! cap goes bottom to top, the left cap top to bottom, so the ring is a
//! closed counter-clockwise loop of `2 * points_per_side` vertices:
//!
//! ```text
//! right cap: theta_k = -pi/2 + pi * k / (pps - 1)
//!            (L/2 + R cos theta_k, T/2 sin theta_k)
//! left cap:  the right cap rotated by 180 degrees
//! ```

use crate::error::{MeshError, MeshResult};
use config::constants::{COLLINEAR_EPSILON, MAX_POINTS_PER_SIDE, MIN_POINTS_PER_SIDE};
use glam::DVec3;
use std::f64::consts::PI;

/// Orthonormal frame perpendicular to the travel direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingFrame {
    /// Unit travel direction
    pub forward: DVec3,
    /// Unit width axis, `normalize(forward x hint)`
    pub right: DVec3,
    /// Unit thickness axis, `right x forward`
    pub up: DVec3,
}

impl RingFrame {
    /// Builds the frame for `forward`, trying `up_hint`, then world Z, then
    /// world X until one is not collinear with `forward`.
    ///
    /// Returns `None` if `forward` has no usable direction.
    pub fn new(forward: DVec3, up_hint: DVec3) -> Option<Self> {
        let forward = forward.try_normalize()?;
        [up_hint, DVec3::Z, DVec3::X]
            .into_iter()
            .filter_map(|hint| hint.try_normalize())
            .find_map(|hint| {
                let right = forward.cross(hint);
                if right.length() <= COLLINEAR_EPSILON {
                    return None;
                }
                let right = right.normalize();
                Some(Self {
                    forward,
                    right,
                    up: right.cross(forward),
                })
            })
    }
}

/// Ring generator for a fixed number of points per cap.
///
/// The cap angles are computed once and reused for every ring of a sweep.
///
/// # Example
///
/// ```rust
/// use bead_mesh::primitives::CrossSectionGenerator;
/// use glam::DVec3;
///
/// let generator = CrossSectionGenerator::new(8).unwrap();
/// let ring = generator
///     .generate_ring(DVec3::ZERO, DVec3::X, DVec3::Z, 1.0, 2.0, 1.0)
///     .unwrap();
/// assert_eq!(ring.len(), 16);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSectionGenerator {
    points_per_side: u32,
    /// `(cos, sin)` of each right-cap angle
    cap: Vec<(f64, f64)>,
}

impl CrossSectionGenerator {
    /// Creates a generator emitting `2 * points_per_side` vertices per ring.
    pub fn new(points_per_side: u32) -> MeshResult<Self> {
        if !(MIN_POINTS_PER_SIDE..=MAX_POINTS_PER_SIDE).contains(&points_per_side) {
            return Err(MeshError::invalid_request(format!(
                "points_per_side must be in {}..={}: {}",
                MIN_POINTS_PER_SIDE, MAX_POINTS_PER_SIDE, points_per_side
            )));
        }

        let steps = f64::from(points_per_side - 1);
        let cap = (0..points_per_side)
            .map(|k| {
                let theta = -PI / 2.0 + PI * f64::from(k) / steps;
                (theta.cos(), theta.sin())
            })
            .collect();

        Ok(Self {
            points_per_side,
            cap,
        })
    }

    /// Points on each semicircular cap.
    #[inline]
    pub fn points_per_side(&self) -> u32 {
        self.points_per_side
    }

    /// Vertices per ring, `2 * points_per_side`.
    #[inline]
    pub fn ring_size(&self) -> usize {
        2 * self.points_per_side as usize
    }

    /// Generates a ring around `center` perpendicular to `forward`.
    ///
    /// Fails with [`MeshError::DegenerateGeometry`] when `forward` is
    /// (near) zero or any input is not finite; the sweeper avoids this by
    /// reusing the previous direction for stationary samples.
    pub fn generate_ring(
        &self,
        center: DVec3,
        forward: DVec3,
        up_hint: DVec3,
        thickness: f64,
        bead_length: f64,
        bead_radius: f64,
    ) -> MeshResult<Vec<DVec3>> {
        let finite = thickness.is_finite() && bead_length.is_finite() && bead_radius.is_finite();
        if !center.is_finite() || !finite {
            return Err(MeshError::degenerate("ring parameters must be finite"));
        }
        let frame = RingFrame::new(forward, up_hint).ok_or_else(|| {
            MeshError::degenerate(format!("no travel direction for ring at {}", center))
        })?;
        Ok(self.ring_in_frame(center, &frame, thickness, bead_length, bead_radius))
    }

    /// Generates a ring in a precomputed frame.
    pub fn ring_in_frame(
        &self,
        center: DVec3,
        frame: &RingFrame,
        thickness: f64,
        bead_length: f64,
        bead_radius: f64,
    ) -> Vec<DVec3> {
        let half_length = bead_length / 2.0;
        let half_thickness = thickness / 2.0;

        let right_cap: Vec<(f64, f64)> = self
            .cap
            .iter()
            .map(|&(cos, sin)| (half_length + bead_radius * cos, half_thickness * sin))
            .collect();

        right_cap
            .iter()
            .copied()
            .chain(right_cap.iter().map(|&(x, y)| (-x, -y)))
            .map(|(x, y)| center + frame.right * x + frame.up * y)
            .collect()
    }
}

/// One-shot ring generation.
///
/// Convenience over [`CrossSectionGenerator`] for callers that build a
/// single ring; sweeps should construct the generator once.
pub fn generate_ring(
    center: DVec3,
    forward: DVec3,
    up_hint: DVec3,
    thickness: f64,
    bead_length: f64,
    bead_radius: f64,
    points_per_side: u32,
) -> MeshResult<Vec<DVec3>> {
    CrossSectionGenerator::new(points_per_side)?.generate_ring(
        center,
        forward,
        up_hint,
        thickness,
        bead_length,
        bead_radius,
    )
}
