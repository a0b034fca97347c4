//! # Fingerprints
//!
//! Cache keys for swept meshes. A key covers the sample data identity, the
//! colour column, the LOD and the calibration version, plus a digest of the
//! geometry parameters. Bumping the calibration version therefore makes
//! every older entry unreachable without touching the cache.

use crate::ops::sweep::{Lod, SweepConfig};
use bead_model::{BeadCrossSection, FeedstockProfile, SampleSeries, VolumeConfig};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Cache key for a swept mesh.
///
/// # Example
///
/// ```rust
/// use bead_mesh::{Fingerprint, Lod};
/// use bead_model::SampleSeries;
///
/// let series = SampleSeries::new(Vec::new()).unwrap();
/// let before = Fingerprint::new(&series, "Color", Lod::High, 1);
/// let after = Fingerprint::new(&series, "Color", Lod::High, 2);
/// assert_ne!(before, after);
/// assert_ne!(before.digest(), after.digest());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Content hash of the sample series
    pub series_hash: u64,
    /// Colour column name
    pub color_column: String,
    /// Level of detail
    pub lod: Lod,
    /// Calibration version the mesh is computed under
    pub calibration_version: u64,
    /// Digest of feedstock, bead and configuration parameters
    pub params_digest: u64,
}

impl Fingerprint {
    /// Creates a fingerprint with an empty parameter digest.
    pub fn new(
        series: &SampleSeries,
        color_column: impl Into<String>,
        lod: Lod,
        calibration_version: u64,
    ) -> Self {
        Self {
            series_hash: series.content_hash(),
            color_column: color_column.into(),
            lod,
            calibration_version,
            params_digest: 0,
        }
    }

    /// Sets the parameter digest, see [`params_digest`].
    pub fn with_params(mut self, params_digest: u64) -> Self {
        self.params_digest = params_digest;
        self
    }

    /// Opaque 64-bit hash of the whole key.
    pub fn digest(&self) -> u64 {
        hash_value(self)
    }
}

/// Digest of everything besides the series, column, LOD and calibration
/// that shapes the mesh.
pub fn params_digest(
    feedstock: &FeedstockProfile,
    bead: &BeadCrossSection,
    volume: &VolumeConfig,
    sweep: &SweepConfig,
) -> u64 {
    let mut hasher = DefaultHasher::new();

    feedstock.shape().hash(&mut hasher);
    hash_f64(&mut hasher, feedstock.dimension_mm());
    hash_f64(&mut hasher, bead.length_mm());
    hash_f64(&mut hasher, bead.radius_mm());

    hash_f64(&mut hasher, volume.min_thickness_mm);
    volume.max_thickness_mm.map(f64::to_bits).hash(&mut hasher);

    sweep.lod_table.hash(&mut hasher);
    hash_f64(&mut hasher, sweep.displacement_epsilon);
    for v in sweep.up_hint.to_array() {
        hash_f64(&mut hasher, v);
    }
    sweep.color_strategy.hash(&mut hasher);

    hasher.finish()
}

/// Computes a hash for arbitrary values.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn hash_f64<H: Hasher>(state: &mut H, value: f64) {
    // Fold -0.0 into 0.0
    let value = if value == 0.0 { 0.0 } else { value };
    value.to_bits().hash(state);
}
