//! # Configuration Constants
//!
//! Centralized constants for the bead deposition mesh engine. Geometry
//! tolerances, level-of-detail defaults, thickness bounds and cache sizing
//! are defined here.
//!
//! ## Categories
//!
//! - **Precision**: Floating-point comparison tolerances
//! - **Level of Detail**: Ring resolution and sample stride per LOD level
//! - **Bead Model**: Thickness clamping bounds
//! - **Calibration**: Identity calibration values
//! - **Cache**: Memoization capacity
//! - **Limits**: Cancellation cadence and safety bounds

use std::fmt;

// =============================================================================
// PRECISION CONSTANTS
// =============================================================================

/// Epsilon for floating-point comparisons.
///
/// # Example
///
/// ```rust
/// use config::constants::EPSILON;
///
/// fn approximately_equal(a: f64, b: f64) -> bool {
///     (a - b).abs() < EPSILON
/// }
///
/// assert!(approximately_equal(1.0, 1.0 + 1e-11));
/// ```
pub const EPSILON: f64 = 1e-10;

/// Minimum displacement (mm) between consecutive samples for a travel
/// direction to be defined.
///
/// Segments shorter than this are not stitched and the previous direction
/// is reused, so no zero-area or NaN triangles are produced.
///
/// # Example
///
/// ```rust
/// use config::constants::DISPLACEMENT_EPSILON;
///
/// let displacement = 1e-7;
/// assert!(displacement < DISPLACEMENT_EPSILON);
/// ```
pub const DISPLACEMENT_EPSILON: f64 = 1e-6;

/// Threshold under which a cross product is treated as zero when building
/// the ring frame (forward and up hint collinear).
pub const COLLINEAR_EPSILON: f64 = 1e-9;

/// Relative tolerance for the conservation-of-mass check
/// `area * path_velocity == feed_velocity * feedstock_area`.
pub const CONSERVATION_REL_TOLERANCE: f64 = 1e-6;

// =============================================================================
// LEVEL OF DETAIL CONSTANTS
// =============================================================================

/// Points per semicircular end cap at low detail.
pub const LOD_LOW_POINTS_PER_SIDE: u32 = 6;

/// Sample stride at low detail (every 4th active sample).
pub const LOD_LOW_STRIDE: usize = 4;

/// Points per semicircular end cap at medium detail.
pub const LOD_MEDIUM_POINTS_PER_SIDE: u32 = 8;

/// Sample stride at medium detail.
pub const LOD_MEDIUM_STRIDE: usize = 2;

/// Points per semicircular end cap at high detail.
///
/// # Example
///
/// ```rust
/// use config::constants::{LOD_HIGH_POINTS_PER_SIDE, LOD_LOW_POINTS_PER_SIDE};
///
/// assert!(LOD_HIGH_POINTS_PER_SIDE > LOD_LOW_POINTS_PER_SIDE);
/// ```
pub const LOD_HIGH_POINTS_PER_SIDE: u32 = 12;

/// Sample stride at high detail (every active sample).
pub const LOD_HIGH_STRIDE: usize = 1;

/// Smallest usable points per side. Two points per cap give a rectangle.
pub const MIN_POINTS_PER_SIDE: u32 = 2;

/// Upper bound on points per side to keep ring sizes sane.
pub const MAX_POINTS_PER_SIDE: u32 = 256;

// =============================================================================
// BEAD MODEL CONSTANTS
// =============================================================================

/// Thickness (mm) assigned to samples whose area falls below the
/// semicircular floor `pi * R^2`.
///
/// # Example
///
/// ```rust
/// use config::constants::DEFAULT_MIN_THICKNESS_MM;
///
/// assert!(DEFAULT_MIN_THICKNESS_MM > 0.0);
/// ```
pub const DEFAULT_MIN_THICKNESS_MM: f64 = 0.05;

/// Smallest rectangular segment length (mm) a calibrated bead may shrink to.
///
/// Keeps the thickness solve `T = (A - pi * R^2) / L` well defined when a
/// width multiplier below one narrows the bead.
pub const MIN_BEAD_LENGTH_MM: f64 = 1e-3;

/// Default upper clamp for bead thickness. `None` leaves thickness
/// unclamped.
pub const DEFAULT_MAX_THICKNESS_MM: Option<f64> = None;

// =============================================================================
// CALIBRATION CONSTANTS
// =============================================================================

/// Identity width multiplier.
pub const IDENTITY_WIDTH_MULTIPLIER: f64 = 1.0;

/// Identity area correction factor.
pub const IDENTITY_CORRECTION_FACTOR: f64 = 1.0;

/// Identity additive area offset (mm^2).
pub const IDENTITY_AREA_OFFSET_MM2: f64 = 0.0;

// =============================================================================
// CACHE CONSTANTS
// =============================================================================

/// Number of mesh buffers kept by the memoization cache.
///
/// # Example
///
/// ```rust
/// use config::constants::DEFAULT_CACHE_CAPACITY;
///
/// assert_eq!(DEFAULT_CACHE_CAPACITY, 8);
/// ```
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

// =============================================================================
// LIMIT CONSTANTS
// =============================================================================

/// Number of samples processed between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: usize = 4096;

/// Minimum number of rings handed to a rayon worker when sweeping.
pub const PARALLEL_MIN_BATCH: usize = 1024;

/// Maximum number of vertices in a single mesh buffer.
///
/// Face indices are `u32`, so buffers larger than this are rejected.
pub const MAX_VERTICES: usize = u32::MAX as usize;

// =============================================================================
// ENGINE CONFIGURATION
// =============================================================================

/// Immutable snapshot of engine-wide settings shared between crates.
///
/// # Examples
/// ```
/// use config::constants::EngineConfig;
/// let config = EngineConfig::default();
/// assert!(config.displacement_epsilon > 0.0);
/// assert_eq!(config.cache_capacity, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Minimum travel between samples for a direction to exist.
    pub displacement_epsilon: f64,
    /// Number of cached mesh buffers.
    pub cache_capacity: usize,
    /// Samples processed between cancellation checks.
    pub cancel_check_interval: usize,
}

impl EngineConfig {
    /// Builds a configuration enforcing strict validation of the supplied
    /// values.
    ///
    /// # Examples
    /// ```
    /// use config::constants::EngineConfig;
    /// let cfg = EngineConfig::new(1.0e-6, 16, 1024).expect("valid config");
    /// assert_eq!(cfg.cache_capacity, 16);
    /// ```
    pub fn new(
        displacement_epsilon: f64,
        cache_capacity: usize,
        cancel_check_interval: usize,
    ) -> Result<Self, ConfigError> {
        if !(displacement_epsilon > 0.0) {
            return Err(ConfigError::InvalidTolerance(displacement_epsilon));
        }
        if cache_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(cache_capacity));
        }
        if cancel_check_interval == 0 {
            return Err(ConfigError::InvalidInterval(cancel_check_interval));
        }
        Ok(Self {
            displacement_epsilon,
            cache_capacity,
            cancel_check_interval,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            displacement_epsilon: DISPLACEMENT_EPSILON,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cancel_check_interval: CANCEL_CHECK_INTERVAL,
        }
    }
}

/// Error returned when invalid configuration values are provided.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Raised when a tolerance is zero, negative or NaN.
    InvalidTolerance(f64),
    /// Raised when the cache could not hold a single entry.
    InvalidCapacity(usize),
    /// Raised when the cancellation interval is zero.
    InvalidInterval(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTolerance(value) => {
                write!(f, "tolerance must be positive: {value}")
            }
            ConfigError::InvalidCapacity(value) => {
                write!(f, "cache capacity must be >= 1: {value}")
            }
            ConfigError::InvalidInterval(value) => {
                write!(f, "cancel check interval must be >= 1: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Checks if two f64 values are approximately equal within EPSILON.
///
/// # Example
///
/// ```rust
/// use config::constants::approx_equal;
///
/// assert!(approx_equal(1.0, 1.0 + 1e-11));
/// assert!(!approx_equal(1.0, 1.1));
/// ```
#[inline]
pub fn approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Checks if two f64 values agree within a relative tolerance.
///
/// # Example
///
/// ```rust
/// use config::constants::{relative_eq, CONSERVATION_REL_TOLERANCE};
///
/// assert!(relative_eq(1000.0, 1000.0000001, CONSERVATION_REL_TOLERANCE));
/// assert!(!relative_eq(1000.0, 1001.0, CONSERVATION_REL_TOLERANCE));
/// ```
#[inline]
pub fn relative_eq(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}
