//! # Calibration
//!
//! Scalar corrections that map the theoretical bead geometry onto what is
//! physically observed, and a versioned store holding the active set.
//!
//! ## Versioning
//!
//! Every mutation of a [`CalibrationStore`] bumps its version. Cache
//! fingerprints embed the version, so entries computed under an older
//! calibration simply become unreachable.
//!
//! ## File Format
//!
//! ```json
//! {"calibration": {"width_multiplier": 1.654, "correction_factor": 1.0, "area_offset": 0.0}}
//! ```
//!
//! Unknown keys are ignored and absent keys keep their identity value.

use crate::error::CalibrationError;
use config::constants::{
    IDENTITY_AREA_OFFSET_MM2, IDENTITY_CORRECTION_FACTOR, IDENTITY_WIDTH_MULTIPLIER,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Calibration parameters plus the store version they were read at.
///
/// # Example
///
/// ```rust
/// use bead_model::Calibration;
///
/// let calibration = Calibration::new(1.654, 1.0, 0.0).unwrap();
/// let width = calibration.effective_width(27.4);
/// assert!((width - 45.3).abs() / 45.3 < 0.01);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    /// Widens the effective bead to emulate physical spreading (> 0)
    pub width_multiplier: f64,
    /// Multiplies the conservation-of-mass area (> 0)
    pub correction_factor: f64,
    /// Added to the corrected area (mm^2)
    pub area_offset_mm2: f64,
    /// Store version this calibration was read at
    pub version: u64,
}

impl Calibration {
    /// The identity calibration: no widening, no area correction.
    pub const IDENTITY: Calibration = Calibration {
        width_multiplier: IDENTITY_WIDTH_MULTIPLIER,
        correction_factor: IDENTITY_CORRECTION_FACTOR,
        area_offset_mm2: IDENTITY_AREA_OFFSET_MM2,
        version: 0,
    };

    /// Returns the identity calibration.
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Creates a validated calibration at version 0.
    pub fn new(
        width_multiplier: f64,
        correction_factor: f64,
        area_offset_mm2: f64,
    ) -> Result<Self, CalibrationError> {
        let calibration = Self {
            width_multiplier,
            correction_factor,
            area_offset_mm2,
            version: 0,
        };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Checks `width_multiplier > 0`, `correction_factor > 0` and a finite
    /// offset.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.width_multiplier.is_finite() || self.width_multiplier <= 0.0 {
            return Err(CalibrationError::InvalidValue {
                field: "width_multiplier",
                value: self.width_multiplier,
            });
        }
        if !self.correction_factor.is_finite() || self.correction_factor <= 0.0 {
            return Err(CalibrationError::InvalidValue {
                field: "correction_factor",
                value: self.correction_factor,
            });
        }
        if !self.area_offset_mm2.is_finite() {
            return Err(CalibrationError::InvalidValue {
                field: "area_offset",
                value: self.area_offset_mm2,
            });
        }
        Ok(())
    }

    /// Applies the area correction: `raw * correction_factor + offset`.
    #[inline]
    pub fn apply_area(&self, raw_area_mm2: f64) -> f64 {
        raw_area_mm2 * self.correction_factor + self.area_offset_mm2
    }

    /// Applies the width multiplier to a baseline bead width.
    #[inline]
    pub fn effective_width(&self, baseline_width_mm: f64) -> f64 {
        baseline_width_mm * self.width_multiplier
    }

    /// Returns true if the parameters (ignoring version) are the identity.
    pub fn is_identity(&self) -> bool {
        self.width_multiplier == IDENTITY_WIDTH_MULTIPLIER
            && self.correction_factor == IDENTITY_CORRECTION_FACTOR
            && self.area_offset_mm2 == IDENTITY_AREA_OFFSET_MM2
    }

    /// Parses a calibration document strictly.
    ///
    /// Used by [`CalibrationStore::load`], which turns any error into an
    /// identity fallback plus warning.
    pub fn from_json(source: &str) -> Result<Self, CalibrationError> {
        let document: CalibrationDocument =
            serde_json::from_str(source).map_err(|e| CalibrationError::Parse(e.to_string()))?;
        let section = document
            .calibration
            .ok_or(CalibrationError::MissingSection)?;
        Self::new(
            section.width_multiplier,
            section.correction_factor,
            section.area_offset,
        )
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Deserialize)]
struct CalibrationDocument {
    #[serde(default)]
    calibration: Option<CalibrationSection>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CalibrationSection {
    width_multiplier: f64,
    correction_factor: f64,
    #[serde(alias = "area_offset_mm2")]
    area_offset: f64,
}

impl Default for CalibrationSection {
    fn default() -> Self {
        Self {
            width_multiplier: IDENTITY_WIDTH_MULTIPLIER,
            correction_factor: IDENTITY_CORRECTION_FACTOR,
            area_offset: IDENTITY_AREA_OFFSET_MM2,
        }
    }
}

/// Where [`CalibrationStore::load`] reads from.
#[derive(Debug, Clone, Copy)]
pub enum CalibrationSource<'a> {
    /// An in-memory JSON document
    Json(&'a str),
    /// A JSON file on disk
    File(&'a Path),
}

/// Outcome of [`CalibrationStore::load`].
///
/// `warning` is set when the source was missing or malformed and the
/// identity calibration was installed instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationLoad {
    /// The calibration now active in the store
    pub calibration: Calibration,
    /// Recoverable problem encountered while loading
    pub warning: Option<CalibrationError>,
}

/// Versioned holder of the active calibration.
///
/// Readers always observe a consistent `(parameters, version)` pair.
/// Pass the store (or a [`Calibration`] snapshot) explicitly to whatever
/// needs it; tests build their own isolated instances.
///
/// # Example
///
/// ```rust
/// use bead_model::{Calibration, CalibrationStore};
///
/// let store = CalibrationStore::new();
/// assert_eq!(store.version(), 0);
///
/// let version = store.set(Calibration::new(1.2, 0.9, 0.0).unwrap()).unwrap();
/// assert_eq!(version, 1);
/// assert_eq!(store.snapshot().width_multiplier, 1.2);
/// ```
#[derive(Debug)]
pub struct CalibrationStore {
    active: RwLock<Calibration>,
}

impl Default for CalibrationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationStore {
    /// Creates a store holding the identity calibration at version 0.
    pub fn new() -> Self {
        Self {
            active: RwLock::new(Calibration::IDENTITY),
        }
    }

    /// Creates a store holding the given calibration at version 0.
    pub fn with_calibration(calibration: Calibration) -> Result<Self, CalibrationError> {
        calibration.validate()?;
        Ok(Self {
            active: RwLock::new(Calibration {
                version: 0,
                ..calibration
            }),
        })
    }

    /// Process-wide default store.
    ///
    /// A convenience for application code that wants one shared instance;
    /// it is handed out as an `Arc` and must still be passed explicitly.
    pub fn shared_default() -> Arc<CalibrationStore> {
        static DEFAULT: OnceLock<Arc<CalibrationStore>> = OnceLock::new();
        Arc::clone(DEFAULT.get_or_init(|| Arc::new(CalibrationStore::new())))
    }

    /// Returns a consistent copy of the active calibration.
    pub fn snapshot(&self) -> Calibration {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current version.
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Replaces the active calibration and bumps the version.
    ///
    /// The version carried by `calibration` is ignored. Returns the new
    /// version.
    pub fn set(&self, calibration: Calibration) -> Result<u64, CalibrationError> {
        calibration.validate()?;
        Ok(self.replace(calibration).version)
    }

    /// Restores the identity calibration, bumping the version.
    pub fn reset(&self) -> u64 {
        self.replace(Calibration::IDENTITY).version
    }

    /// Loads a calibration document and installs it.
    ///
    /// Never fails: a missing or malformed source installs the identity
    /// calibration and reports the problem as a warning.
    pub fn load(&self, source: CalibrationSource<'_>) -> CalibrationLoad {
        let parsed = match source {
            CalibrationSource::Json(json) => Calibration::from_json(json),
            CalibrationSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| CalibrationError::Io(format!("{}: {}", path.display(), e)))
                .and_then(|json| Calibration::from_json(&json)),
        };

        match parsed {
            Ok(calibration) => {
                let calibration = self.replace(calibration);
                log::debug!(
                    "calibration loaded: width x{} area x{} {:+} mm2 (version {})",
                    calibration.width_multiplier,
                    calibration.correction_factor,
                    calibration.area_offset_mm2,
                    calibration.version
                );
                CalibrationLoad {
                    calibration,
                    warning: None,
                }
            }
            Err(error) => {
                log::warn!("{}; falling back to identity calibration", error);
                CalibrationLoad {
                    calibration: self.replace(Calibration::IDENTITY),
                    warning: Some(error),
                }
            }
        }
    }

    /// Loads from an in-memory JSON document. See [`CalibrationStore::load`].
    pub fn load_str(&self, json: &str) -> CalibrationLoad {
        self.load(CalibrationSource::Json(json))
    }

    /// Loads from a JSON file. See [`CalibrationStore::load`].
    pub fn load_path(&self, path: impl AsRef<Path>) -> CalibrationLoad {
        self.load(CalibrationSource::File(path.as_ref()))
    }

    fn replace(&self, calibration: Calibration) -> Calibration {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = Calibration {
            version: active.version + 1,
            ..calibration
        };
        *active
    }
}
