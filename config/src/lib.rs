//! # Config Crate
//!
//! Centralized configuration constants for the bead deposition mesh engine.
//! All magic numbers and tunable defaults are defined here so the model and
//! mesh crates agree on tolerances, level-of-detail tables and cache sizing.
//!
//! ## Usage
//!
//! ```rust
//! use config::constants::{DISPLACEMENT_EPSILON, LOD_HIGH_POINTS_PER_SIDE};
//!
//! // Segments shorter than this are skipped by the sweeper
//! let step: f64 = 5e-7;
//! assert!(step < DISPLACEMENT_EPSILON);
//!
//! // Ring vertex count is twice the points per side
//! let ring_vertices = 2 * LOD_HIGH_POINTS_PER_SIDE;
//! assert_eq!(ring_vertices, 24);
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All constants defined once, used everywhere
//! - **Units**: Lengths in millimeters, areas in square millimeters
//! - **Identity Defaults**: Calibration defaults leave the physics untouched

pub mod constants;
