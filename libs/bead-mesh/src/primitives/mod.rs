//! # Primitives
//!
//! Cross-section geometry swept along the toolpath.

pub mod capsule;

pub use capsule::{generate_ring, CrossSectionGenerator, RingFrame};
