//! # Mesh Operations
//!
//! Operations producing meshes from augmented samples.

pub mod sweep;

pub use sweep::{ColorStrategy, Lod, LodSettings, LodTable, MeshSweeper, SweepConfig};
