//! # Bead Mesh
//!
//! Swept triangle meshes of deposited material, memoized per request.
//! Consumes the augmented samples of `bead-model` and produces
//! [`MeshBuffer`]s for the rendering layer.
//!
//! ## Architecture
//!
//! ```text
//! bead-model (AugmentedSamples) → bead-mesh (MeshBuffer)
//! ```
//!
//! ## Algorithms
//!
//! - **Cross-section**: capsule ring of `2 * points_per_side` vertices
//! - **Sweep**: one ring per kept sample, quads split into triangles
//! - **Cache**: LRU with request coalescing, keyed by calibration version
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use bead_mesh::{Lod, MeshOutcome, MeshPipeline, MeshRequest};
//! use bead_model::{
//!     BeadCrossSection, CalibrationStore, FeedstockProfile, SampleSeries, ToolpathSample,
//! };
//! use glam::DVec3;
//!
//! let store = Arc::new(CalibrationStore::new());
//! let pipeline = MeshPipeline::new(Arc::clone(&store));
//!
//! let series = SampleSeries::new(vec![
//!     ToolpathSample::new(0, DVec3::ZERO, 100.0, 0.0),
//!     ToolpathSample::new(1, DVec3::X, 100.0, 0.0),
//! ])
//! .unwrap();
//! let request = MeshRequest::new(
//!     series,
//!     FeedstockProfile::circular(1.6).unwrap(),
//!     BeadCrossSection::new(2.0, 1.0).unwrap(),
//!     "FeedVel",
//!     Lod::Low,
//! );
//!
//! // The tool never moves, so nothing is deposited
//! assert_eq!(pipeline.generate(&request), MeshOutcome::Empty);
//! ```

pub mod cache;
pub mod color;
pub mod error;
pub mod mesh;
pub mod ops;
pub mod pipeline;
pub mod primitives;

pub use bead_model::{CancelToken, LatestRequest};
pub use cache::{CacheStats, CachedMesh, Fingerprint, MeshCache};
pub use color::{ColorProvider, ColumnColors, ConstantColor};
pub use error::{MeshError, MeshResult};
pub use mesh::MeshBuffer;
pub use ops::sweep::{ColorStrategy, Lod, LodSettings, LodTable, MeshSweeper, SweepConfig};
pub use pipeline::{MeshOutcome, MeshPipeline, MeshRequest};
pub use primitives::{generate_ring, CrossSectionGenerator};
