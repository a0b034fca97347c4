//! # Mesh Pipeline
//!
//! Wires the stages together behind the cache:
//!
//! ```text
//! SampleSeries → VolumeCalculator → MeshSweeper → MeshCache → MeshOutcome
//! ```
//!
//! The calibration store is injected; each build reads one consistent
//! snapshot and keys the cache by its version.

use crate::cache::{params_digest, CachedMesh, Fingerprint, MeshCache};
use crate::color::ColumnColors;
use crate::error::{MeshError, MeshResult};
use crate::mesh::MeshBuffer;
use crate::ops::sweep::{Lod, MeshSweeper, SweepConfig};
use bead_model::{
    BeadCrossSection, Calibration, CalibrationStore, CancelToken, FeedstockProfile,
    LatestRequest, SampleSeries, VolumeCalculator, VolumeConfig,
};
use config::constants::EngineConfig;
use std::sync::Arc;

/// Everything needed to build one mesh.
#[derive(Debug, Clone)]
pub struct MeshRequest {
    /// Samples to extrude
    pub series: SampleSeries,
    /// Feedstock fed into the toolhead
    pub feedstock: FeedstockProfile,
    /// Uncalibrated bead cross-section
    pub bead: BeadCrossSection,
    /// Column used for vertex colours
    pub color_column: String,
    /// Level of detail
    pub lod: Lod,
}

impl MeshRequest {
    /// Creates a request.
    pub fn new(
        series: SampleSeries,
        feedstock: FeedstockProfile,
        bead: BeadCrossSection,
        color_column: impl Into<String>,
        lod: Lod,
    ) -> Self {
        Self {
            series,
            feedstock,
            bead,
            color_column: color_column.into(),
            lod,
        }
    }

    /// Returns a copy at another level of detail.
    pub fn with_lod(&self, lod: Lod) -> Self {
        Self { lod, ..self.clone() }
    }
}

/// Result of a mesh build.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshOutcome {
    /// A mesh ready for rendering
    Success(Arc<MeshBuffer>),
    /// Nothing to extrude
    Empty,
    /// The request failed
    Error(MeshError),
}

impl MeshOutcome {
    /// Returns true for [`MeshOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, MeshOutcome::Success(_))
    }

    /// Returns the mesh on success.
    pub fn mesh(&self) -> Option<&Arc<MeshBuffer>> {
        match self {
            MeshOutcome::Success(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Converts back into a `Result`.
    pub fn into_result(self) -> MeshResult<CachedMesh> {
        match self {
            MeshOutcome::Success(mesh) => Ok(Some(mesh)),
            MeshOutcome::Empty => Ok(None),
            MeshOutcome::Error(error) => Err(error),
        }
    }
}

impl From<MeshResult<CachedMesh>> for MeshOutcome {
    fn from(result: MeshResult<CachedMesh>) -> Self {
        match result {
            Ok(Some(mesh)) => MeshOutcome::Success(mesh),
            Ok(None) => MeshOutcome::Empty,
            Err(error) => MeshOutcome::Error(error),
        }
    }
}

/// Calibration-aware, cached mesh builder.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use bead_mesh::{Lod, MeshPipeline, MeshRequest};
/// use bead_model::{
///     BeadCrossSection, CalibrationStore, FeedstockProfile, SampleSeries, ToolpathSample,
/// };
/// use glam::DVec3;
///
/// let pipeline = MeshPipeline::new(Arc::new(CalibrationStore::new()));
/// let series = SampleSeries::new(
///     (0..3)
///         .map(|i| ToolpathSample::new(i, DVec3::new(10.0 * i as f64, 0.0, 0.0), 100.0, 200.0))
///         .collect(),
/// )
/// .unwrap();
/// let request = MeshRequest::new(
///     series,
///     FeedstockProfile::square(12.7).unwrap(),
///     BeadCrossSection::new(2.0, 1.0).unwrap(),
///     "ZPos",
///     Lod::High,
/// );
///
/// let outcome = pipeline.generate(&request);
/// assert_eq!(outcome.mesh().unwrap().vertex_count(), 72);
/// ```
#[derive(Debug)]
pub struct MeshPipeline {
    calibration: Arc<CalibrationStore>,
    calculator: VolumeCalculator,
    sweeper: MeshSweeper,
    cache: MeshCache,
    requests: LatestRequest<String>,
}

impl MeshPipeline {
    /// Creates a pipeline with default settings.
    pub fn new(calibration: Arc<CalibrationStore>) -> Self {
        Self {
            calibration,
            calculator: VolumeCalculator::default(),
            sweeper: MeshSweeper::default(),
            cache: MeshCache::default(),
            requests: LatestRequest::new(),
        }
    }

    /// Creates a pipeline from explicit settings.
    pub fn with_config(
        calibration: Arc<CalibrationStore>,
        engine: &EngineConfig,
        volume: VolumeConfig,
        sweep: SweepConfig,
    ) -> MeshResult<Self> {
        Ok(Self {
            calibration,
            calculator: VolumeCalculator::new(volume)
                .with_check_interval(engine.cancel_check_interval),
            sweeper: MeshSweeper::new(sweep)?,
            cache: MeshCache::from_engine(engine),
            requests: LatestRequest::new(),
        })
    }

    /// The injected calibration store.
    pub fn calibration(&self) -> &Arc<CalibrationStore> {
        &self.calibration
    }

    /// The mesh cache.
    pub fn cache(&self) -> &MeshCache {
        &self.cache
    }

    /// Cache key for `request` under `calibration`.
    pub fn fingerprint(&self, request: &MeshRequest, calibration: &Calibration) -> Fingerprint {
        Fingerprint::new(
            &request.series,
            request.color_column.as_str(),
            request.lod,
            calibration.version,
        )
        .with_params(params_digest(
            &request.feedstock,
            &request.bead,
            self.calculator.config(),
            self.sweeper.config(),
        ))
    }

    /// Builds (or fetches) the mesh for `request`.
    pub fn generate(&self, request: &MeshRequest) -> MeshOutcome {
        self.run(request, None).into()
    }

    /// Like [`MeshPipeline::generate`], aborting once `cancel` is set.
    pub fn generate_cancellable(&self, request: &MeshRequest, cancel: &CancelToken) -> MeshOutcome {
        self.run(request, Some(cancel)).into()
    }

    /// Builds the mesh for a logical plot; a newer request for the same
    /// plot cancels this one.
    pub fn generate_for_plot(&self, plot: &str, request: &MeshRequest) -> MeshOutcome {
        let token = self.requests.begin(plot.to_string());
        let outcome = self.generate_cancellable(request, &token);
        self.requests.finish(&plot.to_string(), &token);
        outcome
    }

    /// Builds without the cache.
    pub fn build(
        &self,
        request: &MeshRequest,
        calibration: &Calibration,
        cancel: Option<&CancelToken>,
    ) -> MeshResult<Option<MeshBuffer>> {
        let colors = ColumnColors::resolve(&request.series, &request.color_column)?;
        self.build_with(request, calibration, &colors, cancel)
    }

    fn run(&self, request: &MeshRequest, cancel: Option<&CancelToken>) -> MeshResult<CachedMesh> {
        let colors = ColumnColors::resolve(&request.series, &request.color_column)?;
        let calibration = self.calibration.snapshot();
        let key = self.fingerprint(request, &calibration);

        self.cache.get_or_generate(&key, || {
            self.build_with(request, &calibration, &colors, cancel)
        })
    }

    fn build_with(
        &self,
        request: &MeshRequest,
        calibration: &Calibration,
        colors: &ColumnColors,
        cancel: Option<&CancelToken>,
    ) -> MeshResult<Option<MeshBuffer>> {
        let augmented = match cancel {
            Some(token) => self.calculator.process_samples_cancellable(
                &request.series,
                &request.feedstock,
                &request.bead,
                calibration,
                token,
            )?,
            None => self.calculator.process_samples(
                &request.series,
                &request.feedstock,
                &request.bead,
                calibration,
            ),
        };

        let mesh = match cancel {
            Some(token) => {
                self.sweeper
                    .generate_mesh_cancellable(&augmented, colors, request.lod, token)?
            }
            None => self.sweeper.generate_mesh(&augmented, colors, request.lod)?,
        };

        if let Some(mesh) = &mesh {
            mesh.validate()?;
            log::debug!(
                "built mesh for {} samples at LOD {} (calibration v{}): {} vertices, {} faces",
                request.series.len(),
                request.lod,
                calibration.version,
                mesh.vertex_count(),
                mesh.face_count()
            );
        }
        Ok(mesh)
    }
}
