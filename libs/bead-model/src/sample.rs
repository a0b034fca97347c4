//! # Toolpath Samples
//!
//! Immutable, ordered deposition samples as handed over by the ingestion
//! layer, plus the named numeric columns usable for colouring.

use crate::error::{ModelError, ModelResult};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Column name for the X position.
pub const COLUMN_X: &str = "XPos";
/// Column name for the Y position.
pub const COLUMN_Y: &str = "YPos";
/// Column name for the Z position.
pub const COLUMN_Z: &str = "ZPos";
/// Column name for the feed velocity.
pub const COLUMN_FEED: &str = "FeedVel";
/// Column name for the path velocity.
pub const COLUMN_PATH: &str = "PathVel";
/// Column name for the per-sample `color_value`.
pub const COLUMN_COLOR: &str = "Color";

const BUILTIN_COLUMNS: [&str; 6] = [
    COLUMN_X,
    COLUMN_Y,
    COLUMN_Z,
    COLUMN_FEED,
    COLUMN_PATH,
    COLUMN_COLOR,
];

/// One deposition sample.
///
/// Positions are in millimeters; feed and path velocity share a rate unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolpathSample {
    /// Monotonic sequence index assigned by the ingestion layer
    pub sequence: u64,
    /// Tool position (mm)
    pub position: DVec3,
    /// Feedstock feed velocity
    pub feed_velocity: f64,
    /// Tool path velocity
    pub path_velocity: f64,
    /// Optional scalar for colouring (e.g. temperature)
    pub color_value: Option<f64>,
}

impl ToolpathSample {
    /// Creates a sample without a colour value.
    pub fn new(sequence: u64, position: DVec3, feed_velocity: f64, path_velocity: f64) -> Self {
        Self {
            sequence,
            position,
            feed_velocity,
            path_velocity,
            color_value: None,
        }
    }

    /// Attaches a colour value.
    pub fn with_color(mut self, value: f64) -> Self {
        self.color_value = Some(value);
        self
    }

    /// Returns true if position and velocities are all finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.feed_velocity.is_finite()
            && self.path_velocity.is_finite()
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
        for v in self.position.to_array() {
            v.to_bits().hash(state);
        }
        self.feed_velocity.to_bits().hash(state);
        self.path_velocity.to_bits().hash(state);
        self.color_value.map(f64::to_bits).hash(state);
    }
}

/// A resolved column of a [`SampleSeries`].
///
/// Obtained once through [`SampleSeries::column`] so per-sample lookups
/// never repeat the name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// X position
    X,
    /// Y position
    Y,
    /// Z position
    Z,
    /// Feed velocity
    Feed,
    /// Path velocity
    Path,
    /// The optional per-sample `color_value`
    Color,
    /// An extra named column, by position in the series
    Extra(usize),
}

#[derive(Debug)]
struct SeriesData {
    samples: Vec<ToolpathSample>,
    columns: Vec<(String, Vec<f64>)>,
    content_hash: u64,
}

/// An immutable, ordered sequence of samples with optional extra columns.
///
/// Cloning is cheap: the data is shared. The content hash is computed once
/// at construction and identifies the data in cache fingerprints.
///
/// # Example
///
/// ```rust
/// use bead_model::{SampleSeries, ToolpathSample};
/// use glam::DVec3;
///
/// let series = SampleSeries::new(vec![
///     ToolpathSample::new(0, DVec3::ZERO, 100.0, 200.0),
///     ToolpathSample::new(1, DVec3::new(10.0, 0.0, 0.0), 100.0, 200.0),
/// ])
/// .unwrap()
/// .with_column("Temp", vec![410.0, 415.0])
/// .unwrap();
///
/// assert_eq!(series.len(), 2);
/// assert!(series.column("Temp").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct SampleSeries {
    data: Arc<SeriesData>,
}

impl SampleSeries {
    /// Builds a series, rejecting sequence indices that do not strictly
    /// increase.
    pub fn new(samples: Vec<ToolpathSample>) -> ModelResult<Self> {
        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].sequence <= pair[0].sequence {
                return Err(ModelError::NonMonotonicSequence {
                    index: index + 1,
                    previous: pair[0].sequence,
                    current: pair[1].sequence,
                });
            }
        }
        Ok(Self::from_parts(samples, Vec::new()))
    }

    /// Returns a new series with an extra numeric column.
    ///
    /// The column needs one value per sample and a name distinct from the
    /// built-in columns and the existing extras.
    pub fn with_column(self, name: impl Into<String>, values: Vec<f64>) -> ModelResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::invalid_parameter("column", "name must not be empty"));
        }
        if values.len() != self.len() {
            return Err(ModelError::ColumnLength {
                name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        if self.column(&name).is_some() {
            return Err(ModelError::invalid_parameter(
                "column",
                format!("'{}' already exists", name),
            ));
        }

        let mut columns = self.data.columns.clone();
        columns.push((name, values));
        Ok(Self::from_parts(self.data.samples.clone(), columns))
    }

    fn from_parts(samples: Vec<ToolpathSample>, columns: Vec<(String, Vec<f64>)>) -> Self {
        let mut hasher = DefaultHasher::new();
        samples.len().hash(&mut hasher);
        for sample in &samples {
            sample.hash_into(&mut hasher);
        }
        for (name, values) in &columns {
            name.hash(&mut hasher);
            for v in values {
                v.to_bits().hash(&mut hasher);
            }
        }
        let content_hash = hasher.finish();

        Self {
            data: Arc::new(SeriesData {
                samples,
                columns,
                content_hash,
            }),
        }
    }

    /// Returns the number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.samples.len()
    }

    /// Returns true if the series holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.samples.is_empty()
    }

    /// Returns the samples in order.
    #[inline]
    pub fn samples(&self) -> &[ToolpathSample] {
        &self.data.samples
    }

    /// Returns the content hash identifying this data.
    #[inline]
    pub fn content_hash(&self) -> u64 {
        self.data.content_hash
    }

    /// Resolves a column by name.
    pub fn column(&self, name: &str) -> Option<Column> {
        let builtin = match name {
            COLUMN_X => Some(Column::X),
            COLUMN_Y => Some(Column::Y),
            COLUMN_Z => Some(Column::Z),
            COLUMN_FEED => Some(Column::Feed),
            COLUMN_PATH => Some(Column::Path),
            COLUMN_COLOR => Some(Column::Color),
            _ => None,
        };
        builtin.or_else(|| {
            self.data
                .columns
                .iter()
                .position(|(column, _)| column == name)
                .map(Column::Extra)
        })
    }

    /// Lists every column name, built-ins first.
    pub fn column_names(&self) -> Vec<String> {
        BUILTIN_COLUMNS
            .iter()
            .map(|name| name.to_string())
            .chain(self.data.columns.iter().map(|(name, _)| name.clone()))
            .collect()
    }

    /// Reads a resolved column at a sample index.
    ///
    /// Returns `None` for out-of-range indices and for samples without a
    /// `color_value` when reading [`Column::Color`].
    pub fn value(&self, column: Column, index: usize) -> Option<f64> {
        let sample = self.data.samples.get(index)?;
        match column {
            Column::X => Some(sample.position.x),
            Column::Y => Some(sample.position.y),
            Column::Z => Some(sample.position.z),
            Column::Feed => Some(sample.feed_velocity),
            Column::Path => Some(sample.path_velocity),
            Column::Color => sample.color_value,
            Column::Extra(slot) => self
                .data
                .columns
                .get(slot)
                .and_then(|(_, values)| values.get(index).copied()),
        }
    }
}
