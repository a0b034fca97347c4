//! # Vertex Colours
//!
//! Narrow accessor used by the sweeper to colour rings. The column is
//! resolved and checked once when the provider is built, never per sample.

use crate::error::{MeshError, MeshResult};
use bead_model::{Column, SampleSeries};

/// Supplies one scalar per sample index.
///
/// Non-finite values are tolerated here; the sweeper carries the previous
/// finite value forward.
pub trait ColorProvider: Send + Sync {
    /// Colour scalar for the sample at `sample_index`.
    fn get(&self, sample_index: usize) -> f64;
}

impl<F> ColorProvider for F
where
    F: Fn(usize) -> f64 + Send + Sync,
{
    fn get(&self, sample_index: usize) -> f64 {
        self(sample_index)
    }
}

/// Colours taken from a named column of a [`SampleSeries`].
///
/// # Example
///
/// ```rust
/// use bead_mesh::{ColorProvider, ColumnColors};
/// use bead_model::{SampleSeries, ToolpathSample};
/// use glam::DVec3;
///
/// let series = SampleSeries::new(vec![
///     ToolpathSample::new(0, DVec3::ZERO, 1.0, 1.0),
///     ToolpathSample::new(1, DVec3::X, 1.0, 1.0),
/// ])
/// .unwrap();
///
/// let colors = ColumnColors::resolve(&series, "XPos").unwrap();
/// assert_eq!(colors.get(1), 1.0);
/// assert!(ColumnColors::resolve(&series, "Missing").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ColumnColors {
    series: SampleSeries,
    column: Column,
    name: String,
}

impl ColumnColors {
    /// Resolves `name` against the series.
    ///
    /// Fails with [`MeshError::UnknownColumn`] if the column does not exist,
    /// or if the series has samples but none carries a value for it (the
    /// optional `Color` column).
    pub fn resolve(series: &SampleSeries, name: &str) -> MeshResult<Self> {
        let unknown = || MeshError::UnknownColumn {
            name: name.to_string(),
        };
        let column = series.column(name).ok_or_else(unknown)?;
        let has_values = (0..series.len()).any(|i| series.value(column, i).is_some());
        if !series.is_empty() && !has_values {
            log::warn!("color column '{}' has no values in {} samples", name, series.len());
            return Err(unknown());
        }
        Ok(Self {
            series: series.clone(),
            column,
            name: name.to_string(),
        })
    }

    /// The column name this provider reads.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ColorProvider for ColumnColors {
    fn get(&self, sample_index: usize) -> f64 {
        self.series
            .value(self.column, sample_index)
            .unwrap_or(f64::NAN)
    }
}

/// The same colour for every sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantColor(pub f64);

impl ColorProvider for ConstantColor {
    fn get(&self, _sample_index: usize) -> f64 {
        self.0
    }
}
