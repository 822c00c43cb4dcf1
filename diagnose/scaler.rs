//! Per-feature standardization fitted once on the reference dataset.

use log::{info, warn};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis, Zip};
use thiserror::Error;

/// Spreads below this are treated as constant columns and left unscaled.
const CONSTANT_COLUMN_TOLERANCE: f64 = 10.0 * f64::EPSILON;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalerError {
    #[error("Cannot fit a scaler on a reference dataset with no rows.")]
    EmptyReference,
    #[error("Row has {found} features, but the scaler was fitted on {expected}.")]
    DimensionMismatch { found: usize, expected: usize },
}

/// Fitted standardization parameters. There is no way to refit or mutate an
/// instance; a new reference dataset means a new scaler.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
    n_samples: usize,
}

impl StandardScaler {
    /// Fits population means and standard deviations (ddof = 0) over the rows of
    /// `data`, one parameter pair per column.
    pub fn fit(data: ArrayView2<f64>) -> Result<Self, ScalerError> {
        let n_samples = data.nrows();
        let means = data
            .mean_axis(Axis(0))
            .ok_or(ScalerError::EmptyReference)?;

        let mut scales = data.var_axis(Axis(0), 0.0).mapv(f64::sqrt);
        for (col, scale) in scales.iter_mut().enumerate() {
            if *scale < CONSTANT_COLUMN_TOLERANCE {
                warn!("Reference column {col} is constant; leaving it unscaled.");
                *scale = 1.0;
            }
        }

        info!(
            "Fitted standard scaler on {} samples x {} features",
            n_samples,
            means.len()
        );

        Ok(Self {
            means,
            scales,
            n_samples,
        })
    }

    /// Number of features the scaler was fitted on.
    pub fn dim(&self) -> usize {
        self.means.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn means(&self) -> ArrayView1<'_, f64> {
        self.means.view()
    }

    /// `(x - mean) / scale`, elementwise.
    pub fn transform(&self, row: ArrayView1<f64>) -> Result<Array1<f64>, ScalerError> {
        self.check_dim(row.len())?;
        Ok(Zip::from(row)
            .and(&self.means)
            .and(&self.scales)
            .map_collect(|&x, &mean, &scale| (x - mean) / scale))
    }

    /// `z * scale + mean`, elementwise. Undoes `transform`.
    pub fn inverse_transform(&self, row: ArrayView1<f64>) -> Result<Array1<f64>, ScalerError> {
        self.check_dim(row.len())?;
        Ok(Zip::from(row)
            .and(&self.means)
            .and(&self.scales)
            .map_collect(|&z, &mean, &scale| z * scale + mean))
    }

    fn check_dim(&self, found: usize) -> Result<(), ScalerError> {
        if found != self.dim() {
            return Err(ScalerError::DimensionMismatch {
                found,
                expected: self.dim(),
            });
        }
        Ok(())
    }
}
