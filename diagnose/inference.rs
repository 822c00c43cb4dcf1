//! Scale one row and run it through the classifier.

use crate::model::SvmClassifier;
use crate::scaler::StandardScaler;
use log::debug;
use ndarray::ArrayView1;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error(
        "Feature row has {found} values, but the scaler and classifier expect {expected}."
    )]
    DimensionMismatch { found: usize, expected: usize },
}

/// The two diagnostic classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    Benign,
    Malignant,
}

impl Diagnosis {
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Diagnosis::Benign),
            1 => Some(Diagnosis::Malignant),
            _ => None,
        }
    }

    pub fn label(self) -> u8 {
        match self {
            Diagnosis::Benign => 0,
            Diagnosis::Malignant => 1,
        }
    }

    /// Text shown to the user.
    pub fn display_text(self) -> &'static str {
        match self {
            Diagnosis::Benign => "Jinak",
            Diagnosis::Malignant => "Ganas",
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

/// Outcome of one prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub diagnosis: Diagnosis,
    /// Signed margin from the separating boundary.
    pub decision_score: f64,
}

impl PredictionResult {
    pub fn label(&self) -> u8 {
        self.diagnosis.label()
    }
}

/// Standardizes `row` with the fitted parameters and evaluates the classifier.
pub fn invoke(
    scaler: &StandardScaler,
    model: &SvmClassifier,
    row: ArrayView1<f64>,
) -> Result<PredictionResult, InferenceError> {
    if row.len() != model.n_features() {
        return Err(InferenceError::DimensionMismatch {
            found: row.len(),
            expected: model.n_features(),
        });
    }
    let scaled = scaler
        .transform(row)
        .map_err(|_| InferenceError::DimensionMismatch {
            found: row.len(),
            expected: scaler.dim(),
        })?;
    let decision_score = model.decision_function(scaled.view())?;
    let diagnosis = model.label_for(decision_score);
    debug!("Decision score {decision_score:.6} -> {diagnosis}");
    Ok(PredictionResult {
        diagnosis,
        decision_score,
    })
}
