//! Fitted support-vector classifiers and their TOML artifact format.
//!
//! An artifact holds either a linear kernel (one coefficient per feature) or an RBF
//! kernel (support vectors with their dual coefficients). Both are validated against
//! the canonical feature order before anything is scored.

use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::inference::{Diagnosis, InferenceError};
use log::info;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the human-readable format of a fitted classifier when
// serialized to a TOML file.

/// Kernel section of the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelArtifact {
    /// `f(z) = w . z + b`
    Linear { coefficients: Vec<f64> },
    /// `f(z) = sum_i alpha_i * exp(-gamma * ||sv_i - z||^2) + b`
    Rbf {
        gamma: f64,
        support_vectors: Vec<Vec<f64>>,
        dual_coefficients: Vec<f64>,
    },
}

/// The complete, self-contained classifier artifact as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvmArtifact {
    /// Column order the classifier was fit on. Must equal the canonical order.
    #[serde(default = "canonical_feature_names")]
    pub feature_names: Vec<String>,
    /// Encoded labels on the negative and positive side of the decision boundary.
    #[serde(default = "default_classes")]
    pub classes: [u8; 2],
    pub intercept: f64,
    pub kernel: KernelArtifact,
}

fn canonical_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_classes() -> [u8; 2] {
    [0, 1]
}

/// Custom error type for model loading and saving.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model artifact '{}' was not found.", .0.display())]
    ArtifactNotFound(PathBuf),
    #[error("Model artifact '{}' is corrupt: {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Kernel parameters converted to dense arrays for evaluation.
#[derive(Debug, Clone)]
enum Kernel {
    Linear {
        weights: Array1<f64>,
    },
    Rbf {
        gamma: f64,
        support_vectors: Array2<f64>,
        dual_coefficients: Array1<f64>,
    },
}

/// A validated binary support-vector classifier over the 30 canonical features.
/// Operates on standardized rows.
#[derive(Debug, Clone)]
pub struct SvmClassifier {
    classes: [Diagnosis; 2],
    intercept: f64,
    kernel: Kernel,
}

impl SvmClassifier {
    /// Validates an artifact and converts it into its evaluable form.
    pub fn from_artifact(artifact: SvmArtifact) -> Result<Self, ModelError> {
        internal::check_feature_names(&artifact.feature_names)?;
        let classes = internal::check_classes(artifact.classes)?;
        internal::check_finite("intercept", &[artifact.intercept])?;

        let kernel = match artifact.kernel {
            KernelArtifact::Linear { coefficients } => {
                internal::check_width("coefficients", coefficients.len())?;
                internal::check_finite("coefficients", &coefficients)?;
                Kernel::Linear {
                    weights: Array1::from_vec(coefficients),
                }
            }
            KernelArtifact::Rbf {
                gamma,
                support_vectors,
                dual_coefficients,
            } => {
                if !(gamma.is_finite() && gamma > 0.0) {
                    return Err(ModelError::InvalidArtifact(format!(
                        "gamma must be a positive finite number, got {gamma}"
                    )));
                }
                if support_vectors.is_empty() {
                    return Err(ModelError::InvalidArtifact(
                        "an rbf kernel needs at least one support vector".to_string(),
                    ));
                }
                if support_vectors.len() != dual_coefficients.len() {
                    return Err(ModelError::InvalidArtifact(format!(
                        "{} support vectors but {} dual coefficients",
                        support_vectors.len(),
                        dual_coefficients.len()
                    )));
                }
                internal::check_finite("dual_coefficients", &dual_coefficients)?;

                let n_vectors = support_vectors.len();
                let mut flat = Vec::with_capacity(n_vectors * FEATURE_COUNT);
                for (i, sv) in support_vectors.iter().enumerate() {
                    internal::check_width(&format!("support vector {i}"), sv.len())?;
                    internal::check_finite(&format!("support vector {i}"), sv)?;
                    flat.extend_from_slice(sv);
                }
                let support_vectors = Array2::from_shape_vec((n_vectors, FEATURE_COUNT), flat)
                    .map_err(|e| ModelError::InvalidArtifact(e.to_string()))?;

                Kernel::Rbf {
                    gamma,
                    support_vectors,
                    dual_coefficients: Array1::from_vec(dual_coefficients),
                }
            }
        };

        Ok(Self {
            classes,
            intercept: artifact.intercept,
            kernel,
        })
    }

    /// Converts back into the on-disk representation.
    pub fn to_artifact(&self) -> SvmArtifact {
        let kernel = match &self.kernel {
            Kernel::Linear { weights } => KernelArtifact::Linear {
                coefficients: weights.to_vec(),
            },
            Kernel::Rbf {
                gamma,
                support_vectors,
                dual_coefficients,
            } => KernelArtifact::Rbf {
                gamma: *gamma,
                support_vectors: support_vectors
                    .axis_iter(Axis(0))
                    .map(|row| row.to_vec())
                    .collect(),
                dual_coefficients: dual_coefficients.to_vec(),
            },
        };
        SvmArtifact {
            feature_names: canonical_feature_names(),
            classes: self.classes(),
            intercept: self.intercept,
            kernel,
        }
    }

    /// Loads a classifier from a TOML artifact.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let toml_string = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ModelError::ArtifactNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ModelError::IoError(e)),
        };

        let artifact: SvmArtifact =
            toml::from_str(&toml_string).map_err(|e| ModelError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let model = Self::from_artifact(artifact).map_err(|e| match e {
            ModelError::InvalidArtifact(reason) => ModelError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        info!(
            "Loaded {} classifier from '{}'",
            model.kernel_name(),
            path.display()
        );
        Ok(model)
    }

    /// Saves the classifier in the same TOML format `load` reads.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(&self.to_artifact())?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn kernel_name(&self) -> &'static str {
        match self.kernel {
            Kernel::Linear { .. } => "linear",
            Kernel::Rbf { .. } => "rbf",
        }
    }

    pub fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    /// Encoded labels on the negative and positive side of the boundary.
    pub fn classes(&self) -> [u8; 2] {
        self.classes.map(Diagnosis::label)
    }

    /// Signed distance from the separating boundary for one standardized row.
    pub fn decision_function(&self, z: ArrayView1<f64>) -> Result<f64, InferenceError> {
        if z.len() != self.n_features() {
            return Err(InferenceError::DimensionMismatch {
                found: z.len(),
                expected: self.n_features(),
            });
        }
        let margin = match &self.kernel {
            Kernel::Linear { weights } => weights.dot(&z),
            Kernel::Rbf {
                gamma,
                support_vectors,
                dual_coefficients,
            } => support_vectors
                .axis_iter(Axis(0))
                .zip(dual_coefficients.iter())
                .map(|(sv, &alpha)| {
                    let sq_dist: f64 = sv
                        .iter()
                        .zip(z.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    alpha * (-gamma * sq_dist).exp()
                })
                .sum(),
        };
        Ok(margin + self.intercept)
    }

    /// Class for a decision score: the positive side maps to `classes[1]`.
    pub fn label_for(&self, score: f64) -> Diagnosis {
        if score > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        }
    }
}

/// Internal module for artifact validation details.
mod internal {
    use super::*;

    pub(super) fn check_feature_names(names: &[String]) -> Result<(), ModelError> {
        if names.len() != FEATURE_COUNT {
            return Err(ModelError::InvalidArtifact(format!(
                "expected {FEATURE_COUNT} feature names, found {}",
                names.len()
            )));
        }
        for (i, (found, expected)) in names.iter().zip(FEATURE_NAMES.iter()).enumerate() {
            if found != expected {
                return Err(ModelError::InvalidArtifact(format!(
                    "feature order mismatch at column {i}: expected '{expected}', found '{found}'"
                )));
            }
        }
        Ok(())
    }

    pub(super) fn check_classes(classes: [u8; 2]) -> Result<[Diagnosis; 2], ModelError> {
        match classes.map(Diagnosis::from_label) {
            [Some(negative), Some(positive)] if negative != positive => Ok([negative, positive]),
            _ => Err(ModelError::InvalidArtifact(format!(
                "classes must be 0 and 1 in either order, found {classes:?}"
            ))),
        }
    }

    pub(super) fn check_width(what: &str, found: usize) -> Result<(), ModelError> {
        if found != FEATURE_COUNT {
            return Err(ModelError::InvalidArtifact(format!(
                "{what} has {found} entries, expected {FEATURE_COUNT}"
            )));
        }
        Ok(())
    }

    pub(super) fn check_finite(what: &str, values: &[f64]) -> Result<(), ModelError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidArtifact(format!(
                "{what} contains non-finite values"
            )));
        }
        Ok(())
    }
}
