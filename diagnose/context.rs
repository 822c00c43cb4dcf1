//! The read-only state a session runs against.
//!
//! `DiagnosisContext::load` performs every startup step in order: read the classifier
//! artifact, acquire the reference dataset, fit the scaler, resolve the defaults
//! policy. Any failure is returned as a `StartupError` and nothing is partially built.
//! After that the context is never mutated and can be shared freely across threads.

use crate::assemble::{DefaultsPolicy, PolicyKind, assemble};
use crate::config::{AppConfig, ConfigError};
use crate::dataset::{DatasetError, ReferenceDataset, acquire_reference_dataset};
use crate::features::{FeatureError, FeatureVector, PartialInput};
use crate::inference::{InferenceError, PredictionResult, invoke};
use crate::model::{ModelError, SvmClassifier};
use crate::scaler::{ScalerError, StandardScaler};
use log::info;
use ndarray::ArrayView1;
use thiserror::Error;

/// Startup-phase failures. All of them end the session before any prompt is shown.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Reference dataset unavailable: {0}")]
    DatasetUnavailable(#[from] DatasetError),
    #[error("Failed to fit the feature scaler: {0}")]
    Scaler(#[from] ScalerError),
    #[error("Invalid defaults: {0}")]
    Defaults(#[from] FeatureError),
}

#[derive(Debug, Clone)]
pub struct DiagnosisContext {
    model: SvmClassifier,
    scaler: StandardScaler,
    defaults: DefaultsPolicy,
    reference: ReferenceDataset,
}

impl DiagnosisContext {
    pub fn load(config: &AppConfig) -> Result<Self, StartupError> {
        eprintln!(
            "> Loading classifier from: {}",
            config.model_path.display()
        );
        let model = SvmClassifier::load(&config.model_path)?;

        let reference = acquire_reference_dataset(&config.dataset)?;
        eprintln!(
            "> Fitting feature scaler on {} reference samples",
            reference.len()
        );
        let scaler = StandardScaler::fit(reference.features())?;

        let defaults = match config.defaults.policy {
            PolicyKind::Zero => DefaultsPolicy::zero(),
            PolicyKind::Literal => DefaultsPolicy::literal(&config.defaults.literal)?,
            PolicyKind::DatasetMean => DefaultsPolicy::dataset_mean(&scaler)?,
        };

        Self::from_parts(model, scaler, defaults, reference)
    }

    /// Assembles a context from already-loaded pieces.
    pub fn from_parts(
        model: SvmClassifier,
        scaler: StandardScaler,
        defaults: DefaultsPolicy,
        reference: ReferenceDataset,
    ) -> Result<Self, StartupError> {
        if scaler.dim() != model.n_features() {
            return Err(ScalerError::DimensionMismatch {
                found: scaler.dim(),
                expected: model.n_features(),
            }
            .into());
        }
        info!(
            "Session ready: {} kernel, {} defaults, {} reference samples",
            model.kernel_name(),
            defaults.kind(),
            reference.len()
        );
        Ok(Self {
            model,
            scaler,
            defaults,
            reference,
        })
    }

    pub fn assemble(&self, input: &PartialInput) -> FeatureVector {
        assemble(input, &self.defaults)
    }

    /// Assemble, scale and classify one partial input.
    pub fn predict(&self, input: &PartialInput) -> Result<PredictionResult, InferenceError> {
        let vector = self.assemble(input);
        invoke(&self.scaler, &self.model, vector.view())
    }

    /// Classify a complete row, e.g. one from the reference dataset.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<PredictionResult, InferenceError> {
        invoke(&self.scaler, &self.model, row)
    }

    pub fn model(&self) -> &SvmClassifier {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn defaults(&self) -> &DefaultsPolicy {
        &self.defaults
    }

    pub fn reference(&self) -> &ReferenceDataset {
        &self.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::features::{FEATURE_COUNT, FEATURE_NAMES, Feature};
    use crate::inference::Diagnosis;
    use crate::model::{KernelArtifact, SvmArtifact};
    use std::path::Path;

    const RECORDS: &str = "\
842302,M,17.99,10.38,122.8,1001,0.1184,0.2776,0.3001,0.1471,0.2419,0.07871,1.095,0.9053,8.589,153.4,0.006399,0.04904,0.05373,0.01587,0.03003,0.006193,25.38,17.33,184.6,2019,0.1622,0.6656,0.7119,0.2654,0.4601,0.1189
8510824,B,9.504,12.44,60.34,273.9,0.1024,0.06492,0.02956,0.02076,0.1815,0.06905,0.2773,0.9768,1.909,15.7,0.009606,0.01432,0.01985,0.01421,0.02027,0.002968,10.23,15.66,65.13,314.9,0.1324,0.1148,0.08867,0.06227,0.245,0.07773
";

    fn radius_artifact() -> SvmArtifact {
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[Feature::MeanRadius.index()] = 1.0;
        SvmArtifact {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            classes: [0, 1],
            intercept: 0.0,
            kernel: KernelArtifact::Linear { coefficients },
        }
    }

    fn write_inputs(dir: &Path) -> AppConfig {
        let model_path = dir.join("svm_model.toml");
        SvmClassifier::from_artifact(radius_artifact())
            .unwrap()
            .save(&model_path)
            .unwrap();
        let data_path = dir.join("wdbc.data");
        std::fs::write(&data_path, RECORDS).unwrap();
        AppConfig {
            model_path,
            dataset: DatasetConfig {
                path: Some(data_path),
                cache_dir: dir.join("cache"),
                offline: true,
                ..DatasetConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn loads_and_predicts_with_mean_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let context = DiagnosisContext::load(&write_inputs(dir.path())).unwrap();
        assert_eq!(context.defaults().kind(), PolicyKind::DatasetMean);
        assert_eq!(context.reference().len(), 2);

        // Radius mean is 13.747; only the radius weight is non-zero.
        let large = PartialInput::from_pairs([("mean_radius", 17.99)]).unwrap();
        let small = PartialInput::from_pairs([("mean_radius", 9.504)]).unwrap();
        assert_eq!(context.predict(&large).unwrap().diagnosis, Diagnosis::Malignant);
        assert_eq!(context.predict(&small).unwrap().diagnosis, Diagnosis::Benign);

        // An empty form sits exactly on the mean, so the score is zero.
        let neutral = context.predict(&PartialInput::new()).unwrap();
        assert!(neutral.decision_score.abs() < 1e-12);
        assert_eq!(neutral.diagnosis, Diagnosis::Benign);
    }

    #[test]
    fn predictions_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let context = DiagnosisContext::load(&write_inputs(dir.path())).unwrap();
        let input = PartialInput::from_pairs([
            ("mean_radius", 17.99),
            ("mean_texture", 10.38),
            ("mean_perimeter", 122.80),
        ])
        .unwrap();
        assert_eq!(context.predict(&input), context.predict(&input));
    }

    #[test]
    fn missing_artifact_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.model_path = dir.path().join("absent.toml");
        assert!(matches!(
            DiagnosisContext::load(&config),
            Err(StartupError::Model(ModelError::ArtifactNotFound(_)))
        ));
    }

    #[test]
    fn garbled_dataset_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_inputs(dir.path());
        if let Some(path) = &config.dataset.path {
            std::fs::write(path, "not,a,dataset\n").unwrap();
        }
        assert!(matches!(
            DiagnosisContext::load(&config),
            Err(StartupError::DatasetUnavailable(_))
        ));
    }

    #[test]
    fn uncached_offline_dataset_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.dataset.path = None;
        assert!(matches!(
            DiagnosisContext::load(&config),
            Err(StartupError::DatasetUnavailable(DatasetError::Download { .. }))
        ));
    }

    #[test]
    fn literal_policy_is_resolved_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_inputs(dir.path());
        config.defaults.policy = PolicyKind::Literal;
        config
            .defaults
            .literal
            .insert("mean_radius".to_string(), 5.0);
        let context = DiagnosisContext::load(&config).unwrap();
        let vector = context.assemble(&PartialInput::new());
        assert_eq!(vector.get(Feature::MeanRadius), 5.0);
        assert_eq!(vector.get(Feature::MeanTexture), 10.38);
    }
}
