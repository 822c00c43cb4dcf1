//! Checks a loaded classifier against the labelled reference dataset.
//!
//! Two things are reported: how often the predicted class agrees with the dataset's
//! own diagnosis column, and whether every score is on the side of the boundary its
//! label says it should be (positive for malignant, non-positive for benign). The
//! second check catches artifacts whose `classes` order was written the wrong way
//! round.

use crate::context::DiagnosisContext;
use crate::inference::{Diagnosis, InferenceError};
use log::info;
use rayon::prelude::*;
use std::fmt;

/// One reference sample whose predicted label disagrees with its score's sign.
#[derive(Debug, Clone, PartialEq)]
pub struct SignViolation {
    pub sample_id: String,
    pub diagnosis: Diagnosis,
    pub decision_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub samples: usize,
    /// Rows the scaler was fitted on.
    pub scaler_samples: usize,
    pub agreements: usize,
    pub true_malignant: usize,
    pub true_benign: usize,
    pub false_malignant: usize,
    pub false_benign: usize,
    pub sign_violations: Vec<SignViolation>,
}

impl VerificationReport {
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.agreements as f64 / self.samples as f64
        }
    }

    pub fn sign_convention_holds(&self) -> bool {
        self.sign_violations.is_empty()
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reference samples:    {}", self.samples)?;
        writeln!(f, "Scaler fitted on:     {} samples", self.scaler_samples)?;
        writeln!(
            f,
            "Agreement:            {} ({:.2}%)",
            self.agreements,
            100.0 * self.accuracy()
        )?;
        writeln!(
            f,
            "Malignant predicted:  {} correct, {} wrong",
            self.true_malignant, self.false_malignant
        )?;
        writeln!(
            f,
            "Benign predicted:     {} correct, {} wrong",
            self.true_benign, self.false_benign
        )?;
        if self.sign_convention_holds() {
            writeln!(
                f,
                "Sign convention:      positive score <=> {} holds for every sample",
                Diagnosis::Malignant
            )
        } else {
            writeln!(
                f,
                "Sign convention:      VIOLATED for {} samples",
                self.sign_violations.len()
            )?;
            for violation in &self.sign_violations {
                writeln!(
                    f,
                    "  {}: {} with score {:.4}",
                    violation.sample_id, violation.diagnosis, violation.decision_score
                )?;
            }
            Ok(())
        }
    }
}

/// Scores every reference row in parallel and tallies the outcome.
pub fn verify_reference(context: &DiagnosisContext) -> Result<VerificationReport, InferenceError> {
    let reference = context.reference();
    let predictions = (0..reference.len())
        .into_par_iter()
        .map(|i| context.predict_row(reference.row(i)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = VerificationReport {
        samples: predictions.len(),
        scaler_samples: context.scaler().n_samples(),
        agreements: 0,
        true_malignant: 0,
        true_benign: 0,
        false_malignant: 0,
        false_benign: 0,
        sign_violations: Vec::new(),
    };

    for ((prediction, &truth), id) in predictions
        .iter()
        .zip(reference.diagnoses())
        .zip(reference.ids())
    {
        match (prediction.diagnosis, truth) {
            (Diagnosis::Malignant, Diagnosis::Malignant) => report.true_malignant += 1,
            (Diagnosis::Benign, Diagnosis::Benign) => report.true_benign += 1,
            (Diagnosis::Malignant, Diagnosis::Benign) => report.false_malignant += 1,
            (Diagnosis::Benign, Diagnosis::Malignant) => report.false_benign += 1,
        }
        if prediction.diagnosis == truth {
            report.agreements += 1;
        }

        let positive = prediction.decision_score > 0.0;
        if positive != (prediction.diagnosis == Diagnosis::Malignant) {
            report.sign_violations.push(SignViolation {
                sample_id: id.clone(),
                diagnosis: prediction.diagnosis,
                decision_score: prediction.decision_score,
            });
        }
    }

    info!(
        "Verified classifier on {} reference samples: {} agreements, {} sign violations",
        report.samples,
        report.agreements,
        report.sign_violations.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::DefaultsPolicy;
    use crate::dataset::ReferenceDataset;
    use crate::features::{FEATURE_COUNT, FEATURE_NAMES, Feature};
    use crate::model::{KernelArtifact, SvmArtifact, SvmClassifier};
    use crate::scaler::StandardScaler;

    const RECORDS: &str = "\
842302,M,17.99,10.38,122.8,1001,0.1184,0.2776,0.3001,0.1471,0.2419,0.07871,1.095,0.9053,8.589,153.4,0.006399,0.04904,0.05373,0.01587,0.03003,0.006193,25.38,17.33,184.6,2019,0.1622,0.6656,0.7119,0.2654,0.4601,0.1189
842517,M,20.57,17.77,132.9,1326,0.08474,0.07864,0.0869,0.07017,0.1812,0.05667,0.5435,0.7339,3.398,74.08,0.005225,0.01308,0.0186,0.0134,0.01389,0.003532,24.99,23.41,158.8,1956,0.1238,0.1866,0.2416,0.186,0.275,0.08902
8510426,B,13.54,14.36,87.46,566.3,0.09779,0.08129,0.06664,0.04781,0.1885,0.05766,0.2699,0.7886,2.058,23.56,0.008462,0.0146,0.02387,0.01315,0.0198,0.0023,15.11,19.26,99.7,711.2,0.144,0.1773,0.239,0.1288,0.2977,0.07259
8510824,B,9.504,12.44,60.34,273.9,0.1024,0.06492,0.02956,0.02076,0.1815,0.06905,0.2773,0.9768,1.909,15.7,0.009606,0.01432,0.01985,0.01421,0.02027,0.002968,10.23,15.66,65.13,314.9,0.1324,0.1148,0.08867,0.06227,0.245,0.07773
";

    fn context_with_radius_weight(weight: f64, classes: [u8; 2]) -> DiagnosisContext {
        let reference = ReferenceDataset::from_reader(RECORDS.as_bytes()).unwrap();
        let scaler = StandardScaler::fit(reference.features()).unwrap();
        let mut coefficients = vec![0.0; FEATURE_COUNT];
        coefficients[Feature::MeanRadius.index()] = weight;
        let model = SvmClassifier::from_artifact(SvmArtifact {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            classes,
            intercept: 0.0,
            kernel: KernelArtifact::Linear { coefficients },
        })
        .unwrap();
        DiagnosisContext::from_parts(model, scaler, DefaultsPolicy::zero(), reference).unwrap()
    }

    #[test]
    fn radius_model_agrees_with_reference() {
        let report = verify_reference(&context_with_radius_weight(1.0, [0, 1])).unwrap();
        assert_eq!(report.samples, 4);
        assert_eq!(report.scaler_samples, 4);
        assert_eq!(report.agreements, 4);
        assert_eq!(report.true_malignant, 2);
        assert_eq!(report.true_benign, 2);
        assert_eq!(report.accuracy(), 1.0);
        assert!(report.sign_convention_holds());
        let shown = report.to_string();
        assert!(shown.contains("Scaler fitted on:     4 samples"), "{shown}");
        assert!(shown.contains("holds for every sample"), "{shown}");
    }

    #[test]
    fn flipped_weights_disagree_everywhere() {
        let report = verify_reference(&context_with_radius_weight(-1.0, [0, 1])).unwrap();
        assert_eq!(report.agreements, 0);
        assert_eq!(report.false_malignant, 2);
        assert_eq!(report.false_benign, 2);
        assert!(report.sign_convention_holds());
    }

    #[test]
    fn reversed_classes_violate_sign_convention() {
        let report = verify_reference(&context_with_radius_weight(-1.0, [1, 0])).unwrap();
        assert_eq!(report.agreements, 4);
        assert_eq!(report.sign_violations.len(), 4);
        assert!(!report.sign_convention_holds());
        assert!(report.to_string().contains("VIOLATED for 4 samples"));
    }
}
