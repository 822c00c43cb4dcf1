//! Turns a partial set of user-supplied measurements into a full 30-slot row.
//!
//! Slots the user did not fill come from a `DefaultsPolicy`, chosen once at
//! configuration time.

use crate::features::{FEATURE_COUNT, Feature, FeatureError, FeatureVector, PartialInput};
use crate::scaler::{ScalerError, StandardScaler};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Literal defaults: the measurements of reference sample 842302 (the first record of
/// the reference dataset, a malignant mass).
pub const LITERAL_DEFAULTS: [f64; FEATURE_COUNT] = [
    17.99, 10.38, 122.8, 1001.0, 0.1184, 0.2776, 0.3001, 0.1471, 0.2419, 0.07871, 1.095, 0.9053,
    8.589, 153.4, 0.006399, 0.04904, 0.05373, 0.01587, 0.03003, 0.006193, 25.38, 17.33, 184.6,
    2019.0, 0.1622, 0.6656, 0.7119, 0.2654, 0.4601, 0.1189,
];

/// Which defaults policy to build. This is what configuration selects; the
/// `DatasetMean` variant is resolved against the fitted scaler at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    Zero,
    Literal,
    #[default]
    DatasetMean,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyKind::Zero => "zero",
            PolicyKind::Literal => "literal",
            PolicyKind::DatasetMean => "dataset-mean",
        })
    }
}

/// A resolved default for every one of the thirty slots.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultsPolicy {
    kind: PolicyKind,
    values: [f64; FEATURE_COUNT],
}

impl DefaultsPolicy {
    pub fn zero() -> Self {
        Self {
            kind: PolicyKind::Zero,
            values: [0.0; FEATURE_COUNT],
        }
    }

    /// `LITERAL_DEFAULTS`, with individual entries replaced by `overrides`.
    pub fn literal(overrides: &BTreeMap<String, f64>) -> Result<Self, FeatureError> {
        let mut values = LITERAL_DEFAULTS;
        for (name, &value) in overrides {
            let feature: Feature = name.parse()?;
            if !value.is_finite() {
                return Err(FeatureError::NonFiniteValue { feature, value });
            }
            values[feature.index()] = value;
        }
        Ok(Self {
            kind: PolicyKind::Literal,
            values,
        })
    }

    /// Per-feature means of the reference dataset, taken from the fitted scaler.
    pub fn dataset_mean(scaler: &StandardScaler) -> Result<Self, ScalerError> {
        let means = scaler.means();
        if means.len() != FEATURE_COUNT {
            return Err(ScalerError::DimensionMismatch {
                found: means.len(),
                expected: FEATURE_COUNT,
            });
        }
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, &mean) in values.iter_mut().zip(means.iter()) {
            *slot = mean;
        }
        Ok(Self {
            kind: PolicyKind::DatasetMean,
            values,
        })
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn default_for(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }
}

/// Builds the full row: supplied values where present, policy defaults elsewhere.
/// No clamping or range checks are applied.
pub fn assemble(input: &PartialInput, policy: &DefaultsPolicy) -> FeatureVector {
    let mut slots = [0.0; FEATURE_COUNT];
    for feature in Feature::ALL {
        slots[feature.index()] = input
            .get(feature)
            .unwrap_or_else(|| policy.default_for(feature));
    }
    debug!(
        "Assembled feature vector from {} supplied values ({} defaults)",
        input.len(),
        policy.kind()
    );
    FeatureVector::from_slots(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn scaler_with_means(means: &[f64]) -> StandardScaler {
        // Two rows symmetric around `means` give exactly those column means.
        let mut data = Array2::zeros((2, means.len()));
        for (j, &m) in means.iter().enumerate() {
            data[[0, j]] = m - 1.0;
            data[[1, j]] = m + 1.0;
        }
        StandardScaler::fit(data.view()).unwrap()
    }

    #[test]
    fn single_supplied_value_is_kept_exactly() {
        let input = PartialInput::from_pairs([("mean_radius", 17.99)]).unwrap();
        let means: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64 * 2.0 + 0.5).collect();
        let policies = [
            DefaultsPolicy::zero(),
            DefaultsPolicy::literal(&BTreeMap::new()).unwrap(),
            DefaultsPolicy::dataset_mean(&scaler_with_means(&means)).unwrap(),
        ];

        for policy in &policies {
            let vector = assemble(&input, policy);
            assert_eq!(vector.len(), FEATURE_COUNT);
            assert_eq!(vector.get(Feature::MeanRadius), 17.99);
            for feature in Feature::ALL.into_iter().skip(1) {
                assert_eq!(
                    vector.get(feature),
                    policy.default_for(feature),
                    "slot {feature} under {} policy",
                    policy.kind()
                );
            }
        }
    }

    #[test]
    fn every_subset_shape_yields_thirty_slots_in_order() {
        let policy = DefaultsPolicy::zero();
        // Prefixes, suffixes and single features cover the interesting shapes.
        for k in 0..=FEATURE_COUNT {
            let prefix = PartialInput::from_pairs(
                Feature::ALL[..k].iter().map(|f| (f.name(), f.index() as f64 + 1.0)),
            )
            .unwrap();
            let suffix = PartialInput::from_pairs(
                Feature::ALL[k..].iter().map(|f| (f.name(), f.index() as f64 + 1.0)),
            )
            .unwrap();
            for input in [prefix, suffix] {
                let vector = assemble(&input, &policy);
                assert_eq!(vector.len(), FEATURE_COUNT);
                for feature in Feature::ALL {
                    let expected = input.get(feature).unwrap_or(0.0);
                    assert_eq!(vector.view()[feature.index()], expected);
                }
            }
        }
    }

    #[test]
    fn assembly_is_deterministic() {
        let input = PartialInput::from_pairs([
            ("mean_radius", 17.99),
            ("mean_texture", 10.38),
            ("mean_perimeter", 122.80),
        ])
        .unwrap();
        let policy = DefaultsPolicy::literal(&BTreeMap::new()).unwrap();
        assert_eq!(assemble(&input, &policy), assemble(&input, &policy));
    }

    #[test]
    fn zero_policy_fills_zero() {
        let vector = assemble(&PartialInput::new(), &DefaultsPolicy::zero());
        assert!(vector.view().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn literal_policy_applies_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert("worst_area".to_string(), 1500.0);
        let policy = DefaultsPolicy::literal(&overrides).unwrap();
        assert_eq!(policy.kind(), PolicyKind::Literal);
        assert_eq!(policy.default_for(Feature::WorstArea), 1500.0);
        assert_eq!(policy.default_for(Feature::MeanArea), 1001.0);
        assert_eq!(policy.default_for(Feature::WorstFractalDimension), 0.1189);
    }

    #[test]
    fn literal_policy_rejects_unknown_names() {
        let mut overrides = BTreeMap::new();
        overrides.insert("mean_volume".to_string(), 1.0);
        assert_eq!(
            DefaultsPolicy::literal(&overrides).unwrap_err(),
            FeatureError::UnknownFeature("mean_volume".to_string())
        );
    }

    #[test]
    fn dataset_mean_policy_uses_scaler_means() {
        let means: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64 * 0.5).collect();
        let policy = DefaultsPolicy::dataset_mean(&scaler_with_means(&means)).unwrap();
        assert_eq!(policy.kind(), PolicyKind::DatasetMean);
        for feature in Feature::ALL {
            assert!((policy.default_for(feature) - means[feature.index()]).abs() < 1e-12);
        }
    }

    #[test]
    fn dataset_mean_requires_thirty_columns() {
        let scaler = scaler_with_means(&[1.0, 2.0, 3.0]);
        assert_eq!(
            DefaultsPolicy::dataset_mean(&scaler).unwrap_err(),
            ScalerError::DimensionMismatch {
                found: 3,
                expected: FEATURE_COUNT
            }
        );
    }
}
