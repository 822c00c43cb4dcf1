//! # Feature Catalogue
//!
//! The thirty FNA measurements, in the column order of the reference dataset. Every
//! fixed-length vector in this crate (scaler parameters, model coefficients, assembled
//! inputs) is indexed by `Feature::index`, so this order is the single contract that
//! keeps fitting and prediction aligned.

use ndarray::{Array1, ArrayView1};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of canonical features.
pub const FEATURE_COUNT: usize = 30;

/// Canonical feature names, in dataset column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mean_radius",
    "mean_texture",
    "mean_perimeter",
    "mean_area",
    "mean_smoothness",
    "mean_compactness",
    "mean_concavity",
    "mean_concave_points",
    "mean_symmetry",
    "mean_fractal_dimension",
    "radius_error",
    "texture_error",
    "perimeter_error",
    "area_error",
    "smoothness_error",
    "compactness_error",
    "concavity_error",
    "concave_points_error",
    "symmetry_error",
    "fractal_dimension_error",
    "worst_radius",
    "worst_texture",
    "worst_perimeter",
    "worst_area",
    "worst_smoothness",
    "worst_compactness",
    "worst_concavity",
    "worst_concave_points",
    "worst_symmetry",
    "worst_fractal_dimension",
];

/// One of the thirty tumor measurements. The discriminant is the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    MeanRadius,
    MeanTexture,
    MeanPerimeter,
    MeanArea,
    MeanSmoothness,
    MeanCompactness,
    MeanConcavity,
    MeanConcavePoints,
    MeanSymmetry,
    MeanFractalDimension,
    RadiusError,
    TextureError,
    PerimeterError,
    AreaError,
    SmoothnessError,
    CompactnessError,
    ConcavityError,
    ConcavePointsError,
    SymmetryError,
    FractalDimensionError,
    WorstRadius,
    WorstTexture,
    WorstPerimeter,
    WorstArea,
    WorstSmoothness,
    WorstCompactness,
    WorstConcavity,
    WorstConcavePoints,
    WorstSymmetry,
    WorstFractalDimension,
}

impl Feature {
    /// All features in canonical order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::MeanRadius,
        Feature::MeanTexture,
        Feature::MeanPerimeter,
        Feature::MeanArea,
        Feature::MeanSmoothness,
        Feature::MeanCompactness,
        Feature::MeanConcavity,
        Feature::MeanConcavePoints,
        Feature::MeanSymmetry,
        Feature::MeanFractalDimension,
        Feature::RadiusError,
        Feature::TextureError,
        Feature::PerimeterError,
        Feature::AreaError,
        Feature::SmoothnessError,
        Feature::CompactnessError,
        Feature::ConcavityError,
        Feature::ConcavePointsError,
        Feature::SymmetryError,
        Feature::FractalDimensionError,
        Feature::WorstRadius,
        Feature::WorstTexture,
        Feature::WorstPerimeter,
        Feature::WorstArea,
        Feature::WorstSmoothness,
        Feature::WorstCompactness,
        Feature::WorstConcavity,
        Feature::WorstConcavePoints,
        Feature::WorstSymmetry,
        Feature::WorstFractalDimension,
    ];

    /// Column index in the canonical order.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Human-readable label, e.g. `mean_concave_points` becomes `Mean Concave Points`.
    pub fn label(self) -> String {
        self.name()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FEATURE_NAMES
            .iter()
            .position(|&name| name == s)
            .map(|i| Feature::ALL[i])
            .ok_or_else(|| FeatureError::UnknownFeature(s.to_string()))
    }
}

/// Errors raised while building user input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error(
        "Unknown feature '{0}'. Feature names are snake_case, e.g. 'mean_radius' or 'worst_area'."
    )]
    UnknownFeature(String),
    #[error("The value for feature '{feature}' must be a finite number, got {value}.")]
    NonFiniteValue { feature: Feature, value: f64 },
    #[error("Could not parse '{0}'. Expected an assignment of the form name=value.")]
    MalformedAssignment(String),
}

/// The values a user actually supplied. Slots left empty are filled later from a
/// `DefaultsPolicy`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialInput {
    values: [Option<f64>; FEATURE_COUNT],
}

impl PartialInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an input from `(name, value)` pairs. Unknown names are rejected; a name
    /// given twice keeps its last value.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, FeatureError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut input = Self::new();
        for (name, value) in pairs {
            let feature: Feature = name.as_ref().parse()?;
            input.set(feature, value)?;
        }
        Ok(input)
    }

    pub fn set(&mut self, feature: Feature, value: f64) -> Result<(), FeatureError> {
        if !value.is_finite() {
            return Err(FeatureError::NonFiniteValue { feature, value });
        }
        self.values[feature.index()] = Some(value);
        Ok(())
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values[feature.index()]
    }

    /// Number of supplied features.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Supplied values in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL
            .iter()
            .filter_map(|&feature| self.get(feature).map(|value| (feature, value)))
    }
}

/// Parses a `name=value` assignment as given on the command line.
pub fn parse_assignment(text: &str) -> Result<(Feature, f64), FeatureError> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| FeatureError::MalformedAssignment(text.to_string()))?;
    let feature: Feature = name.trim().parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| FeatureError::MalformedAssignment(text.to_string()))?;
    if !value.is_finite() {
        return Err(FeatureError::NonFiniteValue { feature, value });
    }
    Ok((feature, value))
}

/// A complete row of thirty values in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Array1<f64>,
}

impl FeatureVector {
    pub(crate) fn from_slots(slots: [f64; FEATURE_COUNT]) -> Self {
        Self {
            values: Array1::from_vec(slots.to_vec()),
        }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }
}
