//! # Reference Dataset Parsing
//!
//! The reference dataset is the raw UCI "Breast Cancer Wisconsin (Diagnostic)" file:
//! comma separated, no header, one record per line laid out as
//! `id, diagnosis (M|B), <30 features in canonical order>`. It is used to fit the
//! scaler, to provide per-feature means, and to check a classifier's labels.
//!
//! Every failure here is reported as a `DatasetError`; at startup it becomes the
//! fatal `DatasetUnavailable` condition.

use crate::features::FEATURE_COUNT;
use crate::inference::Diagnosis;
use log::info;
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fields before the features: sample id and diagnosis.
const LEADING_FIELDS: usize = 2;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to download reference dataset {id} from '{url}': {reason}")]
    Download { id: u32, url: String, reason: String },
    #[error("I/O error for reference dataset '{}': {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Could not read reference dataset records: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed reference record {record}: {reason}")]
    Malformed { record: usize, reason: String },
    #[error("The reference dataset contains no records.")]
    Empty,
}

/// The reference samples, held in memory for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    ids: Vec<String>,
    diagnoses: Vec<Diagnosis>,
    features: Array2<f64>,
}

impl ReferenceDataset {
    /// Reads the dataset from a file on disk.
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(BufReader::new(file))?;
        info!(
            "Loaded {} reference samples from '{}'",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parses records from any reader. Blank lines are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let expected_fields = LEADING_FIELDS + FEATURE_COUNT;
        let mut ids = Vec::new();
        let mut diagnoses = Vec::new();
        let mut flat = Vec::new();

        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            let record_number = i + 1;
            if record.len() != expected_fields {
                return Err(DatasetError::Malformed {
                    record: record_number,
                    reason: format!("expected {expected_fields} fields, found {}", record.len()),
                });
            }

            ids.push(record[0].to_string());
            diagnoses.push(parse_diagnosis(&record[1]).ok_or_else(|| {
                DatasetError::Malformed {
                    record: record_number,
                    reason: format!("diagnosis must be 'M' or 'B', found '{}'", &record[1]),
                }
            })?);

            for (offset, field) in record.iter().skip(LEADING_FIELDS).enumerate() {
                let value: f64 = field.parse().map_err(|_| DatasetError::Malformed {
                    record: record_number,
                    reason: format!("feature column {offset} is not numeric: '{field}'"),
                })?;
                if !value.is_finite() {
                    return Err(DatasetError::Malformed {
                        record: record_number,
                        reason: format!("feature column {offset} is not finite: '{field}'"),
                    });
                }
                flat.push(value);
            }
        }

        if ids.is_empty() {
            return Err(DatasetError::Empty);
        }

        let features = Array2::from_shape_vec((ids.len(), FEATURE_COUNT), flat).map_err(|e| {
            DatasetError::Malformed {
                record: 0,
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            ids,
            diagnoses,
            features,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn diagnoses(&self) -> &[Diagnosis] {
        &self.diagnoses
    }

    /// Feature matrix, one row per sample, columns in canonical order.
    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.features.row(index)
    }
}

fn parse_diagnosis(field: &str) -> Option<Diagnosis> {
    match field {
        "M" | "m" => Some(Diagnosis::Malignant),
        "B" | "b" => Some(Diagnosis::Benign),
        _ => None,
    }
}
