//! # Batch Input Loading
//!
//! Reads a TSV file of partial inputs for non-interactive scoring. Every column other
//! than the optional `sample_id` must be one of the canonical feature names; columns
//! that are absent are filled by the active defaults policy, just as unfilled form
//! fields are. Cells must be numeric, finite and non-null.

use crate::features::{Feature, FeatureError, PartialInput};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

const SAMPLE_ID_COLUMN: &str = "sample_id";

/// Rows of a batch file, ready for prediction.
#[derive(Debug)]
pub struct BatchInputs {
    /// From the `sample_id` column if present, otherwise 1-based row numbers.
    pub sample_ids: Vec<String>,
    /// The feature columns present in the file, in canonical order.
    pub features: Vec<Feature>,
    pub inputs: Vec<PartialInput>,
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid batch column: {0}")]
    Feature(#[from] FeatureError),
    #[error(
        "The column '{column_name}' could not be converted to a number. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        found_type: String,
    },
    #[error(
        "Missing values were found in column '{0}'. Leave the column out to use the configured defaults instead."
    )]
    MissingValuesFound(String),
}

/// Loads a tab-separated batch file.
pub fn load_batch_inputs(path: &Path) -> Result<BatchInputs, BatchError> {
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(b'\t')),
        )
        .finish()?;

    let n_rows = df.height();
    let column_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut features = Vec::new();
    let mut has_sample_ids = false;
    for name in &column_names {
        if name == SAMPLE_ID_COLUMN {
            has_sample_ids = true;
        } else {
            features.push(name.parse::<Feature>()?);
        }
    }
    features.sort_unstable();
    features.dedup();

    let mut inputs = vec![PartialInput::new(); n_rows];
    for &feature in &features {
        let values = extract_numeric_column(&df, feature.name())?;
        for (input, value) in inputs.iter_mut().zip(values) {
            input.set(feature, value)?;
        }
    }

    let sample_ids = if has_sample_ids {
        build_sample_ids(&df, n_rows)?
    } else {
        (1..=n_rows).map(|i| i.to_string()).collect()
    };

    Ok(BatchInputs {
        sample_ids,
        features,
        inputs,
    })
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, BatchError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(BatchError::MissingValuesFound(column_name.to_string()));
    }

    let wrong_type = || BatchError::ColumnWrongType {
        column_name: column_name.to_string(),
        found_type: format!("{:?}", series.dtype()),
    };

    let casted = series.cast(&DataType::Float64).map_err(|_| wrong_type())?;
    if casted.null_count() > 0 {
        return Err(wrong_type());
    }

    let chunked = casted.f64()?.rechunk();
    Ok(chunked.into_no_null_iter().collect())
}

fn build_sample_ids(df: &DataFrame, n: usize) -> Result<Vec<String>, BatchError> {
    let series = df.column(SAMPLE_ID_COLUMN)?;
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let value = series.get(i).unwrap_or(AnyValue::Null);
        ids.push(match value {
            AnyValue::Null => (i + 1).to_string(),
            AnyValue::String(s) => s.to_string(),
            other => other.to_string(),
        });
    }
    Ok(ids)
}
