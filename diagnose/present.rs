//! Terminal presentation: the interactive form and the result text.
//!
//! The form is generic over its input and output streams so it can be driven by
//! stdin/stdout in the binary and by in-memory buffers in tests.

use crate::assemble::DefaultsPolicy;
use crate::context::DiagnosisContext;
use crate::features::{Feature, PartialInput};
use crate::inference::{Diagnosis, InferenceError, PredictionResult};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::io::{self, BufRead, Write};

/// The three key measurements and the values the short form starts with.
pub const KEY_FIELDS: [(Feature, f64); 3] = [
    (Feature::MeanRadius, 17.99),
    (Feature::MeanTexture, 10.38),
    (Feature::MeanPerimeter, 122.80),
];

/// Which features the form asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSet {
    /// `mean_radius`, `mean_texture` and `mean_perimeter`.
    #[default]
    Key,
    /// All thirty features, each starting at its active default.
    All,
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldSet::Key => "key",
            FieldSet::All => "all",
        })
    }
}

/// One prompt of the form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormField {
    pub feature: Feature,
    /// Value taken when the user just presses Enter.
    pub initial: f64,
}

impl FieldSet {
    pub fn fields(self, defaults: &DefaultsPolicy) -> Vec<FormField> {
        match self {
            FieldSet::Key => KEY_FIELDS
                .iter()
                .map(|&(feature, initial)| FormField { feature, initial })
                .collect(),
            FieldSet::All => Feature::ALL
                .iter()
                .map(|&feature| FormField {
                    feature,
                    initial: defaults.default_for(feature),
                })
                .collect(),
        }
    }
}

/// How a form session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Predicted(PredictionResult),
    /// Input ended before the user triggered a prediction.
    Aborted,
    /// The prediction itself failed; the message has already been shown.
    Failed(InferenceError),
}

/// The result block shown after a prediction.
pub fn render_result(result: &PredictionResult) -> String {
    format!(
        "Predicted diagnosis: {}\n\
         Decision score (raw decision function value): {:.4}\n\
         Note: a positive decision score indicates {}, a negative score indicates {}.\n",
        result.diagnosis,
        result.decision_score,
        Diagnosis::Malignant,
        Diagnosis::Benign,
    )
}

/// Prompts for every field in order. Returns `None` if input ends first.
///
/// An empty line accepts the shown initial value. Anything that is not a finite
/// number is reported and the same field is asked again.
pub fn collect_inputs<R: BufRead, W: Write>(
    fields: &[FormField],
    reader: &mut R,
    writer: &mut W,
) -> io::Result<Option<PartialInput>> {
    let mut input = PartialInput::new();
    for field in fields {
        loop {
            write!(
                writer,
                "{} [{:.4}]: ",
                field.feature.label(),
                field.initial
            )?;
            writer.flush()?;

            let Some(line) = read_line(reader)? else {
                return Ok(None);
            };
            let text = line.trim();
            let value = if text.is_empty() {
                field.initial
            } else {
                match text.parse::<f64>() {
                    Ok(v) if v.is_finite() => v,
                    _ => {
                        writeln!(writer, "  '{text}' is not a finite number, try again.")?;
                        continue;
                    }
                }
            };
            match input.set(field.feature, value) {
                Ok(()) => break,
                Err(e) => writeln!(writer, "  {e}")?,
            }
        }
    }
    Ok(Some(input))
}

/// Runs one full form interaction against a loaded context.
pub fn run_form<R: BufRead, W: Write>(
    context: &DiagnosisContext,
    field_set: FieldSet,
    reader: &mut R,
    writer: &mut W,
) -> io::Result<FormOutcome> {
    let fields = field_set.fields(context.defaults());
    writeln!(
        writer,
        "Enter the values for {} feature(s). Press Enter to keep the value in brackets.",
        fields.len()
    )?;
    if fields.len() < Feature::ALL.len() {
        writeln!(
            writer,
            "The remaining features use {} defaults.",
            context.defaults().kind()
        )?;
    }

    let Some(input) = collect_inputs(&fields, reader, writer)? else {
        writeln!(writer)?;
        return Ok(FormOutcome::Aborted);
    };

    write!(writer, "Press Enter to predict the diagnosis...")?;
    writer.flush()?;
    if read_line(reader)?.is_none() {
        writeln!(writer)?;
        return Ok(FormOutcome::Aborted);
    }

    debug!("Form submitted with {} values", input.len());
    match context.predict(&input) {
        Ok(result) => {
            writeln!(writer)?;
            write!(writer, "{}", render_result(&result))?;
            Ok(FormOutcome::Predicted(result))
        }
        Err(e) => {
            writeln!(writer, "Prediction failed: {e}")?;
            Ok(FormOutcome::Failed(e))
        }
    }
}

fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        Ok(None)
    } else {
        Ok(Some(line))
    }
}
