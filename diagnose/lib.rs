#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod assemble;
pub mod config;
pub mod context;
pub mod features;
pub mod inference;
pub mod model;
pub mod present;
pub mod scaler;
pub mod verify;

#[path = "../dataset/mod.rs"]
pub mod dataset;

pub use context::{DiagnosisContext, StartupError};
pub use features::{Feature, FeatureError, PartialInput};
pub use inference::{Diagnosis, PredictionResult};
