pub mod batch;
pub mod fetch;
pub mod reference;
pub use batch::{BatchError, BatchInputs, load_batch_inputs};
pub use fetch::{acquire_reference_dataset, cached_dataset_path};
pub use reference::{DatasetError, ReferenceDataset};
