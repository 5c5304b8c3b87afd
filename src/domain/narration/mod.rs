pub mod error;
pub mod model;
pub mod retry;
pub mod service;

pub use error::NarrationError;
pub use model::{
    lesson_dir, output_path, BatchSummary, NarrationRequest, NarrationResult, NarrationStatus,
};
pub use retry::RetryPolicy;
pub use service::{GeneratorOptions, NarrationService, NarrationServiceApi};
