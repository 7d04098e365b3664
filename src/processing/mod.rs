//! Document parse pipeline: upload storage, prompting, and reply normalization.

pub mod normalize;
pub mod prompt;
pub mod sanitize;
mod service;
pub mod types;

pub use normalize::{FailureKind, is_error_record, normalize};
pub use prompt::build_prompt;
pub use service::{ParseApi, ProcessingService};
pub use types::{DocumentType, ParsedRecord, ProcessingError, UnknownDocumentType, Upload};
