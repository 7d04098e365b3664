//! Core data types and error definitions for the parse pipeline.

use crate::ocr::OcrError;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured record returned to callers: either a schema-shaped object produced by the model
/// or an `{error, raw_output}` record.
pub type ParsedRecord = serde_json::Value;

/// Document schemas understood by the prompt builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// Driving license card.
    DrivingLicense,
    /// Shop or till receipt.
    ShopReceipt,
    /// Curriculum vitae.
    Resume,
}

impl DocumentType {
    /// Every supported document type, in catalog order.
    pub const ALL: [DocumentType; 3] = [Self::DrivingLicense, Self::ShopReceipt, Self::Resume];

    /// Literal name used on the wire and inside the prompt schema.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DrivingLicense => "Driving License",
            Self::ShopReceipt => "Shop Receipt",
            Self::Resume => "Resume",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a `doc_type` string names none of the known schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown document type '{0}'")]
pub struct UnknownDocumentType(pub String);

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == s)
            .ok_or_else(|| UnknownDocumentType(s.to_string()))
    }
}

/// File received in the multipart `file` part.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-supplied filename, unsanitized.
    pub filename: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Faults that escape the parse pipeline and surface as server errors.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Upload could not be written to scratch storage.
    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    /// OCR engine failed to read the stored image.
    #[error("Failed to extract text: {0}")]
    Ocr(#[from] OcrError),
}
