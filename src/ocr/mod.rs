//! OCR backends and the extractor that routes documents to them.
//!
//! Two engines are available, both driven through the `tesseract` CLI:
//!
//! - [`DenseOcrEngine`] converts the image to grayscale first and trims the output; it suits
//!   small-font, tightly structured cards and receipts.
//! - [`LayoutOcrEngine`] asks tesseract for word boxes and regroups them into paragraphs; it
//!   suits multi-column layouts such as resumes.
//!
//! Engines are built once at startup and shared for the lifetime of the process.

mod layout;
mod tesseract;

pub use layout::{LayoutOcrEngine, group_paragraphs};
pub use tesseract::DenseOcrEngine;

use crate::config::get_config;
use crate::processing::DocumentType;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;

/// Errors raised while running OCR on a stored upload.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Image could not be decoded or re-encoded.
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    /// Temporary files or the OCR process could not be created.
    #[error("OCR I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// The OCR command ran but reported failure.
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        /// Executable that was invoked.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// Blocking image work panicked or was cancelled.
    #[error("OCR worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Interface implemented by OCR backends.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Recognize the text contained in the image at `image_path`.
    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// Which engine handles a given document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrBackend {
    /// Grayscale, whitespace-trimmed recognition for dense structured documents.
    Dense,
    /// Paragraph-aware recognition for noisy multi-region layouts.
    Layout,
}

impl OcrBackend {
    /// Select the backend for a raw `doc_type` string. Only resumes use the layout engine.
    pub fn for_doc_type(doc_type: &str) -> Self {
        match doc_type.parse::<DocumentType>() {
            Ok(DocumentType::Resume) => Self::Layout,
            _ => Self::Dense,
        }
    }
}

/// Routes each document to the OCR engine tuned for its type.
#[derive(Clone)]
pub struct TextExtractor {
    dense: Arc<dyn OcrEngine>,
    layout: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    /// Build an extractor from explicit engines.
    pub fn new(dense: Arc<dyn OcrEngine>, layout: Arc<dyn OcrEngine>) -> Self {
        Self { dense, layout }
    }

    /// Build the tesseract-backed extractor described by the global configuration.
    pub fn from_config() -> Self {
        let config = get_config();
        Self::new(
            Arc::new(DenseOcrEngine::new(
                config.tesseract_bin.clone(),
                config.ocr_language.clone(),
            )),
            Arc::new(LayoutOcrEngine::new(
                config.tesseract_bin.clone(),
                config.ocr_language.clone(),
            )),
        )
    }

    /// Extract text from the image at `image_path` using the engine chosen by `doc_type`.
    pub async fn extract(&self, image_path: &Path, doc_type: &str) -> Result<String, OcrError> {
        let engine = match OcrBackend::for_doc_type(doc_type) {
            OcrBackend::Dense => &self.dense,
            OcrBackend::Layout => &self.layout,
        };
        tracing::debug!(engine = engine.name(), path = %image_path.display(), "Running OCR");
        let text = engine.recognize(image_path).await?;
        tracing::info!(
            engine = engine.name(),
            characters = text.chars().count(),
            "OCR completed"
        );
        Ok(text)
    }
}

/// Check that the tesseract binary can be executed, returning its version banner.
pub async fn probe_tesseract(binary: &str) -> Result<String, OcrError> {
    let output = Command::new(binary).arg("--version").output().await?;
    check_command_output(binary, &output)?;
    // Older builds print the banner on stderr.
    let banner = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    Ok(String::from_utf8_lossy(banner)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string())
}

pub(crate) fn check_command_output(command: &str, output: &Output) -> Result<(), OcrError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    tracing::error!(command, status = %output.status, stderr = %stderr, "OCR command failed");
    Err(OcrError::CommandFailed {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedEngine(&'static str);

    #[async_trait]
    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn recognize(&self, _image_path: &Path) -> Result<String, OcrError> {
            Ok(format!("text from {}", self.0))
        }
    }

    fn extractor() -> TextExtractor {
        TextExtractor::new(Arc::new(FixedEngine("dense")), Arc::new(FixedEngine("layout")))
    }

    #[test]
    fn only_resumes_use_layout_engine() {
        assert_eq!(OcrBackend::for_doc_type("Resume"), OcrBackend::Layout);
        assert_eq!(OcrBackend::for_doc_type("Driving License"), OcrBackend::Dense);
        assert_eq!(OcrBackend::for_doc_type("Shop Receipt"), OcrBackend::Dense);
        assert_eq!(OcrBackend::for_doc_type("Invoice"), OcrBackend::Dense);
    }

    #[tokio::test]
    async fn extract_routes_by_document_type() {
        let extractor = extractor();
        let path = PathBuf::from("unused.png");
        assert_eq!(
            extractor.extract(&path, "Resume").await.expect("ocr"),
            "text from layout"
        );
        assert_eq!(
            extractor.extract(&path, "Shop Receipt").await.expect("ocr"),
            "text from dense"
        );
    }

    #[tokio::test]
    async fn probe_reports_missing_binary() {
        let error = probe_tesseract("definitely-not-a-real-tesseract-binary")
            .await
            .expect_err("missing binary");
        assert!(matches!(error, OcrError::Io(_)));
    }
}
