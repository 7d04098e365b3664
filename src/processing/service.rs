//! Processing service sequencing storage, OCR, prompting, and the model call.

use crate::{
    completion::{CompletionClient, call_model, get_completion_client},
    config::get_config,
    metrics::{MetricsSnapshot, ParseMetrics},
    ocr::{TextExtractor, probe_tesseract},
    processing::{
        normalize::is_error_record,
        prompt::build_prompt,
        sanitize::secure_filename,
        types::{ParsedRecord, ProcessingError, Upload},
    },
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs the full parse pipeline for one uploaded document.
///
/// The service owns the OCR engines, the model client, and the metrics registry. Build it once
/// near process start and share it through an `Arc`; every request reuses the same engines.
pub struct ProcessingService {
    extractor: TextExtractor,
    completion_client: Box<dyn CompletionClient>,
    upload_dir: PathBuf,
    metrics: Arc<ParseMetrics>,
}

/// Abstraction over the parse pipeline used by the HTTP surface.
#[async_trait]
pub trait ParseApi: Send + Sync {
    /// Store `upload`, extract its text, and ask the model for a `doc_type` record.
    async fn parse_document(
        &self,
        upload: Upload,
        doc_type: &str,
    ) -> Result<ParsedRecord, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build the service from the global configuration.
    ///
    /// Creates the upload directory and checks that tesseract is installed. A missing binary is
    /// logged rather than fatal; requests will fail with an OCR error until it is available.
    pub async fn new() -> Self {
        let config = get_config();
        match probe_tesseract(&config.tesseract_bin).await {
            Ok(version) => tracing::info!(version = %version, "Tesseract available"),
            Err(error) => tracing::warn!(
                binary = %config.tesseract_bin,
                error = %error,
                "Tesseract probe failed; OCR requests will error"
            ),
        }
        let completion_client =
            get_completion_client().expect("Failed to construct completion client");
        tracing::info!(model = %config.gemini_model, "Completion client initialized");

        Self::with_components(
            TextExtractor::from_config(),
            completion_client,
            config.upload_dir.clone(),
        )
        .expect("Failed to prepare upload directory")
    }

    /// Assemble a service from explicit components, creating `upload_dir` if needed.
    pub fn with_components(
        extractor: TextExtractor,
        completion_client: Box<dyn CompletionClient>,
        upload_dir: PathBuf,
    ) -> Result<Self, ProcessingError> {
        std::fs::create_dir_all(&upload_dir)?;
        tracing::debug!(upload_dir = %upload_dir.display(), "Upload directory ready");
        Ok(Self {
            extractor,
            completion_client,
            upload_dir,
            metrics: Arc::new(ParseMetrics::new()),
        })
    }

    /// Write `upload` into the scratch directory, replacing any file with the same name.
    pub async fn save_upload(&self, upload: &Upload) -> Result<PathBuf, ProcessingError> {
        let filename = secure_filename(upload.filename.as_deref());
        let path = self.upload_dir.join(filename);
        tokio::fs::write(&path, &upload.bytes).await?;
        tracing::debug!(path = %path.display(), bytes = upload.bytes.len(), "Stored upload");
        Ok(path)
    }

    /// Run OCR, prompting, and the model call on an already stored image.
    pub async fn parse_stored(
        &self,
        path: &Path,
        doc_type: &str,
    ) -> Result<ParsedRecord, ProcessingError> {
        let text = self.extractor.extract(path, doc_type).await?;
        let prompt = build_prompt(doc_type, &text);
        if prompt.is_empty() {
            tracing::warn!(doc_type, "Unknown document type; sending empty prompt");
        }
        let record = call_model(self.completion_client.as_ref(), &prompt).await;
        let is_error = is_error_record(&record);
        self.metrics.record_parse(is_error);
        tracing::info!(doc_type, is_error, "Document parsed");
        Ok(record)
    }
}

#[async_trait]
impl ParseApi for ProcessingService {
    async fn parse_document(
        &self,
        upload: Upload,
        doc_type: &str,
    ) -> Result<ParsedRecord, ProcessingError> {
        let path = self.save_upload(&upload).await?;
        self.parse_stored(&path, doc_type).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
