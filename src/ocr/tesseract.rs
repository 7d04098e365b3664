//! Grayscale tesseract engine for dense, small-font documents.

use super::{OcrEngine, OcrError, check_command_output};
use async_trait::async_trait;
use image::ImageReader;
use std::path::Path;
use tempfile::TempDir;
use tokio::process::Command;

/// OCR engine that feeds a grayscale copy of the image to `tesseract` and trims the output.
pub struct DenseOcrEngine {
    binary: String,
    language: String,
}

impl DenseOcrEngine {
    /// Create an engine invoking `binary` with language pack `language`.
    pub fn new(binary: String, language: String) -> Self {
        Self { binary, language }
    }
}

#[async_trait]
impl OcrEngine for DenseOcrEngine {
    fn name(&self) -> &'static str {
        "tesseract-dense"
    }

    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let tmpdir = TempDir::with_prefix("docparse-ocr")?;
        let gray_path = tmpdir.path().join("gray.png");

        let source = image_path.to_path_buf();
        let target = gray_path.clone();
        tokio::task::spawn_blocking(move || write_grayscale(&source, &target)).await??;

        let output = Command::new(&self.binary)
            .arg(&gray_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await?;
        check_command_output(&self.binary, &output)?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

// Format is sniffed from content since sanitized upload names may lack an extension.
fn write_grayscale(source: &Path, target: &Path) -> Result<(), OcrError> {
    let gray = ImageReader::open(source)?
        .with_guessed_format()?
        .decode()?
        .to_luma8();
    gray.save(target)?;
    Ok(())
}
