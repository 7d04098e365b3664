//! Paragraph-aware tesseract engine for multi-region layouts.

use super::{OcrEngine, OcrError, check_command_output};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

const WORD_LEVEL: &str = "5";

/// OCR engine that reads tesseract's TSV word boxes and regroups them into paragraphs.
pub struct LayoutOcrEngine {
    binary: String,
    language: String,
}

impl LayoutOcrEngine {
    /// Create an engine invoking `binary` with language pack `language`.
    pub fn new(binary: String, language: String) -> Self {
        Self { binary, language }
    }
}

#[async_trait]
impl OcrEngine for LayoutOcrEngine {
    fn name(&self) -> &'static str {
        "tesseract-layout"
    }

    async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("3")
            .arg("tsv")
            .output()
            .await?;
        check_command_output(&self.binary, &output)?;

        Ok(group_paragraphs(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Collapse tesseract TSV output into one line per paragraph.
///
/// Words sharing a `(page, block, paragraph)` key are joined with spaces in reading order;
/// paragraphs are joined with `\n`. Rows that are not word-level or carry no text are ignored.
pub fn group_paragraphs(tsv: &str) -> String {
    let mut paragraphs: Vec<((&str, &str, &str), Vec<&str>)> = Vec::new();

    for row in tsv.lines() {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 || columns[0] != WORD_LEVEL {
            continue;
        }
        let word = columns[11].trim();
        if word.is_empty() {
            continue;
        }
        let key = (columns[1], columns[2], columns[3]);
        match paragraphs.last_mut() {
            Some((last_key, words)) if *last_key == key => words.push(word),
            _ => paragraphs.push((key, vec![word])),
        }
    }

    paragraphs
        .into_iter()
        .map(|(_, words)| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}
