//! Summaries of local `.pdf`, `.docx` and `.txt` documents.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::FileSummarizer;
use crate::error::{AssistantError, Result};
use crate::llm::LanguageModel;

/// Document formats that can be summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Extracts document text and asks the model for a summary.
pub struct DocumentSummarizer {
    max_chars: usize,
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for DocumentSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSummarizer")
            .field("max_chars", &self.max_chars)
            .field("model", &self.model.name())
            .finish()
    }
}

impl DocumentSummarizer {
    /// At most `max_chars` characters of the document are sent to the model.
    pub fn new(max_chars: usize, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            max_chars: max_chars.max(1),
            model,
        }
    }
}

#[async_trait]
impl FileSummarizer for DocumentSummarizer {
    async fn summarize(&self, file_path: &str) -> Result<String> {
        let path = clean_path(file_path);
        if !path.is_file() {
            return Ok(format!(
                "File not found. I could not locate the file at: {}",
                path.display()
            ));
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let Some(kind) = DocumentKind::from_extension(&ext) else {
            return Ok(format!(
                "Sorry, I can only summarize .pdf, .docx, and .txt files, not the '.{ext}' format."
            ));
        };

        info!(path = %path.display(), ?kind, "extracting document text");
        let source = path.clone();
        let text = tokio::task::spawn_blocking(move || extract_text(&source, kind))
            .await
            .map_err(|e| AssistantError::File(format!("text extraction failed: {e}")))?
            .unwrap_or_else(|e| {
                warn!(path = %path.display(), "could not extract text: {e}");
                String::new()
            });
        if text.trim().is_empty() {
            return Ok(format!(
                "Could not extract any readable text from the file at {}.",
                path.display()
            ));
        }

        let excerpt = truncate_chars(text.trim(), self.max_chars);
        debug!(chars = excerpt.chars().count(), "sending document to model");
        let prompt = format!(
            "Please provide a concise summary of the following document. \
             Focus on the main points and key takeaways.\n\n---\n{excerpt}\n---"
        );
        let summary = self.model.complete(&prompt).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("Here is a summary of '{name}':\n\n{}", summary.trim()))
    }
}

/// Strip quotes and whitespace from a spoken path and expand `~`.
fn clean_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if let Some(rest) = trimmed.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(trimmed)
}

/// Raw text of a document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn extract_text(path: &Path, kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Text => {
            let bytes = std::fs::read(path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        DocumentKind::Docx => extract_docx(path),
        DocumentKind::Pdf => extract_pdf(path),
    }
}

fn extract_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| AssistantError::File(format!("cannot parse PDF: {e}")))?;
    let mut text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page) => {
                text.push_str(&page);
                text.push('\n');
            }
            Err(e) => debug!(page = page_num, "skipping unreadable PDF page: {e}"),
        }
    }
    Ok(text)
}

fn extract_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| AssistantError::File(format!("not a valid .docx archive: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AssistantError::File(format!("missing document body: {e}")))?
        .read_to_string(&mut xml)?;
    Ok(docx_xml_text(&xml))
}

/// Visible text of a WordprocessingML body: `w:t` runs, with paragraph
/// ends, tabs and breaks turned into whitespace.
pub fn docx_xml_text(xml: &str) -> String {
    let mut out = String::new();
    let mut in_text = false;
    let mut tab_stops = 0usize;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text {
            out.push_str(&decode_entities(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default();

        match (name, closing) {
            ("w:t", false) => in_text = !self_closing,
            ("w:t", true) => in_text = false,
            ("w:p", true) => out.push('\n'),
            ("w:tabs", false) if !self_closing => tab_stops += 1,
            ("w:tabs", true) => tab_stops = tab_stops.saturating_sub(1),
            ("w:tab", false) if tab_stops == 0 => out.push('\t'),
            ("w:br" | "w:cr", false) => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
