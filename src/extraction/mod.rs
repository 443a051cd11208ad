//! Raw text extraction from uploaded policy documents.
//!
//! The pipeline only consumes plain text; this module owns the format-specific plumbing for
//! PDF, DOCX, EML, and plain-text uploads behind the [`TextExtractor`] trait. Per-page PDF
//! failures are skipped rather than treated as fatal; a document that yields no text at all
//! (for example a scanned PDF with no text layer) surfaces as an [`ExtractionError`].

use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::LazyLock;
use thiserror::Error;

/// Errors raised while reading an uploaded document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File extension is not one the service knows how to read.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
    /// Document bytes could not be parsed as the declared format.
    #[error("Failed to read document: {0}")]
    Unreadable(String),
    /// Document parsed but contained no extractable text.
    #[error("Document contains no extractable text")]
    NoText,
}

/// Capability interface for turning uploaded bytes into raw text.
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes`, dispatching on the extension of `filename`.
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Format-dispatching extractor covering PDF, DOCX, EML, and plain text.
pub struct FormatExtractor;

impl FormatExtractor {
    /// Construct a new extractor instance.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for FormatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for FormatExtractor {
    fn extract(&self, filename: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let text = match extension.as_str() {
            "pdf" => extract_pdf(bytes)?,
            "docx" => extract_docx(bytes)?,
            "eml" => extract_eml(bytes)?,
            "txt" | "" => String::from_utf8_lossy(bytes).into_owned(),
            other => {
                // Last resort: accept anything that is readable as UTF-8 text.
                match std::str::from_utf8(bytes) {
                    Ok(text) => text.to_string(),
                    Err(_) => return Err(ExtractionError::UnsupportedFormat(other.to_string())),
                }
            }
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

/// Extract text from a PDF page by page, skipping pages that fail.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractionError::Unreadable(format!("failed to load PDF: {e}")))?;

    let pages = doc.get_pages();
    let mut page_numbers: Vec<u32> = pages.keys().copied().collect();
    page_numbers.sort_unstable();

    let mut text = String::new();
    for page_num in page_numbers {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                let trimmed = page_text.trim();
                if !trimmed.is_empty() {
                    text.push_str(trimmed);
                    text.push('\n');
                }
            }
            Err(error) => {
                tracing::warn!(page = page_num, error = %error, "Skipping unreadable PDF page");
            }
        }
    }

    if text.trim().is_empty() {
        return Err(ExtractionError::Unreadable(
            "no text layer found in PDF; document may be scanned".to_string(),
        ));
    }
    Ok(text)
}

static DOCX_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").expect("valid docx run pattern"));
static DOCX_PARAGRAPH_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</w:p>").expect("valid docx paragraph pattern"));

/// Extract text runs from the WordprocessingML body of a DOCX archive.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let cursor = Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| ExtractionError::Unreadable(format!("failed to read DOCX as ZIP: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Unreadable(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Unreadable(format!("failed to read document.xml: {e}")))?;

    // Paragraph boundaries become newlines, then runs are collected per paragraph so the
    // boundaries survive into the extracted text.
    let xml = DOCX_PARAGRAPH_END.replace_all(&xml, "\n");
    let mut paragraphs = Vec::new();
    for paragraph in xml.split('\n') {
        let mut line = String::new();
        for capture in DOCX_RUN.captures_iter(paragraph) {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&unescape_xml(&capture[1]));
        }
        if !line.trim().is_empty() {
            paragraphs.push(line);
        }
    }

    Ok(paragraphs.join("\n"))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Extract the plain-text body of an RFC 822 email.
///
/// Multipart messages contribute their `text/plain` parts; single-part messages contribute
/// the body following the header block.
fn extract_eml(bytes: &[u8]) -> Result<String, ExtractionError> {
    let raw = String::from_utf8_lossy(bytes);
    let (headers, body) = split_headers(&raw);

    let boundary = headers
        .lines()
        .find(|line| line.to_lowercase().contains("boundary="))
        .and_then(|line| {
            let value = line.split("boundary=").nth(1)?;
            // The boundary value may be followed by further parameters.
            let value = value.split(';').next().unwrap_or(value);
            Some(value.trim().trim_matches('"').to_string())
        });

    let Some(boundary) = boundary else {
        return Ok(body.to_string());
    };

    let marker = format!("--{boundary}");
    let mut parts = Vec::new();
    for part in body.split(marker.as_str()).skip(1) {
        let (part_headers, part_body) = split_headers(part);
        let content_type = part_headers
            .lines()
            .find(|line| line.to_lowercase().starts_with("content-type"))
            .unwrap_or("")
            .to_lowercase();
        if content_type.contains("text/plain") || content_type.is_empty() {
            let cleaned = part_body.trim_end_matches("--").trim();
            if !cleaned.is_empty() {
                parts.push(cleaned.to_string());
            }
        }
    }

    Ok(parts.join("\n"))
}

/// Split an RFC 822 message into its header block and body at the first blank line.
fn split_headers(raw: &str) -> (&str, &str) {
    if let Some(idx) = raw.find("\r\n\r\n") {
        (&raw[..idx], &raw[idx + 4..])
    } else if let Some(idx) = raw.find("\n\n") {
        (&raw[..idx], &raw[idx + 2..])
    } else {
        ("", raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let extractor = FormatExtractor::new();
        let text = extractor
            .extract("policy.txt", b"Coverage begins after 36 months.")
            .expect("text extraction");
        assert_eq!(text, "Coverage begins after 36 months.");
    }

    #[test]
    fn unknown_binary_format_is_rejected() {
        let extractor = FormatExtractor::new();
        let error = extractor
            .extract("policy.bin", &[0xFF, 0xFE, 0x00, 0x01])
            .expect_err("binary data");
        assert!(matches!(error, ExtractionError::UnsupportedFormat(ext) if ext == "bin"));
    }

    #[test]
    fn empty_document_is_rejected() {
        let extractor = FormatExtractor::new();
        let error = extractor
            .extract("policy.txt", b"   \n\n  ")
            .expect_err("empty text");
        assert!(matches!(error, ExtractionError::NoText));
    }

    #[test]
    fn corrupt_pdf_is_unreadable() {
        let extractor = FormatExtractor::new();
        let error = extractor
            .extract("policy.pdf", b"%PDF-1.4 garbage")
            .expect_err("corrupt pdf");
        assert!(matches!(error, ExtractionError::Unreadable(_)));
    }

    #[test]
    fn single_part_email_yields_body() {
        let raw = "From: claims@example.com\nSubject: Policy\n\nThe policy covers knee surgery.";
        let text = FormatExtractor::new()
            .extract("claim.eml", raw.as_bytes())
            .expect("email extraction");
        assert_eq!(text.trim(), "The policy covers knee surgery.");
    }

    #[test]
    fn multipart_email_yields_text_plain_parts() {
        let raw = concat!(
            "From: claims@example.com\n",
            "Content-Type: multipart/alternative; boundary=\"sep\"\n",
            "\n",
            "--sep\n",
            "Content-Type: text/plain\n",
            "\n",
            "Plain body here.\n",
            "--sep\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>HTML body</p>\n",
            "--sep--\n",
        );
        let text = FormatExtractor::new()
            .extract("claim.eml", raw.as_bytes())
            .expect("email extraction");
        assert!(text.contains("Plain body here."));
        assert!(!text.contains("HTML body"));
    }

    #[test]
    fn multipart_boundary_with_trailing_parameters_is_parsed() {
        let raw = concat!(
            "From: claims@example.com\n",
            "Content-Type: multipart/alternative; boundary=\"sep\"; charset=utf-8\n",
            "\n",
            "--sep\n",
            "Content-Type: text/plain\n",
            "\n",
            "Plain body here.\n",
            "--sep\n",
            "Content-Type: text/html\n",
            "\n",
            "<p>HTML body</p>\n",
            "--sep--\n",
        );
        let text = FormatExtractor::new()
            .extract("claim.eml", raw.as_bytes())
            .expect("email extraction");
        assert!(text.contains("Plain body here."));
        assert!(!text.contains("HTML body"));
    }

    fn docx_from_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut xml = String::from("<w:document><w:body>");
        for paragraph in paragraphs {
            xml.push_str(&format!("<w:p><w:r><w:t>{paragraph}</w:t></w:r></w:p>"));
        }
        xml.push_str("</w:body></w:document>");

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .expect("zip entry");
            writer.write_all(xml.as_bytes()).expect("zip write");
            writer.finish().expect("zip finish");
        }
        buffer.into_inner()
    }

    #[test]
    fn docx_runs_are_collected() {
        let bytes = docx_from_paragraphs(&["Maternity benefits apply", "after nine months."]);
        let text = FormatExtractor::new()
            .extract("policy.docx", &bytes)
            .expect("docx extraction");
        assert!(text.contains("Maternity benefits apply"));
        assert!(text.contains("after nine months."));
        // Paragraph boundaries become line breaks in the extracted text.
        assert_eq!(text, "Maternity benefits apply\nafter nine months.");
    }

    #[test]
    fn docx_paragraphs_stay_segmentable() {
        use crate::processing::segment::ClauseSegmenter;

        let bytes = docx_from_paragraphs(&[
            "Policy Terms Overview",
            "1. Waiting Periods",
            "a) Pre-existing conditions have a 36-month waiting period",
            "b) Maternity benefits apply after nine months of coverage",
            "2. Exclusions",
            "- Cosmetic surgery is not covered under this policy",
        ]);
        let text = FormatExtractor::new()
            .extract("policy.docx", &bytes)
            .expect("docx extraction");
        assert!(text.contains('\n'));

        let clauses = ClauseSegmenter::new(20, 1000).segment(&text, "policy.docx");
        assert!(clauses.len() >= 3, "got {} clauses", clauses.len());
        let texts: Vec<&str> = clauses.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.iter().any(|t| t.contains("36-month waiting period")));
        assert!(texts.iter().any(|t| t.contains("Cosmetic surgery")));
    }
}
