//! Upload classification: decides how each file reaches the extractor.

use image::ImageFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::ocr::OcrInput;
use crate::schema::DocumentKind;

/// Page separator in plain-text transcripts.
const FORM_FEED: char = '\u{0C}';

/// A raw uploaded file.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// An upload that passed classification.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub kind: DocumentKind,
    pub mime_type: String,
    pub content_hash: String,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("{0}: file is empty")]
    Empty(String),
    #[error("{name}: unsupported file type .{ext}. Supported: .pdf, .png, .jpg, .jpeg, .txt")]
    Unsupported { name: String, ext: String },
}

impl Document {
    /// Classify an upload by extension, sniffing image bytes for the MIME type.
    pub fn classify(file: UploadedFile) -> Result<Self, IntakeError> {
        if file.data.is_empty() {
            return Err(IntakeError::Empty(file.name));
        }

        let ext = file
            .name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let (kind, mime_type) = match ext.as_str() {
            "pdf" => (DocumentKind::Pdf, "application/pdf".to_string()),
            "png" | "jpg" | "jpeg" => (DocumentKind::Image, image_mime(&file.name, &ext, &file.data)),
            "txt" => (DocumentKind::Transcript, "text/plain".to_string()),
            other => {
                return Err(IntakeError::Unsupported {
                    name: file.name,
                    ext: other.to_string(),
                })
            }
        };

        let content_hash = format!("{:x}", Sha256::digest(&file.data));
        debug!("{}: {:?} ({}), sha256={}", file.name, kind, mime_type, content_hash);

        Ok(Self {
            name: file.name,
            kind,
            mime_type,
            content_hash,
            data: file.data,
        })
    }

    /// Pages the document should yield. PDFs are counted; everything else is one page.
    pub fn expected_pages(&self) -> u32 {
        match self.kind {
            DocumentKind::Pdf => pdf_page_count(&self.data).unwrap_or_else(|e| {
                warn!("{}: could not count PDF pages, assuming 1: {}", self.name, e);
                1
            }),
            DocumentKind::Image => 1,
            DocumentKind::Transcript => self.transcript_pages().len() as u32,
        }
    }

    /// Split a transcript into pages on form feeds. A trailing form feed
    /// (as written by `pdftotext`) does not open a new page.
    pub fn transcript_pages(&self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.data);
        text.strip_suffix(FORM_FEED)
            .unwrap_or(&text)
            .split(FORM_FEED)
            .map(|p| p.to_string())
            .collect()
    }

    pub fn to_ocr_input(&self) -> OcrInput {
        OcrInput {
            filename: self.name.clone(),
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// MIME type from the image bytes, or from the extension if they are not recognized.
fn image_mime(name: &str, ext: &str, data: &[u8]) -> String {
    match image::guess_format(data) {
        Ok(ImageFormat::Png) => "image/png".to_string(),
        Ok(ImageFormat::Jpeg) => "image/jpeg".to_string(),
        Ok(other) => {
            warn!("{}: .{} file contains {:?} data", name, ext, other);
            extension_mime(ext)
        }
        Err(_) => {
            warn!("{}: unrecognized image bytes", name);
            extension_mime(ext)
        }
    }
}

fn extension_mime(ext: &str) -> String {
    match ext {
        "png" => "image/png",
        _ => "image/jpeg",
    }
    .to_string()
}

fn pdf_page_count(data: &[u8]) -> anyhow::Result<u32> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;
    Ok(doc.get_pages().len() as u32)
}
