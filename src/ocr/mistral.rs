//! Mistral OCR provider (remote OCR web API).

use super::{OcrInput, OcrPage, OcrProvider, OcrResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const OCR_URL: &str = "https://api.mistral.ai/v1/ocr";
const FILES_URL: &str = "https://api.mistral.ai/v1/files";
const MODEL: &str = "mistral-ocr-latest";

pub struct MistralOcrProvider {
    api_key: String,
    client: reqwest::Client,
}

impl MistralOcrProvider {
    pub fn from_env(client: reqwest::Client) -> anyhow::Result<Self> {
        let api_key = std::env::var("MISTRAL_API_KEY")
            .map_err(|_| anyhow::anyhow!("MISTRAL_API_KEY not set"))?;
        Ok(Self { api_key, client })
    }
}

// ── Mistral API request/response types ──────────────────────────────────────

#[derive(Serialize)]
struct OcrRequest {
    model: String,
    document: DocumentSource,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum DocumentSource {
    #[serde(rename = "image_url")]
    Image { image_url: String },
    #[serde(rename = "file")]
    File { file_id: String },
}

#[derive(Deserialize)]
struct OcrResponse {
    pages: Vec<MistralPage>,
}

#[derive(Deserialize)]
struct MistralPage {
    index: u32,
    markdown: String,
}

#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

// ── Provider implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl OcrProvider for MistralOcrProvider {
    fn name(&self) -> &str {
        "mistral_ocr"
    }

    async fn process(&self, input: &OcrInput) -> anyhow::Result<OcrResult> {
        let document = if input.mime_type.starts_with("image/") {
            inline_image(input)
        } else {
            let file_id = self.upload_file(input).await?;
            DocumentSource::File { file_id }
        };

        let body = OcrRequest {
            model: MODEL.to_string(),
            document,
        };

        info!("MistralOcrProvider: calling OCR API for {}", input.filename);

        let resp = self
            .client
            .post(OCR_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Mistral OCR API error ({}): {}", status, text);
        }

        let raw_text = resp.text().await?;
        debug!(
            "MistralOcrProvider: raw response ({} bytes)",
            raw_text.len()
        );
        let ocr: OcrResponse = serde_json::from_str(&raw_text)?;

        Ok(OcrResult {
            pages: into_pages(ocr),
            provider_name: "mistral_ocr".to_string(),
        })
    }
}

/// Images go inline as a data URL; no upload round-trip needed.
fn inline_image(input: &OcrInput) -> DocumentSource {
    DocumentSource::Image {
        image_url: format!("data:{};base64,{}", input.mime_type, BASE64.encode(&input.data)),
    }
}

fn into_pages(ocr: OcrResponse) -> Vec<OcrPage> {
    ocr.pages
        .into_iter()
        .map(|p| OcrPage {
            page_num: p.index + 1, // API pages are 0-indexed
            text: p.markdown,
        })
        .collect()
}

impl MistralOcrProvider {
    /// Upload raw bytes to Mistral Files API, return the file_id.
    async fn upload_file(&self, input: &OcrInput) -> anyhow::Result<String> {
        use reqwest::multipart::{Form, Part};

        info!(
            "MistralOcrProvider: uploading {} ({} bytes) to Files API",
            input.filename,
            input.data.len()
        );

        let part = Part::bytes(input.data.clone())
            .file_name(input.filename.clone())
            .mime_str(&input.mime_type)?;

        let form = Form::new().part("file", part).text("purpose", "ocr");

        let resp = self
            .client
            .post(FILES_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Mistral Files API error ({}): {}", status, text);
        }

        let upload: FileUploadResponse = resp.json().await?;
        info!("MistralOcrProvider: uploaded file_id={}", upload.id);
        Ok(upload.id)
    }
}
