//! Local OCR model sidecar provider.
//!
//! The sidecar hosts the neural OCR model (and any PDF rasterization) and
//! returns recognized text fragments per page.

use super::{OcrInput, OcrPage, OcrProvider, OcrResult};
use serde::Deserialize;
use tracing::info;

/// Sidecar response (private deserialization types).
#[derive(Debug, Deserialize)]
struct ReadTextResponse {
    pages: Vec<ReadTextPage>,
}

#[derive(Debug, Deserialize)]
struct ReadTextPage {
    page_num: u32,
    /// Text fragments in reading order, one per detected box.
    #[serde(default)]
    lines: Vec<String>,
}

pub struct LocalOcrProvider {
    url: String,
    client: reqwest::Client,
}

impl LocalOcrProvider {
    pub fn new(client: reqwest::Client) -> Self {
        let url =
            std::env::var("LOCAL_OCR_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());
        Self::with_url(client, url)
    }

    pub fn with_url(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl OcrProvider for LocalOcrProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn process(&self, input: &OcrInput) -> anyhow::Result<OcrResult> {
        use reqwest::multipart::{Form, Part};

        info!(
            "LocalOcrProvider: sending {} ({} bytes) to {}",
            input.filename,
            input.data.len(),
            self.url
        );

        let part = Part::bytes(input.data.clone())
            .file_name(input.filename.clone())
            .mime_str(&input.mime_type)?;

        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/readtext", self.url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Local OCR sidecar error ({}): {}", status, error_text);
        }

        let body: ReadTextResponse = response.json().await?;

        Ok(OcrResult {
            pages: into_pages(body),
            provider_name: "local".to_string(),
        })
    }
}

fn into_pages(body: ReadTextResponse) -> Vec<OcrPage> {
    body.pages
        .into_iter()
        .map(|p| OcrPage {
            page_num: p.page_num,
            text: p.lines.join("\n"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_joined_per_page() {
        let body: ReadTextResponse = serde_json::from_str(
            r#"{"pages": [
                {"page_num": 1, "lines": ["SAD", "250 L/S"]},
                {"page_num": 2}
            ]}"#,
        )
        .unwrap();
        let pages = into_pages(body);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].text, "SAD\n250 L/S");
        assert_eq!(pages[1].page_num, 2);
        assert_eq!(pages[1].text, "");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = LocalOcrProvider::with_url(reqwest::Client::new(), "http://ocr:9000/");
        assert_eq!(provider.url, "http://ocr:9000");
    }
}
