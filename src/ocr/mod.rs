//! Modular OCR provider abstraction.
//!
//! Defines the [`OcrProvider`] trait so the local model sidecar and the remote
//! OCR API can be swapped via query parameter. Provider failures stop at
//! [`recognize_pages`]: callers always get page text, possibly empty.

pub mod local;
pub mod mistral;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

/// Page numbers above this are treated as provider garbage.
const MAX_OCR_PAGES: u32 = 10_000;

/// Per-page OCR output (always 1-indexed).
#[derive(Debug, Clone)]
pub struct OcrPage {
    pub page_num: u32,
    pub text: String,
}

/// Unified OCR result returned by every provider.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub pages: Vec<OcrPage>,
    pub provider_name: String,
}

/// A file handed to an OCR provider.
#[derive(Debug, Clone)]
pub struct OcrInput {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Async trait implemented by each OCR backend.
#[async_trait::async_trait]
pub trait OcrProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn process(&self, input: &OcrInput) -> anyhow::Result<OcrResult>;
}

/// Known provider identifiers used for registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OcrProviderKind {
    Local,
    MistralOcr,
}

impl OcrProviderKind {
    /// Parse a query-parameter string into a provider kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(Self::Local),
            "mistral" | "mistral_ocr" => Some(Self::MistralOcr),
            _ => None,
        }
    }
}

/// Providers available to this process.
#[derive(Clone, Default)]
pub struct OcrRegistry {
    providers: HashMap<OcrProviderKind, Arc<dyn OcrProvider>>,
}

impl OcrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: OcrProviderKind, provider: Arc<dyn OcrProvider>) {
        info!("Registered OCR provider: {}", provider.name());
        self.providers.insert(kind, provider);
    }

    pub fn get(&self, kind: OcrProviderKind) -> Option<Arc<dyn OcrProvider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .values()
            .map(|p| p.name().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Text for each page of a document, in page order.
#[derive(Debug, Clone)]
pub struct RecognizedPages {
    pub texts: Vec<String>,
    /// Set when the provider failed and every page is empty.
    pub degraded: bool,
}

/// Run OCR and lay the result out as exactly one string per page.
///
/// Never fails. A provider error becomes `expected_pages` empty pages (at
/// least one). Pages the provider skipped are empty; pages beyond
/// `expected_pages` are kept.
pub async fn recognize_pages(
    provider: &dyn OcrProvider,
    input: &OcrInput,
    expected_pages: u32,
) -> RecognizedPages {
    let expected = expected_pages.max(1);

    match provider.process(input).await {
        Ok(result) => {
            info!(
                "{}: {} pages recognized by {}",
                input.filename,
                result.pages.len(),
                result.provider_name
            );
            RecognizedPages {
                texts: layout_pages(result.pages, expected),
                degraded: false,
            }
        }
        Err(e) => {
            warn!(
                "OCR failed for {} via {}, treating {} page(s) as empty: {:#}",
                input.filename,
                provider.name(),
                expected,
                e
            );
            RecognizedPages {
                texts: vec![String::new(); expected as usize],
                degraded: true,
            }
        }
    }
}

fn layout_pages(mut pages: Vec<OcrPage>, expected: u32) -> Vec<String> {
    pages.retain(|p| {
        let valid = (1..=MAX_OCR_PAGES).contains(&p.page_num);
        if !valid {
            warn!("Dropping OCR page with invalid number {}", p.page_num);
        }
        valid
    });

    let total = pages
        .iter()
        .map(|p| p.page_num)
        .max()
        .unwrap_or(0)
        .max(expected);

    let mut texts = vec![String::new(); total as usize];
    for page in pages {
        let slot = &mut texts[(page.page_num - 1) as usize];
        if !slot.is_empty() {
            slot.push('\n');
        }
        slot.push_str(&page.text);
    }
    texts
}
