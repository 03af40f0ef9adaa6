//! Report types produced by an analysis run.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Placeholder size for labels that were not seen on a page.
pub const NO_SIZE: &str = "N/A";

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format_unix_secs(secs)
}

fn format_unix_secs(secs: u64) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;

    // Civil date from day count (proleptic Gregorian, epoch 1970-01-01).
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Raw signals found on one page of OCR text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// One entry per line × label match, duplicates kept.
    pub detected_labels: Vec<String>,
    /// Airflow values in L/s, in line order.
    pub airflows: Vec<u64>,
    /// `"<W>x<H>"` sizes, in line order.
    pub sizes: Vec<String>,
}

/// One summary row: a label's statistics on a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Page")]
    pub page: u32,
    #[serde(rename = "Component")]
    pub component: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Average Airflow (L/s)")]
    pub average_airflow: u64,
    #[serde(rename = "Common Size")]
    pub common_size: String,
}

/// Per-page diagnostics: what OCR returned and what the extractor saw in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDetail {
    pub file: String,
    pub page: u32,
    pub ocr_text: String,
    #[serde(flatten)]
    pub extraction: ExtractionResult,
}

/// How an uploaded file was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    Transcript,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: usize,
    pub content_hash: String,
    pub pages: u32,
    /// Provider that produced the text, `None` for transcripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_provider: Option<String>,
    /// True when OCR failed and the pages were processed as empty text.
    #[serde(default)]
    pub ocr_degraded: bool,
}

/// Result of one analysis run. Records are append-only, in processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub created_at: String,
    pub vocabulary: String,
    pub labels: Vec<String>,
    pub files: Vec<FileSummary>,
    pub pages: Vec<PageDetail>,
    pub records: Vec<SummaryRecord>,
}

impl Report {
    pub fn new(vocabulary: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            id: format!("rep_{}", Uuid::new_v4().simple()),
            created_at: now_iso8601(),
            vocabulary: vocabulary.into(),
            labels,
            files: Vec::new(),
            pages: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }
}
