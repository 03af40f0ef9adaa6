//! Folds one page's extraction into per-label summary records.

use std::collections::HashMap;

use tracing::debug;

use crate::schema::{ExtractionResult, Report, SummaryRecord, NO_SIZE};

/// Page-level statistics shared by every label detected on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStats {
    pub average_airflow: u64,
    pub common_size: Option<String>,
}

impl PageStats {
    pub fn from_extraction(extraction: &ExtractionResult) -> Self {
        Self {
            average_airflow: average_airflow(&extraction.airflows),
            common_size: extraction.sizes.first().cloned(),
        }
    }
}

/// Floor of the mean, 0 for no values.
pub fn average_airflow(airflows: &[u64]) -> u64 {
    if airflows.is_empty() {
        return 0;
    }
    let sum: u128 = airflows.iter().map(|&v| u128::from(v)).sum();
    (sum / airflows.len() as u128) as u64
}

/// Build one record per label for a page, in label order.
///
/// Airflow and size are page-wide: every label seen on the page gets the same
/// average and the first size. Labels not seen get 0 and `N/A`.
pub fn summarize_page(
    extraction: &ExtractionResult,
    file_name: &str,
    page_number: u32,
    labels: &[String],
) -> Vec<SummaryRecord> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in &extraction.detected_labels {
        *counts.entry(label.as_str()).or_default() += 1;
    }

    let stats = PageStats::from_extraction(extraction);

    labels
        .iter()
        .map(|label| {
            let count = counts.get(label.as_str()).copied().unwrap_or(0);
            let seen = count > 0;
            SummaryRecord {
                file: file_name.to_string(),
                page: page_number,
                component: label.clone(),
                count,
                average_airflow: if seen { stats.average_airflow } else { 0 },
                common_size: match (&stats.common_size, seen) {
                    (Some(size), true) => size.clone(),
                    _ => NO_SIZE.to_string(),
                },
            }
        })
        .collect()
}

/// Summarize a page and append its records to `report`.
///
/// Returns the slice of records that were just appended.
pub fn aggregate_page<'r>(
    report: &'r mut Report,
    extraction: &ExtractionResult,
    file_name: &str,
    page_number: u32,
    labels: &[String],
) -> &'r [SummaryRecord] {
    let records = summarize_page(extraction, file_name, page_number, labels);
    debug!(
        "{} page {}: {} records ({} labels detected)",
        file_name,
        page_number,
        records.len(),
        records.iter().filter(|r| r.count > 0).count()
    );

    let start = report.records.len();
    report.records.extend(records);
    &report.records[start..]
}
