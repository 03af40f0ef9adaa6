//! Line-by-line extraction of labels, airflows and sizes from OCR text.
//!
//! Pure functions, no async. The text is uppercased once and scanned line by
//! line; every line is matched independently of its neighbours.

use regex::Regex;
use tracing::{debug, warn};

use crate::schema::ExtractionResult;

/// Digits followed by the `L/S` unit. Input is already uppercased.
const AIRFLOW_PATTERN: &str = r"([0-9]+)\s*L/S";
/// Two 2-4 digit runs joined by `x`, `X` or `*`.
const SIZE_PATTERN: &str = r"([0-9]{2,4})\s*[xX*]\s*([0-9]{2,4})";

/// Compiled extractor for one label vocabulary.
pub struct LineExtractor {
    labels: Vec<String>,
    airflow: Regex,
    size: Regex,
}

impl LineExtractor {
    /// Build an extractor for `labels`. Labels are matched in the given order.
    pub fn new(labels: &[String]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_uppercase()).collect(),
            airflow: Regex::new(AIRFLOW_PATTERN).expect("airflow pattern is valid"),
            size: Regex::new(SIZE_PATTERN).expect("size pattern is valid"),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Scan one page of OCR text.
    ///
    /// Labels match as plain substrings, so `FD` also fires inside `FAD`.
    /// Only the first airflow and the first size on a line are taken.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let mut result = ExtractionResult::default();
        let upper = text.to_uppercase();

        for line in upper.lines() {
            if line.is_empty() {
                continue;
            }

            for label in &self.labels {
                if line.contains(label.as_str()) {
                    result.detected_labels.push(label.clone());
                }
            }

            if let Some(flow) = self.airflow.captures(line).and_then(|c| c.get(1)) {
                match flow.as_str().parse::<u64>() {
                    Ok(value) => result.airflows.push(value),
                    Err(e) => warn!("Skipping airflow '{}': {}", flow.as_str(), e),
                }
            }

            if let Some(size) = self.size.captures(line) {
                result.sizes.push(format!("{}x{}", &size[1], &size[2]));
            }
        }

        debug!(
            "Extracted {} labels, {} airflows, {} sizes",
            result.detected_labels.len(),
            result.airflows.len(),
            result.sizes.len()
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LABELS;

    fn extractor() -> LineExtractor {
        let labels: Vec<String> = DEFAULT_LABELS.iter().map(|l| l.to_string()).collect();
        LineExtractor::new(&labels)
    }

    #[test]
    fn test_single_line() {
        let result = extractor().extract("SAD 250 L/S 600x400");
        assert_eq!(result.detected_labels, vec!["SAD"]);
        assert_eq!(result.airflows, vec![250]);
        assert_eq!(result.sizes, vec!["600x400"]);
    }

    #[test]
    fn test_mixed_case_unit_and_star_separator() {
        let result = extractor().extract("FD FAD 300 L/s 200*150");
        assert!(result.detected_labels.contains(&"FD".to_string()));
        assert!(result.detected_labels.contains(&"FAD".to_string()));
        assert_eq!(result.airflows, vec![300]);
        assert_eq!(result.sizes, vec!["200x150"]);
    }

    #[test]
    fn test_substring_matching_is_kept() {
        // no word boundaries: one token can carry several labels
        let result = extractor().extract("sadfd");
        assert_eq!(result.detected_labels, vec!["SAD", "FD"]);
    }

    #[test]
    fn test_one_entry_per_label_per_line() {
        let result = extractor().extract("SAD SAD SAD\nsad-1");
        assert_eq!(result.detected_labels, vec!["SAD", "SAD"]);
    }

    #[test]
    fn test_first_match_per_line_only() {
        let result = extractor().extract("100 L/S then 200 L/S, 300x300 and 400x400");
        assert_eq!(result.airflows, vec![100]);
        assert_eq!(result.sizes, vec!["300x300"]);
    }

    #[test]
    fn test_whitespace_around_separators() {
        let result = extractor().extract("RAD 75   l/s\n450 X 300\n1200 * 600");
        assert_eq!(result.airflows, vec![75]);
        assert_eq!(result.sizes, vec!["450x300", "1200x600"]);
    }

    #[test]
    fn test_size_digit_run_bounds() {
        // single digits are not sizes; five digit runs are trimmed by leftmost match
        let result = extractor().extract("5x5\n12345x400");
        assert_eq!(result.sizes, vec!["2345x400"]);
    }

    #[test]
    fn test_empty_and_noise() {
        let ex = extractor();
        assert_eq!(ex.extract(""), ExtractionResult::default());
        assert_eq!(ex.extract("\n\n   \n"), ExtractionResult::default());
        assert_eq!(ex.extract("~~ ## L/S x *"), ExtractionResult::default());
    }

    #[test]
    fn test_crlf_lines() {
        let result = extractor().extract("EAD 120 L/S\r\nVCD 300x200\r\n");
        assert_eq!(result.detected_labels, vec!["EAD", "VCD"]);
        assert_eq!(result.airflows, vec![120]);
        assert_eq!(result.sizes, vec!["300x200"]);
    }

    #[test]
    fn test_overflowing_airflow_skipped() {
        let result = extractor().extract("99999999999999999999999 L/S\n40 L/S");
        assert_eq!(result.airflows, vec![40]);
    }

    #[test]
    fn test_idempotent() {
        let ex = extractor();
        let text = "SAD 250 L/S 600x400\nFD FAD 300 L/s 200*150\nnoise";
        assert_eq!(ex.extract(text), ex.extract(text));
    }

    #[test]
    fn test_labels_uppercased() {
        let ex = LineExtractor::new(&["sad".to_string()]);
        assert_eq!(ex.labels(), &["SAD".to_string()]);
        assert_eq!(ex.extract("Sad").detected_labels, vec!["SAD"]);
    }
}
