//! Analysis pipeline: files → pages → line extraction → page aggregation.

use tracing::{debug, info};

use crate::aggregator;
use crate::config::VocabularyConfig;
use crate::intake::Document;
use crate::line_extractor::LineExtractor;
use crate::ocr::{self, OcrProvider};
use crate::schema::{DocumentKind, FileSummary, PageDetail, Report};

/// Runs one analysis over a batch of documents.
///
/// Documents are processed in order, pages in page order, one at a time.
pub struct Analyzer<'a> {
    vocabulary: &'a VocabularyConfig,
    extractor: LineExtractor,
    provider: &'a dyn OcrProvider,
}

impl<'a> Analyzer<'a> {
    pub fn new(vocabulary: &'a VocabularyConfig, provider: &'a dyn OcrProvider) -> Self {
        Self {
            vocabulary,
            extractor: LineExtractor::new(&vocabulary.labels),
            provider,
        }
    }

    /// Analyze every document into a fresh report.
    pub async fn run(&self, documents: &[Document]) -> Report {
        let mut report = Report::new(
            self.vocabulary.name.clone(),
            self.extractor.labels().to_vec(),
        );

        for document in documents {
            self.analyze_document(&mut report, document).await;
        }

        info!(
            "Report {}: {} files, {} pages, {} records",
            report.id,
            report.files.len(),
            report.total_pages(),
            report.records.len()
        );
        report
    }

    /// Analyze one document, appending its pages and records to `report`.
    pub async fn analyze_document(&self, report: &mut Report, document: &Document) {
        info!("Analyzing {} ({:?})", document.name, document.kind);

        let (texts, ocr_provider, ocr_degraded) = match document.kind {
            DocumentKind::Transcript => (document.transcript_pages(), None, false),
            DocumentKind::Pdf | DocumentKind::Image => {
                let recognized = ocr::recognize_pages(
                    self.provider,
                    &document.to_ocr_input(),
                    document.expected_pages(),
                )
                .await;
                (
                    recognized.texts,
                    Some(self.provider.name().to_string()),
                    recognized.degraded,
                )
            }
        };

        report.files.push(FileSummary {
            name: document.name.clone(),
            kind: document.kind,
            bytes: document.data.len(),
            content_hash: document.content_hash.clone(),
            pages: texts.len() as u32,
            ocr_provider,
            ocr_degraded,
        });

        for (idx, text) in texts.into_iter().enumerate() {
            let page = idx as u32 + 1;
            self.analyze_page(report, &document.name, page, text);
        }
    }

    /// Extract and aggregate a single page of text.
    pub fn analyze_page(&self, report: &mut Report, file_name: &str, page: u32, text: String) {
        let extraction = self.extractor.extract(&text);
        debug!(
            "{} page {}: labels={:?} airflows={:?} sizes={:?}",
            file_name, page, extraction.detected_labels, extraction.airflows, extraction.sizes
        );

        aggregator::aggregate_page(
            report,
            &extraction,
            file_name,
            page,
            self.extractor.labels(),
        );

        report.pages.push(PageDetail {
            file: file_name.to_string(),
            page,
            ocr_text: text,
            extraction,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::create_default_config;
    use crate::intake::UploadedFile;
    use crate::ocr::{OcrInput, OcrPage, OcrResult};

    /// Returns one page per form-feed-separated chunk of the input bytes.
    struct EchoProvider;

    #[async_trait::async_trait]
    impl OcrProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn process(&self, input: &OcrInput) -> anyhow::Result<OcrResult> {
            let text = String::from_utf8_lossy(&input.data);
            Ok(OcrResult {
                pages: text
                    .split('\u{0C}')
                    .enumerate()
                    .map(|(i, t)| OcrPage {
                        page_num: i as u32 + 1,
                        text: t.to_string(),
                    })
                    .collect(),
                provider_name: "echo".to_string(),
            })
        }
    }

    struct DownProvider;

    #[async_trait::async_trait]
    impl OcrProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn process(&self, _input: &OcrInput) -> anyhow::Result<OcrResult> {
            anyhow::bail!("503 Service Unavailable")
        }
    }

    fn document(name: &str, data: &str) -> Document {
        Document::classify(UploadedFile {
            name: name.to_string(),
            data: data.as_bytes().to_vec(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_records_partition_by_file_and_page() {
        let vocabulary = create_default_config();
        let analyzer = Analyzer::new(&vocabulary, &EchoProvider);
        let documents = vec![
            document("a.png", "SAD 250 L/S 600x400\u{0C}FD FAD 300 L/s 200*150"),
            document("b.txt", "RAD 100 L/S\nRAD 101 L/S\u{0C}nothing here"),
        ];

        let report = analyzer.run(&documents).await;

        // files × pages × labels
        assert_eq!(report.records.len(), 2 * 2 * 6);
        assert_eq!(report.pages.len(), 4);
        assert_eq!(report.files.len(), 2);

        let page = |file: &str, page: u32| -> Vec<_> {
            report
                .records
                .iter()
                .filter(|r| r.file == file && r.page == page)
                .collect()
        };
        for (file, p) in [("a.png", 1), ("a.png", 2), ("b.txt", 1), ("b.txt", 2)] {
            assert_eq!(page(file, p).len(), 6);
        }

        let a1 = page("a.png", 1);
        assert_eq!((a1[0].count, a1[0].average_airflow), (1, 250));
        assert_eq!(a1[0].common_size, "600x400");

        let a2 = page("a.png", 2);
        let fad = a2.iter().find(|r| r.component == "FAD").unwrap();
        let fd = a2.iter().find(|r| r.component == "FD").unwrap();
        assert_eq!((fad.count, fad.average_airflow), (1, 300));
        assert_eq!((fd.count, fd.common_size.as_str()), (1, "200x150"));

        let b1 = page("b.txt", 1);
        assert_eq!((b1[1].component.as_str(), b1[1].count), ("RAD", 2));
        assert_eq!(b1[1].average_airflow, 100);

        assert!(page("b.txt", 2).iter().all(|r| r.count == 0));
    }

    #[tokio::test]
    async fn test_transcripts_bypass_ocr() {
        let vocabulary = create_default_config();
        let analyzer = Analyzer::new(&vocabulary, &DownProvider);
        let report = analyzer.run(&[document("t.txt", "VCD")]).await;

        assert_eq!(report.files[0].ocr_provider, None);
        assert!(!report.files[0].ocr_degraded);
        assert_eq!(report.records[5].count, 1);
    }

    #[tokio::test]
    async fn test_failed_ocr_still_yields_rows() {
        let vocabulary = create_default_config();
        let analyzer = Analyzer::new(&vocabulary, &DownProvider);
        let report = analyzer.run(&[document("scan.jpg", "ignored")]).await;

        assert!(report.files[0].ocr_degraded);
        assert_eq!(report.files[0].ocr_provider.as_deref(), Some("down"));
        assert_eq!(report.records.len(), 6);
        assert!(report
            .records
            .iter()
            .all(|r| r.count == 0 && r.average_airflow == 0 && r.common_size == "N/A"));
        assert_eq!(report.pages[0].ocr_text, "");
    }

    #[tokio::test]
    async fn test_page_detail_keeps_raw_signals() {
        let vocabulary = create_default_config();
        let analyzer = Analyzer::new(&vocabulary, &EchoProvider);
        let report = analyzer
            .run(&[document("a.png", "SAD 250 L/S 600x400\nsad 100 l/s")])
            .await;

        let detail = &report.pages[0];
        assert_eq!(detail.extraction.detected_labels, vec!["SAD", "SAD"]);
        assert_eq!(detail.extraction.airflows, vec![250, 100]);
        assert_eq!(detail.extraction.sizes, vec!["600x400"]);
        assert_eq!(report.records[0].average_airflow, 175);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let vocabulary = create_default_config();
        let analyzer = Analyzer::new(&vocabulary, &EchoProvider);
        let report = analyzer.run(&[]).await;
        assert!(report.records.is_empty());
        assert_eq!(report.labels.len(), 6);
    }
}
