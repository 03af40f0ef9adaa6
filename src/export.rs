//! Tabular export of a report's summary records.

use anyhow::{Context, Result};

use crate::schema::Report;

/// Suggested download name for the summary table.
pub const EXPORT_FILENAME: &str = "MEP_summary.csv";

pub const COLUMNS: [&str; 6] = [
    "File",
    "Page",
    "Component",
    "Count",
    "Average Airflow (L/s)",
    "Common Size",
];

/// Write the summary table as CSV: a header row, then one row per record.
pub fn report_to_csv(report: &Report) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(COLUMNS)
        .context("Failed to write CSV header")?;

    for record in &report.records {
        writer
            .write_record([
                record.file.clone(),
                record.page.to_string(),
                record.component.clone(),
                record.count.to_string(),
                record.average_airflow.to_string(),
                record.common_size.clone(),
            ])
            .context("Failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SummaryRecord;

    fn record(file: &str, component: &str, count: usize, flow: u64, size: &str) -> SummaryRecord {
        SummaryRecord {
            file: file.to_string(),
            page: 1,
            component: component.to_string(),
            count,
            average_airflow: flow,
            common_size: size.to_string(),
        }
    }

    #[test]
    fn test_header_only_for_empty_report() {
        let report = Report::new("default", vec![]);
        let csv = String::from_utf8(report_to_csv(&report).unwrap()).unwrap();
        assert_eq!(
            csv,
            "File,Page,Component,Count,Average Airflow (L/s),Common Size\n"
        );
    }

    #[test]
    fn test_rows_in_record_order() {
        let mut report = Report::new("default", vec![]);
        report.records.push(record("a.pdf", "SAD", 2, 250, "600x400"));
        report.records.push(record("a.pdf", "RAD", 0, 0, "N/A"));

        let csv = String::from_utf8(report_to_csv(&report).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "a.pdf,1,SAD,2,250,600x400");
        assert_eq!(lines[2], "a.pdf,1,RAD,0,0,N/A");
    }

    #[test]
    fn test_file_names_are_quoted() {
        let mut report = Report::new("default", vec![]);
        report.records.push(record("level 1, east.pdf", "FD", 1, 80, "N/A"));

        let csv = String::from_utf8(report_to_csv(&report).unwrap()).unwrap();
        assert!(csv.contains("\"level 1, east.pdf\",1,FD,1,80,N/A"));
    }
}
