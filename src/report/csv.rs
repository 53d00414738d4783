//! # CSV 报告
//!
//! 分块输出，块之间以空行分隔：`metric,value` 汇总块、逐文件明细，
//! 有错误时再追加按类型、按严重程度的计数块和最近错误块。
//! 列数不同，因此写入器使用 `flexible(true)`。

use super::{
    fmt_mb, fmt_secs, metric_rows, BatchReport, ERRORS_BY_SEVERITY, ERRORS_BY_TYPE, RECENT_ERRORS,
};
use crate::error::{DocbatchError, Result};

use std::collections::BTreeMap;
use std::io::Write;

const FILE_HEADER: [&str; 6] = [
    "filename",
    "status",
    "size_mb",
    "processing_time",
    "error_kind",
    "detail",
];

pub fn to_csv(report: &BatchReport) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    wtr.write_record(["metric", "value"])?;
    for (metric, value) in metric_rows(report) {
        wtr.write_record([metric, value.as_str()])?;
    }

    wtr.write_record([""])?;
    wtr.write_record(FILE_HEADER)?;
    for file in &report.succeeded {
        wtr.write_record([
            file.filename.as_str(),
            "succeeded",
            fmt_mb(file.size_mb).as_str(),
            fmt_secs(file.processing_time).as_str(),
            "",
            file.result_summary.as_str(),
        ])?;
    }
    for file in &report.failed {
        wtr.write_record([
            file.filename.as_str(),
            "failed",
            fmt_mb(file.size_mb).as_str(),
            fmt_secs(file.processing_time).as_str(),
            file.error_kind.as_str(),
            file.error_message.as_str(),
        ])?;
    }

    let summary = &report.error_summary;
    if summary.total_errors > 0 {
        write_counts(&mut wtr, ERRORS_BY_TYPE, &summary.errors_by_type)?;
        write_counts(&mut wtr, ERRORS_BY_SEVERITY, &summary.errors_by_severity)?;
        wtr.write_record([""])?;
        wtr.write_record([RECENT_ERRORS])?;
        for line in &summary.most_recent_errors {
            wtr.write_record([line.as_str()])?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| DocbatchError::Other(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| DocbatchError::Other(format!("CSV is not UTF-8: {}", e)))
}

/// 计数块：标题行后跟 `key,count`
fn write_counts<W: Write>(
    wtr: &mut csv::Writer<W>,
    title: &str,
    counts: &BTreeMap<String, usize>,
) -> Result<()> {
    wtr.write_record([""])?;
    wtr.write_record([title, "count"])?;
    for (key, count) in counts {
        wtr.write_record([key.as_str(), count.to_string().as_str()])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_blocks_and_rows() {
        let text = to_csv(&sample_report()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("metric,value"));
        assert!(text.contains("Failed,1"));
        assert!(text.contains("filename,status,size_mb,processing_time,error_kind,detail"));
        assert!(text.contains("c.html,failed,3.00,2.00,Parse,broken <table>"));
        assert!(text.contains("a.pdf,succeeded,1.00,1.50,,Summary of a | with pipe"));
    }

    #[test]
    fn test_error_blocks_follow_file_rows() {
        let text = to_csv(&sample_report()).unwrap();
        let files_at = text.find("filename,status").unwrap();
        let by_type_at = text.find("Errors by Type,count").unwrap();
        let by_severity_at = text.find("Errors by Severity,count").unwrap();
        let recent_at = text.find("Most Recent Errors").unwrap();
        assert!(files_at < by_type_at);
        assert!(by_type_at < by_severity_at);
        assert!(by_severity_at < recent_at);
        assert!(text.trim_end().ends_with("[LOW] c.html: broken <table>"));
    }

    #[test]
    fn test_no_error_blocks_without_errors() {
        let mut report = sample_report();
        report.error_summary = Default::default();
        let text = to_csv(&report).unwrap();
        assert!(!text.contains(ERRORS_BY_TYPE));
        assert!(!text.contains(RECENT_ERRORS));
    }

    #[test]
    fn test_parses_back_with_flexible_reader() {
        let text = to_csv(&sample_report()).unwrap();
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_reader(text.as_bytes());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        let file_rows = rows
            .iter()
            .filter(|r| r.get(1) == Some("succeeded") || r.get(1) == Some("failed"))
            .count();
        assert_eq!(file_rows, 5);
    }
}
