//! # HTML 报告
//!
//! 单文件、内联样式；所有动态文本都经过转义。

use super::{
    fmt_mb, fmt_secs, metric_rows, BatchReport, ERRORS_BY_SEVERITY, ERRORS_BY_TYPE, RECENT_ERRORS,
};
use crate::error::Result;

use std::collections::BTreeMap;
use std::fmt::{self, Write};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin:1em 0}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
th{background:#f0f0f0}\
.ok{color:#2e7d32}.err{color:#c62828}.partial{color:#ef6c00}";

/// 转义 HTML 特殊字符
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn to_html(report: &BatchReport) -> Result<String> {
    let mut html = String::new();
    write_document(&mut html, report)?;
    Ok(html)
}

fn write_document(html: &mut String, report: &BatchReport) -> fmt::Result {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">")?;
    writeln!(
        html,
        "<title>Batch Report {}</title>\n<style>{}</style>\n</head>\n<body>",
        escape(&report.session_id),
        STYLE
    )?;
    writeln!(html, "<h1>Batch Processing Report</h1>")?;
    if report.partial {
        writeln!(
            html,
            "<p class=\"partial\">Run stopped early; {} file(s) were not processed.</p>",
            report.skipped_files
        )?;
    }

    writeln!(html, "<h2>Summary</h2>\n<table>")?;
    for (metric, value) in metric_rows(report) {
        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td></tr>",
            metric,
            escape(&value)
        )?;
    }
    writeln!(html, "</table>")?;

    write_files(html, report)?;
    write_errors(html, report)?;

    writeln!(html, "</body>\n</html>")
}

fn write_files(html: &mut String, report: &BatchReport) -> fmt::Result {
    writeln!(html, "<h2>Succeeded ({})</h2>", report.succeeded.len())?;
    if !report.succeeded.is_empty() {
        writeln!(
            html,
            "<table>\n<tr><th>File</th><th>Size (MB)</th><th>Time (s)</th><th>Summary</th></tr>"
        )?;
        for file in &report.succeeded {
            writeln!(
                html,
                "<tr class=\"ok\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&file.filename),
                fmt_mb(file.size_mb),
                fmt_secs(file.processing_time),
                escape(&file.result_summary)
            )?;
        }
        writeln!(html, "</table>")?;
    }

    writeln!(html, "<h2>Failed ({})</h2>", report.failed.len())?;
    if !report.failed.is_empty() {
        writeln!(
            html,
            "<table>\n<tr><th>File</th><th>Size (MB)</th><th>Time (s)</th>\
             <th>Kind</th><th>Error</th></tr>"
        )?;
        for file in &report.failed {
            writeln!(
                html,
                "<tr class=\"err\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&file.filename),
                fmt_mb(file.size_mb),
                fmt_secs(file.processing_time),
                escape(&file.error_kind),
                escape(&file.error_message)
            )?;
        }
        writeln!(html, "</table>")?;
    }
    Ok(())
}

fn write_errors(html: &mut String, report: &BatchReport) -> fmt::Result {
    let summary = &report.error_summary;
    if summary.total_errors == 0 {
        return Ok(());
    }

    write_count_table(html, ERRORS_BY_TYPE, "Kind", &summary.errors_by_type)?;
    write_count_table(
        html,
        ERRORS_BY_SEVERITY,
        "Severity",
        &summary.errors_by_severity,
    )?;

    writeln!(html, "<h2>{}</h2>\n<ul>", RECENT_ERRORS)?;
    for line in &summary.most_recent_errors {
        writeln!(html, "<li>{}</li>", escape(line))?;
    }
    writeln!(html, "</ul>")
}

fn write_count_table(
    html: &mut String,
    title: &str,
    label: &str,
    counts: &BTreeMap<String, usize>,
) -> fmt::Result {
    writeln!(html, "<h2>{}</h2>\n<table>", title)?;
    writeln!(html, "<tr><th>{}</th><th>Count</th></tr>", label)?;
    for (key, count) in counts {
        writeln!(html, "<tr><td>{}</td><td>{}</td></tr>", escape(key), count)?;
    }
    writeln!(html, "</table>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_dynamic_text_is_escaped() {
        let html = to_html(&sample_report()).unwrap();
        assert!(html.contains("broken &lt;table&gt;"));
        assert!(!html.contains("broken <table>"));
        assert!(html.contains("<h2>Failed (1)</h2>"));
    }

    #[test]
    fn test_partial_banner() {
        let mut report = sample_report();
        assert!(!to_html(&report).unwrap().contains("class=\"partial\""));
        report.partial = true;
        assert!(to_html(&report).unwrap().contains("class=\"partial\""));
    }

    #[test]
    fn test_error_sections_skipped_without_errors() {
        let mut report = sample_report();
        report.error_summary = Default::default();
        let html = to_html(&report).unwrap();
        assert!(!html.contains(ERRORS_BY_TYPE));
        assert!(!html.contains(RECENT_ERRORS));
    }
}
