//! # Markdown 报告

use super::{
    fmt_mb, fmt_secs, metric_rows, BatchReport, ERRORS_BY_SEVERITY, ERRORS_BY_TYPE, RECENT_ERRORS,
};
use crate::error::Result;

use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// 表格单元格转义：`|` 与换行
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn to_markdown(report: &BatchReport) -> Result<String> {
    let mut md = String::new();
    write_document(&mut md, report)?;
    Ok(md)
}

fn write_document(md: &mut String, report: &BatchReport) -> fmt::Result {
    writeln!(md, "# Batch Processing Report\n")?;
    if report.partial {
        writeln!(
            md,
            "> **Partial run:** stopped early, {} file(s) not processed.\n",
            report.skipped_files
        )?;
    }

    writeln!(md, "## Summary\n")?;
    writeln!(md, "| Metric | Value |\n|---|---|")?;
    for (metric, value) in metric_rows(report) {
        writeln!(md, "| {} | {} |", metric, cell(&value))?;
    }

    if !report.succeeded.is_empty() {
        writeln!(md, "\n## Succeeded ({})\n", report.succeeded.len())?;
        writeln!(
            md,
            "| File | Size (MB) | Time (s) | Summary |\n|---|---|---|---|"
        )?;
        for file in &report.succeeded {
            writeln!(
                md,
                "| {} | {} | {} | {} |",
                cell(&file.filename),
                fmt_mb(file.size_mb),
                fmt_secs(file.processing_time),
                cell(&file.result_summary)
            )?;
        }
    }

    if !report.failed.is_empty() {
        writeln!(md, "\n## Failed ({})\n", report.failed.len())?;
        writeln!(
            md,
            "| File | Size (MB) | Time (s) | Kind | Error |\n|---|---|---|---|---|"
        )?;
        for file in &report.failed {
            writeln!(
                md,
                "| {} | {} | {} | {} | {} |",
                cell(&file.filename),
                fmt_mb(file.size_mb),
                fmt_secs(file.processing_time),
                cell(&file.error_kind),
                cell(&file.error_message)
            )?;
        }
    }

    write_errors(md, report)
}

fn write_errors(md: &mut String, report: &BatchReport) -> fmt::Result {
    let summary = &report.error_summary;
    if summary.total_errors == 0 {
        return Ok(());
    }

    write_count_table(md, ERRORS_BY_TYPE, "Kind", &summary.errors_by_type)?;
    write_count_table(
        md,
        ERRORS_BY_SEVERITY,
        "Severity",
        &summary.errors_by_severity,
    )?;

    if !summary.most_recent_errors.is_empty() {
        writeln!(md, "\n## {}\n", RECENT_ERRORS)?;
        for line in &summary.most_recent_errors {
            writeln!(md, "- `{}`", line.replace('`', "'"))?;
        }
    }
    Ok(())
}

fn write_count_table(
    md: &mut String,
    title: &str,
    label: &str,
    counts: &BTreeMap<String, usize>,
) -> fmt::Result {
    writeln!(md, "\n## {}\n", title)?;
    writeln!(md, "| {} | Count |\n|---|---|", label)?;
    for (key, count) in counts {
        writeln!(md, "| {} | {} |", cell(key), count)?;
    }
    Ok(())
}
