//! # JSON 报告
//!
//! 完整的 `BatchReport`，可反序列化回同一结构。

use super::BatchReport;
use crate::error::Result;

pub fn to_json(report: &BatchReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn from_json(text: &str) -> Result<BatchReport> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_round_trip() {
        let report = sample_report();
        let text = to_json(&report).unwrap();
        let back = from_json(&text).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_field_names() {
        let text = to_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["session_id"], "batch_test");
        assert_eq!(value["succeeded_files"], 4);
        assert_eq!(value["failed"][0]["error_kind"], "Parse");
        assert_eq!(value["error_summary"]["errors_by_severity"]["low"], 1);
    }
}
