use crate::domain::model::{DateCoverage, FlatRecord};
use chrono::NaiveDate;

/// 取字串前 10 個字元解析 ISO 日期
pub fn parse_leading_date(value: &str) -> Option<NaiveDate> {
    let prefix = value.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// 掃描名稱包含 `marker`（不分大小寫）的頂層文字欄位
pub fn date_coverage(records: &[FlatRecord], marker: &str) -> DateCoverage {
    let marker = marker.to_lowercase();
    let mut coverage = DateCoverage::default();

    for record in records {
        for (key, value) in &record.fields {
            if !key.to_lowercase().contains(&marker) {
                continue;
            }
            let Some(date) = value.as_text().and_then(parse_leading_date) else {
                continue;
            };

            coverage.min = Some(coverage.min.map_or(date, |min| min.min(date)));
            coverage.max = Some(coverage.max.map_or(date, |max| max.max(date)));
            coverage.months.insert(date.format("%Y-%m").to_string());
        }
    }

    coverage
}
