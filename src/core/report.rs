use crate::domain::model::TransformResult;
use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

/// 報表標頭資訊
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub generated_at: NaiveDateTime,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

pub fn coverage_report(result: &TransformResult, context: &ReportContext) -> String {
    let mut out = String::new();
    // 寫入 String 不會失敗
    let _ = write_report(&mut out, result, context);
    out
}

fn write_report(
    out: &mut String,
    result: &TransformResult,
    context: &ReportContext,
) -> std::fmt::Result {
    writeln!(out, "MONTHLY COVERAGE REPORT - XUBIO API")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;
    writeln!(
        out,
        "Extraction date: {}",
        context.generated_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        out,
        "Period: {} → {}",
        context.period_start.format("%Y-%m-%d"),
        context.period_end.format("%Y-%m-%d")
    )?;
    writeln!(out, "Method: monthly windows + key-field diagnostic")?;
    writeln!(out)?;
    writeln!(out, "RESULTS BY ENDPOINT:")?;
    writeln!(out, "{}", "-".repeat(30))?;

    for table in &result.tables {
        writeln!(out)?;
        writeln!(
            out,
            "{}: {} records",
            table.endpoint.name.to_uppercase(),
            table.records.len()
        )?;

        if table.records.is_empty() {
            writeln!(out, "  No data retrieved")?;
            continue;
        }

        match (table.coverage.min, table.coverage.max) {
            (Some(min), Some(max)) => {
                let months: Vec<&str> = table.coverage.months.iter().map(String::as_str).collect();
                writeln!(
                    out,
                    "  Range: {} → {}",
                    min.format("%Y-%m-%d"),
                    max.format("%Y-%m-%d")
                )?;
                writeln!(out, "  Months with data: {}", months.len())?;
                writeln!(out, "  Months: {}", months.join(", "))?;
            }
            _ => {
                writeln!(out, "  No dates detected in the data")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coverage::date_coverage;
    use crate::core::flatten::flatten_records;
    use crate::domain::model::{EndpointDescriptor, EndpointTable};
    use serde_json::json;

    fn table(name: &str, records: Vec<serde_json::Value>) -> EndpointTable {
        let flat = flatten_records(&records);
        let coverage = date_coverage(&flat, "fecha");
        EndpointTable {
            endpoint: EndpointDescriptor::new(name, name),
            records: flat,
            coverage,
        }
    }

    #[test]
    fn test_report_sections() {
        let result = TransformResult {
            tables: vec![
                table("cobros", vec![
                    json!({"fecha": "2024-03-05"}),
                    json!({"fecha": "2024-01-20"}),
                    json!({"fecha": "2024-03-28"}),
                ]),
                table("cuentas", vec![json!({"codigo": "1.1"})]),
                table("pagos", vec![]),
            ],
        };
        let context = ReportContext {
            generated_at: NaiveDate::from_ymd_opt(2025, 9, 17)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2025, 9, 17).unwrap(),
        };

        let report = coverage_report(&result, &context);

        assert!(report.contains("Extraction date: 2025-09-17 10:30:00"));
        assert!(report.contains("Period: 2024-01-01 → 2025-09-17"));
        assert!(report.contains("COBROS: 3 records\n  Range: 2024-01-20 → 2024-03-28\n  Months with data: 2\n  Months: 2024-01, 2024-03\n"));
        assert!(report.contains("CUENTAS: 1 records\n  No dates detected in the data\n"));
        assert!(report.contains("PAGOS: 0 records\n  No data retrieved\n"));
    }
}
