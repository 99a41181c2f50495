use crate::core::export::{Sheet, Workbook};
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// 每張工作表一個 CSV，打包成單一 ZIP
pub fn write_csv_bundle(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for sheet in &workbook.sheets {
        let csv_data = sheet_to_csv(sheet)?;
        zip.start_file::<_, ()>(format!("{}.csv", sheet.name), FileOptions::default())?;
        zip.write_all(&csv_data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

pub fn sheet_to_csv(sheet: &Sheet) -> Result<Vec<u8>> {
    // 「No data available」列只有一欄，需允許列長不一
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    for row in &sheet.rows {
        writer.write_record(row.iter().map(|cell| cell.display()))?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::ProcessingError {
            message: format!("Failed to finalize CSV for sheet {}: {}", sheet.name, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::{Cell, NO_DATA_ROW};
    use std::io::Read;

    #[test]
    fn test_sheet_to_csv() {
        let mut sheet = Sheet::new("Cobros", Some(50));
        sheet.push_row(vec![Cell::text("id"), Cell::text("detalle")]);
        sheet.push_row(vec![Cell::Number(7.into()), Cell::text("a, \"b\"")]);
        sheet.push_row(vec![Cell::Bool(false), Cell::Empty]);

        let csv = String::from_utf8(sheet_to_csv(&sheet).unwrap()).unwrap();
        assert_eq!(csv, "id,detalle\n7,\"a, \"\"b\"\"\"\nfalse,\n");
    }

    #[test]
    fn test_bundle_has_one_file_per_sheet() {
        let mut summary = Sheet::new("Summary", None);
        summary.push_row(vec![Cell::text("Endpoint"), Cell::text("Records")]);
        summary.push_row(vec![Cell::text("pagos"), Cell::from(0usize)]);
        let mut pagos = Sheet::new("Pagos", Some(50));
        pagos.push_row(vec![Cell::text(NO_DATA_ROW)]);

        let bytes = write_csv_bundle(&Workbook {
            sheets: vec![summary, pagos],
        })
        .unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "Summary.csv");

        let mut content = String::new();
        archive
            .by_name("Pagos.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "No data available\n");
    }
}
