use crate::core::export::{Cell, Sheet, Workbook};
use crate::utils::error::Result;
use std::fmt::Write as _;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Excel 單一儲存格的字元上限
const MAX_CELL_CHARS: usize = 32_767;

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

// 樣式 0 為預設，樣式 1 為粗體標題列
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs></styleSheet>"#;

/// 將 Workbook 寫成 .xlsx（SpreadsheetML 封裝在 ZIP 中）
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    zip.start_file::<_, ()>("[Content_Types].xml", FileOptions::default())?;
    zip.write_all(content_types(workbook.sheets.len()).as_bytes())?;

    zip.start_file::<_, ()>("_rels/.rels", FileOptions::default())?;
    zip.write_all(ROOT_RELS.as_bytes())?;

    zip.start_file::<_, ()>("xl/workbook.xml", FileOptions::default())?;
    zip.write_all(workbook_xml(workbook).as_bytes())?;

    zip.start_file::<_, ()>("xl/_rels/workbook.xml.rels", FileOptions::default())?;
    zip.write_all(workbook_rels(workbook.sheets.len()).as_bytes())?;

    zip.start_file::<_, ()>("xl/styles.xml", FileOptions::default())?;
    zip.write_all(STYLES.as_bytes())?;

    for (index, sheet) in workbook.sheets.iter().enumerate() {
        let name = format!("xl/worksheets/sheet{}.xml", index + 1);
        zip.start_file::<_, ()>(name, FileOptions::default())?;
        zip.write_all(sheet_xml(sheet).as_bytes())?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = String::from(CONTENT_TYPES_HEAD);
    for n in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        );
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (index, sheet) in workbook.sheets.iter().enumerate() {
        let _ = write!(
            xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(&sheet.name),
            index + 1,
            index + 1
        );
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for n in 1..=sheet_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        );
    }
    // styles 的 id 接在工作表之後
    let _ = write!(
        xml,
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    );
    xml.push_str("</Relationships>");
    xml
}

fn sheet_xml(sheet: &Sheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );

    let widths = sheet.column_widths();
    if !widths.is_empty() {
        xml.push_str("<cols>");
        for (index, width) in widths.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#,
                index + 1,
                width
            );
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    for (row_index, row) in sheet.rows.iter().enumerate() {
        let row_number = row_index + 1;
        // 第一列是標題
        let style = if row_index == 0 { r#" s="1""# } else { "" };
        let _ = write!(xml, r#"<row r="{}">"#, row_number);
        for (col_index, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(col_index), row_number);
            match cell {
                Cell::Empty => {}
                Cell::Number(n) => {
                    let _ = write!(xml, r#"<c r="{}"{}><v>{}</v></c>"#, reference, style, n);
                }
                Cell::Bool(b) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{}"{} t="b"><v>{}</v></c>"#,
                        reference,
                        style,
                        u8::from(*b)
                    );
                }
                Cell::Text(text) => {
                    let truncated: String = text.chars().take(MAX_CELL_CHARS).collect();
                    let _ = write!(
                        xml,
                        r#"<c r="{}"{} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        reference,
                        style,
                        escape_xml(&truncated)
                    );
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// 0 -> A, 25 -> Z, 26 -> AA
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// 跳脫 XML 特殊字元並移除 XML 1.0 不允許的控制字元
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn sample_workbook() -> Workbook {
        let mut summary = Sheet::new("Summary", None);
        summary.push_row(vec![Cell::text("Endpoint"), Cell::text("Records")]);
        summary.push_row(vec![Cell::text("clientes"), Cell::from(2usize)]);

        let mut data = Sheet::new("Clientes", Some(50));
        data.push_row(vec![Cell::text("nombre"), Cell::text("activo"), Cell::text("nota")]);
        data.push_row(vec![Cell::text("A & B <SA>"), Cell::Bool(true), Cell::Empty]);

        Workbook {
            sheets: vec![summary, data],
        }
    }

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_escape_xml_strips_control_chars() {
        assert_eq!(escape_xml("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&apos;");
        assert_eq!(escape_xml("x\u{0001}y\tz"), "xy\tz");
    }

    #[test]
    fn test_workbook_parts() {
        let bytes = write_workbook(&sample_workbook()).unwrap();

        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/sheet2.xml",
            ]
        );

        let workbook = read_part(&bytes, "xl/workbook.xml");
        let summary_pos = workbook.find(r#"name="Summary""#).unwrap();
        let clientes_pos = workbook.find(r#"name="Clientes""#).unwrap();
        assert!(summary_pos < clientes_pos);
    }

    #[test]
    fn test_sheet_cells() {
        let bytes = write_workbook(&sample_workbook()).unwrap();

        let summary = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(summary.contains(r#"<c r="B2"><v>2</v></c>"#));

        let data = read_part(&bytes, "xl/worksheets/sheet2.xml");
        assert!(data.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">nombre</t></is></c>"#));
        assert!(data.contains("A &amp; B &lt;SA&gt;"));
        assert!(data.contains(r#"<c r="B2" t="b"><v>1</v></c>"#));
        assert!(!data.contains(r#"r="C2""#));
        assert!(data.contains(r#"<col min="1" max="1" width="12" customWidth="1"/>"#));
    }

    #[test]
    fn test_long_text_is_truncated() {
        let mut sheet = Sheet::new("Big", Some(50));
        sheet.push_row(vec![Cell::text("x".repeat(MAX_CELL_CHARS + 10))]);

        let xml = sheet_xml(&sheet);
        let start = xml.find("preserve\">").unwrap() + "preserve\">".len();
        let end = xml[start..].find("</t>").unwrap();
        assert_eq!(end, MAX_CELL_CHARS);
    }
}
