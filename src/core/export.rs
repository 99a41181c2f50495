use crate::config::extraction::{ColumnPolicy, OutputSettings};
use crate::domain::model::{EndpointTable, FlatRecord, FlatValue, TransformResult};
use std::collections::HashSet;

pub const SUMMARY_SHEET: &str = "Summary";
pub const SUMMARY_HEADERS: [&str; 5] = [
    "Endpoint",
    "Records",
    "Earliest Date",
    "Latest Date",
    "Months Covered",
];
pub const NO_DATA_ROW: &str = "No data available";
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    pub fn width(&self) -> usize {
        self.display().chars().count()
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number((value as u64).into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    /// 欄寬上限（字元數）；`None` 表示不設上限
    pub width_cap: Option<usize>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, width_cap: Option<usize>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            width_cap,
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// 最長內容 + 2，再套用上限
    pub fn column_widths(&self) -> Vec<usize> {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (0..columns)
            .map(|col| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(Cell::width)
                    .max()
                    .unwrap_or(0);
                let width = longest + 2;
                self.width_cap.map_or(width, |cap| width.min(cap))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// 欄位集合：第一筆記錄的欄位，`Union` 時再補上之後出現的欄位
pub fn columns_for(records: &[FlatRecord], policy: ColumnPolicy) -> Vec<String> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let mut columns: Vec<String> = first.keys().cloned().collect();

    if policy == ColumnPolicy::Union {
        let mut seen: HashSet<String> = columns.iter().cloned().collect();
        for record in &records[1..] {
            for key in record.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
    }

    columns
}

/// 缺少的欄位為空值，巢狀物件序列化成 JSON 字串
pub fn cell_for(value: Option<&FlatValue>) -> Cell {
    match value {
        None | Some(FlatValue::Null) => Cell::Empty,
        Some(FlatValue::Bool(b)) => Cell::Bool(*b),
        Some(FlatValue::Number(n)) => Cell::Number(n.clone()),
        Some(FlatValue::Text(s)) => Cell::Text(s.clone()),
        Some(FlatValue::Map(map)) => Cell::Text(map.to_json().to_string()),
    }
}

/// `factura_venta` -> `Factura Venta`，移除工作表不允許的字元並限制 31 字
pub fn sheet_name(endpoint_name: &str, used: &mut HashSet<String>) -> String {
    let titled: String = endpoint_name
        .replace('_', " ")
        .split(' ')
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned: String = titled
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let base = if cleaned.trim().is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    };

    let mut candidate = base.clone();
    let mut counter = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({})", counter);
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        counter += 1;
    }
    candidate
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn data_sheet(table: &EndpointTable, name: String, settings: &OutputSettings) -> Sheet {
    let mut sheet = Sheet::new(name, Some(settings.max_column_width));

    if table.records.is_empty() {
        sheet.push_row(vec![Cell::text(NO_DATA_ROW)]);
        return sheet;
    }

    let columns = columns_for(&table.records, settings.column_policy);
    sheet.push_row(columns.iter().map(|c| Cell::text(c.as_str())).collect());
    for record in &table.records {
        sheet.push_row(columns.iter().map(|c| cell_for(record.get(c))).collect());
    }
    sheet
}

pub fn summary_row(table: &EndpointTable) -> Vec<Cell> {
    let date_cell = |date: Option<chrono::NaiveDate>| {
        Cell::text(date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default())
    };
    vec![
        Cell::text(table.endpoint.name.as_str()),
        Cell::from(table.records.len()),
        date_cell(table.coverage.min),
        date_cell(table.coverage.max),
        Cell::from(table.coverage.months_covered()),
    ]
}

/// 第一張為 Summary，之後每個端點一張
pub fn build_workbook(result: &TransformResult, settings: &OutputSettings) -> Workbook {
    let mut used = HashSet::new();
    used.insert(SUMMARY_SHEET.to_lowercase());

    let mut summary = Sheet::new(SUMMARY_SHEET, None);
    summary.push_row(SUMMARY_HEADERS.iter().map(|h| Cell::text(*h)).collect());

    let mut sheets = Vec::with_capacity(result.tables.len() + 1);
    for table in &result.tables {
        let name = sheet_name(&table.endpoint.name, &mut used);
        sheets.push(data_sheet(table, name, settings));
        summary.push_row(summary_row(table));
    }

    sheets.insert(0, summary);
    Workbook { sheets }
}
