use crate::domain::model::{FlatRecord, FlatValue, RawRecord};
use serde_json::Value;

/// 物件逐欄遞迴；陣列攤平後整個序列化成一個 JSON 字串；純量原樣保留
pub fn flatten(value: &Value) -> FlatValue {
    match value {
        Value::Null => FlatValue::Null,
        Value::Bool(b) => FlatValue::Bool(*b),
        Value::Number(n) => FlatValue::Number(n.clone()),
        Value::String(s) => FlatValue::Text(s.clone()),
        Value::Object(_) => FlatValue::Map(flatten_object(value)),
        Value::Array(items) => {
            let flattened: Vec<Value> = items.iter().map(|item| flatten(item).to_json()).collect();
            // Value 的序列化不會失敗
            FlatValue::Text(Value::Array(flattened).to_string())
        }
    }
}

fn flatten_object(value: &Value) -> FlatRecord {
    let mut record = FlatRecord::default();
    if let Value::Object(obj) = value {
        for (key, field) in obj {
            record.fields.insert(key.clone(), flatten(field));
        }
    }
    record
}

/// 將一筆原始記錄轉為表格列。非物件的記錄放進 `value` 欄位
pub fn flatten_record(record: &RawRecord) -> FlatRecord {
    match flatten(record) {
        FlatValue::Map(map) => map,
        other => {
            let mut map = FlatRecord::default();
            map.fields.insert("value".to_string(), other);
            map
        }
    }
}

pub fn flatten_records(records: &[RawRecord]) -> Vec<FlatRecord> {
    records.iter().map(flatten_record).collect()
}
