use crate::domain::model::FetchWindow;
use chrono::{Datelike, Months, NaiveDate};

/// 將 `[start, end]` 切成連續的日曆月區間。
///
/// 第一個區間從 `start` 開始，之後每個區間都從該月一日開始；
/// 最後一個區間截止於 `end`。`start > end` 時不產生任何區間。
#[derive(Debug, Clone)]
pub struct MonthWindows {
    next_start: Option<NaiveDate>,
    end: NaiveDate,
}

impl MonthWindows {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next_start: Some(start),
            end,
        }
    }
}

impl Iterator for MonthWindows {
    type Item = FetchWindow;

    fn next(&mut self) -> Option<FetchWindow> {
        let start = self.next_start.take()?;
        if start > self.end {
            return None;
        }

        let next_month = start
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)));

        let window_end = next_month
            .and_then(|first| first.pred_opt())
            .map_or(self.end, |month_end| month_end.min(self.end));

        self.next_start = next_month;
        Some(FetchWindow {
            start,
            end: window_end,
        })
    }
}

pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<FetchWindow> {
    MonthWindows::new(start, end).collect()
}

/// `start` 與 `end` 之間觸及的日曆月數
pub fn months_touched(start: NaiveDate, end: NaiveDate) -> usize {
    if start > end {
        return 0;
    }
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    months as usize + 1
}
