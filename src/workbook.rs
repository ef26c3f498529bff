use crate::date_normalizer::excel_serial_to_date;
use crate::error::{TransformError, TransformResult};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use std::path::Path;

static EMPTY: Data = Data::Empty;

/// 工作表：按绝对行列保存单元格，越界视为空
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<Data>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Data>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// calamine 的 Range 从第一个非空单元格开始，这里补齐到 A1
    pub fn from_range(name: &str, range: &Range<Data>) -> Self {
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Data>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Data::Empty; col_offset];
            cells.extend(row.iter().cloned());
            rows.push(cells);
        }
        Self::new(name, rows)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Data] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Data {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    /// 单元格文本（已去首尾空白）
    pub fn text(&self, row: usize, col: usize) -> String {
        cell_text(self.cell(row, col))
    }

    /// 仅当单元格本身是字符串时返回
    pub fn str_at(&self, row: usize, col: usize) -> Option<&str> {
        match self.cell(row, col) {
            Data::String(s) => Some(s.trim()),
            _ => None,
        }
    }

    pub fn number(&self, row: usize, col: usize) -> Option<f64> {
        cell_number(self.cell(row, col))
    }

    pub fn is_empty_at(&self, row: usize, col: usize) -> bool {
        self.text(row, col).is_empty()
    }

    /// 整行文本，用于整行匹配
    pub fn row_text(&self, row: usize) -> String {
        self.row(row)
            .iter()
            .map(cell_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 行中第一个等于 `label` 的列
    pub fn find_in_row(&self, row: usize, label: &str) -> Option<usize> {
        self.row(row).iter().position(|c| cell_text(c) == label)
    }
}

/// 原始工作簿
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// 读取 .xls / .xlsx 的全部工作表；单个工作表读取失败时跳过，全部失败时报错
    pub fn open(path: &Path) -> TransformResult<Self> {
        if !path.exists() {
            return Err(TransformError::InputMissing(path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(path).map_err(|source| TransformError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let loaded = workbook
            .sheet_names()
            .into_iter()
            .map(|name| {
                let range = workbook.worksheet_range(&name);
                (name, range)
            })
            .collect::<Vec<_>>();
        let sheets = readable_sheets(loaded)?;

        tracing::debug!("读取 {:?}: {} 个工作表", path, sheets.len());
        Ok(Self { sheets })
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn first(&self) -> Option<&Sheet> {
        self.sheets.first()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// 跳过读取失败的工作表；一个都读不出来时返回第一个失败
fn readable_sheets<E: std::fmt::Display>(
    loaded: Vec<(String, Result<Range<Data>, E>)>,
) -> TransformResult<Vec<Sheet>> {
    let mut sheets = Vec::new();
    let mut first_failure = None;
    for (name, range) in loaded {
        match range {
            Ok(range) => sheets.push(Sheet::from_range(&name, &range)),
            Err(e) => {
                tracing::warn!("跳过无法读取的工作表 {}: {}", name, e);
                if first_failure.is_none() {
                    first_failure = Some(TransformError::SheetRead {
                        sheet: name,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
    match first_failure {
        Some(err) if sheets.is_empty() => Err(err),
        _ => Ok(sheets),
    }
}

fn excel_serial_to_timestamp(serial: f64) -> Option<String> {
    let date = excel_serial_to_date(serial)?;
    let date = NaiveDate::parse_from_str(&date, "%Y%m%d").ok()?;
    Some(format!("{} 00:00:00", date.format("%Y-%m-%d")))
}

/// 单元格转文本：整数浮点不带 `.0`，日期格式为 `YYYY-MM-DD 00:00:00`
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_timestamp(dt.as_f64()).unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
    }
}

/// 从单元格提取数字：接受浮点、整数和数字样式的字符串（允许千分位逗号）
pub fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) if f.is_finite() => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => {
            let s = s.trim().replace(',', "");
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// 数量：截断取整，零或非数字返回 None
pub fn quantity(cell: &Data) -> Option<i64> {
    cell_number(cell).and_then(quantity_from)
}

pub fn quantity_from(value: f64) -> Option<i64> {
    let q = value.trunc() as i64;
    (q != 0).then_some(q)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// 用于测试的单元格构造
    pub fn s(value: &str) -> Data {
        if value.is_empty() {
            Data::Empty
        } else {
            Data::String(value.to_string())
        }
    }

    pub fn n(value: f64) -> Data {
        Data::Float(value)
    }

    pub fn sheet(name: &str, rows: Vec<Vec<Data>>) -> Sheet {
        Sheet::new(name, rows)
    }

    pub fn blank_rows(count: usize) -> Vec<Vec<Data>> {
        vec![Vec::new(); count]
    }
}
