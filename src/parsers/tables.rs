//! 表头 + 平铺明细版式

use super::ParseOptions;
use crate::code_normalizer::fold_full_width;
use crate::date_normalizer::{last_date_in, normalize_date, sheet_date_range_end, sheet_day_range_end};
use crate::models::{ProductContext, TransactionRecord};
use crate::workbook::{cell_text, quantity, Sheet};

/// 列定位：固定列号或表头名称
#[derive(Debug, Clone, Copy)]
pub enum Col {
    At(usize),
    Named(&'static str),
}

/// 表头所在行
#[derive(Clone, Copy)]
pub enum HeaderRow {
    First,
    Detect(fn(&Sheet) -> usize),
}

/// 日期来源
#[derive(Debug, Clone, Copy)]
pub enum TableDate {
    Column(Col),
    /// 工作表名 `MMDD-MMDD`
    SheetDayRange,
    /// 工作表名 `YYYYMMDD-YYYYMMDD`
    SheetDateRange,
    /// 指定行中最后一个日期
    BannerRow(usize),
}

#[derive(Clone, Copy)]
pub struct TableLayout {
    pub header: HeaderRow,
    pub date: TableDate,
    pub customer_code: Col,
    pub customer_name: Col,
    pub product_code: Col,
    pub product_name: Col,
    pub quantity: Col,
    pub document: Option<Col>,
    /// 客户代码空白时沿用上一行
    pub fill_down_customer: bool,
    /// 客户代码被 Excel 误转成日期时的还原表
    pub customer_aliases: &'static [(&'static str, &'static str)],
    /// 残留表头行的客户代码
    pub skip_customers: &'static [&'static str],
    pub fold_product_code: bool,
}

/// 已解析出列号的表格
struct Resolved {
    customer_code: usize,
    customer_name: usize,
    product_code: usize,
    product_name: usize,
    quantity: usize,
    date: Option<usize>,
    document: Option<usize>,
}

impl TableLayout {
    pub const fn new(
        customer_code: Col,
        customer_name: Col,
        product_code: Col,
        product_name: Col,
        quantity: Col,
        date: TableDate,
    ) -> Self {
        Self {
            header: HeaderRow::First,
            date,
            customer_code,
            customer_name,
            product_code,
            product_name,
            quantity,
            document: None,
            fill_down_customer: false,
            customer_aliases: &[],
            skip_customers: &[],
            fold_product_code: false,
        }
    }

    fn header_row(&self, sheet: &Sheet) -> usize {
        match self.header {
            HeaderRow::First => 0,
            HeaderRow::Detect(detect) => detect(sheet),
        }
    }

    fn resolve(&self, sheet: &Sheet, header: usize) -> Option<Resolved> {
        let find = |col: Col| match col {
            Col::At(i) => Some(i),
            Col::Named(name) => sheet.find_in_row(header, name),
        };
        let date = match self.date {
            TableDate::Column(col) => Some(find(col)?),
            _ => None,
        };
        let document = match self.document {
            Some(col) => Some(find(col)?),
            None => None,
        };
        Some(Resolved {
            customer_code: find(self.customer_code)?,
            customer_name: find(self.customer_name)?,
            product_code: find(self.product_code)?,
            product_name: find(self.product_name)?,
            quantity: find(self.quantity)?,
            date,
            document,
        })
    }

    fn sheet_date(&self, sheet: &Sheet, options: &ParseOptions) -> Option<String> {
        match self.date {
            TableDate::Column(_) => None,
            TableDate::SheetDayRange => sheet_day_range_end(&sheet.name, options.sheet_year),
            TableDate::SheetDateRange => sheet_date_range_end(&sheet.name),
            TableDate::BannerRow(row) => last_date_in(&sheet.row_text(row)),
        }
    }

    fn customer_code(&self, text: String) -> String {
        self.customer_aliases
            .iter()
            .find(|(raw, _)| *raw == text)
            .map(|(_, alias)| alias.to_string())
            .unwrap_or(text)
    }

    pub fn parse(&self, sheet: &Sheet, options: &ParseOptions) -> Vec<TransactionRecord> {
        let header = self.header_row(sheet);
        let Some(cols) = self.resolve(sheet, header) else {
            tracing::warn!("{}: 表头缺少必要字段，跳过", sheet.name);
            return Vec::new();
        };
        let sheet_date = self.sheet_date(sheet, options);

        let mut records = Vec::new();
        let mut last_customer = (String::new(), String::new());

        for row in header + 1..sheet.height() {
            let mut code = self.customer_code(cell_text(sheet.cell(row, cols.customer_code)));
            let mut name = sheet.text(row, cols.customer_name);
            if self.fill_down_customer {
                if code.is_empty() {
                    code = last_customer.0.clone();
                    if name.is_empty() {
                        name = last_customer.1.clone();
                    }
                } else {
                    last_customer = (code.clone(), name.clone());
                }
            }

            if self.skip_customers.contains(&code.as_str()) {
                continue;
            }

            let mut product_code = sheet.text(row, cols.product_code);
            if self.fold_product_code {
                product_code = fold_full_width(&product_code);
            }
            if code.is_empty() && product_code.is_empty() {
                continue;
            }
            let Some(qty) = quantity(sheet.cell(row, cols.quantity)) else {
                continue;
            };

            let date = match cols.date {
                Some(col) => normalize_date(sheet.cell(row, col)),
                None => sheet_date.clone(),
            };
            let product = ProductContext::new(product_code, sheet.text(row, cols.product_name));
            let mut record = product.record(code, name, date, qty);
            if let Some(col) = cols.document {
                record = record.with_document(sheet.text(row, col));
            }
            records.push(record);
        }
        records
    }
}
