//! 经销商原始报表解析
//!
//! 每张工作表独立解析：货品上下文只在表内传递，表与表之间不共享状态。
//! 声明式版式（`blocks`、`tables`）覆盖大多数经销商，其余用自定义解析函数。

pub mod blocks;
pub mod customer_blocks;
pub mod ledgers;
pub mod period_reports;
pub mod tables;

use crate::models::{ProductContext, SheetSummary, TransactionRecord};
use crate::workbook::{Sheet, Workbook};
use once_cell::sync::Lazy;
use regex::Regex;

pub use blocks::{Banner, BlockLayout, CodeShape, QuantityCells};
pub use tables::{Col, HeaderRow, TableDate, TableLayout};

/// 小计 / 合计 / 总计
pub const TOTAL_MARKERS: [&str; 3] = ["小計", "合計", "總計"];

pub fn is_total_line(text: &str) -> bool {
    TOTAL_MARKERS.iter().any(|m| text.contains(m))
}

static PRODUCT_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"貨品編號\s*[:：]\s*[\[【]?\s*([A-Za-z0-9\-]+)[\]】]?").expect("valid regex")
});

static PRODUCT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"貨品名稱\s*[:：]\s*(.+)").expect("valid regex"));

/// 解析 `貨品編號:CODE 貨品名稱:NAME` 或 `貨品編號:CODE NAME`
pub fn labelled_product(text: &str) -> Option<ProductContext> {
    let caps = PRODUCT_CODE.captures(text)?;
    let code = caps.get(1)?;
    let name = match PRODUCT_NAME.captures(text) {
        Some(n) => n[1].trim().to_string(),
        None => text[caps.get(0)?.end()..].trim().to_string(),
    };
    Some(ProductContext::new(code.as_str().trim(), name))
}

/// 解析选项
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// 工作表名只含月日时补的年份
    pub sheet_year: i32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { sheet_year: 2025 }
    }
}

/// 自定义解析函数
pub type SheetParser = fn(&Sheet, &ParseOptions) -> Vec<TransactionRecord>;

/// 要解析哪些工作表
#[derive(Clone, Copy)]
pub enum SheetSelector {
    First,
    All,
    Named(&'static str),
    NamedOrFirst(&'static str),
    /// 第一个名称包含该文字的工作表
    FirstContaining(&'static str),
    /// 名称符合条件的全部工作表
    Matching(fn(&str) -> bool),
    /// 第一个符合条件的工作表，否则第一个工作表
    FirstMatchingOrFirst(fn(&str) -> bool),
}

impl SheetSelector {
    pub fn select<'a>(&self, workbook: &'a Workbook) -> Vec<&'a Sheet> {
        match self {
            Self::First => workbook.first().into_iter().collect(),
            Self::All => workbook.sheets.iter().collect(),
            Self::Named(name) => workbook.sheet(name).into_iter().collect(),
            Self::NamedOrFirst(name) => workbook
                .sheet(name)
                .or_else(|| workbook.first())
                .into_iter()
                .collect(),
            Self::FirstContaining(part) => workbook
                .sheets
                .iter()
                .find(|s| s.name.contains(part))
                .into_iter()
                .collect(),
            Self::Matching(accept) => workbook.sheets.iter().filter(|s| accept(&s.name)).collect(),
            Self::FirstMatchingOrFirst(accept) => workbook
                .sheets
                .iter()
                .find(|s| accept(&s.name))
                .or_else(|| workbook.first())
                .into_iter()
                .collect(),
        }
    }
}

/// 报表版式
#[derive(Clone, Copy)]
pub enum Layout {
    Blocks(BlockLayout),
    Table(TableLayout),
    Custom(SheetParser),
}

impl Layout {
    pub fn parse_sheet(&self, sheet: &Sheet, options: &ParseOptions) -> Vec<TransactionRecord> {
        match self {
            Self::Blocks(layout) => layout.parse(sheet),
            Self::Table(layout) => layout.parse(sheet, options),
            Self::Custom(parser) => parser(sheet, options),
        }
    }
}

/// 解析结果与逐表统计
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub records: Vec<TransactionRecord>,
    pub sheets: Vec<SheetSummary>,
}

impl ParseReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 逐表解析后合并
pub fn parse_workbook(
    selector: &SheetSelector,
    layout: &Layout,
    workbook: &Workbook,
    options: &ParseOptions,
) -> ParseReport {
    let mut report = ParseReport::default();

    for sheet in selector.select(workbook) {
        let mut records = layout.parse_sheet(sheet, options);
        for record in &mut records {
            record.sheet = sheet.name.clone();
        }
        tracing::info!("工作表 {}: {} 条", sheet.name, records.len());
        report.sheets.push(SheetSummary {
            sheet: sheet.name.clone(),
            records: records.len(),
        });
        report.records.extend(records);
    }

    if report.sheets.is_empty() {
        tracing::warn!("没有符合条件的工作表: {:?}", workbook.sheet_names());
    }
    report
}
