//! 货品明细账：货品标题行之后是逐笔单据（日期、单号、客户、数量）

use super::{is_total_line, ParseOptions};
use crate::code_normalizer::clean_text;
use crate::date_normalizer::{minguo_to_gregorian, normalize_date, normalize_date_text};
use crate::models::{ProductContext, TransactionRecord};
use crate::workbook::{quantity, quantity_from, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;

static MINGUO_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}/\d{2}/\d{2}$").expect("valid regex"));

static ANY_LEAD_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}/\d{2}/\d{2}|\d{3}/\d{2}/\d{2}").expect("valid regex"));

static BRACKETED_PRODUCT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"貨品編號:\s*[\[【]([^\]】]+)[\]】]\s*(.+)").expect("valid regex")
});

static COVER_PRODUCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"貨品編號[:：]([A-Z0-9\-]+)\s+(.*)").expect("valid regex"));

static CODE_THEN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"貨品編號[:：]\s*([A-Za-z0-9\-]+)\s+(?:貨品名稱[:：])?\s*(.+)").expect("valid regex")
});

static NUMERIC_PRODUCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{6,})\s+(.+)$").expect("valid regex"));

static NUMERIC_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6,}$").expect("valid regex"));

static BRACKET_EDGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\[【]\s*|\s*[\]】]$").expect("valid regex"));

const RETURN_DOCS: [&str; 4] = ["銷退", "退回", "退貨", "銷售退回"];

/// 单元格为民国日期 `YYY/MM/DD` 时转换
fn minguo_at(sheet: &Sheet, row: usize, col: usize) -> Option<String> {
    let text = sheet.text(row, col);
    if MINGUO_ONLY.is_match(&text) {
        minguo_to_gregorian(&text)
    } else {
        None
    }
}

fn returned(qty: i64) -> i64 {
    -qty.abs()
}

/// 去掉 `貨品編號:` 后按空白切出代码与名称
fn split_after_label(text: &str, label: &str) -> ProductContext {
    let rest = text.split_once(label).map(|(_, r)| r).unwrap_or(text);
    let rest = rest.trim_start_matches([':', '：']).trim();
    match rest.split_once(char::is_whitespace) {
        Some((code, name)) => ProductContext::new(code.trim(), name.trim()),
        None => ProductContext::new(rest, ""),
    }
}

/// 日期列为民国或公元年，客户栏位视版本左移一栏
pub fn bracketed_products(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let offset = (10..sheet.height())
        .find(|&row| ANY_LEAD_DATE.is_match(&sheet.text(row, 0)))
        .map(|row| if sheet.text(row, 1).starts_with('銷') { 0 } else { 1 })
        .unwrap_or(0);

    let mut records = Vec::new();
    let mut product: Option<ProductContext> = None;

    for row in 0..sheet.height() {
        let first = clean_text(&sheet.text(row, 0));
        if first.contains("貨品編號:") {
            if let Some(caps) = BRACKETED_PRODUCT.captures(&first) {
                product = Some(ProductContext::new(caps[1].trim(), caps[2].trim()));
            }
            continue;
        }
        let Some(current) = &product else {
            continue;
        };
        if first.contains("合計") || first.contains("小計") {
            continue;
        }

        let code = sheet.text(row, 2 - offset);
        if code.is_empty() || current.code.is_empty() || current.name.is_empty() {
            continue;
        }
        let Some(qty) = sheet.number(row, 4 - offset).and_then(quantity_from) else {
            continue;
        };
        let date = normalize_date(sheet.cell(row, 0));
        records.push(current.record(code, sheet.text(row, 3 - offset), date, qty));
    }
    records
}

/// `名稱(代碼)`：下一行为 `單據類別` 时是客户，否则是货品；`出貨單` 行是明细
pub fn named_ledger(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let banner = [2, 3]
        .iter()
        .map(|&row| sheet.text(row, 1))
        .find(|text| !text.is_empty())
        .unwrap_or_default();
    let date = if banner.contains('~') {
        normalize_date_text(&banner)
    } else {
        None
    };

    let mut records = Vec::new();
    let mut customer = (String::new(), String::new());
    let mut product = ProductContext::default();

    for row in 0..sheet.height() {
        let label = sheet.text(row, 1);
        if let (Some(open), Some(close)) = (label.rfind('('), label.rfind(')')) {
            if open < close {
                let code = label[open + 1..close].to_string();
                let name = label[..open].trim().to_string();
                if sheet.text(row + 1, 1) == "單據類別" {
                    customer = (code, name);
                } else {
                    product = ProductContext::new(code, name);
                }
            }
        }

        let document = sheet.text(row, 2);
        if label != "出貨單" || document.is_empty() {
            continue;
        }
        let Some(qty) = quantity(sheet.cell(row, 4)) else {
            continue;
        };
        let record = product
            .record(customer.0.clone(), customer.1.clone(), date.clone(), qty)
            .with_document(document);
        records.push(record);
    }
    records
}

/// 货品标题下第 5 行起为明细，`進貨單` 略过，`銷退單` 为退货
pub fn inventory_ledger(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product: Option<ProductContext> = None;
    let mut details_from = 0;

    for row in 0..sheet.height() {
        let first = sheet.str_at(row, 0).unwrap_or_default().to_string();
        if first.starts_with("貨品編號:") {
            product = Some(split_after_label(&first, "貨品編號"));
            details_from = row + 5;
            continue;
        }
        let Some(current) = &product else {
            continue;
        };
        if row < details_from {
            continue;
        }

        let kind = sheet.text(row, 4);
        if kind == "進貨單" || (0..3).any(|col| sheet.is_empty_at(row, col)) {
            continue;
        }
        let Some(mut qty) = quantity(sheet.cell(row, 6)) else {
            continue;
        };
        if kind == "銷退單" {
            qty = returned(qty);
        }

        let code = sheet.text(row, 2);
        let code = code.split('.').next().unwrap_or_default().to_string();
        let date = normalize_date(sheet.cell(row, 0));
        let record = current
            .record(code, sheet.text(row, 3), date, qty)
            .with_document(sheet.text(row, 1));
        records.push(record);
    }
    records
}

/// 每张表一个货品，写在 A3；第 9 行起为明细
pub fn cover_product(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let cover = sheet.text(2, 0);
    let Some(caps) = COVER_PRODUCT.captures(&cover) else {
        tracing::debug!("{}: A3 没有货品编号，跳过", sheet.name);
        return Vec::new();
    };
    let product = ProductContext::new(caps[1].trim(), caps[2].trim());

    (8..sheet.height())
        .filter_map(|row| {
            if sheet.is_empty_at(row, 0) || sheet.is_empty_at(row, 2) {
                return None;
            }
            let qty = quantity(sheet.cell(row, 5))?;
            let date = normalize_date(sheet.cell(row, 0));
            let record = product
                .record(sheet.text(row, 2), sheet.text(row, 4), date, qty)
                .with_document(sheet.text(row, 1));
            Some(record)
        })
        .collect()
}

/// `產品編號:` / `品名規格:` 标题，`銷貨（庫存）` 行为明细
fn stock_ledger(sheet: &Sheet, with_returns: bool) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);
        let kind = sheet.text(row, 3);
        if let Some(code) = first.strip_prefix("產品編號:") {
            product.code = code.trim().to_string();
        }
        if let Some(name) = kind.strip_prefix("品名規格:") {
            product.name = name.trim().to_string();
        }

        let is_return = with_returns && kind == "銷貨退回";
        if kind != "銷貨（庫存）" && !is_return {
            continue;
        }
        if [0, 1, 2, 9].iter().any(|&col| sheet.is_empty_at(row, col)) {
            continue;
        }
        let Some(mut qty) = quantity(sheet.cell(row, 5)) else {
            continue;
        };
        if is_return {
            qty = -qty;
        }
        let date = normalize_date(sheet.cell(row, 0));
        let record = product
            .record(sheet.text(row, 9), sheet.text(row, 2), date, qty)
            .with_document(sheet.text(row, 1));
        records.push(record);
    }
    records
}

pub fn stock_ledger_sales(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    stock_ledger(sheet, false)
}

pub fn stock_ledger_with_returns(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    stock_ledger(sheet, true)
}

/// `產品編號` 行之后逐笔，日期与单号向下填充；赠品行另起一行，由合并步骤相加
pub fn product_number_blocks(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();
    let mut date = None;
    let mut document = String::new();

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);
        if sheet.str_at(row, 0).is_some() && first.starts_with("產品編號") {
            product = ProductContext::new(
                sheet.text(row, 1).to_uppercase(),
                BRACKET_EDGES.replace_all(&sheet.text(row, 3), "").to_string(),
            );
            continue;
        }
        if sheet.str_at(row, 2).is_some_and(|c| c.contains("台幣合計")) {
            continue;
        }
        if MINGUO_ONLY.is_match(&first) {
            date = minguo_to_gregorian(&first);
        }
        if let Some(doc) = sheet.str_at(row, 1).map(str::trim).filter(|d| !d.is_empty()) {
            document = doc.to_string();
        }

        if product.code.is_empty() || date.is_none() {
            continue;
        }
        let Some(qty) = quantity(sheet.cell(row, 5)) else {
            continue;
        };
        let record = product
            .record(sheet.text(row, 2), sheet.text(row, 3), date.clone(), qty)
            .with_document(document.clone());
        records.push(record);
    }
    records
}

/// `產品編號` 行之后每个民国日期行为一笔
pub fn product_number_details(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);
        if first.starts_with("產品編號") {
            let name = sheet.text(row, 3);
            product = ProductContext::new(
                sheet.text(row, 1).to_uppercase(),
                name.trim_start_matches('[').trim(),
            );
            continue;
        }
        let Some(date) = minguo_at(sheet, row, 0) else {
            continue;
        };
        let name = sheet.text(row, 3);
        if product.code.is_empty() || name.is_empty() {
            continue;
        }
        let Some(qty) = quantity(sheet.cell(row, 5)) else {
            continue;
        };
        let record = product
            .record(sheet.text(row, 2), name, Some(date), qty)
            .with_document(sheet.text(row, 1));
        records.push(record);
    }
    records
}

/// 数字货号标题 + `日期|銷貨單號|客戶編號|客戶簡稱` 表格
pub fn numeric_product_grid(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();
    let mut in_table = false;

    for row in 0..sheet.height() {
        let cells: Vec<String> = (0..4).map(|col| sheet.text(row, col)).collect();

        let inline = NUMERIC_PRODUCT.captures(&cells[0]);
        let split = NUMERIC_CODE.is_match(&cells[0]) && !cells[1].is_empty();
        if inline.is_some() || split {
            product = match inline {
                Some(caps) => ProductContext::new(caps[1].trim(), caps[2].trim()),
                None => ProductContext::new(cells[0].clone(), cells[1].clone()),
            };
            product.code = product.code.to_uppercase();
            in_table = false;
            continue;
        }

        if cells == ["日期", "銷貨單號", "客戶編號", "客戶簡稱"] {
            in_table = true;
            continue;
        }
        if !in_table || product.code.is_empty() {
            continue;
        }
        if cells[0].contains("合計") || cells[0].contains("小計") {
            continue;
        }

        let Some(date) = normalize_date(sheet.cell(row, 0)) else {
            continue;
        };
        let Some(qty) = quantity(sheet.cell(row, 4)) else {
            continue;
        };
        let record = product
            .record(cells[2].clone(), cells[3].clone(), Some(date), qty)
            .with_document(cells[1].clone());
        records.push(record);
    }
    records
}

/// 明细表头里各栏的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridColumns {
    date: usize,
    document: usize,
    customer_code: usize,
    customer_name: usize,
    quantity: usize,
}

const HEADER_WIDTH: usize = 12;

fn grid_header(cells: &[String]) -> Option<GridColumns> {
    let joined = cells.join("|");
    let has = |tokens: &[&str]| tokens.iter().any(|t| joined.contains(t));
    if !(has(&["日期"]) && has(&["銷貨單號", "單據號碼"]) && has(&["客戶"]) && has(&["數量"])) {
        return None;
    }
    let index_of = |candidates: &[&str], fallback: usize| {
        candidates
            .iter()
            .find_map(|c| cells.iter().position(|cell| cell == c))
            .unwrap_or(fallback)
    };
    Some(GridColumns {
        date: index_of(&["銷貨日期", "日期"], 0),
        document: index_of(&["銷貨單號", "單據號碼"], 1),
        customer_code: index_of(&["客戶編號", "客戶代號"], 3),
        customer_name: index_of(&["客戶簡稱", "客戶"], 4),
        quantity: index_of(&["數量", "數量(瓶)"], 5),
    })
}

/// `起訖品號：CODE` 标题，名称在 D 栏或其后三行内；表头决定栏位
pub fn range_product_grid(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();
    let mut grid: Option<GridColumns> = None;

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);
        if let Some(code) = first.strip_prefix("起訖品號：") {
            let name = (row..(row + 4).min(sheet.height()))
                .map(|r| sheet.text(r, 3))
                .find(|n| !n.is_empty())
                .unwrap_or_default();
            product = ProductContext::new(code.trim().to_uppercase(), name);
            grid = None;
            continue;
        }

        let cells: Vec<String> = (0..HEADER_WIDTH).map(|col| sheet.text(row, col)).collect();
        if let Some(columns) = grid_header(&cells) {
            grid = Some(columns);
            continue;
        }
        let Some(cols) = grid else {
            continue;
        };
        if product.code.is_empty() || cells.iter().any(|c| c.contains("合計") || c.contains("小計")) {
            continue;
        }

        let Some(date) = normalize_date(sheet.cell(row, cols.date)) else {
            continue;
        };
        // 数量栏为空时在客户名称右侧三栏内找
        let qty = match sheet.number(row, cols.quantity) {
            Some(q) => Some(q),
            None => (cols.customer_name + 1..cols.customer_name + 4).find_map(|c| sheet.number(row, c)),
        };
        let Some(qty) = qty.and_then(quantity_from) else {
            continue;
        };
        let record = product
            .record(
                sheet.text(row, cols.customer_code),
                sheet.text(row, cols.customer_name),
                Some(date),
                qty,
            )
            .with_document(sheet.text(row, cols.document));
        records.push(record);
    }
    records
}

fn labelled_code_then_name(text: &str) -> ProductContext {
    match CODE_THEN_NAME.captures(text) {
        Some(caps) => ProductContext::new(caps[1].trim().to_uppercase(), caps[2].trim()),
        None => {
            let code = text.rsplit("貨品編號").next().unwrap_or_default();
            ProductContext::new(code.trim_start_matches([':', '：']).trim().to_uppercase(), "")
        }
    }
}

fn is_document_table_header(sheet: &Sheet, row: usize) -> bool {
    sheet.text(row, 0) == "單據日期"
        && sheet.text(row, 1) == "單據編號"
        && sheet.text(row, 2) == "客戶編號"
        && matches!(sheet.text(row, 3).as_str(), "客戶簡稱" | "客戶名稱")
        && sheet.text(row, 4).contains("數量")
}

/// 货品标题下接单据表，空行、公司抬头或下一个货品结束该表
pub fn labelled_product_tables(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();
    let mut in_table = false;

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);
        if first.starts_with("貨品編號:") {
            product = labelled_code_then_name(&first);
            in_table = false;
            continue;
        }
        if is_document_table_header(sheet, row) {
            in_table = true;
            continue;
        }
        if !in_table {
            continue;
        }
        if (0..4).all(|col| sheet.is_empty_at(row, col)) || first.starts_with("酒國英豪洋酒有限公司") {
            in_table = false;
            continue;
        }

        let name = sheet.text(row, 3);
        if product.code.is_empty() || name.is_empty() {
            continue;
        }
        let Some(mut qty) = quantity(sheet.cell(row, 4)) else {
            continue;
        };
        let document = sheet.text(row, 1);
        if RETURN_DOCS.iter().any(|m| document.contains(m)) {
            qty = returned(qty);
        }
        let date = normalize_date(sheet.cell(row, 0));
        let record = product
            .record(sheet.text(row, 2), name, date, qty)
            .with_document(document);
        records.push(record);
    }
    records
}

/// 货品标题之后，C 栏为民国日期的行即明细；单号含 `退` 为退货
pub fn labelled_product_rows(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut product = ProductContext::default();

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);
        if first.starts_with("貨品編號") {
            product = labelled_code_then_name(&first);
            continue;
        }
        let Some(date) = minguo_at(sheet, row, 2) else {
            continue;
        };
        let name = sheet.text(row, 1);
        if first.is_empty() || first == "客戶編號" || is_total_line(&first) || name.is_empty() || name == "客戶名稱" {
            continue;
        }
        if product.code.is_empty() {
            continue;
        }
        let Some(mut qty) = quantity(sheet.cell(row, 4)) else {
            continue;
        };
        let document = sheet.text(row, 3);
        if document.contains('退') {
            qty = returned(qty);
        }
        let record = product
            .record(first, name, Some(date), qty)
            .with_document(document);
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::test_support::{blank_rows, n, s};
    use calamine::Data;

    fn opts() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn test_bracketed_products_with_shifted_columns() {
        let mut rows = blank_rows(10);
        rows[2] = vec![s("貨品編號: 【GL-12】 格蘭利威12年")];
        rows.push(vec![s("114/07/02"), s("C01"), s("甲店"), n(6.0)]);
        rows.push(vec![s("小計"), Data::Empty, Data::Empty, n(6.0)]);
        rows.push(vec![s("2025/07/03"), s("C02"), s("乙店"), n(2.0)]);
        let records = bracketed_products(&Sheet::new("S", rows), &opts());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_code, "GL-12");
        assert_eq!(records[0].customer_code, "C01");
        assert_eq!(records[0].customer_name, "甲店");
        assert_eq!(records[0].date.as_deref(), Some("20250702"));
        assert_eq!(records[1].date.as_deref(), Some("20250703"));
    }

    #[test]
    fn test_named_ledger_customer_and_product_headers() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![],
                vec![],
                vec![Data::Empty, s("2025/07/01 ~ 2025/07/31")],
                vec![Data::Empty, s("大同酒行(K001)")],
                vec![Data::Empty, s("單據類別")],
                vec![Data::Empty, s("約翰走路黑牌(JW-B)")],
                vec![Data::Empty, s("出貨單"), s("SO-9"), Data::Empty, n(12.0)],
                vec![Data::Empty, s("出貨單"), Data::Empty, Data::Empty, n(1.0)],
            ],
        );
        let records = named_ledger(&sheet, &opts());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!((r.customer_code.as_str(), r.customer_name.as_str()), ("K001", "大同酒行"));
        assert_eq!((r.product_code.as_str(), r.product_name.as_str()), ("JW-B", "約翰走路黑牌"));
        assert_eq!(r.document_number.as_deref(), Some("SO-9"));
        assert_eq!(r.date.as_deref(), Some("20250731"));
    }

    #[test]
    fn test_inventory_ledger_negates_sales_returns() {
        let mut rows = vec![vec![s("貨品編號:P100 皇家禮炮21年")]];
        rows.extend(blank_rows(4));
        rows.push(vec![s("114/07/01"), s("D1"), n(501.0), s("甲"), s("銷貨單"), Data::Empty, n(10.0)]);
        rows.push(vec![s("114/07/02"), s("D2"), n(502.0), s("乙"), s("進貨單"), Data::Empty, n(50.0)]);
        rows.push(vec![s("114/07/03"), s("D3"), n(501.0), s("甲"), s("銷退單"), Data::Empty, n(5.0)]);
        let records = inventory_ledger(&Sheet::new("S", rows), &opts());

        let qty: Vec<i64> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![10, -5]);
        assert_eq!(records[0].customer_code, "501");
        assert_eq!(records[0].product_name, "皇家禮炮21年");
        assert_eq!(records[1].date.as_deref(), Some("20250703"));
    }

    #[test]
    fn test_cover_product_requires_a3() {
        let mut rows = blank_rows(8);
        rows[2] = vec![s("貨品編號:HB-17 響17年")];
        rows.push(vec![s("2025/07/05"), s("R1"), s("C9"), s("任我行"), s("酒窖"), n(3.0)]);
        rows.push(vec![Data::Empty, s("R2"), s("C9"), s("任我行"), s("酒窖"), n(3.0)]);
        let records = cover_product(&Sheet::new("S", rows.clone()), &opts());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customer_name, "酒窖");
        assert_eq!(records[0].document_number.as_deref(), Some("R1"));

        rows[2] = vec![s("其他")];
        assert!(cover_product(&Sheet::new("S", rows), &opts()).is_empty());
    }

    fn stock_sheet() -> Sheet {
        let detail = |kind: &str, qty: f64| {
            let mut row = vec![s("114/07/08"), s("SL-1"), s("和易門市"), s(kind), Data::Empty, n(qty)];
            row.extend([Data::Empty, Data::Empty, Data::Empty, s("H01")]);
            row
        };
        Sheet::new(
            "Page 1",
            vec![
                vec![s("產品編號:MC-12"), Data::Empty, Data::Empty, s("品名規格:麥卡倫12年")],
                detail("銷貨（庫存）", 4.0),
                detail("銷貨退回", 5.0),
            ],
        )
    }

    #[test]
    fn test_stock_ledger_returns_only_when_enabled() {
        let sales = stock_ledger_sales(&stock_sheet(), &opts());
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].product_code, "MC-12");
        assert_eq!(sales[0].product_name, "麥卡倫12年");
        assert_eq!(sales[0].customer_code, "H01");

        let all = stock_ledger_with_returns(&stock_sheet(), &opts());
        let qty: Vec<i64> = all.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![4, -5]);
    }

    #[test]
    fn test_product_number_blocks_fill_forward() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("產品編號："), s("gl-15"), Data::Empty, s("【格蘭利威15年】")],
                vec![s("114/07/10"), s("A001"), s("C1"), s("甲"), Data::Empty, n(6.0)],
                vec![Data::Empty, Data::Empty, s("C1"), s("甲"), Data::Empty, s("1")],
                vec![Data::Empty, Data::Empty, s("台幣合計"), Data::Empty, Data::Empty, n(7.0)],
            ],
        );
        let records = product_number_blocks(&sheet, &opts());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_code, "GL-15");
        assert_eq!(records[0].product_name, "格蘭利威15年");
        assert_eq!(records[1].document_number.as_deref(), Some("A001"));
        assert_eq!(records[1].date.as_deref(), Some("20250710"));
    }

    #[test]
    fn test_product_number_details() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("產品編號："), s("ab-1"), Data::Empty, s("[百齡罈")],
                vec![s("114/05/07"), s("N1"), s("K1"), s("甲"), Data::Empty, n(2.0)],
                vec![s("小計"), Data::Empty, Data::Empty, Data::Empty, Data::Empty, n(2.0)],
            ],
        );
        let records = product_number_details(&sheet, &opts());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_name, "百齡罈");
        assert_eq!(records[0].date.as_deref(), Some("20250507"));
    }

    #[test]
    fn test_numeric_product_grid() {
        let sheet = Sheet::new(
            "7月",
            vec![
                vec![s("列印日期"), s("2025/08/01")],
                vec![n(100234.0), s("山崎12年")],
                vec![s("日期"), s("銷貨單號"), s("客戶編號"), s("客戶簡稱"), s("數量")],
                vec![s("2025/07/04"), s("S-1"), s("Y1"), s("裕店"), n(3.0)],
                vec![s("小計"), Data::Empty, Data::Empty, Data::Empty, n(3.0)],
                vec![s("200111 白州")],
                vec![s("2025/07/05"), s("S-2"), s("Y1"), s("裕店"), n(1.0)],
                vec![s("日期"), s("銷貨單號"), s("客戶編號"), s("客戶簡稱"), s("數量")],
                vec![s("2025/07/06"), s("S-3"), s("Y2"), s("陞店"), n(2.0)],
            ],
        );
        let records = numeric_product_grid(&sheet, &opts());
        let keys: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.product_code.as_str(), r.customer_code.as_str()))
            .collect();
        assert_eq!(keys, vec![("100234", "Y1"), ("200111", "Y2")]);
    }

    #[test]
    fn test_range_product_grid_with_header_indices() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("起訖品號：ms-18"), Data::Empty, Data::Empty, Data::Empty],
                vec![Data::Empty, Data::Empty, Data::Empty, s("麥卡倫18年")],
                vec![s("銷貨日期"), s("銷貨單號"), s("客戶編號"), s("客戶簡稱"), s("數量")],
                vec![s("114/07/01"), s("L1"), s("C1"), s("甲"), n(2.0)],
                vec![s("114/07/02"), s("L2"), s("C2"), s("乙"), Data::Empty, n(3.0)],
                vec![s("合計"), Data::Empty, Data::Empty, Data::Empty, n(5.0)],
            ],
        );
        let records = range_product_grid(&sheet, &opts());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_code, "MS-18");
        assert_eq!(records[0].product_name, "麥卡倫18年");
        assert_eq!(records[0].customer_code, "C1");
        assert_eq!(records[1].quantity, 3);
        assert_eq!(records[1].document_number.as_deref(), Some("L2"));
    }

    #[test]
    fn test_labelled_product_tables_stop_and_returns() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("貨品編號:B07002-004 格蘭利威13年雪莉桶-0.7L")],
                vec![s("單據日期"), s("單據編號"), s("客戶編號"), s("客戶簡稱"), s("數量/Units")],
                vec![s("2025/07/01"), s("銷貨A1"), s("K1"), s("甲"), n(6.0)],
                vec![s("2025/07/02"), s("銷退B1"), s("K1"), s("甲"), n(5.0)],
                vec![],
                vec![s("2025/07/03"), s("銷貨A2"), s("K2"), s("乙"), n(9.0)],
            ],
        );
        let records = labelled_product_tables(&sheet, &opts());
        let qty: Vec<i64> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![6, -5]);
        assert_eq!(records[0].product_code, "B07002-004");
        assert_eq!(records[0].product_name, "格蘭利威13年雪莉桶-0.7L");
    }

    #[test]
    fn test_labelled_product_rows() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("貨品編號:D0530-0  貨品名稱:格蘭利威12年-盒裝")],
                vec![s("客戶編號"), s("客戶名稱"), s("日期"), s("單號"), s("數量")],
                vec![s("E1"), s("東店"), s("114/07/24"), s("銷A"), n(2.0)],
                vec![s("E1"), s("東店"), s("114/07/25"), s("退B"), n(5.0)],
                vec![s("小計"), s(""), s("114/07/25"), Data::Empty, n(-3.0)],
            ],
        );
        let records = labelled_product_rows(&sheet, &opts());
        let qty: Vec<i64> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![2, -5]);
        assert_eq!(records[0].product_name, "格蘭利威12年-盒裝");
        assert_eq!(records[1].date.as_deref(), Some("20250725"));
    }
}
