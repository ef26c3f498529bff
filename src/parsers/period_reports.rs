//! 期间汇总报表：整张表一个报表期间，日期取期间结束日

use super::ParseOptions;
use crate::date_normalizer::{minguo_month_end, minguo_to_gregorian, normalize_date, normalize_date_text};
use crate::models::{ProductContext, TransactionRecord};
use crate::workbook::{quantity, quantity_from, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;

static MINGUO_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}/\d{2}/\d{2}$").expect("valid regex"));

static INTERVAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"日期區間[:：]\s*\d{3}/\d{2}/\d{2}\s*~\s*(\d{3}/\d{2}/\d{2})").expect("valid regex")
});

/// 左上角 `rows × cols` 窗口内第一个满足条件的值
fn scan_window<T>(sheet: &Sheet, rows: usize, cols: usize, find: impl Fn(&str) -> Option<T>) -> Option<T> {
    (0..rows.min(sheet.height()))
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .find_map(|(r, c)| {
            let text = sheet.text(r, c);
            if text.is_empty() {
                None
            } else {
                find(&text)
            }
        })
}

fn header_row(sheet: &Sheet, limit: usize, matches: impl Fn(&[String]) -> bool) -> Option<usize> {
    (0..limit.min(sheet.height())).find(|&r| {
        let cells: Vec<String> = (0..sheet.width()).map(|c| sheet.text(r, c)).collect();
        matches(&cells)
    })
}

/// 期间 `114.7`，货品行可同时带第一个客户
pub fn monthly_product_customers(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let date = scan_window(sheet, 20, 8, minguo_month_end);
    let Some(header) = header_row(sheet, sheet.height(), |cells| {
        ["產品編號", "發票品名", "客戶/廠商編號", "數量"]
            .iter()
            .all(|label| cells.iter().any(|c| c == label))
    }) else {
        tracing::debug!("{}: 没有找到表头", sheet.name);
        return Vec::new();
    };

    let mut records = Vec::new();
    let mut product: Option<ProductContext> = None;

    for row in header + 1..sheet.height() {
        if let Some(code) = sheet.str_at(row, 0).map(str::trim).filter(|c| !c.is_empty()) {
            let name = sheet.str_at(row, 1).map(str::trim).unwrap_or_default();
            product = Some(ProductContext::new(code.to_uppercase(), name));
        }
        let Some(current) = &product else {
            continue;
        };
        let Some(customer) = sheet.str_at(row, 2).map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let Some(qty) = quantity(sheet.cell(row, 4)) else {
            continue;
        };
        records.push(current.record(sheet.text(row, 3), customer, date.clone(), qty));
    }
    records
}

/// `日期區間:114/07/01~114/07/31` 报表，`總計` 行结束
pub fn interval_report(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let date = scan_window(sheet, 30, 8, |text| {
        INTERVAL
            .captures(text)
            .and_then(|caps| minguo_to_gregorian(&caps[1]))
    });
    let Some(header) = header_row(sheet, sheet.height(), |cells| {
        cells.len() >= 5
            && cells[..4] == ["產品編號", "品名規格", "客戶編號", "客戶名稱"]
            && cells[4].contains("數量")
    }) else {
        tracing::debug!("{}: 没有找到表头", sheet.name);
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in header + 1..sheet.height() {
        let product_code = sheet.str_at(row, 0).map(str::trim).unwrap_or_default();
        if product_code.starts_with("總計") {
            break;
        }
        let Some(qty) = quantity(sheet.cell(row, 4)) else {
            continue;
        };
        let Some(customer) = sheet.str_at(row, 3).map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let product = ProductContext::new(
            product_code.to_uppercase(),
            sheet.str_at(row, 1).map(str::trim).unwrap_or_default(),
        );
        records.push(product.record(sheet.text(row, 2), customer, date.clone(), qty));
    }
    records
}

/// 一个 `統計日期` 区块：客户清单与货品代码
#[derive(Debug, Clone, PartialEq)]
struct CustomerBlock {
    date: Option<String>,
    product_code: String,
    customers: Vec<(String, String)>,
}

/// 第一遍：`統計日期` 之后 `客戶名稱` 表头下的客户（A、B 栏）与货品代码（F 栏）
fn customer_blocks(sheet: &Sheet) -> Vec<CustomerBlock> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < sheet.height() {
        let banner = sheet.text(i, 0);
        if !banner.contains("統計日期") {
            i += 1;
            continue;
        }
        let Some(header) = (i + 1..sheet.height()).find(|&r| sheet.text(r, 0) == "客戶名稱") else {
            i += 1;
            continue;
        };

        let mut block = CustomerBlock {
            date: normalize_date_text(&banner),
            product_code: String::new(),
            customers: Vec::new(),
        };
        let mut k = header + 1;
        while k < sheet.height() {
            let code = sheet.text(k, 0);
            let name = sheet.text(k, 1);
            let product = sheet.text(k, 5);
            if !code.is_empty() && !name.is_empty() && !product.is_empty() && code != "客戶名稱" {
                if block.product_code.is_empty() {
                    block.product_code = product.to_uppercase();
                }
                block.customers.push((code, name));
            } else if code.is_empty() && name.is_empty() {
                break;
            }
            k += 1;
        }
        if !block.product_code.is_empty() && !block.customers.is_empty() {
            blocks.push(block);
        }
        i = k;
    }
    blocks
}

/// 第二遍：`品名規格` 栏下的（品名，数量），数量在右侧第 4 栏
fn quantity_sections(sheet: &Sheet) -> Vec<Vec<(String, i64)>> {
    let mut sections = Vec::new();
    let mut i = 0;
    while i < sheet.height() {
        let Some(col) = (0..sheet.width()).find(|&c| sheet.text(i, c) == "品名規格") else {
            i += 1;
            continue;
        };
        let qty_col = (col + 4).min(sheet.width().saturating_sub(1));
        let mut section = Vec::new();
        let mut r = i + 1;
        while r < sheet.height() {
            let name = sheet.text(r, col);
            if name.is_empty() || sheet.text(r, col + 1).contains("合計") {
                break;
            }
            // 数量为 0 也保留，以免与客户错位
            if let Some(qty) = sheet.number(r, qty_col) {
                section.push((name, qty.trunc() as i64));
            }
            r += 1;
        }
        if !section.is_empty() {
            sections.push(section);
        }
        i = r;
    }
    sections
}

/// 客户区块与品名数量区段按出现顺序配对，客户与明细逐一对应
pub fn paired_blocks(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let blocks = customer_blocks(sheet);
    let sections = quantity_sections(sheet);
    if blocks.len() != sections.len() {
        tracing::warn!(
            "{}: 客户区块 {} 个，品名区段 {} 个，按较少者配对",
            sheet.name,
            blocks.len(),
            sections.len()
        );
    }

    blocks
        .iter()
        .zip(&sections)
        .flat_map(|(block, section)| {
            block
                .customers
                .iter()
                .zip(section)
                .filter_map(move |((code, name), (product_name, qty))| {
                    let qty = quantity_from(*qty as f64)?;
                    let product = ProductContext::new(block.product_code.clone(), product_name.clone());
                    Some(product.record(code.clone(), name.clone(), block.date.clone(), qty))
                })
        })
        .collect()
}

/// 月份分页：C/D/E 栏为 客戶編號/客戶簡稱/產品編號 的表头，`合計` 行结束；数量为销量加赠品
pub fn monthly_tabs(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let Some(header) = header_row(sheet, 25, |cells| {
        cells.len() >= 5 && cells[2..5] == ["客戶編號", "客戶簡稱", "產品編號"]
    }) else {
        tracing::debug!("{}: 没有找到表头", sheet.name);
        return Vec::new();
    };

    let mut records = Vec::new();
    for row in header + 1..sheet.height() {
        if sheet.text(row, 0) == "合計" {
            break;
        }
        if [2, 4, 5].iter().all(|&c| sheet.is_empty_at(row, c)) {
            continue;
        }
        let whole = |col: usize| sheet.number(row, col).map(f64::trunc).unwrap_or(0.0);
        let Some(qty) = quantity_from(whole(6) + whole(7)) else {
            continue;
        };
        let product = ProductContext::new(sheet.text(row, 4), sheet.text(row, 5));
        let date = normalize_date(sheet.cell(row, 0));
        records.push(product.record(sheet.text(row, 2), sheet.text(row, 3), date, qty));
    }
    records
}

/// A 栏为民国日期的行即明细
pub fn dated_rows(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    (0..sheet.height())
        .filter_map(|row| {
            let first = sheet.text(row, 0);
            if !MINGUO_ONLY.is_match(&first) {
                return None;
            }
            let name = sheet.text(row, 2);
            let code = sheet.text(row, 4).to_uppercase();
            if name.is_empty() || code.is_empty() {
                return None;
            }
            let qty = quantity(sheet.cell(row, 6))?;
            let product = ProductContext::new(code, sheet.text(row, 5));
            Some(product.record(sheet.text(row, 1), name, minguo_to_gregorian(&first), qty))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::test_support::{n, s};
    use calamine::Data;

    fn opts() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn test_monthly_product_customers() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("亨玖"), Data::Empty, n(114.7)],
                vec![s("產品編號"), s("發票品名"), s("客戶/廠商簡稱"), s("客戶/廠商編號"), s("數量")],
                vec![s("gv-12"), s("格蘭維特12年"), s("甲店"), s("H1"), n(3.0)],
                vec![Data::Empty, Data::Empty, s("乙店"), s("H2"), n(2.0)],
                vec![Data::Empty, Data::Empty, s("丙店"), s("H3"), n(0.0)],
            ],
        );
        let records = monthly_product_customers(&sheet, &opts());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].customer_code, "H2");
        assert_eq!(records[1].customer_name, "乙店");
        assert_eq!(records[1].product_code, "GV-12");
        assert!(records.iter().all(|r| r.date.as_deref() == Some("20250731")));
    }

    #[test]
    fn test_interval_report_stops_at_grand_total() {
        let sheet = Sheet::new(
            "夜點",
            vec![
                vec![s("日期區間:114/07/01~114/07/30")],
                vec![s("產品編號"), s("品名規格"), s("客戶編號"), s("客戶名稱"), s("數量(瓶)")],
                vec![s("r-1"), s("黑牌"), s("K1"), s("甲"), n(4.0)],
                vec![s("總計"), Data::Empty, Data::Empty, Data::Empty, n(4.0)],
                vec![s("r-2"), s("紅牌"), s("K2"), s("乙"), n(9.0)],
            ],
        );
        let records = interval_report(&sheet, &opts());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_code, "R-1");
        assert_eq!(records[0].date.as_deref(), Some("20250730"));
    }

    #[test]
    fn test_paired_blocks_zip_customers_with_quantities() {
        let mut header = vec![Data::Empty; 6];
        header.extend([s("品名規格"), Data::Empty, Data::Empty, Data::Empty, s("銷量")]);
        let qty_row = |name: &str, qty: f64| {
            let mut row = vec![Data::Empty; 6];
            row.extend([s(name), Data::Empty, Data::Empty, Data::Empty, n(qty)]);
            row
        };
        let rows = vec![
            vec![s("統計日期：2025/06/23至2025/06/30")],
            vec![s("客戶名稱"), s("名稱"), Data::Empty, Data::Empty, Data::Empty, s("貨號")],
            vec![s("W1"), s("華店"), Data::Empty, Data::Empty, Data::Empty, s("hn-1")],
            vec![s("W2"), s("恩店"), Data::Empty, Data::Empty, Data::Empty, s("hn-1")],
            vec![s("W3"), s("零店"), Data::Empty, Data::Empty, Data::Empty, s("hn-1")],
            vec![],
            header,
            qty_row("華恩特選", 5.0),
            qty_row("華恩特選", 0.0),
            qty_row("華恩特選", -2.0),
        ];
        let sheet = Sheet::new("銷售", rows);

        let records = paired_blocks(&sheet, &opts());
        let got: Vec<(&str, i64)> = records.iter().map(|r| (r.customer_code.as_str(), r.quantity)).collect();
        assert_eq!(got, vec![("W1", 5), ("W3", -2)]);
        assert_eq!(records[0].product_code, "HN-1");
        assert_eq!(records[0].product_name, "華恩特選");
        assert_eq!(records[0].date.as_deref(), Some("20250630"));
    }

    #[test]
    fn test_monthly_tabs_add_free_goods() {
        let sheet = Sheet::new(
            "11407",
            vec![
                vec![s("玄星")],
                vec![s("日期"), s("單號"), s("客戶編號"), s("客戶簡稱"), s("產品編號"), s("產品名稱"), s("銷量"), s("贈品")],
                vec![s("114/07/02"), s("X1"), s("C1"), s("甲"), s("P1"), s("酒"), n(5.0), n(1.0)],
                vec![s("114/07/03"), s("X2"), s("C2"), s("乙"), s("P1"), s("酒"), n(-2.0), Data::Empty],
                vec![s("合計"), Data::Empty, Data::Empty, Data::Empty, Data::Empty, Data::Empty, n(3.0)],
                vec![s("114/07/09"), s("X3"), s("C3"), s("丙"), s("P1"), s("酒"), n(7.0)],
            ],
        );
        let records = monthly_tabs(&sheet, &opts());
        let qty: Vec<i64> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![6, -2]);
        assert_eq!(records[0].date.as_deref(), Some("20250702"));
    }

    #[test]
    fn test_dated_rows() {
        let sheet = Sheet::new(
            "Sheet1",
            vec![
                vec![s("日期"), s("客戶"), s("名稱"), Data::Empty, s("品號"), s("品名"), s("數量")],
                vec![s("114/07/15"), s("M1"), s("明店"), Data::Empty, s("ab-7"), s("輝酒"), n(8.0)],
                vec![s("114/07/16"), s("M2"), Data::Empty, Data::Empty, s("ab-7"), s("輝酒"), n(1.0)],
            ],
        );
        let records = dated_rows(&sheet, &opts());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_code, "AB-7");
        assert_eq!(records[0].date.as_deref(), Some("20250715"));
    }
}
