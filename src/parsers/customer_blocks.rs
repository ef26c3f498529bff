//! 客户区块版式：客户行开启一个客户，其下为该客户的逐笔货品

use super::ParseOptions;
use crate::code_normalizer::clean_text;
use crate::date_normalizer::minguo_to_gregorian;
use crate::models::{ProductContext, TransactionRecord};
use crate::workbook::{quantity, Sheet};
use once_cell::sync::Lazy;
use regex::Regex;

static MINGUO_LEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}/\d{2}/\d{2}").expect("valid regex"));

static MINGUO_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}/\d{2}/\d{2}$").expect("valid regex"));

static NUMBERED_CUSTOMER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"客戶編號[:：]\s*([\d\-]+).*客戶名稱[:：]\s*(.*)").expect("valid regex")
});

static SHORT_NAME_CUSTOMER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"客戶簡稱[:：]\s*([A-Z0-9\-]+)\s+(.+?)(?:\s+電\s*話|$)").expect("valid regex")
});

static CODE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-]+$").expect("valid regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// 当前客户
#[derive(Debug, Clone, Default)]
struct Customer {
    code: String,
    name: String,
}

/// `客戶編號:123-4 ... 客戶名稱:某某`，明细从第 8 行开始
pub fn numbered_customers(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut customer: Option<Customer> = None;
    let mut date = None;

    for row in 7..sheet.height() {
        let first = sheet.str_at(row, 0).map(clean_text).unwrap_or_default();

        if first.contains("客戶名稱") {
            if let Some(caps) = NUMBERED_CUSTOMER.captures(&first) {
                customer = Some(Customer {
                    code: caps[1].trim().to_string(),
                    name: caps[2].trim().to_string(),
                });
            }
            continue;
        }

        if let Some(m) = MINGUO_LEAD.find(&first) {
            date = minguo_to_gregorian(m.as_str());
        }

        let product_code = sheet.text(row, 1);
        if product_code.is_empty() {
            continue;
        }
        let (Some(current), Some(qty)) = (&customer, quantity(sheet.cell(row, 3))) else {
            continue;
        };
        let product = ProductContext::new(product_code, sheet.text(row, 2));
        records.push(product.record(current.code.clone(), current.name.clone(), date.clone(), qty));
    }
    records
}

fn short_name_customer(line: &str) -> Option<Customer> {
    let collapsed = WHITESPACE.replace_all(&clean_text(line), " ").to_string();
    let caps = SHORT_NAME_CUSTOMER.captures(&collapsed)?;
    Some(Customer {
        code: caps[1].trim().to_string(),
        name: caps[2].trim().to_string(),
    })
}

/// 品名最后一个英数字片段作为货品代码
fn trailing_code(name: &str) -> String {
    name.split_whitespace()
        .last()
        .filter(|t| CODE_TOKEN.is_match(t))
        .unwrap_or_default()
        .to_string()
}

fn is_heading(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    matches!(compact.as_str(), "單據日期" | "合計" | "合計：" | "合計:")
}

/// `客戶簡稱: CODE 名稱 電話...` 客户行，日期行与货品行可在同一行
pub fn short_name_customers(sheet: &Sheet, _: &ParseOptions) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut customer = Customer::default();
    let mut date = None;

    for row in 0..sheet.height() {
        let first = sheet.text(row, 0);

        if sheet.str_at(row, 0).is_some() && first.starts_with("客戶簡稱") {
            if let Some(found) = short_name_customer(&first) {
                customer = found;
            }
            continue;
        }
        if is_heading(&first) {
            continue;
        }
        if MINGUO_ONLY.is_match(&first) {
            date = minguo_to_gregorian(&first);
        }

        let name = sheet.text(row, 2);
        if name.is_empty() {
            continue;
        }
        let Some(qty) = quantity(sheet.cell(row, 3)) else {
            continue;
        };
        let product = ProductContext::new(trailing_code(&name), name);
        let record = product
            .record(customer.code.clone(), customer.name.clone(), date.clone(), qty)
            .with_document(sheet.text(row, 1));
        records.push(record);
    }
    records
}
