//! 交易记录 → 输出记录：对照、补固定栏位、去重 / 汇总、排序

use crate::code_normalizer::normalize_code;
use crate::distributors::{DedupField, DedupRule, Descriptor, SortKey, UnmappedPolicy};
use crate::mapping::MappingTables;
use crate::models::{OutputRecord, PeriodFilter, TransactionRecord};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const RECORD_TYPE: &str = "INV";
pub const ACTION: &str = "U";

/// 未对照的输出行数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unmapped {
    /// 客户代码为空
    pub customers: usize,
    /// SKU 为空
    pub products: usize,
}

impl Unmapped {
    pub fn count(records: &[OutputRecord]) -> Self {
        Self {
            customers: records.iter().filter(|r| r.customer_code.is_empty()).count(),
            products: records.iter().filter(|r| r.prt_product_code.is_empty()).count(),
        }
    }
}

/// 合并同一单据的拆分行，数量相加后为 0 的丢弃
pub fn combine_split_lines(records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    let mut index: HashMap<[String; 6], usize> = HashMap::new();
    let mut combined: Vec<TransactionRecord> = Vec::new();

    for record in records {
        let key = [
            record.date.clone().unwrap_or_default(),
            record.document_number.clone().unwrap_or_default(),
            record.customer_code.clone(),
            record.customer_name.clone(),
            record.product_code.clone(),
            record.product_name.clone(),
        ];
        match index.get(&key) {
            Some(&i) => combined[i].quantity += record.quantity,
            None => {
                index.insert(key, combined.len());
                combined.push(record);
            }
        }
    }

    combined.retain(|r| r.quantity != 0);
    combined
}

fn to_output(
    record: TransactionRecord,
    descriptor: &Descriptor,
    mapping: &MappingTables,
) -> OutputRecord {
    let external_customer = normalize_code(&record.customer_code);
    let product_code = normalize_code(&record.product_code);

    let customer_code = match mapping.customers.resolve(&external_customer) {
        Some(code) => code.to_string(),
        None => match descriptor.unmapped {
            UnmappedPolicy::Blank => String::new(),
            UnmappedPolicy::KeepExternal => external_customer.clone(),
        },
    };
    let prt_product_code = mapping
        .skus
        .resolve(&product_code)
        .map(str::to_string)
        .unwrap_or_default();

    OutputRecord {
        record_type: RECORD_TYPE.to_string(),
        action: ACTION.to_string(),
        group_code: descriptor.id.to_string(),
        group_name: descriptor.group_name.to_string(),
        customer_code,
        customer_name: record.customer_name,
        date: record.date,
        prt_product_code,
        product_code,
        product_name: record.product_name,
        quantity: record.quantity,
        document_number: record.document_number,
        external_customer_code: external_customer,
        sheet: record.sheet,
    }
}

fn field_value(record: &OutputRecord, field: DedupField) -> String {
    match field {
        DedupField::GroupCode => record.group_code.clone(),
        DedupField::CustomerCode => record.customer_code.clone(),
        DedupField::CustomerKey => {
            if record.customer_code.is_empty() {
                record.external_customer_code.clone()
            } else {
                record.customer_code.clone()
            }
        }
        DedupField::CustomerName => record.customer_name.clone(),
        DedupField::Date => record.date.clone().unwrap_or_default(),
        DedupField::PrtProductCode => record.prt_product_code.clone(),
        DedupField::ProductCode => record.product_code.clone(),
        DedupField::ProductName => record.product_name.clone(),
        DedupField::Quantity => record.quantity.to_string(),
        DedupField::DocumentNumber => record.document_number.clone().unwrap_or_default(),
        DedupField::Sheet => record.sheet.clone(),
    }
}

/// 写出的全部栏位
fn row_key(record: &OutputRecord) -> Vec<String> {
    const ROW: [DedupField; 9] = [
        DedupField::GroupCode,
        DedupField::CustomerCode,
        DedupField::CustomerName,
        DedupField::Date,
        DedupField::PrtProductCode,
        DedupField::ProductCode,
        DedupField::ProductName,
        DedupField::Quantity,
        DedupField::DocumentNumber,
    ];
    ROW.iter().map(|&f| field_value(record, f)).collect()
}

fn key_of(record: &OutputRecord, fields: &[DedupField]) -> Vec<String> {
    fields.iter().map(|&f| field_value(record, f)).collect()
}

pub fn apply_dedup(records: Vec<OutputRecord>, rule: DedupRule) -> Vec<OutputRecord> {
    match rule {
        DedupRule::ExactRow => {
            let mut seen = HashSet::new();
            records.into_iter().filter(|r| seen.insert(row_key(r))).collect()
        }
        DedupRule::Keyed(fields) => {
            let mut seen = HashSet::new();
            records
                .into_iter()
                .filter(|r| seen.insert(key_of(r, fields)))
                .collect()
        }
        DedupRule::Aggregate(fields) => {
            let mut index: HashMap<Vec<String>, usize> = HashMap::new();
            let mut grouped: Vec<OutputRecord> = Vec::new();
            for record in records {
                let key = key_of(&record, fields);
                match index.get(&key) {
                    Some(&i) => grouped[i].quantity += record.quantity,
                    None => {
                        index.insert(key, grouped.len());
                        grouped.push(record);
                    }
                }
            }
            grouped.retain(|r| r.quantity != 0);
            grouped
        }
    }
}

/// 稳定排序；无日期的排在最后
pub fn sort_records(records: &mut [OutputRecord], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| match key {
                SortKey::Date => match (&a.date, &b.date) {
                    (Some(x), Some(y)) => x.cmp(y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                },
                SortKey::DocumentNumber => a.document_number.cmp(&b.document_number),
                SortKey::ProductCode => a.product_code.cmp(&b.product_code),
                SortKey::CustomerName => a.customer_name.cmp(&b.customer_name),
                SortKey::Sheet => a.sheet.cmp(&b.sheet),
            })
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

pub fn assemble(
    records: Vec<TransactionRecord>,
    descriptor: &Descriptor,
    mapping: &MappingTables,
) -> Vec<OutputRecord> {
    let parsed = records.len();
    let records = if descriptor.combine_split_lines {
        combine_split_lines(records)
    } else {
        records
    };

    let output: Vec<OutputRecord> = records
        .into_iter()
        .map(|r| to_output(r, descriptor, mapping))
        .collect();
    let mut output = apply_dedup(output, descriptor.dedup);
    sort_records(&mut output, descriptor.sort);

    tracing::info!("组装完成: {} 条解析记录 → {} 条输出", parsed, output.len());
    output
}

pub fn filter_periods(records: Vec<OutputRecord>, period: &PeriodFilter) -> Vec<OutputRecord> {
    records
        .into_iter()
        .filter(|r| period.accepts(r.date.as_deref()))
        .collect()
}

/// 记录中出现的 YYYYMM，已排序
pub fn available_periods<'a, I>(dates: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    dates
        .into_iter()
        .flatten()
        .filter_map(|d| d.get(..6))
        .filter(|p| p.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
