//! 客户 / SKU 对照表
//!
//! 同一来源代码对应两个以上不同目标值时整体剔除，不做任意取舍。

use crate::code_normalizer::{normalize_code, strip_float_suffix};
use crate::error::{TransformError, TransformResult};
use crate::workbook::{cell_text, Sheet, Workbook};
use calamine::Data;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

pub const CUSTOMER_SHEET: &str = "Customer Mapping";
pub const CUSTOMER_KEY: &str = "ASI_CRM_Offtake_Customer_No__c";
pub const CUSTOMER_VALUE: &str = "ASI_CRM_JDE_Cust_No_Formula__c";
pub const CUSTOMER_FILTER: &str = "ASI_CRM_Mapping_Cust_No__c";

pub const SKU_SHEET: &str = "SKU Mapping";
pub const SKU_KEY: &str = "ASI_CRM_Offtake_Product__c";
pub const SKU_VALUE: &str = "ASI_CRM_SKU_Code__c";
pub const SKU_FILTER: &str = "ASI_CRM_Mapping_Cust_Code__c";

/// 查表范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingScope {
    /// 只用整表
    Global,
    /// 只用本经销商的行
    FilteredOnly,
    /// 先本经销商，再整表
    FilteredThenGlobal,
}

/// 第一行为表头的对照表
#[derive(Debug, Clone)]
pub struct MappingTable {
    pub sheet: String,
    headers: Vec<String>,
    rows: Vec<Vec<Data>>,
}

impl MappingTable {
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let headers = sheet.row(0).iter().map(cell_text).collect();
        let rows = (1..sheet.height()).map(|r| sheet.row(r).to_vec()).collect();
        Self {
            sheet: sheet.name.clone(),
            headers,
            rows,
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, name: &str) -> TransformResult<usize> {
        self.column(name).ok_or_else(|| TransformError::MissingColumn {
            sheet: self.sheet.clone(),
            column: name.to_string(),
        })
    }

    fn value(row: &[Data], col: usize) -> String {
        row.get(col).map(cell_text).unwrap_or_default()
    }
}

/// 只保留唯一对应的键
pub fn unique_only<I>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut targets: HashMap<String, BTreeSet<String>> = HashMap::new();
    for (key, value) in pairs {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        targets.entry(key).or_default().insert(value);
    }

    targets
        .into_iter()
        .filter_map(|(key, values)| {
            if values.len() == 1 {
                values.into_iter().next().map(|v| (key, v))
            } else {
                None
            }
        })
        .collect()
}

/// 建立对照：`filter` 为 (筛选列, 经销商编号) 时只取该经销商的行
pub fn build_mapping(
    table: &MappingTable,
    key_column: &str,
    value_column: &str,
    filter: Option<(&str, &str)>,
) -> TransformResult<HashMap<String, String>> {
    let key_col = table.require(key_column)?;
    let value_col = table.require(value_column)?;

    let filter_col = match filter {
        Some((column, id)) => match table.column(column) {
            Some(col) => Some((col, id)),
            None => {
                tracing::warn!("{} 缺少筛选字段 {}，按未对照处理", table.sheet, column);
                return Ok(HashMap::new());
            }
        },
        None => None,
    };

    let pairs = table
        .rows
        .iter()
        .filter(|row| match filter_col {
            Some((col, id)) => strip_float_suffix(&MappingTable::value(row, col)) == id,
            None => true,
        })
        .map(|row| {
            (
                normalize_code(&MappingTable::value(row, key_col)),
                strip_float_suffix(&MappingTable::value(row, value_col)),
            )
        });

    Ok(unique_only(pairs))
}

/// 单张表的查找：先本经销商，后整表
#[derive(Debug, Clone, Default)]
pub struct CodeLookup {
    filtered: HashMap<String, String>,
    global: HashMap<String, String>,
}

impl CodeLookup {
    pub fn new(filtered: HashMap<String, String>, global: HashMap<String, String>) -> Self {
        Self { filtered, global }
    }

    fn build(
        table: &MappingTable,
        key: &str,
        value: &str,
        filter: &str,
        id: &str,
        scope: MappingScope,
    ) -> TransformResult<Self> {
        let filtered = match scope {
            MappingScope::Global => HashMap::new(),
            _ => build_mapping(table, key, value, Some((filter, id)))?,
        };
        let global = match scope {
            MappingScope::FilteredOnly => {
                // 仍检查字段是否齐全
                table.require(key)?;
                table.require(value)?;
                HashMap::new()
            }
            _ => build_mapping(table, key, value, None)?,
        };
        Ok(Self { filtered, global })
    }

    /// 按标准化后的代码查找
    pub fn resolve(&self, code: &str) -> Option<&str> {
        let key = normalize_code(code);
        self.filtered
            .get(&key)
            .or_else(|| self.global.get(&key))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.filtered.len() + self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 一次转换用到的两张对照
#[derive(Debug, Clone, Default)]
pub struct MappingTables {
    pub customers: CodeLookup,
    pub skus: CodeLookup,
}

/// 对照表文件
#[derive(Debug, Clone)]
pub struct MappingBook {
    customers: MappingTable,
    skus: MappingTable,
}

impl MappingBook {
    pub fn open(path: &Path) -> TransformResult<Self> {
        let workbook = Workbook::open(path)?;
        Self::from_workbook(&workbook)
    }

    /// 缺少 Customer Mapping 或 SKU Mapping 时报错
    pub fn from_workbook(workbook: &Workbook) -> TransformResult<Self> {
        let customers = workbook
            .sheet(CUSTOMER_SHEET)
            .ok_or_else(|| TransformError::MissingSheet(CUSTOMER_SHEET.to_string()))?;
        let skus = workbook
            .sheet(SKU_SHEET)
            .ok_or_else(|| TransformError::MissingSheet(SKU_SHEET.to_string()))?;

        Ok(Self {
            customers: MappingTable::from_sheet(customers),
            skus: MappingTable::from_sheet(skus),
        })
    }

    pub fn lookups_for(
        &self,
        distributor_id: &str,
        customer_scope: MappingScope,
        sku_scope: MappingScope,
    ) -> TransformResult<MappingTables> {
        let customers = CodeLookup::build(
            &self.customers,
            CUSTOMER_KEY,
            CUSTOMER_VALUE,
            CUSTOMER_FILTER,
            distributor_id,
            customer_scope,
        )?;
        let skus = CodeLookup::build(
            &self.skus,
            SKU_KEY,
            SKU_VALUE,
            SKU_FILTER,
            distributor_id,
            sku_scope,
        )?;

        tracing::info!(
            "对照表: 客户 {} 条, SKU {} 条 (经销商 {})",
            customers.len(),
            skus.len(),
            distributor_id
        );
        Ok(MappingTables { customers, skus })
    }
}
