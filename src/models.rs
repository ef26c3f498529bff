use serde::{Deserialize, Serialize};

/// 解析得到的交易记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// 经销商的客户代码（原始）
    pub customer_code: String,
    /// 客户名称
    pub customer_name: String,
    /// YYYYMMDD，无法解析时为 None
    pub date: Option<String>,
    /// 货品代码
    pub product_code: String,
    /// 货品名称
    pub product_name: String,
    /// 数量，负数表示退货；不会为 0
    pub quantity: i64,
    /// 单据号码
    pub document_number: Option<String>,
    /// 来源工作表
    #[serde(default)]
    pub sheet: String,
}

/// 当前货品上下文，在同一工作表内随行传递
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductContext {
    pub code: String,
    pub name: String,
}

impl ProductContext {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// 用当前货品生成一条记录
    pub fn record(
        &self,
        customer_code: impl Into<String>,
        customer_name: impl Into<String>,
        date: Option<String>,
        quantity: i64,
    ) -> TransactionRecord {
        TransactionRecord {
            customer_code: customer_code.into(),
            customer_name: customer_name.into(),
            date,
            product_code: self.code.clone(),
            product_name: self.name.clone(),
            quantity,
            document_number: None,
            sheet: String::new(),
        }
    }
}

impl TransactionRecord {
    pub fn with_document(mut self, document_number: impl Into<String>) -> Self {
        let doc = document_number.into();
        self.document_number = (!doc.is_empty()).then_some(doc);
        self
    }
}

/// 输出记录，列顺序即写出顺序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub record_type: String,
    pub action: String,
    pub group_code: String,
    pub group_name: String,
    /// 对照后的客户代码，可能为空
    pub customer_code: String,
    pub customer_name: String,
    pub date: Option<String>,
    /// 对照后的 SKU，可能为空
    pub prt_product_code: String,
    /// 原货品代码（已标准化）
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub document_number: Option<String>,
    /// 去重键会用到，不写出
    #[serde(skip)]
    pub external_customer_code: String,
    #[serde(skip)]
    pub sheet: String,
}

/// 输出期间筛选（按日期前 6 位 YYYYMM）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PeriodFilter {
    #[default]
    All,
    Months(Vec<String>),
}

impl PeriodFilter {
    pub fn from_months(months: Vec<String>) -> Self {
        let months: Vec<String> = months
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && !m.eq_ignore_ascii_case("all"))
            .collect();
        if months.is_empty() {
            Self::All
        } else {
            Self::Months(months)
        }
    }

    pub fn accepts(&self, date: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Months(months) => date
                .and_then(|d| d.get(..6))
                .is_some_and(|period| months.iter().any(|m| m == period)),
        }
    }

    /// 文件名标记：all_months / 202507 / 202506_202507
    pub fn tag(&self) -> String {
        match self {
            Self::All => "all_months".to_string(),
            Self::Months(months) => {
                let mut sorted = months.clone();
                sorted.sort();
                sorted.dedup();
                sorted.join("_")
            }
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 输出目录
    pub output_dir: String,
    /// 工作表名只有月日时使用的年份
    pub sheet_year: i32,
    /// 上次处理的经销商
    #[serde(default)]
    pub last_distributor: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            sheet_year: 2025,
            last_distributor: None,
        }
    }
}

/// 单个工作表的解析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub records: usize,
}

/// 处理结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    pub message: String,
    pub distributor: String,
    pub parsed_records: usize,
    pub output_records: usize,
    pub unmapped_customers: usize,
    pub unmapped_products: usize,
    pub sheets: Vec<SheetSummary>,
    pub output_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_filter_accepts_by_month() {
        let filter = PeriodFilter::from_months(vec!["202507".to_string()]);
        assert!(filter.accepts(Some("20250731")));
        assert!(!filter.accepts(Some("20250630")));
        assert!(!filter.accepts(None));
        assert!(PeriodFilter::All.accepts(None));
    }

    #[test]
    fn test_period_filter_all_keyword() {
        assert_eq!(PeriodFilter::from_months(vec!["all".to_string()]), PeriodFilter::All);
        assert_eq!(PeriodFilter::from_months(vec![]), PeriodFilter::All);
    }

    #[test]
    fn test_period_tag() {
        assert_eq!(PeriodFilter::All.tag(), "all_months");
        let filter = PeriodFilter::Months(vec!["202507".into(), "202506".into()]);
        assert_eq!(filter.tag(), "202506_202507");
    }

    #[test]
    fn test_config_roundtrip_with_missing_field() {
        let config: AppConfig =
            serde_json::from_str(r#"{"output_dir":"out","sheet_year":2024}"#).unwrap();
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.last_distributor, None);
    }

    #[test]
    fn test_with_document_ignores_blank() {
        let ctx = ProductContext::new("X01", "Widget");
        let record = ctx.record("C1", "Cust", None, 1).with_document("");
        assert_eq!(record.document_number, None);
        let record = ctx.record("C1", "Cust", None, 1).with_document("SO-1");
        assert_eq!(record.document_number.as_deref(), Some("SO-1"));
    }
}
