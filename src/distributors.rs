//! 经销商登记表
//!
//! 每个经销商一条声明：选哪些工作表、用哪种版式解析、对照范围、
//! 未对照时的处理、去重规则、输出栏位与文件名。

use crate::mapping::MappingScope;
use crate::models::PeriodFilter;
use crate::parsers::{
    customer_blocks, ledgers, parse_workbook, period_reports, Banner, BlockLayout, CodeShape, Col,
    HeaderRow, Layout, ParseOptions, ParseReport, QuantityCells, SheetSelector, TableDate,
    TableLayout,
};
use crate::workbook::{Sheet, Workbook};

/// 未对照客户代码的输出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedPolicy {
    Blank,
    /// 保留标准化后的经销商代码
    KeepExternal,
}

/// 去重 / 汇总键的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupField {
    GroupCode,
    CustomerCode,
    /// 对照后的客户代码，未对照时用经销商代码
    CustomerKey,
    CustomerName,
    Date,
    PrtProductCode,
    ProductCode,
    ProductName,
    Quantity,
    DocumentNumber,
    Sheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupRule {
    /// 所有输出栏位都相同才算重复
    ExactRow,
    /// 同键保留第一条
    Keyed(&'static [DedupField]),
    /// 同键数量相加
    Aggregate(&'static [DedupField]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    DocumentNumber,
    ProductCode,
    CustomerName,
    Sheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// 11 栏
    Standard,
    /// 11 栏 + 单据号码
    WithDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileName {
    /// `<id> transformation.xlsx`
    Spaced,
    /// `<id>_transformation.xlsx`
    Underscored,
    Fixed(&'static str),
    /// `<prefix>_<期间标记>.xlsx`
    Tagged(&'static str),
}

/// 经销商声明
pub struct Descriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub group_name: &'static str,
    pub sheets: SheetSelector,
    pub layout: Layout,
    pub customer_scope: MappingScope,
    pub sku_scope: MappingScope,
    pub unmapped: UnmappedPolicy,
    /// 对照前先合并同一单据的拆分行（如赠品行）
    pub combine_split_lines: bool,
    pub dedup: DedupRule,
    pub sort: &'static [SortKey],
    pub output: OutputLayout,
    pub file_name: FileName,
}

impl Descriptor {
    /// 全局对照、未对照留空、整行去重、标准栏位
    const fn base(
        id: &'static str,
        label: &'static str,
        group_name: &'static str,
        sheets: SheetSelector,
        layout: Layout,
    ) -> Self {
        Self {
            id,
            label,
            group_name,
            sheets,
            layout,
            customer_scope: MappingScope::Global,
            sku_scope: MappingScope::Global,
            unmapped: UnmappedPolicy::Blank,
            combine_split_lines: false,
            dedup: DedupRule::ExactRow,
            sort: &[],
            output: OutputLayout::Standard,
            file_name: FileName::Spaced,
        }
    }

    /// 先本经销商、后整表
    const fn preferring_own(self) -> Self {
        Self {
            customer_scope: MappingScope::FilteredThenGlobal,
            sku_scope: MappingScope::FilteredThenGlobal,
            ..self
        }
    }

    /// `<id> 名称`
    pub fn display_name(&self) -> String {
        format!("{} {}", self.id, self.label)
    }

    pub fn output_file_name(&self, period: &PeriodFilter) -> String {
        match self.file_name {
            FileName::Spaced => format!("{} transformation.xlsx", self.id),
            FileName::Underscored => format!("{}_transformation.xlsx", self.id),
            FileName::Fixed(name) => name.to_string(),
            FileName::Tagged(prefix) => format!("{}_{}.xlsx", prefix, period.tag()),
        }
    }

    pub fn parse(&self, workbook: &Workbook, options: &ParseOptions) -> ParseReport {
        parse_workbook(&self.sheets, &self.layout, workbook, options)
    }
}

/// 按编号或名称查找
pub fn find(key: &str) -> Option<&'static Descriptor> {
    let key = key.trim();
    REGISTRY
        .iter()
        .find(|d| d.id == key || d.label == key || d.display_name() == key)
}

// ===== 工作表名称规则 =====

fn digits(name: &str, len: usize) -> bool {
    name.chars().count() == len && name.chars().all(|c| c.is_ascii_digit())
}

/// 民国年月 `11407`
fn is_minguo_month_tab(name: &str) -> bool {
    digits(name, 5)
}

/// 公元年月 `202507`
fn is_month_tab(name: &str) -> bool {
    digits(name, 6)
}

/// 前 15 行中 A 栏含 `貨號`、C 栏含 `客戶` 的行，找不到时为第 4 行
fn product_first_header(sheet: &Sheet) -> usize {
    (0..15.min(sheet.height()))
        .find(|&r| sheet.text(r, 0).contains("貨號") && sheet.text(r, 2).contains("客戶"))
        .unwrap_or(3)
}

// ===== 常用去重键 =====

const STANDARD_KEY: &[DedupField] = &[
    DedupField::GroupCode,
    DedupField::CustomerCode,
    DedupField::Date,
    DedupField::ProductCode,
    DedupField::Quantity,
];

const DOCUMENT_KEY: &[DedupField] = &[
    DedupField::DocumentNumber,
    DedupField::CustomerCode,
    DedupField::Date,
    DedupField::ProductCode,
    DedupField::ProductName,
    DedupField::Quantity,
];

const CUSTOMER_KEY_WITH_DOCUMENT: &[DedupField] = &[
    DedupField::GroupCode,
    DedupField::CustomerKey,
    DedupField::Date,
    DedupField::ProductCode,
    DedupField::ProductName,
    DedupField::Quantity,
    DedupField::DocumentNumber,
];

/// 除数量外的全部标准栏位
const ALL_COLUMNS: &[DedupField] = &[
    DedupField::GroupCode,
    DedupField::CustomerCode,
    DedupField::CustomerName,
    DedupField::Date,
    DedupField::PrtProductCode,
    DedupField::ProductCode,
    DedupField::ProductName,
];

const ALL_COLUMNS_BY_SHEET: &[DedupField] = &[
    DedupField::GroupCode,
    DedupField::CustomerCode,
    DedupField::CustomerName,
    DedupField::Date,
    DedupField::PrtProductCode,
    DedupField::ProductCode,
    DedupField::ProductName,
    DedupField::Sheet,
];

const ALL_COLUMNS_BY_DOCUMENT: &[DedupField] = &[
    DedupField::GroupCode,
    DedupField::CustomerCode,
    DedupField::CustomerName,
    DedupField::Date,
    DedupField::PrtProductCode,
    DedupField::ProductCode,
    DedupField::ProductName,
    DedupField::DocumentNumber,
    DedupField::Sheet,
];

const DATE_PRODUCT_CUSTOMER: &[SortKey] = &[SortKey::Date, SortKey::ProductCode, SortKey::CustomerName];

// ===== 共用版式 =====

const WAREHOUSE_BLOCKS: BlockLayout = BlockLayout {
    banner: Banner::FixedCell {
        row: 4,
        col: 0,
        required: false,
    },
    customer_code_col: 0,
    customer_name_col: 1,
    require_name: true,
    code_shape: CodeShape::Any,
    quantity: QuantityCells::Column(3),
};

const ZHENTAI_BLOCKS: BlockLayout = BlockLayout {
    banner: Banner::FixedCell {
        row: 4,
        col: 0,
        required: true,
    },
    require_name: false,
    quantity: QuantityCells::Column(2),
    ..WAREHOUSE_BLOCKS
};

const OUTLET_ALIASES: &[(&str, &str)] = &[
    ("2024-05-01 00:00:00", "5月1日"),
    ("2024-07-01 00:00:00", "7月1日"),
    ("2024-07-02 00:00:00", "07-02"),
];

const OUTLET_TABLE: TableLayout = TableLayout {
    customer_aliases: OUTLET_ALIASES,
    ..TableLayout::new(
        Col::At(2),
        Col::At(3),
        Col::At(4),
        Col::At(5),
        Col::At(6),
        TableDate::Column(Col::At(1)),
    )
};

const BRANDED_CUSTOMERS: &[&str] = &["客戶"];

pub static REGISTRY: [Descriptor; 31] = [
    // ===== 货品区块 =====
    Descriptor::base(
        "30010010",
        "酒倉盛豐行",
        "酒倉 ON",
        SheetSelector::First,
        Layout::Blocks(WAREHOUSE_BLOCKS),
    ),
    Descriptor::base(
        "30010013",
        "酒田",
        "酒田 ON",
        SheetSelector::First,
        Layout::Blocks(BlockLayout {
            code_shape: CodeShape::LatinLead,
            quantity: QuantityCells::Column(5),
            ..WAREHOUSE_BLOCKS
        }),
    ),
    Descriptor {
        customer_scope: MappingScope::FilteredOnly,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "30010199",
            "振泰 OFF",
            "振泰 OFF",
            SheetSelector::All,
            Layout::Blocks(ZHENTAI_BLOCKS),
        )
    },
    Descriptor {
        customer_scope: MappingScope::FilteredOnly,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "30010176",
            "振泰 ON",
            "振泰 ON",
            SheetSelector::All,
            Layout::Blocks(ZHENTAI_BLOCKS),
        )
    },
    Descriptor {
        dedup: DedupRule::Keyed(STANDARD_KEY),
        ..Descriptor::base(
            "30010017",
            "正興(振興)",
            "正興(振興)",
            SheetSelector::Named("Sheet4"),
            Layout::Blocks(BlockLayout {
                banner: Banner::Inline { label: "貨單日期" },
                quantity: QuantityCells::Net {
                    sales: 2,
                    returns: 3,
                    total: 4,
                    prefer_total: false,
                },
                ..WAREHOUSE_BLOCKS
            }),
        )
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS),
        sort: &[SortKey::ProductCode, SortKey::CustomerName],
        file_name: FileName::Fixed("30010316_大倉捷_transformation.xlsx"),
        ..Descriptor::base(
            "30010316",
            "大倉捷",
            "大倉捷",
            SheetSelector::All,
            Layout::Blocks(BlockLayout {
                banner: Banner::Window {
                    label: "貨單日期",
                    rows: 12,
                    cols: 6,
                },
                code_shape: CodeShape::Alphanumeric,
                quantity: QuantityCells::Net {
                    sales: 2,
                    returns: 3,
                    total: 4,
                    prefer_total: true,
                },
                ..WAREHOUSE_BLOCKS
            }),
        )
        .preferring_own()
    },
    // ===== 表头明细 =====
    Descriptor {
        customer_scope: MappingScope::FilteredOnly,
        ..Descriptor::base(
            "30010085",
            "宏酒樽(夜)",
            "宏酒樽 ON",
            SheetSelector::FirstContaining("夜"),
            Layout::Table(OUTLET_TABLE),
        )
    },
    Descriptor {
        customer_scope: MappingScope::FilteredOnly,
        ..Descriptor::base(
            "30010203",
            "宏酒樽(日)",
            "宏酒樽 OFF",
            SheetSelector::FirstContaining("日"),
            Layout::Table(OUTLET_TABLE),
        )
    },
    Descriptor {
        customer_scope: MappingScope::FilteredOnly,
        sku_scope: MappingScope::FilteredOnly,
        dedup: DedupRule::Keyed(STANDARD_KEY),
        ..Descriptor::base(
            "30010031",
            "廣茂隆(八條)",
            "廣茂隆(八條)",
            SheetSelector::First,
            Layout::Table(TableLayout::new(
                Col::Named("客戶"),
                Col::Named("客戶名稱"),
                Col::Named("品號"),
                Col::Named("品名規格"),
                Col::Named("銷量"),
                TableDate::SheetDayRange,
            )),
        )
    },
    Descriptor {
        unmapped: UnmappedPolicy::KeepExternal,
        dedup: DedupRule::Keyed(STANDARD_KEY),
        ..Descriptor::base(
            "30020027",
            "榮好(實儀)",
            "榮好(實儀)",
            SheetSelector::First,
            Layout::Table(TableLayout {
                fill_down_customer: true,
                ..TableLayout::new(
                    Col::Named("客戶代碼"),
                    Col::Named("客戶名稱"),
                    Col::Named("產品代號"),
                    Col::Named("品名規格"),
                    Col::Named("銷量"),
                    TableDate::SheetDateRange,
                )
            }),
        )
        .preferring_own()
    },
    Descriptor {
        unmapped: UnmappedPolicy::KeepExternal,
        dedup: DedupRule::Keyed(STANDARD_KEY),
        ..Descriptor::base(
            "30020180",
            "暐倫 OFF",
            "暐倫 OFF",
            SheetSelector::First,
            Layout::Table(TableLayout {
                document: Some(Col::Named("銷貨單號")),
                ..TableLayout::new(
                    Col::Named("客戶代號"),
                    Col::Named("客戶名稱"),
                    Col::Named("產品編號"),
                    Col::Named("產品名稱"),
                    Col::Named("數量"),
                    TableDate::Column(Col::Named("銷貨日期")),
                )
            }),
        )
        .preferring_own()
    },
    Descriptor {
        unmapped: UnmappedPolicy::KeepExternal,
        dedup: DedupRule::Keyed(STANDARD_KEY),
        ..Descriptor::base(
            "30020016",
            "日嵩",
            "日嵩",
            SheetSelector::First,
            Layout::Table(TableLayout {
                header: HeaderRow::Detect(product_first_header),
                skip_customers: BRANDED_CUSTOMERS,
                fold_product_code: true,
                ..TableLayout::new(
                    Col::At(2),
                    Col::At(3),
                    Col::At(0),
                    Col::At(1),
                    Col::At(7),
                    TableDate::BannerRow(2),
                )
            }),
        )
        .preferring_own()
    },
    // ===== 自定义解析 =====
    Descriptor::base(
        "30010061",
        "向日葵",
        "向日葵",
        SheetSelector::First,
        Layout::Custom(customer_blocks::numbered_customers),
    ),
    Descriptor {
        file_name: FileName::Fixed("processed_30010059.xlsx"),
        ..Descriptor::base(
            "30010059",
            "誠邦有限公司",
            "誠邦有限公司",
            SheetSelector::First,
            Layout::Custom(ledgers::bracketed_products),
        )
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "30010315",
            "圳程",
            "圳程有限公司",
            SheetSelector::First,
            Layout::Custom(ledgers::named_ledger),
        )
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "30030088",
            "九久",
            "九久",
            SheetSelector::First,
            Layout::Custom(ledgers::inventory_ledger),
        )
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "30020145",
            "鏵錡",
            "任我行",
            SheetSelector::All,
            Layout::Custom(ledgers::cover_product),
        )
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "30030094",
            "和易 ON",
            "和易 ON",
            SheetSelector::Named("Page 1"),
            Layout::Custom(ledgers::stock_ledger_sales),
        )
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        file_name: FileName::Underscored,
        ..Descriptor::base(
            "33001422",
            "和易 OFF",
            "和易 OFF",
            SheetSelector::Named("Page 1"),
            Layout::Custom(ledgers::stock_ledger_with_returns),
        )
    },
    Descriptor {
        dedup: DedupRule::Keyed(STANDARD_KEY),
        file_name: FileName::Tagged("30020203_玄星OFF"),
        ..Descriptor::base(
            "30020203",
            "玄星 OFF",
            "玄星 OFF",
            SheetSelector::Matching(is_minguo_month_tab),
            Layout::Custom(period_reports::monthly_tabs),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Keyed(CUSTOMER_KEY_WITH_DOCUMENT),
        ..Descriptor::base(
            "30020216",
            "久悅貿易",
            "久悅貿易",
            SheetSelector::FirstMatchingOrFirst(is_month_tab),
            Layout::Custom(customer_blocks::short_name_customers),
        )
        .preferring_own()
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        combine_split_lines: true,
        dedup: DedupRule::Keyed(DOCUMENT_KEY),
        ..Descriptor::base(
            "30030061",
            "合歡 OFF",
            "合歡 OFF",
            SheetSelector::First,
            Layout::Custom(ledgers::product_number_blocks),
        )
        .preferring_own()
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        combine_split_lines: true,
        dedup: DedupRule::Keyed(DOCUMENT_KEY),
        file_name: FileName::Tagged("30030076_裕陞"),
        ..Descriptor::base(
            "30030076",
            "裕陞(分月)",
            "裕陞",
            SheetSelector::All,
            Layout::Custom(ledgers::numeric_product_grid),
        )
        .preferring_own()
    },
    Descriptor {
        output: OutputLayout::WithDocument,
        combine_split_lines: true,
        sort: &[SortKey::Date, SortKey::DocumentNumber],
        file_name: FileName::Fixed("30010008_利多吉_transformation.xlsx"),
        ..Descriptor::base(
            "30010008",
            "利多吉",
            "利多吉",
            SheetSelector::All,
            Layout::Custom(ledgers::range_product_grid),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS),
        file_name: FileName::Fixed("30010154_亨玖_transformation.xlsx"),
        ..Descriptor::base(
            "30010154",
            "亨玖",
            "亨玖",
            SheetSelector::All,
            Layout::Custom(period_reports::monthly_product_customers),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS_BY_SHEET),
        sort: &[SortKey::Sheet, SortKey::ProductCode, SortKey::CustomerName],
        file_name: FileName::Fixed("30010185_瑞星翰德_夜點_transformation.xlsx"),
        ..Descriptor::base(
            "30010185",
            "瑞星翰德(夜點)",
            "瑞星翰德(夜點)",
            SheetSelector::All,
            Layout::Custom(period_reports::interval_report),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS_BY_DOCUMENT),
        sort: &[
            SortKey::Date,
            SortKey::ProductCode,
            SortKey::CustomerName,
            SortKey::DocumentNumber,
        ],
        file_name: FileName::Fixed("30020076_酒國英豪_transformation.xlsx"),
        ..Descriptor::base(
            "30020076",
            "酒國英豪",
            "酒國英豪",
            SheetSelector::All,
            Layout::Custom(ledgers::labelled_product_tables),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS),
        sort: DATE_PRODUCT_CUSTOMER,
        file_name: FileName::Fixed("30030021_合歡ON_transformation.xlsx"),
        ..Descriptor::base(
            "30030021",
            "合歡 ON",
            "合歡 ON",
            SheetSelector::All,
            Layout::Custom(ledgers::product_number_details),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS_BY_DOCUMENT),
        sort: &[
            SortKey::Date,
            SortKey::ProductCode,
            SortKey::CustomerName,
            SortKey::DocumentNumber,
        ],
        file_name: FileName::Fixed("30030083_東瀛_transformation.xlsx"),
        ..Descriptor::base(
            "30030083",
            "東瀛",
            "東瀛",
            SheetSelector::All,
            Layout::Custom(ledgers::labelled_product_rows),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS),
        sort: DATE_PRODUCT_CUSTOMER,
        file_name: FileName::Fixed("30030084_華恩_transformation.xlsx"),
        ..Descriptor::base(
            "30030084",
            "華恩",
            "華恩",
            SheetSelector::NamedOrFirst("銷售"),
            Layout::Custom(period_reports::paired_blocks),
        )
        .preferring_own()
    },
    Descriptor {
        dedup: DedupRule::Aggregate(ALL_COLUMNS),
        sort: DATE_PRODUCT_CUSTOMER,
        file_name: FileName::Fixed("30030106_明輝_transformation.xlsx"),
        ..Descriptor::base(
            "30030106",
            "明輝",
            "明輝",
            SheetSelector::Named("Sheet1"),
            Layout::Custom(period_reports::dated_rows),
        )
        .preferring_own()
    },
];
