//! 货品区块版式：`貨品編號` 行开启一个货品，其下每行一个客户

use super::{is_total_line, labelled_product};
use crate::date_normalizer::normalize_date_text;
use crate::models::{ProductContext, TransactionRecord};
use crate::workbook::{quantity_from, Sheet};

/// 报表日期来源
#[derive(Debug, Clone, Copy)]
pub enum Banner {
    /// 固定单元格；`required` 时该格为空则跳过整张表
    FixedCell {
        row: usize,
        col: usize,
        required: bool,
    },
    /// 第一列中含 `label` 与「至」的行，出现时更新日期
    Inline { label: &'static str },
    /// 在左上角窗口内查找含 `label` 的日期区间，找不到则跳过整张表
    Window {
        label: &'static str,
        rows: usize,
        cols: usize,
    },
}

/// 客户代码形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeShape {
    Any,
    /// 以大写英文字母开头
    LatinLead,
    /// 仅英数字与 `-`
    Alphanumeric,
}

impl CodeShape {
    fn accepts(&self, code: &str) -> bool {
        match self {
            Self::Any => true,
            Self::LatinLead => code.chars().next().is_some_and(|c| c.is_ascii_uppercase()),
            Self::Alphanumeric => code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'),
        }
    }
}

/// 数量取法
#[derive(Debug, Clone, Copy)]
pub enum QuantityCells {
    Column(usize),
    /// 销货减退货；`prefer_total` 时合计栏为数字则直接用合计，否则净额为 0 时才用合计
    Net {
        sales: usize,
        returns: usize,
        total: usize,
        prefer_total: bool,
    },
}

impl QuantityCells {
    fn read(&self, sheet: &Sheet, row: usize) -> Option<f64> {
        match *self {
            Self::Column(col) => sheet.number(row, col),
            Self::Net {
                sales,
                returns,
                total,
                prefer_total,
            } => {
                let s = sheet.number(row, sales);
                let r = sheet.number(row, returns);
                let t = sheet.number(row, total);
                if prefer_total {
                    if t.is_some() {
                        return t;
                    }
                    if s.is_none() && r.is_none() {
                        return None;
                    }
                    return Some(s.unwrap_or(0.0) - r.unwrap_or(0.0));
                }
                if s.is_none() && r.is_none() && t.is_none() {
                    return None;
                }
                let net = s.unwrap_or(0.0) - r.unwrap_or(0.0);
                if net.trunc() != 0.0 {
                    Some(net)
                } else {
                    t
                }
            }
        }
    }
}

/// 货品区块版式的声明
#[derive(Debug, Clone, Copy)]
pub struct BlockLayout {
    pub banner: Banner,
    pub customer_code_col: usize,
    pub customer_name_col: usize,
    pub require_name: bool,
    pub code_shape: CodeShape,
    pub quantity: QuantityCells,
}

/// 逐行折叠的状态
#[derive(Default)]
struct BlockState {
    product: Option<ProductContext>,
    date: Option<String>,
    records: Vec<TransactionRecord>,
    dropped: usize,
}

impl BlockLayout {
    /// 外层 None 表示整张表不符合版式
    fn banner_date(&self, sheet: &Sheet) -> Option<Option<String>> {
        match self.banner {
            Banner::FixedCell { row, col, required } => {
                let text = sheet.text(row, col);
                if text.is_empty() && required {
                    return None;
                }
                Some(normalize_date_text(&text))
            }
            Banner::Inline { .. } => Some(None),
            Banner::Window { label, rows, cols } => {
                for r in 0..rows.min(sheet.height()) {
                    for c in 0..cols {
                        let text = sheet.text(r, c);
                        if text.contains(label) && text.contains('至') {
                            if let Some(date) = normalize_date_text(&text) {
                                return Some(Some(date));
                            }
                        }
                    }
                }
                None
            }
        }
    }

    fn step(&self, sheet: &Sheet, mut state: BlockState, row: usize) -> BlockState {
        let first = sheet.text(row, 0);

        if let Banner::Inline { label } = self.banner {
            if first.contains(label) && first.contains('至') {
                if let Some(date) = normalize_date_text(&first) {
                    state.date = Some(date);
                }
                return state;
            }
        }

        if first.contains("貨品編號") {
            if let Some(product) = labelled_product(&first) {
                state.product = Some(product);
            }
            return state;
        }

        let code = sheet.text(row, self.customer_code_col);
        let name = sheet.text(row, self.customer_name_col);
        if is_total_line(&first) || is_total_line(&code) || is_total_line(&name) {
            return state;
        }

        let Some(product) = &state.product else {
            return state;
        };
        if code.is_empty() || (self.require_name && name.is_empty()) || !self.code_shape.accepts(&code) {
            return state;
        }

        match self.quantity.read(sheet, row).and_then(quantity_from) {
            Some(qty) => {
                let record = product.record(code, name, state.date.clone(), qty);
                state.records.push(record);
            }
            None => state.dropped += 1,
        }
        state
    }

    pub fn parse(&self, sheet: &Sheet) -> Vec<TransactionRecord> {
        let Some(date) = self.banner_date(sheet) else {
            tracing::debug!("{}: 没有报表日期，跳过", sheet.name);
            return Vec::new();
        };

        let initial = BlockState {
            date,
            ..BlockState::default()
        };
        let state = (0..sheet.height()).fold(initial, |state, row| self.step(sheet, state, row));

        if state.dropped > 0 {
            tracing::debug!("{}: 丢弃 {} 行无数量的明细", sheet.name, state.dropped);
        }
        state.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::test_support::{blank_rows, n, s};
    use calamine::Data;

    fn warehouse_layout() -> BlockLayout {
        BlockLayout {
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
        }
    }

    fn generic_sheet() -> Sheet {
        let mut rows = blank_rows(4);
        rows.push(vec![s("貨單日期: 114/07/01 至 114/07/12")]);
        rows.push(vec![s("客戶編號"), s("客戶名稱"), s("日期"), s("數量")]);
        rows.push(vec![s("C099"), s("Early"), Data::Empty, n(9.0)]);
        rows.push(vec![s("貨品編號:X01 Widget")]);
        rows.push(vec![s("C100"), s("CustA"), n(120725.0), n(5.0)]);
        rows.push(vec![s("小計"), s(""), s(""), n(5.0)]);
        Sheet::new("Sheet1", rows)
    }

    #[test]
    fn test_product_block_emits_one_record_per_detail() {
        let records = warehouse_layout().parse(&generic_sheet());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.customer_code, "C100");
        assert_eq!(r.customer_name, "CustA");
        assert_eq!(r.product_code, "X01");
        assert_eq!(r.product_name, "Widget");
        assert_eq!(r.quantity, 5);
        assert_eq!(r.date.as_deref(), Some("20250712"));
    }

    #[test]
    fn test_required_banner_skips_sheet() {
        let layout = BlockLayout {
            banner: Banner::FixedCell {
                row: 4,
                col: 0,
                required: true,
            },
            ..warehouse_layout()
        };
        let sheet = Sheet::new(
            "Sheet2",
            vec![vec![s("貨品編號:X01 Widget")], vec![s("C100"), s("CustA"), s(""), n(5.0)]],
        );
        assert!(layout.parse(&sheet).is_empty());
    }

    #[test]
    fn test_latin_lead_customer_shape() {
        let layout = BlockLayout {
            code_shape: CodeShape::LatinLead,
            ..warehouse_layout()
        };
        let sheet = Sheet::new(
            "S",
            vec![
                vec![s("貨品編號:X01 貨品名稱:Widget")],
                vec![s("A01"), s("甲"), s(""), n(2.0)],
                vec![s("123"), s("乙"), s(""), n(3.0)],
            ],
        );
        let records = layout.parse(&sheet);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].customer_code, "A01");
        assert_eq!(records[0].date, None);
    }

    #[test]
    fn test_net_quantity_falls_back_to_total() {
        let layout = BlockLayout {
            banner: Banner::Inline { label: "貨單日期" },
            quantity: QuantityCells::Net {
                sales: 2,
                returns: 3,
                total: 4,
                prefer_total: false,
            },
            ..warehouse_layout()
        };
        let sheet = Sheet::new(
            "Sheet4",
            vec![
                vec![s("貨單日期:114/07/01 至 114/07/31")],
                vec![s("貨品編號:A1 貨品名稱:威士忌")],
                vec![s("C1"), s("甲"), n(10.0), n(2.0), n(8.0)],
                vec![s("C2"), s("乙"), n(3.0), n(3.0), n(4.0)],
                vec![s("C3"), s("丙"), n(0.0), n(0.0), n(0.0)],
                vec![s("C4"), s("丁"), n(1.0), n(4.0), Data::Empty],
            ],
        );
        let records = layout.parse(&sheet);
        let qty: Vec<i64> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![8, 4, -3]);
        assert!(records.iter().all(|r| r.date.as_deref() == Some("20250731")));
    }

    #[test]
    fn test_window_banner_and_prefer_total() {
        let layout = BlockLayout {
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
            ..warehouse_layout()
        };
        let sheet = Sheet::new(
            "七月",
            vec![
                vec![Data::Empty, Data::Empty, s("貨單日期:114/07/01 至 114/07/31")],
                vec![s("貨品編號:B2 金門高粱")],
                vec![s("客戶編號"), s("客戶名稱"), s("銷貨"), s("退貨"), s("合計")],
                vec![s("K-1"), s("甲店"), n(5.0), n(1.0), n(4.0)],
                vec![s("K-2"), s("乙店"), n(5.0), n(1.0), s("")],
                vec![s("總計"), s(""), n(10.0), n(2.0), n(8.0)],
            ],
        );
        let records = layout.parse(&sheet);
        let qty: Vec<i64> = records.iter().map(|r| r.quantity).collect();
        assert_eq!(qty, vec![4, 4]);

        let no_banner = Sheet::new("說明", vec![vec![s("貨品編號:B2 金門高粱")]]);
        assert!(layout.parse(&no_banner).is_empty());
    }
}
