use crate::distributors::OutputLayout;
use crate::error::TransformResult;
use crate::models::OutputRecord;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

/// 数量所在列
pub const QUANTITY_COLUMN: u16 = 10;

/// 文字栏位，顺序即写出顺序
fn text_columns(record: &OutputRecord) -> [&str; 10] {
    [
        record.record_type.as_str(),
        record.action.as_str(),
        record.group_code.as_str(),
        record.group_name.as_str(),
        record.customer_code.as_str(),
        record.customer_name.as_str(),
        record.date.as_deref().unwrap_or_default(),
        record.prt_product_code.as_str(),
        record.product_code.as_str(),
        record.product_name.as_str(),
    ]
}

/// 空白栏位不写，保持空格
fn write_text(sheet: &mut Worksheet, row: u32, col: u16, text: &str) -> TransformResult<()> {
    if !text.is_empty() {
        sheet.write_string(row, col, text)?;
    }
    Ok(())
}

/// 写出结果：无表头、无索引
pub fn write_output(
    records: &[OutputRecord],
    layout: OutputLayout,
    output_file: &Path,
) -> TransformResult<()> {
    if let Some(dir) = output_file.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    // 代码栏位稍宽
    sheet.set_column_width(3, 16)?;
    sheet.set_column_width(5, 24)?;
    sheet.set_column_width(9, 32)?;

    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32;
        for (col, text) in text_columns(record).iter().enumerate() {
            write_text(sheet, row, col as u16, text)?;
        }
        sheet.write_number(row, QUANTITY_COLUMN, record.quantity as f64)?;
        if layout == OutputLayout::WithDocument {
            let doc = record.document_number.as_deref().unwrap_or_default();
            write_text(sheet, row, QUANTITY_COLUMN + 1, doc)?;
        }
    }

    workbook.save(output_file)?;
    tracing::info!("已写出 {} 条 → {}", records.len(), output_file.display());
    Ok(())
}
