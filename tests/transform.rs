use calamine::{open_workbook_auto, Data, Reader};
use offtake_lib::error::TransformError;
use offtake_lib::mapping::{
    CUSTOMER_FILTER, CUSTOMER_KEY, CUSTOMER_SHEET, CUSTOMER_VALUE, SKU_KEY, SKU_SHEET, SKU_VALUE,
};
use offtake_lib::models::{AppConfig, PeriodFilter};
use offtake_lib::{logging, periods, process, TransformRequest};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

enum Cell {
    T(&'static str),
    N(f64),
    Blank,
}

use Cell::{Blank, N, T};

fn write_book(path: &Path, sheets: &[(&str, Vec<Vec<Cell>>)]) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    for (name, rows) in sheets {
        let sheet = workbook.add_worksheet().set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    T(text) => {
                        sheet.write_string(r as u32, c as u16, *text).unwrap();
                    }
                    N(value) => {
                        sheet.write_number(r as u32, c as u16, *value).unwrap();
                    }
                    Blank => {}
                }
            }
        }
    }
    workbook.save(path).unwrap();
}

fn mapping_file(dir: &TempDir, filter: &'static str) -> PathBuf {
    let path = dir.path().join("mapping.xlsx");
    write_book(
        &path,
        &[
            (
                CUSTOMER_SHEET,
                vec![
                    vec![T(CUSTOMER_KEY), T(CUSTOMER_VALUE), T(CUSTOMER_FILTER)],
                    vec![T("C100"), T("J500"), T(filter)],
                    vec![T("C200"), T("J600"), T(filter)],
                ],
            ),
            (
                SKU_SHEET,
                vec![vec![T(SKU_KEY), T(SKU_VALUE)], vec![T("X01"), T("S900")]],
            ),
        ],
    );
    path
}

/// A5 为报表日期；数量同时放在 C、D 两栏
fn product_block_sheet(banner: &'static str, customer: &'static str, qty: f64) -> Vec<Vec<Cell>> {
    vec![
        vec![T("出貨明細表")],
        vec![],
        vec![],
        vec![],
        vec![T(banner)],
        vec![T("客戶編號"), T("客戶名稱"), T("日期"), T("數量")],
        vec![T("貨品編號:X01 Widget")],
        vec![T(customer), T("CustA"), N(qty), N(qty)],
        vec![T("小計"), Blank, N(qty), N(qty)],
    ]
}

fn request(dir: &TempDir, distributor: &str, raw: PathBuf, mapping: PathBuf) -> TransformRequest {
    TransformRequest {
        distributor: distributor.to_string(),
        raw_file: raw,
        mapping_file: mapping,
        output_dir: Some(dir.path().join("out")),
        period: PeriodFilter::All,
        sheet_year: None,
    }
}

fn read_rows(path: &Path) -> Vec<Vec<Data>> {
    let mut book = open_workbook_auto(path).unwrap();
    let range = book.worksheet_range_at(0).unwrap().unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

fn text(value: &str) -> Data {
    Data::String(value.to_string())
}

#[test]
fn test_product_block_end_to_end() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.xlsx");
    write_book(
        &raw,
        &[("Sheet1", product_block_sheet("貨單日期: 114/07/01 至 114/07/12", "C100", 5.0))],
    );
    let mapping = mapping_file(&dir, "30010010");

    let result = process(&request(&dir, "30010010", raw, mapping), &AppConfig::default()).unwrap();
    assert!(result.success);
    assert_eq!(result.parsed_records, 1);
    assert_eq!(result.output_records, 1);
    assert_eq!(result.unmapped_customers, 0);

    let output = PathBuf::from(result.output_path.unwrap());
    assert!(output.ends_with("30010010 transformation.xlsx"));
    let rows = read_rows(&output);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        vec![
            text("INV"),
            text("U"),
            text("30010010"),
            text("酒倉 ON"),
            text("J500"),
            text("CustA"),
            text("20250712"),
            text("S900"),
            text("X01"),
            text("Widget"),
            Data::Float(5.0),
        ]
    );
}

#[test]
fn test_multi_sheet_union_and_period_filter() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.xlsx");
    write_book(
        &raw,
        &[
            ("六月", product_block_sheet("114/06/01 至 114/06/30", "C100", 4.0)),
            ("空白", vec![vec![T("備註")]]),
            ("七月", product_block_sheet("114/07/01 至 114/07/31", "C200", -2.0)),
        ],
    );
    let mapping = mapping_file(&dir, "30010199");

    let mut req = request(&dir, "30010199", raw.clone(), mapping);
    let result = process(&req, &AppConfig::default()).unwrap();
    assert!(result.success);
    assert_eq!(result.output_records, 2);
    let sheet_counts: Vec<(String, usize)> = result
        .sheets
        .iter()
        .map(|s| (s.sheet.clone(), s.records))
        .collect();
    assert_eq!(
        sheet_counts,
        vec![("六月".into(), 1), ("空白".into(), 0), ("七月".into(), 1)]
    );

    let found = periods("30010199", &raw, &AppConfig::default()).unwrap();
    assert_eq!(found, vec!["202506", "202507"]);

    req.period = PeriodFilter::Months(vec!["202507".into()]);
    let result = process(&req, &AppConfig::default()).unwrap();
    assert_eq!(result.output_records, 1);
    let output = PathBuf::from(result.output_path.unwrap());
    assert!(output.ends_with("30010199_transformation.xlsx"));
    let rows = read_rows(&output);
    assert_eq!(rows[0][4], text("J600"));
    assert_eq!(rows[0][10], Data::Float(-2.0));
}

#[test]
fn test_missing_mapping_sheet_is_fatal() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.xlsx");
    write_book(
        &raw,
        &[("Sheet1", product_block_sheet("114/07/01 至 114/07/12", "C100", 5.0))],
    );
    let mapping = dir.path().join("mapping.xlsx");
    write_book(
        &mapping,
        &[(
            CUSTOMER_SHEET,
            vec![vec![T(CUSTOMER_KEY), T(CUSTOMER_VALUE), T(CUSTOMER_FILTER)]],
        )],
    );

    let err = process(&request(&dir, "30010010", raw, mapping), &AppConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransformError>(),
        Some(TransformError::MissingSheet(name)) if name == SKU_SHEET
    ));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_unrecognized_layout_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw.xlsx");
    write_book(&raw, &[("Sheet1", vec![vec![T("完全不同的報表")], vec![N(1.0)]])]);
    let mapping = mapping_file(&dir, "30010010");

    let result = process(&request(&dir, "30010010", raw, mapping), &AppConfig::default()).unwrap();
    assert!(!result.success);
    assert_eq!(result.output_path, None);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_missing_input_and_unknown_distributor() {
    let dir = TempDir::new().unwrap();
    let mapping = mapping_file(&dir, "30010010");

    let missing = request(&dir, "30010010", dir.path().join("nope.xlsx"), mapping.clone());
    let err = process(&missing, &AppConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransformError>(),
        Some(TransformError::InputMissing(_))
    ));

    let unknown = request(&dir, "12345678", mapping.clone(), mapping);
    let err = process(&unknown, &AppConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransformError>(),
        Some(TransformError::UnknownDistributor(_))
    ));
}
