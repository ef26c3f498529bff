pub mod assembler;
pub mod code_normalizer;
pub mod date_normalizer;
pub mod distributors;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod models;
pub mod parsers;
pub mod workbook;
pub mod writer;

use anyhow::{Context, Result};
use assembler::{assemble, available_periods, filter_periods, Unmapped};
use error::TransformError;
use mapping::MappingBook;
use models::{AppConfig, PeriodFilter, ProcessResult};
use parsers::ParseOptions;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use workbook::Workbook;

const CONFIG_FILE: &str = "config.json";

/// 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("offtake")
        .join(CONFIG_FILE)
}

/// 加载配置，文件不存在或损坏时用默认值
pub fn load_config() -> AppConfig {
    let config_path = get_config_path();
    if config_path.exists() {
        if let Ok(content) = fs::read_to_string(&config_path) {
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("配置文件格式错误，使用默认值: {}", e),
            }
        }
    }
    AppConfig::default()
}

/// 保存配置
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = get_config_path();

    // 创建配置目录
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).context("创建配置目录失败")?;
    }

    let content = serde_json::to_string_pretty(config).map_err(TransformError::from)?;
    fs::write(&config_path, content)
        .with_context(|| format!("保存配置失败: {}", config_path.display()))?;

    Ok(())
}

/// 一次转换请求；未给的选项取自配置
#[derive(Debug, Clone, Default)]
pub struct TransformRequest {
    /// 经销商编号或名称
    pub distributor: String,
    pub raw_file: PathBuf,
    pub mapping_file: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub period: PeriodFilter,
    pub sheet_year: Option<i32>,
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(TransformError::InputMissing(path.display().to_string()).into());
    }
    Ok(())
}

fn lookup_distributor(key: &str) -> Result<&'static distributors::Descriptor> {
    distributors::find(key)
        .ok_or_else(|| TransformError::UnknownDistributor(key.to_string()).into())
}

/// 读取、解析、对照、写出
pub fn process(request: &TransformRequest, config: &AppConfig) -> Result<ProcessResult> {
    let descriptor = lookup_distributor(&request.distributor)?;
    require_file(&request.raw_file)?;
    require_file(&request.mapping_file)?;

    tracing::info!(
        "开始转换 {} ({})",
        descriptor.display_name(),
        request.raw_file.display()
    );

    let mapping_book = MappingBook::open(&request.mapping_file)
        .with_context(|| format!("读取对照表失败: {}", request.mapping_file.display()))?;
    let mapping = mapping_book.lookups_for(
        descriptor.id,
        descriptor.customer_scope,
        descriptor.sku_scope,
    )?;

    let workbook = Workbook::open(&request.raw_file)
        .with_context(|| format!("读取原始数据失败: {}", request.raw_file.display()))?;
    let options = ParseOptions {
        sheet_year: request.sheet_year.unwrap_or(config.sheet_year),
    };
    let report = descriptor.parse(&workbook, &options);

    let mut result = ProcessResult {
        success: false,
        message: String::new(),
        distributor: descriptor.display_name(),
        parsed_records: report.records.len(),
        output_records: 0,
        unmapped_customers: 0,
        unmapped_products: 0,
        sheets: report.sheets.clone(),
        output_path: None,
    };

    if report.is_empty() {
        tracing::warn!("{}: 没有解析到任何记录", descriptor.display_name());
        result.message = "没有解析到任何记录，请确认文件格式与所选经销商一致".to_string();
        return Ok(result);
    }

    let assembled = assemble(report.records, descriptor, &mapping);
    let records = filter_periods(assembled, &request.period);
    if records.is_empty() {
        tracing::warn!("期间 {} 没有记录", request.period.tag());
        result.message = format!("期间 {} 没有记录", request.period.tag());
        return Ok(result);
    }

    let output_dir = request
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    let output_file = output_dir.join(descriptor.output_file_name(&request.period));
    writer::write_output(&records, descriptor.output, &output_file)
        .with_context(|| format!("写出失败: {}", output_file.display()))?;

    let unmapped = Unmapped::count(&records);
    if unmapped.customers > 0 || unmapped.products > 0 {
        tracing::warn!("未对照: 客户 {} 条, SKU {} 条", unmapped.customers, unmapped.products);
    }

    result.success = true;
    result.output_records = records.len();
    result.unmapped_customers = unmapped.customers;
    result.unmapped_products = unmapped.products;
    result.message = format!("处理完成，共 {} 条", records.len());
    result.output_path = Some(output_file.display().to_string());
    Ok(result)
}

/// 原始数据中出现的 YYYYMM
pub fn periods(distributor: &str, raw_file: &Path, config: &AppConfig) -> Result<Vec<String>> {
    let descriptor = lookup_distributor(distributor)?;
    let workbook = Workbook::open(raw_file)
        .with_context(|| format!("读取原始数据失败: {}", raw_file.display()))?;
    let options = ParseOptions {
        sheet_year: config.sheet_year,
    };
    let report = descriptor.parse(&workbook, &options);
    Ok(available_periods(
        report.records.iter().map(|r| r.date.as_deref()),
    ))
}

/// 按行列列出原始单元格，用于排查版式
pub fn inspect(raw_file: &Path, sheet: Option<&str>, rows: usize) -> Result<String> {
    let workbook = Workbook::open(raw_file)
        .with_context(|| format!("无法打开文件: {}", raw_file.display()))?;

    let mut out = String::new();
    writeln!(out, "工作表列表: {:?}", workbook.sheet_names())?;

    let target = match sheet {
        Some(name) => workbook
            .sheet(name)
            .ok_or_else(|| TransformError::MissingSheet(name.to_string()))?,
        None => workbook
            .first()
            .ok_or_else(|| TransformError::MissingSheet("(第一个工作表)".to_string()))?,
    };

    writeln!(out, "\n{} 前 {} 行:", target.name, rows)?;
    for row in 0..rows.min(target.height()) {
        let cells: Vec<String> = target
            .row(row)
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, calamine::Data::Empty))
            .map(|(col, c)| format!("[{}] {:?}", col, c))
            .collect();
        writeln!(out, "行 {}: {}", row, cells.join("  "))?;
    }
    Ok(out)
}
