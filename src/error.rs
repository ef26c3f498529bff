// ==========================================
// 经销商出货转换 - 错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 转换流程错误类型
#[derive(Error, Debug)]
pub enum TransformError {
    // ===== 输入文件 =====
    #[error("输入文件不存在: {0}")]
    InputMissing(String),

    #[error("无法打开文件 {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("无法读取工作表 {sheet}: {message}")]
    SheetRead { sheet: String, message: String },

    // ===== 对照表 =====
    #[error("对照表缺少工作表: {0}")]
    MissingSheet(String),

    #[error("工作表 {sheet} 缺少字段: {column}")]
    MissingColumn { sheet: String, column: String },

    // ===== 选择 =====
    #[error("未知的经销商: {0}")]
    UnknownDistributor(String),

    // ===== 输出 =====
    #[error("写入 Excel 失败: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置格式错误: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TransformResult<T> = Result<T, TransformError>;
