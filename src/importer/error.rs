// ==========================================
// 计量读数导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层:
// - RowError: 行级错误，只累加进报告，不中断批次
// - ImportError: 输入级 / 运行级致命错误，立即中止
// ==========================================

use crate::domain::{RejectionKind, RowRejection};
use crate::i18n::t_with_args;
use crate::repository::RepositoryError;
use thiserror::Error;

// ==========================================
// RowError - 行级错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("行格式错误 (行 {row}): 空行或不足三列")]
    MalformedRow { row: usize, value: String },

    #[error("计量点缺失 (行 {row})")]
    MissingDevice { row: usize },

    #[error("读数无效 (行 {row}): {value}")]
    InvalidValue { row: usize, value: String },

    #[error("日期无法识别 (行 {row}): {value}")]
    InvalidDate { row: usize, value: String },
}

impl RowError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            RowError::MalformedRow { .. } => RejectionKind::MalformedRow,
            RowError::MissingDevice { .. } => RejectionKind::MissingDevice,
            RowError::InvalidValue { .. } => RejectionKind::InvalidValue,
            RowError::InvalidDate { .. } => RejectionKind::InvalidDate,
        }
    }

    pub fn row(&self) -> usize {
        match self {
            RowError::MalformedRow { row, .. }
            | RowError::MissingDevice { row }
            | RowError::InvalidValue { row, .. }
            | RowError::InvalidDate { row, .. } => *row,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RowError::MalformedRow { value, .. }
            | RowError::InvalidValue { value, .. }
            | RowError::InvalidDate { value, .. } => value,
            RowError::MissingDevice { .. } => "",
        }
    }

    /// 转为报告用的拒绝记录（消息按当前语言本地化）
    pub fn to_rejection(&self) -> RowRejection {
        let key = match self.kind() {
            RejectionKind::MalformedRow => "row.malformed_row",
            RejectionKind::MissingDevice => "row.missing_device",
            RejectionKind::InvalidValue => "row.invalid_value",
            RejectionKind::InvalidDate => "row.invalid_date",
        };
        let row = self.row().to_string();
        RowRejection {
            row_number: self.row(),
            kind: self.kind(),
            value: self.value().to_string(),
            message: t_with_args(key, &[("row", &row), ("value", self.value())]),
        }
    }
}

// ==========================================
// ImportError - 致命错误
// ==========================================
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（输入级） =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.ods/.csv/.txt/.tsv）")]
    UnsupportedFileFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("文件没有数据行")]
    EmptyFile,

    #[error("缺少必需列: {missing:?}（必需: {required:?}）")]
    MissingRequiredColumns {
        missing: Vec<String>,
        required: Vec<String>,
    },

    // ===== 运行级错误 =====
    #[error("暂存表清空失败，导入已中止: {0}")]
    StagingClearFailed(String),

    #[error("存储约束违反，提交阶段已回滚: {0}")]
    StorageConstraintViolation(String),

    #[error("数据库操作失败: {0}")]
    DatabaseError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>（经仓储层分类）
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            e if e.is_constraint_violation() => ImportError::StorageConstraintViolation(e.to_string()),
            RepositoryError::LockError(msg) => ImportError::LockError(msg),
            e => ImportError::DatabaseError(e.to_string()),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
