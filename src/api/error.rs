// ==========================================
// 计量读数导入系统 - API层错误类型
// ==========================================
// 职责: 把导入层 / 仓储层错误收敛为面向用户的单条消息
// 约束: 每个致命错误只产生一条本地化消息
// ==========================================

use crate::i18n::{t, t_with_args};
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入级错误
    // ==========================================
    #[error("文件格式不支持: {0}")]
    UnsupportedFileFormat(String),

    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件没有数据行")]
    EmptyFile,

    #[error("缺少必需列: {missing:?}")]
    MissingRequiredColumns {
        missing: Vec<String>,
        required: Vec<String>,
    },

    // ==========================================
    // 运行级错误
    // ==========================================
    #[error("暂存表清空失败: {0}")]
    StagingClearFailed(String),

    #[error("存储约束违反: {0}")]
    StorageConstraintViolation(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 面向用户的本地化消息
    pub fn localized_message(&self) -> String {
        match self {
            ApiError::UnsupportedFileFormat(detail) => {
                t_with_args("api.error.unsupported_format", &[("detail", detail)])
            }
            ApiError::FileNotFound(detail) => {
                t_with_args("api.error.file_not_found", &[("detail", detail)])
            }
            ApiError::FileReadError(detail) => {
                t_with_args("api.error.read_failed", &[("detail", detail)])
            }
            ApiError::EmptyFile => t("api.error.empty_file"),
            ApiError::MissingRequiredColumns { missing, required } => t_with_args(
                "api.error.missing_columns",
                &[("missing", &missing.join(", ")), ("required", &required.join(", "))],
            ),
            ApiError::StagingClearFailed(detail) => {
                t_with_args("api.error.staging_clear_failed", &[("detail", detail)])
            }
            ApiError::StorageConstraintViolation(detail) => {
                t_with_args("api.error.storage_constraint", &[("detail", detail)])
            }
            ApiError::DatabaseError(detail) => {
                t_with_args("api.error.database", &[("detail", detail)])
            }
            // 调用方已给出本地化文本
            ApiError::InvalidInput(msg) | ApiError::NotFound(msg) => msg.clone(),
            ApiError::InternalError(detail) => {
                t_with_args("api.error.internal", &[("detail", detail)])
            }
            ApiError::Other(err) => t_with_args("api.error.internal", &[("detail", &err.to_string())]),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::FileNotFound(path),
            ImportError::UnsupportedFileFormat(ext) => ApiError::UnsupportedFileFormat(ext),
            ImportError::FileReadError(msg)
            | ImportError::CsvParseError(msg)
            | ImportError::ExcelParseError(msg) => ApiError::FileReadError(msg),
            ImportError::EmptyFile => ApiError::EmptyFile,
            ImportError::MissingRequiredColumns { missing, required } => {
                ApiError::MissingRequiredColumns { missing, required }
            }
            ImportError::StagingClearFailed(msg) => ApiError::StagingClearFailed(msg),
            ImportError::StorageConstraintViolation(msg) => ApiError::StorageConstraintViolation(msg),
            ImportError::DatabaseError(msg) | ImportError::LockError(msg) => ApiError::DatabaseError(msg),
            ImportError::ConfigError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
            e if e.is_constraint_violation() => ApiError::StorageConstraintViolation(e.to_string()),
            e => ApiError::DatabaseError(e.to_string()),
        }
    }
}

// 从 rusqlite::Error 转换（经仓储层分类）
impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
