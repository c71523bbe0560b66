// ==========================================
// 计量读数导入系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束: 约束违反按 SQLite 扩展错误码分类（唯一 / 外键 / 其他）
// ==========================================

use rusqlite::ffi;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 约束错误 =====
    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    #[error("约束违反: {0}")]
    ConstraintViolation(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 是否为存储层约束违反（唯一 / 外键 / 触发器 / CHECK 等）
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            RepositoryError::UniqueConstraintViolation(_)
                | RepositoryError::ForeignKeyViolation(_)
                | RepositoryError::ConstraintViolation(_)
        )
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let msg = msg.unwrap_or_else(|| code.to_string());
                match code.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        RepositoryError::UniqueConstraintViolation(msg)
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RepositoryError::ForeignKeyViolation(msg),
                    _ => RepositoryError::ConstraintViolation(msg),
                }
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) => RepositoryError::DatabaseQueryError(msg),
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
