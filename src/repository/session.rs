// ==========================================
// 计量读数导入系统 - 工作单元（存储会话）
// ==========================================
// 职责: 一次导入运行内的显式事务作用域
// 约束: 仓储视图只借用事务内连接，commit 之前一切写入可回滚
// 红线: 不使用隐式全局事务状态
// ==========================================

use crate::repository::device_repo::DeviceRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_run_repo::ImportRunRepository;
use crate::repository::reading_repo::ReadingRepository;
use crate::repository::staging_repo::StagingRepository;
use rusqlite::{Connection, Transaction, TransactionBehavior};

// ==========================================
// UnitOfWork - 工作单元
// ==========================================
// 丢弃（drop）未提交的 UnitOfWork 等同于回滚
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl<'c> UnitOfWork<'c> {
    /// 开启写事务（IMMEDIATE，尽早拿到写锁）
    pub fn begin(conn: &'c mut Connection) -> RepositoryResult<Self> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(Self { tx })
    }

    pub fn staging(&self) -> StagingRepository<'_> {
        StagingRepository::new(&self.tx)
    }

    pub fn devices(&self) -> DeviceRepository<'_> {
        DeviceRepository::new(&self.tx)
    }

    pub fn readings(&self) -> ReadingRepository<'_> {
        ReadingRepository::new(&self.tx)
    }

    pub fn runs(&self) -> ImportRunRepository<'_> {
        ImportRunRepository::new(&self.tx)
    }

    /// 提交事务
    pub fn commit(self) -> RepositoryResult<()> {
        self.tx
            .commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    /// 显式回滚
    pub fn rollback(self) -> RepositoryResult<()> {
        self.tx
            .rollback()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}
