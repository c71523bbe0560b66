// ==========================================
// 计量读数导入系统 - 暂存加载
// ==========================================
// 职责: 清空暂存表后批量写入规范化后的候选行
// 约束: 清空失败 → 整个运行中止，且发生在任何插入之前
// 约束: 文件内重复 (时间, 计量点) 以第一次出现为准
// ==========================================

use crate::domain::StagedReading;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::{ClearStrategy, UnitOfWork};
use tracing::{debug, error};

/// 暂存结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagingOutcome {
    pub strategy: ClearStrategy,
    pub attempted: usize,
    pub staged: usize,
}

impl StagingOutcome {
    /// 文件内重复被丢弃的行数
    pub fn in_file_duplicates(&self) -> usize {
        self.attempted.saturating_sub(self.staged)
    }
}

pub struct StagingLoader;

impl StagingLoader {
    /// 在给定工作单元内清空并写入暂存表（不提交）
    pub fn load(uow: &UnitOfWork<'_>, candidates: &[StagedReading]) -> ImportResult<StagingOutcome> {
        let staging = uow.staging();

        let strategy = staging.clear().map_err(|e| {
            error!(error = %e, "暂存表清空失败");
            ImportError::StagingClearFailed(e.to_string())
        })?;

        let staged = staging.insert_all(candidates)?;
        debug!(
            ?strategy,
            attempted = candidates.len(),
            staged,
            "暂存写入完成"
        );

        Ok(StagingOutcome {
            strategy,
            attempted: candidates.len(),
            staged,
        })
    }
}
