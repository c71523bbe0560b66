// ==========================================
// 计量读数导入系统 - 去重提交
// ==========================================
// 职责: 暂存读数 → 永久读数表（只追加）
// 规则（逐行，按顺序）:
// 1. 计量点未解析 → 跳过，计入 skipped_device_not_found
// 2. (时间, 设备) 已存在于读数表 → 跳过，计入 skipped_duplicate
// 3. 否则成为候选，并加入本批已见集合
// 4. 候选以 INSERT OR IGNORE 写入；存储层忽略的行只计数，不算失败
// ==========================================

use crate::domain::{Reading, ReadingKey, StagedReading};
use crate::importer::device_resolver::DeviceResolution;
use crate::importer::error::ImportResult;
use crate::repository::UnitOfWork;
use std::collections::HashSet;
use tracing::debug;

// ==========================================
// CommitPlan - 提交计划（纯计算）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitPlan {
    pub candidates: Vec<Reading>,
    pub skipped_device_not_found: Vec<StagedReading>,
    pub skipped_duplicate: usize,
}

/// 根据解析结果与已存在键生成提交计划
pub fn plan_commit(
    staged: &[StagedReading],
    resolution: &DeviceResolution,
    existing: &HashSet<ReadingKey>,
) -> CommitPlan {
    let mut plan = CommitPlan::default();
    let mut seen: HashSet<ReadingKey> = HashSet::with_capacity(staged.len());

    for row in staged {
        let Some(device_id) = resolution.device_id(&row.device_name) else {
            plan.skipped_device_not_found.push(row.clone());
            continue;
        };

        let reading = Reading {
            timestamp: row.timestamp,
            value: Some(row.value),
            device_id,
        };
        let key = reading.key();
        if existing.contains(&key) || !seen.insert(key) {
            plan.skipped_duplicate += 1;
            continue;
        }

        plan.candidates.push(reading);
    }

    plan
}

/// 提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub inserted: usize,
    pub ignored_by_storage: usize,
}

pub struct DeduplicatingCommitter;

impl DeduplicatingCommitter {
    /// 在给定工作单元内写入候选读数（不提交）
    ///
    /// 唯一键以外的约束违反（外键、触发器）返回 StorageConstraintViolation
    pub fn commit(uow: &UnitOfWork<'_>, plan: &CommitPlan, run_id: &str) -> ImportResult<CommitOutcome> {
        let inserted = uow.readings().insert_or_ignore(&plan.candidates, Some(run_id))?;
        let ignored_by_storage = plan.candidates.len().saturating_sub(inserted);
        debug!(
            candidates = plan.candidates.len(),
            inserted,
            ignored_by_storage,
            "读数写入完成"
        );

        Ok(CommitOutcome {
            inserted,
            ignored_by_storage,
        })
    }
}
