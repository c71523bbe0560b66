// ==========================================
// 计量读数导入系统 - 基础类型
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 设备主键
pub type DeviceId = i64;

/// 行级拒绝原因分类
///
/// 行级错误只计入报告，不中断批次
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    MalformedRow,
    MissingDevice,
    InvalidValue,
    InvalidDate,
}

impl RejectionKind {
    /// 全部分类（报告按此顺序输出）
    pub const ALL: [RejectionKind; 4] = [
        RejectionKind::MalformedRow,
        RejectionKind::MissingDevice,
        RejectionKind::InvalidValue,
        RejectionKind::InvalidDate,
    ];

    /// i18n 键
    pub fn i18n_key(&self) -> &'static str {
        match self {
            RejectionKind::MalformedRow => "report.kind.malformed_row",
            RejectionKind::MissingDevice => "report.kind.missing_device",
            RejectionKind::InvalidValue => "report.kind.invalid_value",
            RejectionKind::InvalidDate => "report.kind.invalid_date",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionKind::MalformedRow => "MalformedRow",
            RejectionKind::MissingDevice => "MissingDevice",
            RejectionKind::InvalidValue => "InvalidValue",
            RejectionKind::InvalidDate => "InvalidDate",
        };
        f.write_str(s)
    }
}

/// 导入结果分类
///
/// 部分成功不能被报告为全部成功，反之亦然
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportOutcome {
    /// 文件中所有行均已写入读数表
    Complete,
    /// 部分行写入，部分行被拒绝或跳过
    Partial,
    /// 没有任何新读数写入
    NothingCommitted,
}

impl ImportOutcome {
    pub fn classify(total_rows: usize, committed: usize) -> Self {
        if committed == 0 {
            ImportOutcome::NothingCommitted
        } else if committed >= total_rows {
            ImportOutcome::Complete
        } else {
            ImportOutcome::Partial
        }
    }

    pub fn i18n_key(&self) -> &'static str {
        match self {
            ImportOutcome::Complete => "report.outcome.complete",
            ImportOutcome::Partial => "report.outcome.partial",
            ImportOutcome::NothingCommitted => "report.outcome.nothing_committed",
        }
    }
}
