// ==========================================
// 计量读数导入系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、导入报告
// 红线: 不含数据访问逻辑
// ==========================================

pub mod reading;
pub mod report;
pub mod types;

// 重导出核心类型
pub use reading::{ConsumptionDelta, Device, RawRecord, Reading, ReadingKey, StagedReading};
pub use report::{ImportReport, ImportReportBuilder, ImportRun, RowRejection};
pub use types::{DeviceId, ImportOutcome, RejectionKind};
