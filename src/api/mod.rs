// ==========================================
// 计量读数导入系统 - API 层
// ==========================================
// 职责: 对外提供导入、查询、配置接口
// 红线: API 层只做编排与错误收敛，不含解析/核对逻辑
// ==========================================

pub mod error;
pub mod import_api;

// 重导出
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportOverrides, ImportRunSummary};
