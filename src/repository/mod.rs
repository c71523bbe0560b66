// ==========================================
// 计量读数导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约束: 仓储借用 &Connection，事务边界由 UnitOfWork 决定
// ==========================================

pub mod device_repo;
pub mod error;
pub mod import_run_repo;
pub mod reading_repo;
pub mod session;
pub mod staging_repo;

// 重导出核心仓储
pub use device_repo::DeviceRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_run_repo::ImportRunRepository;
pub use reading_repo::ReadingRepository;
pub use session::UnitOfWork;
pub use staging_repo::{ClearStrategy, StagingRepository};
