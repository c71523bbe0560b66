// ==========================================
// 计量读数导入系统 - 核心库
// ==========================================
// 职责: 表格文件中的计量读数 → 暂存 → 核对 → 读数表
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

pub use api::{ApiError, ImportApi, ImportOverrides};
pub use config::{DecimalSeparator, ImportConfig};
pub use domain::{ImportOutcome, ImportReport, RejectionKind};
pub use importer::{ImportError, ReadingImporter, ReadingImporterImpl};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "计量读数导入系统";
