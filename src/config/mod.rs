// ==========================================
// 计量读数导入系统 - 配置层
// ==========================================
// 职责: 导入管道配置管理（默认值 < config_kv < 命令行）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;
pub mod import_config_trait;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use import_config::{DecimalSeparator, ImportConfig};
pub use import_config_trait::{ConfigResult, ImportConfigReader};
