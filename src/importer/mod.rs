// ==========================================
// 计量读数导入系统 - 导入层
// ==========================================
// 职责: 表格文件 → 暂存 → 核对 → 永久读数表
// 支持: Excel (.xlsx/.xls/.ods), 文本 (.csv/.txt/.tsv)
// ==========================================

// 模块声明
pub mod column_layout;
pub mod date_resolver;
pub mod deduplicating_committer;
pub mod device_resolver;
pub mod error;
pub mod file_parser;
pub mod reading_importer_impl;
pub mod reading_importer_trait;
pub mod row_normalizer;
pub mod staging_loader;

// 重导出核心类型
pub use column_layout::{ColumnLayout, REQUIRED_COLUMNS};
pub use date_resolver::DateResolver;
pub use deduplicating_committer::{plan_commit, CommitOutcome, CommitPlan, DeduplicatingCommitter};
pub use device_resolver::{DeviceResolution, DeviceResolver};
pub use error::{ImportError, ImportResult, RowError};
pub use file_parser::{CsvParser, ExcelParser, TabularData, TabularRow, UniversalFileParser};
pub use reading_importer_impl::ReadingImporterImpl;
pub use row_normalizer::{parse_value, RowNormalizer};
pub use staging_loader::{StagingLoader, StagingOutcome};

// 重导出 Trait 接口
pub use reading_importer_trait::{FileParser, ReadingImporter};
