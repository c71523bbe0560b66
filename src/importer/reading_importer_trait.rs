// ==========================================
// 计量读数导入系统 - 读数导入 Trait
// ==========================================
// 职责: 定义导入接口（不包含实现）
// ==========================================

use crate::config::ImportConfig;
use crate::domain::ImportReport;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::TabularData;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// ReadingImporter Trait
// ==========================================
// 用途: 读数导入主接口
// 实现者: ReadingImporterImpl
#[async_trait]
pub trait ReadingImporter: Send + Sync {
    /// 使用已存储配置（config_kv）导入一个文件
    ///
    /// # 返回
    /// - Ok(ImportReport): 导入报告（行级错误已汇总在内）
    /// - Err: 输入级或运行级致命错误，读数表保持运行前状态
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 列定位与逐行规范化
    /// 3. 暂存（事务 a）
    /// 4. 设备解析 + 去重 + 提交（事务 b）
    /// 5. 报告汇总
    async fn import_file(&self, file_path: &Path) -> ImportResult<ImportReport>;

    /// 使用显式配置导入一个文件（调用方已合并命令行覆盖项）
    async fn import_file_with_config(
        &self,
        file_path: &Path,
        config: &ImportConfig,
    ) -> ImportResult<ImportReport>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 1）
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为表头 + 数据行
    ///
    /// # 返回
    /// - Ok(TabularData): 末尾空行已去除
    /// - Err: 文件不存在、格式不支持、读取或解析失败
    fn parse(&self, file_path: &Path) -> ImportResult<TabularData>;
}
