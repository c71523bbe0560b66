// ==========================================
// 计量读数导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_config::{DecimalSeparator, ImportConfig};
use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 数值解析 =====

    /// 获取读数列的小数分隔符
    ///
    /// # 默认值
    /// - "."
    async fn get_decimal_separator(&self) -> ConfigResult<DecimalSeparator>;

    // ===== 日期解析 =====

    /// 获取按优先级排列的日期格式列表
    ///
    /// # 配置格式
    /// JSON 数组: ["%d/%m/%Y %H:%M", "%d/%m/%Y"]
    ///
    /// # 默认值
    /// - 与 day_first 对应的三种默认格式
    async fn get_date_formats(&self) -> ConfigResult<Vec<String>>;

    /// 日在前还是月在前
    ///
    /// # 默认值
    /// - true（01/02/2024 = 2024-02-01）
    async fn get_day_first(&self) -> ConfigResult<bool>;

    // ===== 文件读取 =====

    /// 获取文本文件列分隔符（None = 自动识别）
    async fn get_csv_delimiter(&self) -> ConfigResult<Option<u8>>;

    // ===== 报告与收尾 =====

    /// 获取报告中每类错误保留的示例条数
    ///
    /// # 默认值
    /// - 5
    async fn get_max_error_examples(&self) -> ConfigResult<usize>;

    /// 提交成功后是否清空暂存表
    ///
    /// # 默认值
    /// - true
    async fn get_purge_staging_on_success(&self) -> ConfigResult<bool>;

    /// 一次性组装完整导入配置
    async fn load_import_config(&self) -> ConfigResult<ImportConfig> {
        let day_first = self.get_day_first().await?;
        let date_formats = self.get_date_formats().await?;

        Ok(ImportConfig::default()
            .with_day_first(day_first)
            .with_date_formats(date_formats)
            .with_decimal_separator(self.get_decimal_separator().await?)
            .with_csv_delimiter(self.get_csv_delimiter().await?)
            .with_max_error_examples(self.get_max_error_examples().await?)
            .with_purge_staging_on_success(self.get_purge_staging_on_success().await?))
    }
}
