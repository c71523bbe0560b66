// ==========================================
// 计量读数导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config::{default_date_formats, parse_delimiter, DecimalSeparator};
use crate::config::import_config_trait::{ConfigResult, ImportConfigReader};
use crate::domain::report::DEFAULT_MAX_EXAMPLES;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 列出 global scope 的全部配置
    pub fn list_config_values(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut values = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            values.insert(key, value);
        }
        Ok(values)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }
}

fn parse_bool(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "si" | "sí" => true,
        "false" | "0" | "no" => false,
        _ => default,
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
// 非法值只告警并回退默认值，不中断导入
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_decimal_separator(&self) -> ConfigResult<DecimalSeparator> {
        let value = self.get_config_or_default(config_keys::DECIMAL_SEPARATOR, ".")?;
        Ok(value.parse::<DecimalSeparator>().unwrap_or_else(|e| {
            tracing::warn!(
                config_key = config_keys::DECIMAL_SEPARATOR,
                raw_value = %value,
                "{}，使用默认值 '.'",
                e
            );
            DecimalSeparator::Dot
        }))
    }

    async fn get_date_formats(&self) -> ConfigResult<Vec<String>> {
        let day_first = self.get_day_first().await?;
        let Some(value) = self.get_config_value(config_keys::DATE_FORMATS)? else {
            return Ok(default_date_formats(day_first));
        };

        match serde_json::from_str::<Vec<String>>(&value) {
            Ok(formats) if !formats.is_empty() => Ok(formats),
            _ => {
                tracing::warn!(
                    config_key = config_keys::DATE_FORMATS,
                    raw_value = %value,
                    "日期格式配置格式错误，使用默认格式"
                );
                Ok(default_date_formats(day_first))
            }
        }
    }

    async fn get_day_first(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::DAY_FIRST, "true")?;
        Ok(parse_bool(&value, true))
    }

    async fn get_csv_delimiter(&self) -> ConfigResult<Option<u8>> {
        Ok(self
            .get_config_value(config_keys::CSV_DELIMITER)?
            .and_then(|raw| parse_delimiter(&raw)))
    }

    async fn get_max_error_examples(&self) -> ConfigResult<usize> {
        let default = DEFAULT_MAX_EXAMPLES.to_string();
        let value = self.get_config_or_default(config_keys::MAX_ERROR_EXAMPLES, &default)?;
        Ok(value.trim().parse::<usize>().unwrap_or(DEFAULT_MAX_EXAMPLES))
    }

    async fn get_purge_staging_on_success(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::PURGE_STAGING_ON_SUCCESS, "true")?;
        Ok(parse_bool(&value, true))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 数值与日期解析
    pub const DECIMAL_SEPARATOR: &str = "import.decimal_separator";
    pub const DATE_FORMATS: &str = "import.date_formats"; // JSON 数组
    pub const DAY_FIRST: &str = "import.day_first";

    // 文件读取
    pub const CSV_DELIMITER: &str = "import.csv_delimiter";

    // 报告与收尾
    pub const MAX_ERROR_EXAMPLES: &str = "import.max_error_examples";
    pub const PURGE_STAGING_ON_SUCCESS: &str = "import.purge_staging_on_success";

    /// 全部已知键（CLI 校验用）
    pub const ALL: [&str; 6] = [
        DECIMAL_SEPARATOR,
        DATE_FORMATS,
        DAY_FIRST,
        CSV_DELIMITER,
        MAX_ERROR_EXAMPLES,
        PURGE_STAGING_ON_SUCCESS,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::import_config::ImportConfig;

    fn manager() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_without_rows() {
        let config = manager().load_import_config().await.unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[tokio::test]
    async fn test_overrides_from_config_kv() {
        let manager = manager();
        manager.set_config_value(config_keys::DECIMAL_SEPARATOR, ",").unwrap();
        manager.set_config_value(config_keys::DAY_FIRST, "false").unwrap();
        manager.set_config_value(config_keys::CSV_DELIMITER, ";").unwrap();
        manager.set_config_value(config_keys::MAX_ERROR_EXAMPLES, "2").unwrap();
        manager
            .set_config_value(config_keys::PURGE_STAGING_ON_SUCCESS, "no")
            .unwrap();

        let config = manager.load_import_config().await.unwrap();
        assert_eq!(config.decimal_separator, DecimalSeparator::Comma);
        assert!(!config.day_first);
        assert_eq!(config.date_formats[0], "%m/%d/%Y %H:%M");
        assert_eq!(config.csv_delimiter, Some(b';'));
        assert_eq!(config.max_error_examples, 2);
        assert!(!config.purge_staging_on_success);
    }

    #[tokio::test]
    async fn test_invalid_values_fall_back() {
        let manager = manager();
        manager.set_config_value(config_keys::DECIMAL_SEPARATOR, "x").unwrap();
        manager.set_config_value(config_keys::DATE_FORMATS, "not json").unwrap();

        let config = manager.load_import_config().await.unwrap();
        assert_eq!(config.decimal_separator, DecimalSeparator::Dot);
        assert_eq!(config.date_formats, default_date_formats(true));
    }

    #[test]
    fn test_set_is_upsert() {
        let manager = manager();
        manager.set_config_value(config_keys::DAY_FIRST, "true").unwrap();
        manager.set_config_value(config_keys::DAY_FIRST, "false").unwrap();
        let values = manager.list_config_values().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get(config_keys::DAY_FIRST).map(String::as_str), Some("false"));
    }
}
