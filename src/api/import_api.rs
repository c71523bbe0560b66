// ==========================================
// 计量读数导入系统 - 导入 API
// ==========================================
// 职责: 面向命令行/上层的统一入口
// 功能: 文件导入、消耗差值查询、导入运行记录、配置读写
// 约束: 配置优先级 默认值 < config_kv < 调用方覆盖
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager, DecimalSeparator, ImportConfig, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection, warn_on_schema_mismatch};
use crate::domain::{ConsumptionDelta, ImportReport, ImportRun};
use crate::i18n::t_with_args;
use crate::importer::{ReadingImporter, ReadingImporterImpl};
use crate::repository::{DeviceRepository, ImportRunRepository, ReadingRepository};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

// ==========================================
// ImportOverrides - 单次导入的配置覆盖
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ImportOverrides {
    pub decimal_separator: Option<DecimalSeparator>,
    pub date_formats: Vec<String>,
    pub month_first: bool,
    pub csv_delimiter: Option<u8>,
    pub keep_staging: bool,
}

impl ImportOverrides {
    /// 把覆盖项叠加到已加载的配置上
    pub fn apply(&self, mut config: ImportConfig) -> ImportConfig {
        if self.month_first {
            config = config.with_day_first(false);
        }
        if let Some(separator) = self.decimal_separator {
            config = config.with_decimal_separator(separator);
        }
        config = config.with_date_formats(self.date_formats.clone());
        if self.csv_delimiter.is_some() {
            config = config.with_csv_delimiter(self.csv_delimiter);
        }
        if self.keep_staging {
            config = config.with_purge_staging_on_success(false);
        }
        config
    }
}

/// 运行记录摘要（不含完整报告 JSON）
#[derive(Debug, Clone, Serialize)]
pub struct ImportRunSummary {
    pub run_id: String,
    pub file_name: Option<String>,
    pub started_at: String,
    pub total_rows: usize,
    pub rejected_rows: usize,
    pub staged_rows: usize,
    pub committed_rows: usize,
}

impl From<&ImportRun> for ImportRunSummary {
    fn from(run: &ImportRun) -> Self {
        Self {
            run_id: run.run_id.clone(),
            file_name: run.file_name.clone(),
            started_at: run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            total_rows: run.total_rows,
            rejected_rows: run.rejected_rows,
            staged_rows: run.staged_rows,
            committed_rows: run.committed_rows,
        }
    }
}

// ==========================================
// ImportApi - 导入API
// ==========================================
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
    config: ConfigManager,
    importer: ReadingImporterImpl<ConfigManager>,
}

impl ImportApi {
    /// 打开数据库文件并初始化 schema（幂等）
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        warn_on_schema_mismatch(&conn)?;
        info!(db_path, "数据库已就绪");
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 基于已有连接创建（schema 须已初始化）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let importer_config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        Ok(Self {
            importer: ReadingImporterImpl::new(conn.clone(), importer_config),
            conn,
            config,
        })
    }

    fn lock(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseError(format!("锁获取失败: {}", e)))
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 导入读数文件
    ///
    /// # 参数
    /// - file_path: 文件路径（.xlsx/.xls/.ods/.csv/.txt/.tsv）
    /// - overrides: 本次调用的配置覆盖
    pub async fn import_file(&self, file_path: &Path, overrides: &ImportOverrides) -> ApiResult<ImportReport> {
        let config = self
            .config
            .load_import_config()
            .await
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let config = overrides.apply(config);

        let report = self.importer.import_file_with_config(file_path, &config).await?;
        Ok(report)
    }

    /// 当前暂存表行数
    pub fn staged_count(&self) -> ApiResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM staging_reading", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 计量点最近的消耗差值（按时间倒序）
    pub fn consumption_deltas(&self, device_name: &str, limit: usize) -> ApiResult<Vec<ConsumptionDelta>> {
        let conn = self.lock()?;
        let device = DeviceRepository::new(&conn)
            .find_by_name(device_name)?
            .ok_or_else(|| {
                ApiError::NotFound(t_with_args("cli.device_not_found", &[("device", device_name)]))
            })?;

        Ok(ReadingRepository::new(&conn).consumption_deltas(device.id, limit)?)
    }

    /// 最近的导入运行记录
    pub fn recent_runs(&self, limit: usize) -> ApiResult<Vec<ImportRunSummary>> {
        let conn = self.lock()?;
        let runs = ImportRunRepository::new(&conn).recent(limit)?;
        Ok(runs.iter().map(ImportRunSummary::from).collect())
    }

    /// 按 run_id 取回完整报告
    pub fn run_report(&self, run_id: &str) -> ApiResult<ImportReport> {
        let conn = self.lock()?;
        let run = ImportRunRepository::new(&conn)
            .find_by_id(run_id)?
            .ok_or_else(|| ApiError::NotFound(format!("import_run(id={})不存在", run_id)))?;
        serde_json::from_str(&run.report_json).map_err(|e| ApiError::InternalError(e.to_string()))
    }

    // ==========================================
    // 配置
    // ==========================================

    /// 已存储的导入配置
    pub fn config_values(&self) -> ApiResult<BTreeMap<String, String>> {
        self.config
            .list_config_values()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// 写入导入配置
    ///
    /// 只接受 config_keys::ALL 中的键
    pub fn set_config_value(&self, key: &str, value: &str) -> ApiResult<()> {
        if !config_keys::ALL.contains(&key) {
            return Err(ApiError::InvalidInput(t_with_args(
                "cli.unknown_config_key",
                &[("key", key)],
            )));
        }
        self.config
            .set_config_value(key, value)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        info!(key, value, "配置已更新");
        Ok(())
    }
}
