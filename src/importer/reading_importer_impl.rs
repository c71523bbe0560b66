// ==========================================
// 计量读数导入系统 - 读数导入器实现
// ==========================================
// 职责: 整合导入流程，从文件到读数表
// 流程: 解析 → 列定位 → 规范化 → 暂存（事务 a）→ 解析设备 → 去重 → 提交（事务 b）→ 报告
// 约束: 整个运行持有连接锁，同一进程内的运行串行执行
// 约束: 事务 b 失败整体回滚，暂存表保留本次数据供排查
// ==========================================

use crate::config::{ImportConfig, ImportConfigReader};
use crate::domain::{ImportReport, ImportReportBuilder, ImportRun, StagedReading};
use crate::i18n::t_with_args;
use crate::importer::column_layout::ColumnLayout;
use crate::importer::deduplicating_committer::{plan_commit, DeduplicatingCommitter};
use crate::importer::device_resolver::DeviceResolver;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::reading_importer_trait::{FileParser, ReadingImporter};
use crate::importer::row_normalizer::RowNormalizer;
use crate::importer::staging_loader::StagingLoader;
use crate::repository::UnitOfWork;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

fn run_record(report: &ImportReport) -> ImportResult<ImportRun> {
    ImportRun::from_report(report).map_err(|e| ImportError::Other(e.into()))
}

fn device_not_found_example(row: &StagedReading) -> String {
    let date = row.timestamp.format("%d/%m/%Y %H:%M").to_string();
    t_with_args(
        "row.device_not_found",
        &[("device", &row.device_name), ("date", &date)],
    )
}

// ==========================================
// ReadingImporterImpl - 读数导入器实现
// ==========================================
pub struct ReadingImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 数据库连接（整个运行期间持锁）
    conn: Arc<Mutex<Connection>>,

    // 配置读取器
    config: C,
}

impl<C> ReadingImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建新的 ReadingImporter 实例
    ///
    /// # 参数
    /// - conn: 共享数据库连接（schema 已初始化）
    /// - config: 配置读取器
    pub fn new(conn: Arc<Mutex<Connection>>, config: C) -> Self {
        Self { conn, config }
    }

    /// 同步执行一次完整导入
    ///
    /// 不含 await，连接锁不会跨越挂起点
    fn run_pipeline(&self, file_path: &Path, config: &ImportConfig) -> ImportResult<ImportReport> {
        let run_id = Uuid::new_v4().to_string();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        let mut report = ImportReportBuilder::new(run_id.clone(), file_name, config.max_error_examples);

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let data = UniversalFileParser::new(config.csv_delimiter).parse(file_path)?;
        if data.rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        report.record_total_rows(data.rows.len());

        // === 步骤 2: 列定位 ===
        let layout = ColumnLayout::resolve(&data.headers, config.decimal_separator)?;
        info!(total_rows = data.rows.len(), "文件解析完成");

        // === 步骤 3: 逐行规范化 ===
        debug!("步骤 3: 逐行规范化");
        let normalizer = RowNormalizer::new(config);
        let mut candidates = Vec::with_capacity(data.rows.len());
        for row in &data.rows {
            match layout.to_record(row).and_then(|record| normalizer.normalize(&record)) {
                Ok(staged) => candidates.push(staged),
                Err(e) => {
                    debug!(row_number = e.row(), kind = %e.kind(), error = %e, "行被拒绝");
                    report.record_rejection(e.to_rejection());
                }
            }
        }
        info!(
            valid = candidates.len(),
            rejected = data.rows.len() - candidates.len(),
            "规范化完成"
        );

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;

        // === 步骤 4: 暂存（事务 a） ===
        debug!("步骤 4: 暂存");
        let uow = UnitOfWork::begin(&mut conn)?;
        let staging = StagingLoader::load(&uow, &candidates)?;
        uow.commit()?;
        report.record_staging(staging.attempted, staging.staged);
        if staging.in_file_duplicates() > 0 {
            warn!(duplicates = staging.in_file_duplicates(), "文件内存在重复的 (时间, 计量点)，保留第一条");
        }
        info!(strategy = ?staging.strategy, staged = staging.staged, "暂存完成");

        // === 步骤 5: 设备解析 + 去重 + 提交（事务 b） ===
        debug!("步骤 5: 设备解析与提交");
        let uow = UnitOfWork::begin(&mut conn)?;
        let staged = uow.staging().load_all()?;
        let names = uow.staging().distinct_device_names()?;

        let resolution = DeviceResolver::resolve(&uow, &names)?;
        if !resolution.not_found.is_empty() {
            warn!(devices = ?resolution.not_found, "计量点不存在，相关读数将被跳过");
        }
        report.record_resolution(resolution.distinct_names(), resolution.not_found.clone());

        let existing = uow
            .readings()
            .existing_keys_for_devices(&resolution.device_ids())?;
        let plan = plan_commit(&staged, &resolution, &existing);
        for row in &plan.skipped_device_not_found {
            report.record_device_not_found(device_not_found_example(row));
        }

        // 运行记录先于读数写入（读数外键引用 run_id）
        uow.runs().insert(&run_record(&report.snapshot())?)?;
        let outcome = DeduplicatingCommitter::commit(&uow, &plan, &run_id)?;
        report.record_commit(plan.skipped_duplicate, outcome.inserted, outcome.ignored_by_storage);

        if config.purge_staging_on_success {
            uow.staging()
                .clear()
                .map_err(|e| ImportError::StagingClearFailed(e.to_string()))?;
        }

        let final_report = report.finish();
        uow.runs().finalize(&run_record(&final_report)?)?;
        uow.commit()?;

        Ok(final_report)
    }
}

#[async_trait]
impl<C> ReadingImporter for ReadingImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self), fields(file = %file_path.display()))]
    async fn import_file(&self, file_path: &Path) -> ImportResult<ImportReport> {
        let config = self
            .config
            .load_import_config()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        self.import_file_with_config(file_path, &config).await
    }

    #[instrument(skip(self, config), fields(file = %file_path.display()))]
    async fn import_file_with_config(
        &self,
        file_path: &Path,
        config: &ImportConfig,
    ) -> ImportResult<ImportReport> {
        info!("开始导入读数");
        let result = self.run_pipeline(file_path, config);

        match &result {
            Ok(report) => info!(
                run_id = %report.run_id,
                outcome = ?report.outcome,
                total_rows = report.total_rows,
                rejected = report.rejected_rows,
                devices_not_found = report.devices_not_found.len(),
                skipped_duplicate = report.skipped_duplicate,
                committed = report.committed,
                elapsed_ms = report.elapsed_ms,
                "导入完成"
            ),
            Err(e) => error!(error = %e, "导入失败"),
        }

        result
    }
}
