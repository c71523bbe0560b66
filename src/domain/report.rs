// ==========================================
// 计量读数导入系统 - 导入报告
// ==========================================
// 职责: 汇总各阶段计数与示例错误，生成面向用户的统一摘要
// 红线: 部分成功不得报告为全部成功，反之亦然
// ==========================================

use crate::domain::types::{ImportOutcome, RejectionKind};
use crate::i18n::{t, t_with_args};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 默认示例条数
pub const DEFAULT_MAX_EXAMPLES: usize = 5;

// ==========================================
// RowRejection - 行级拒绝记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row_number: usize,
    pub kind: RejectionKind,
    pub value: String,   // 出问题的原始值
    pub message: String, // 原因描述
}

// ==========================================
// ImportReport - 导入报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: String,
    pub file_name: Option<String>,
    pub outcome: ImportOutcome,

    // ===== 规范化阶段 =====
    pub total_rows: usize,
    pub rejected_rows: usize,
    pub rejections_by_kind: BTreeMap<RejectionKind, usize>,
    pub rejection_examples: Vec<RowRejection>,

    // ===== 暂存阶段 =====
    pub staged_candidates: usize, // 通过校验、尝试写入暂存表的行数
    pub staged_rows: usize,       // 实际落入暂存表的行数
    pub in_file_duplicates: usize,

    // ===== 设备解析阶段 =====
    pub distinct_devices: usize,
    pub devices_not_found: Vec<String>,
    pub skipped_device_not_found: usize,
    pub device_not_found_examples: Vec<String>,

    // ===== 提交阶段 =====
    pub skipped_duplicate: usize,
    pub committed: usize,
    pub ignored_by_storage: usize,

    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl ImportReport {
    /// 是否有任何行未能写入（拒绝/未找到设备/重复）
    pub fn has_losses(&self) -> bool {
        self.committed < self.total_rows
    }

    /// 生成本地化摘要（逐行）
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let file = self.file_name.clone().unwrap_or_else(|| "-".to_string());
        lines.push(t_with_args("report.title", &[("file", &file)]));
        lines.push(t(self.outcome.i18n_key()));
        lines.push(t_with_args(
            "report.total_rows",
            &[("count", &self.total_rows.to_string())],
        ));

        if self.staged_candidates > 0 {
            lines.push(t_with_args(
                "report.staged",
                &[
                    ("valid", &self.staged_candidates.to_string()),
                    ("staged", &self.staged_rows.to_string()),
                ],
            ));
        }

        if self.rejected_rows > 0 {
            let breakdown = RejectionKind::ALL
                .iter()
                .filter_map(|kind| self.rejections_by_kind.get(kind).map(|count| (kind, count)))
                .map(|(kind, count)| format!("{}: {}", t(kind.i18n_key()), count))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(t_with_args(
                "report.rejected",
                &[
                    ("count", &self.rejected_rows.to_string()),
                    ("total", &self.total_rows.to_string()),
                    ("breakdown", &breakdown),
                ],
            ));
            let examples = self
                .rejection_examples
                .iter()
                .map(|r| r.message.clone())
                .collect::<Vec<_>>();
            lines.push(examples_line(&examples, self.rejected_rows));
        }

        if self.in_file_duplicates > 0 {
            lines.push(t_with_args(
                "report.in_file_duplicates",
                &[("count", &self.in_file_duplicates.to_string())],
            ));
        }

        lines.push(t_with_args(
            "report.distinct_devices",
            &[("count", &self.distinct_devices.to_string())],
        ));

        if self.skipped_device_not_found > 0 {
            lines.push(t_with_args(
                "report.devices_not_found",
                &[
                    ("count", &self.skipped_device_not_found.to_string()),
                    ("devices", &self.devices_not_found.len().to_string()),
                    ("names", &self.devices_not_found.join(", ")),
                ],
            ));
            lines.push(examples_line(
                &self.device_not_found_examples,
                self.skipped_device_not_found,
            ));
        }

        if self.skipped_duplicate > 0 {
            lines.push(t_with_args(
                "report.skipped_duplicate",
                &[("count", &self.skipped_duplicate.to_string())],
            ));
        }

        lines.push(t_with_args(
            "report.committed",
            &[("count", &self.committed.to_string())],
        ));

        if self.ignored_by_storage > 0 {
            lines.push(t_with_args(
                "report.ignored_by_storage",
                &[("count", &self.ignored_by_storage.to_string())],
            ));
        }

        lines
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary_lines().join("\n"))
    }
}

fn examples_line(examples: &[String], total: usize) -> String {
    let mut joined = examples.join("; ");
    if total > examples.len() {
        joined.push_str("...");
    }
    t_with_args("report.examples", &[("examples", &joined)])
}

// ==========================================
// ImportReportBuilder - 报告累加器
// ==========================================
// 各阶段按顺序调用 record_*，最后 finish
#[derive(Debug)]
pub struct ImportReportBuilder {
    report: ImportReport,
    max_examples: usize,
}

impl ImportReportBuilder {
    pub fn new(run_id: String, file_name: Option<String>, max_examples: usize) -> Self {
        Self {
            report: ImportReport {
                run_id,
                file_name,
                outcome: ImportOutcome::NothingCommitted,
                total_rows: 0,
                rejected_rows: 0,
                rejections_by_kind: BTreeMap::new(),
                rejection_examples: Vec::new(),
                staged_candidates: 0,
                staged_rows: 0,
                in_file_duplicates: 0,
                distinct_devices: 0,
                devices_not_found: Vec::new(),
                skipped_device_not_found: 0,
                device_not_found_examples: Vec::new(),
                skipped_duplicate: 0,
                committed: 0,
                ignored_by_storage: 0,
                started_at: Utc::now(),
                elapsed_ms: 0,
            },
            max_examples,
        }
    }

    pub fn record_total_rows(&mut self, total_rows: usize) {
        self.report.total_rows = total_rows;
    }

    pub fn record_rejection(&mut self, rejection: RowRejection) {
        self.report.rejected_rows += 1;
        *self.report.rejections_by_kind.entry(rejection.kind).or_insert(0) += 1;
        if self.report.rejection_examples.len() < self.max_examples {
            self.report.rejection_examples.push(rejection);
        }
    }

    pub fn record_staging(&mut self, attempted: usize, staged: usize) {
        self.report.staged_candidates = attempted;
        self.report.staged_rows = staged;
        self.report.in_file_duplicates = attempted.saturating_sub(staged);
    }

    pub fn record_resolution(&mut self, distinct_devices: usize, not_found: Vec<String>) {
        self.report.distinct_devices = distinct_devices;
        self.report.devices_not_found = not_found;
    }

    pub fn record_device_not_found(&mut self, message: String) {
        self.report.skipped_device_not_found += 1;
        if self.report.device_not_found_examples.len() < self.max_examples {
            self.report.device_not_found_examples.push(message);
        }
    }

    pub fn record_commit(&mut self, skipped_duplicate: usize, committed: usize, ignored_by_storage: usize) {
        self.report.skipped_duplicate = skipped_duplicate;
        self.report.committed = committed;
        self.report.ignored_by_storage = ignored_by_storage;
    }

    /// 当前进度的报告快照（结果分类与耗时按当前计数计算）
    pub fn snapshot(&self) -> ImportReport {
        let mut report = self.report.clone();
        report.outcome = ImportOutcome::classify(report.total_rows, report.committed);
        let elapsed = Utc::now() - report.started_at;
        report.elapsed_ms = elapsed.num_milliseconds().max(0) as u64;
        report
    }

    /// 结束累加
    pub fn finish(self) -> ImportReport {
        self.snapshot()
    }
}

// ==========================================
// ImportRun - 导入运行记录（import_run 表）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: String,
    pub file_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_rows: usize,
    pub rejected_rows: usize,
    pub staged_rows: usize,
    pub committed_rows: usize,
    pub report_json: String,
}

impl ImportRun {
    pub fn from_report(report: &ImportReport) -> serde_json::Result<Self> {
        Ok(Self {
            run_id: report.run_id.clone(),
            file_name: report.file_name.clone(),
            started_at: report.started_at,
            finished_at: Utc::now(),
            total_rows: report.total_rows,
            rejected_rows: report.rejected_rows,
            staged_rows: report.staged_rows,
            committed_rows: report.committed,
            report_json: serde_json::to_string(report)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::tests::LOCALE_TEST_LOCK;

    fn rejection(row: usize, kind: RejectionKind) -> RowRejection {
        RowRejection {
            row_number: row,
            kind,
            value: "x".to_string(),
            message: format!("row {row}"),
        }
    }

    #[test]
    fn test_examples_are_capped() {
        let mut builder = ImportReportBuilder::new("run".to_string(), None, 2);
        builder.record_total_rows(4);
        for row in 2..6 {
            builder.record_rejection(rejection(row, RejectionKind::InvalidDate));
        }
        let report = builder.finish();

        assert_eq!(report.rejected_rows, 4);
        assert_eq!(report.rejection_examples.len(), 2);
        assert_eq!(report.rejections_by_kind.get(&RejectionKind::InvalidDate), Some(&4));
        assert_eq!(report.outcome, ImportOutcome::NothingCommitted);
    }

    #[test]
    fn test_partial_outcome_and_duplicates() {
        let mut builder = ImportReportBuilder::new("run".to_string(), Some("a.csv".to_string()), 5);
        builder.record_total_rows(3);
        builder.record_rejection(rejection(3, RejectionKind::InvalidValue));
        builder.record_staging(2, 2);
        builder.record_resolution(2, vec!["M2".to_string()]);
        builder.record_device_not_found("M2".to_string());
        builder.record_commit(0, 1, 0);
        let report = builder.finish();

        assert_eq!(report.outcome, ImportOutcome::Partial);
        assert!(report.has_losses());
        assert_eq!(report.in_file_duplicates, 0);
        assert_eq!(report.devices_not_found, vec!["M2".to_string()]);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("en");

        let mut builder = ImportReportBuilder::new("run".to_string(), Some("a.csv".to_string()), 5);
        builder.record_total_rows(3);
        builder.record_rejection(rejection(3, RejectionKind::InvalidValue));
        builder.record_staging(2, 2);
        builder.record_resolution(2, vec!["M2".to_string()]);
        builder.record_device_not_found("M2".to_string());
        builder.record_commit(0, 1, 0);
        let text = builder.finish().to_string();

        assert!(text.contains("a.csv"));
        assert!(text.contains("M2"));
        assert!(!text.contains("%{"));

        crate::i18n::set_locale(crate::i18n::DEFAULT_LOCALE);
    }

    #[test]
    fn test_breakdown_follows_kind_order() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("en");

        let mut builder = ImportReportBuilder::new("run".to_string(), None, 5);
        builder.record_total_rows(3);
        builder.record_rejection(rejection(2, RejectionKind::InvalidDate));
        builder.record_rejection(rejection(3, RejectionKind::MalformedRow));
        builder.record_rejection(rejection(4, RejectionKind::InvalidDate));
        let lines = builder.finish().summary_lines();

        let line = lines
            .iter()
            .find(|l| l.contains("malformed row"))
            .expect("breakdown line");
        let malformed = line.find("malformed row: 1").unwrap();
        let invalid_date = line.find("invalid date: 2").unwrap();
        assert!(malformed < invalid_date);
        assert!(!line.contains("non-numeric consumption"));

        crate::i18n::set_locale(crate::i18n::DEFAULT_LOCALE);
    }

    #[test]
    fn test_run_record_from_report() {
        let mut builder = ImportReportBuilder::new("run-1".to_string(), None, 5);
        builder.record_total_rows(1);
        builder.record_staging(1, 1);
        builder.record_commit(0, 1, 0);
        let report = builder.finish();

        let run = ImportRun::from_report(&report).unwrap();
        assert_eq!(run.run_id, "run-1");
        assert_eq!(run.committed_rows, 1);
        let decoded: ImportReport = serde_json::from_str(&run.report_json).unwrap();
        assert_eq!(decoded.outcome, ImportOutcome::Complete);
    }
}
