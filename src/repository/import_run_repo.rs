// ==========================================
// 计量读数导入系统 - 导入运行记录 Repository
// ==========================================
// 表: import_run
// 约束: 与读数在同一事务内写入，回滚时不留运行记录
// ==========================================

use crate::domain::ImportRun;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "run_id, file_name, started_at, finished_at, total_rows, rejected_rows,
     staged_rows, committed_rows, report_json";

pub struct ImportRunRepository<'a> {
    conn: &'a Connection,
}

fn map_run(row: &Row<'_>) -> rusqlite::Result<ImportRun> {
    Ok(ImportRun {
        run_id: row.get(0)?,
        file_name: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        total_rows: row.get::<_, i64>(4)? as usize,
        rejected_rows: row.get::<_, i64>(5)? as usize,
        staged_rows: row.get::<_, i64>(6)? as usize,
        committed_rows: row.get::<_, i64>(7)? as usize,
        report_json: row.get(8)?,
    })
}

impl<'a> ImportRunRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, run: &ImportRun) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO import_run (
                run_id, file_name, started_at, finished_at, total_rows,
                rejected_rows, staged_rows, committed_rows, report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                run.run_id,
                run.file_name,
                run.started_at,
                run.finished_at,
                run.total_rows as i64,
                run.rejected_rows as i64,
                run.staged_rows as i64,
                run.committed_rows as i64,
                run.report_json,
            ],
        )?;
        Ok(())
    }

    /// 更新运行结束信息（提交阶段最后一步回填最终报告）
    pub fn finalize(&self, run: &ImportRun) -> RepositoryResult<()> {
        self.conn.execute(
            r#"
            UPDATE import_run
            SET finished_at = ?2, total_rows = ?3, rejected_rows = ?4,
                staged_rows = ?5, committed_rows = ?6, report_json = ?7
            WHERE run_id = ?1
            "#,
            params![
                run.run_id,
                run.finished_at,
                run.total_rows as i64,
                run.rejected_rows as i64,
                run.staged_rows as i64,
                run.committed_rows as i64,
                run.report_json,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, run_id: &str) -> RepositoryResult<Option<ImportRun>> {
        let sql = format!("SELECT {} FROM import_run WHERE run_id = ?1", SELECT_COLUMNS);
        let run = self.conn.query_row(&sql, params![run_id], map_run).optional()?;
        Ok(run)
    }

    /// 最近的运行记录（最新在前）
    pub fn recent(&self, limit: usize) -> RepositoryResult<Vec<ImportRun>> {
        let sql = format!(
            "SELECT {} FROM import_run ORDER BY started_at DESC LIMIT ?1",
            SELECT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit as i64], map_run)?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM import_run", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
