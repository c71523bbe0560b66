// ==========================================
// 计量读数导入系统 - 暂存表 Repository
// ==========================================
// 表: staging_reading（每次运行前清空）
// 约束: (read_at, device_name) 唯一，重复行插入时忽略（先到先得）
// ==========================================

use crate::domain::StagedReading;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};

// ==========================================
// ClearStrategy - 暂存表清空策略
// ==========================================
// 由存储能力探测决定，而非先试后退
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearStrategy {
    /// 删除全部行并重置自增序列
    ResetSequence,
    /// 仅删除全部行
    PlainClear,
}

impl ClearStrategy {
    /// 探测存储能力：存在 sqlite_sequence 表才可重置序列
    pub fn detect(conn: &Connection) -> RepositoryResult<Self> {
        let has_sequence = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence' LIMIT 1",
                [],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        Ok(if has_sequence {
            ClearStrategy::ResetSequence
        } else {
            ClearStrategy::PlainClear
        })
    }

    /// 执行清空，返回删除的行数
    pub fn apply(&self, conn: &Connection) -> RepositoryResult<usize> {
        let removed = conn.execute("DELETE FROM staging_reading", [])?;
        if *self == ClearStrategy::ResetSequence {
            conn.execute("DELETE FROM sqlite_sequence WHERE name = 'staging_reading'", [])?;
        }
        Ok(removed)
    }
}

// ==========================================
// StagingRepository
// ==========================================
pub struct StagingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> StagingRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 清空暂存表，返回所用策略
    pub fn clear(&self) -> RepositoryResult<ClearStrategy> {
        let strategy = ClearStrategy::detect(self.conn)?;
        let removed = strategy.apply(self.conn)?;
        tracing::debug!(?strategy, removed, "暂存表已清空");
        Ok(strategy)
    }

    /// 批量插入（INSERT OR IGNORE），返回实际写入行数
    pub fn insert_all(&self, rows: &[StagedReading]) -> RepositoryResult<usize> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO staging_reading (read_at, value, device_name) VALUES (?1, ?2, ?3)",
        )?;

        let mut inserted = 0;
        for row in rows {
            inserted += stmt.execute(params![row.timestamp, row.value, row.device_name])?;
        }
        Ok(inserted)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM staging_reading", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// 按写入顺序读取全部暂存行
    pub fn load_all(&self) -> RepositoryResult<Vec<StagedReading>> {
        let mut stmt = self
            .conn
            .prepare("SELECT read_at, value, device_name FROM staging_reading ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(StagedReading {
                timestamp: row.get(0)?,
                value: row.get(1)?,
                device_name: row.get(2)?,
            })
        })?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }

    /// 暂存表中出现的设备名（去重、排序）
    pub fn distinct_device_names(&self) -> RepositoryResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT device_name FROM staging_reading ORDER BY device_name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }
}
