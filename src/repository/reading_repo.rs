// ==========================================
// 计量读数导入系统 - 读数 Repository
// ==========================================
// 表: reading（只追加），视图: reading_delta
// 约束: (read_at, device_id) 唯一；冲突按“已处理”忽略
// ==========================================

use crate::domain::{ConsumptionDelta, DeviceId, Reading, ReadingKey};
use crate::repository::device_repo::NAME_LOOKUP_CHUNK;
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};
use std::collections::HashSet;

pub struct ReadingRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ReadingRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 预取指定设备已存在的 (时间, 设备) 键
    pub fn existing_keys_for_devices(&self, device_ids: &[DeviceId]) -> RepositoryResult<HashSet<ReadingKey>> {
        let mut keys = HashSet::new();

        for chunk in device_ids.chunks(NAME_LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT read_at, device_id FROM reading WHERE device_id IN ({})",
                placeholders
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let bind: Vec<&dyn ToSql> = chunk.iter().map(|id| id as &dyn ToSql).collect();
            let rows = stmt.query_map(bind.as_slice(), |row| {
                Ok((row.get::<_, NaiveDateTime>(0)?, row.get::<_, DeviceId>(1)?))
            })?;

            for row in rows {
                keys.insert(row?);
            }
        }

        Ok(keys)
    }

    /// 批量插入（INSERT OR IGNORE），返回实际写入行数
    ///
    /// 唯一键冲突被存储层静默忽略；其他约束违反（外键、触发器）照常报错
    pub fn insert_or_ignore(&self, readings: &[Reading], import_run_id: Option<&str>) -> RepositoryResult<usize> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO reading (read_at, value, device_id, import_run_id) VALUES (?1, ?2, ?3, ?4)",
        )?;

        let mut inserted = 0;
        for reading in readings {
            inserted += stmt.execute(params![
                reading.timestamp,
                reading.value,
                reading.device_id,
                import_run_id
            ])?;
        }
        Ok(inserted)
    }

    pub fn count(&self) -> RepositoryResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reading", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// 某设备的全部读数（按时间升序）
    pub fn find_by_device(&self, device_id: DeviceId) -> RepositoryResult<Vec<Reading>> {
        let mut stmt = self.conn.prepare(
            "SELECT read_at, value, device_id FROM reading WHERE device_id = ?1 ORDER BY read_at",
        )?;
        let rows = stmt.query_map(params![device_id], |row| {
            Ok(Reading {
                timestamp: row.get(0)?,
                value: row.get(1)?,
                device_id: row.get(2)?,
            })
        })?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }

    /// 相邻读数的消耗差值（最新在前）
    pub fn consumption_deltas(&self, device_id: DeviceId, limit: usize) -> RepositoryResult<Vec<ConsumptionDelta>> {
        let mut stmt = self.conn.prepare(
            "SELECT device_id, read_at, value, previous_value, delta
             FROM reading_delta
             WHERE device_id = ?1
             ORDER BY read_at DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![device_id, limit as i64], |row| {
            Ok(ConsumptionDelta {
                device_id: row.get(0)?,
                timestamp: row.get(1)?,
                value: row.get(2)?,
                previous_value: row.get(3)?,
                delta: row.get(4)?,
            })
        })?;

        let mut deltas = Vec::new();
        for row in rows {
            deltas.push(row?);
        }
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn reading(day: u32, value: f64, device_id: DeviceId) -> Reading {
        Reading {
            timestamp: at(day, 0),
            value: Some(value),
            device_id,
        }
    }

    fn seeded() -> Connection {
        let conn = crate::db::open_in_memory().unwrap();
        conn.execute_batch(
            "INSERT INTO device (id, name) VALUES (1, 'M1');
             INSERT INTO device (id, name) VALUES (2, 'M2');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_insert_or_ignore_skips_existing_key() {
        let conn = seeded();
        let repo = ReadingRepository::new(&conn);

        assert_eq!(repo.insert_or_ignore(&[reading(1, 10.0, 1)], None).unwrap(), 1);
        assert_eq!(
            repo.insert_or_ignore(&[reading(1, 99.0, 1), reading(2, 12.0, 1)], None)
                .unwrap(),
            1
        );

        let stored = repo.find_by_device(1).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].value, Some(10.0));
    }

    #[test]
    fn test_existing_keys_scoped_to_devices() {
        let conn = seeded();
        let repo = ReadingRepository::new(&conn);
        repo.insert_or_ignore(&[reading(1, 10.0, 1), reading(1, 3.0, 2)], None)
            .unwrap();

        let keys = repo.existing_keys_for_devices(&[1]).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&(at(1, 0), 1)));
    }

    #[test]
    fn test_unknown_device_is_foreign_key_error() {
        let conn = seeded();
        let repo = ReadingRepository::new(&conn);
        let err = repo.insert_or_ignore(&[reading(1, 1.0, 42)], None).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_consumption_deltas_newest_first() {
        let conn = seeded();
        let repo = ReadingRepository::new(&conn);
        repo.insert_or_ignore(
            &[reading(1, 10.0, 1), reading(2, 15.5, 1), reading(3, 20.0, 1)],
            None,
        )
        .unwrap();

        let deltas = repo.consumption_deltas(1, 10).unwrap();
        assert_eq!(deltas.len(), 3);
        assert_eq!(deltas[0].timestamp, at(3, 0));
        assert_eq!(deltas[0].delta, Some(4.5));
        assert_eq!(deltas[2].previous_value, None);
        assert_eq!(deltas[2].delta, None);
    }
}
