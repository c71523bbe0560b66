// ==========================================
// 计量读数导入系统 - 设备 Repository（只读）
// ==========================================
// 表: device
// 红线: 导入管道从不创建设备，只按名称精确查找（区分大小写）
// ==========================================

use crate::domain::{Device, DeviceId};
use crate::repository::error::RepositoryResult;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

/// 单条 IN 查询最多绑定的名称数（低于 SQLite 参数上限）
pub const NAME_LOOKUP_CHUNK: usize = 500;

pub struct DeviceRepository<'a> {
    conn: &'a Connection,
}

fn map_device(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        device_type_id: row.get(2)?,
        parent_id: row.get(3)?,
    })
}

impl<'a> DeviceRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 按名称批量查找，返回 名称 → 设备ID（未找到的名称不出现在结果中）
    pub fn find_ids_by_names(&self, names: &[String]) -> RepositoryResult<HashMap<String, DeviceId>> {
        let mut found = HashMap::with_capacity(names.len());

        for chunk in names.chunks(NAME_LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT name, id FROM device WHERE name IN ({})", placeholders);
            let mut stmt = self.conn.prepare(&sql)?;
            let bind: Vec<&dyn ToSql> = chunk.iter().map(|n| n as &dyn ToSql).collect();
            let rows = stmt.query_map(bind.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, DeviceId>(1)?))
            })?;

            for row in rows {
                let (name, id) = row?;
                found.insert(name, id);
            }
        }

        Ok(found)
    }

    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Device>> {
        let device = self
            .conn
            .query_row(
                "SELECT id, name, device_type_id, parent_id FROM device WHERE name = ?1",
                params![name],
                map_device,
            )
            .optional()?;
        Ok(device)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Device>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, device_type_id, parent_id FROM device ORDER BY name")?;
        let rows = stmt.query_map([], map_device)?;

        let mut devices = Vec::new();
        for row in rows {
            devices.push(row?);
        }
        Ok(devices)
    }
}
