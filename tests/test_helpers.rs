// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、参考设备、输入文件
// ==========================================

#![allow(dead_code)]

use meter_import::config::ConfigManager;
use meter_import::importer::ReadingImporterImpl;
use rusqlite::{params, Connection};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 测试数据库（临时文件需保持存活）
pub struct TestDb {
    pub _file: NamedTempFile,
    pub path: String,
    pub conn: Arc<Mutex<Connection>>,
}

/// 创建临时测试数据库并初始化 schema
pub fn create_test_db() -> Result<TestDb, Box<dyn Error>> {
    meter_import::logging::init_test();

    let file = NamedTempFile::new()?;
    let path = file.path().to_string_lossy().to_string();

    let conn = meter_import::db::open_sqlite_connection(&path)?;
    meter_import::db::init_schema(&conn)?;

    Ok(TestDb {
        _file: file,
        path,
        conn: Arc::new(Mutex::new(conn)),
    })
}

/// 基于测试数据库构建导入器
pub fn build_importer(db: &TestDb) -> ReadingImporterImpl<ConfigManager> {
    let config = ConfigManager::from_connection(db.conn.clone()).unwrap();
    ReadingImporterImpl::new(db.conn.clone(), config)
}

/// 写入参考设备
pub fn seed_device(db: &TestDb, id: i64, name: &str) {
    let conn = db.conn.lock().unwrap();
    conn.execute("INSERT INTO device (id, name) VALUES (?1, ?2)", params![id, name])
        .unwrap();
}

/// 在临时目录中写入输入文件
pub fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

/// 单表计数
pub fn count_rows(db: &TestDb, table: &str) -> i64 {
    let conn = db.conn.lock().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

/// 读取某设备在某时刻的读数值
pub fn reading_value(db: &TestDb, device_id: i64, read_at: &str) -> Option<f64> {
    let conn = db.conn.lock().unwrap();
    conn.query_row(
        "SELECT value FROM reading WHERE device_id = ?1 AND read_at = ?2",
        params![device_id, read_at],
        |row| row.get(0),
    )
    .ok()
}
