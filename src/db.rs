// ==========================================
// 计量读数导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 建库脚本内嵌（migrations/v0.1_init.sql），幂等执行
// - 默认数据库路径解析（环境变量 > 用户数据目录 > 当前目录）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version（与 `migrations/v0.*.sql` 对齐）
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 显式指定数据库路径的环境变量
pub const DB_PATH_ENV: &str = "METER_IMPORT_DB_PATH";

const INIT_SCHEMA_SQL: &str = include_str!("../migrations/v0.1_init.sql");

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库并初始化 schema（测试/演练用）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 初始化 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(INIT_SCHEMA_SQL)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 校验 schema_version，不一致时只告警（不做自动迁移）
pub fn warn_on_schema_mismatch(conn: &Connection) -> rusqlite::Result<()> {
    match read_schema_version(conn)? {
        Some(v) if v == CURRENT_SCHEMA_VERSION => {}
        Some(v) => tracing::warn!(
            found = v,
            expected = CURRENT_SCHEMA_VERSION,
            "数据库 schema_version 与代码不一致"
        ),
        None => tracing::warn!("数据库缺少 schema_version 表，请先执行 init-db"),
    }
    Ok(())
}

/// 获取默认数据库路径
///
/// 优先级：
/// 1. 环境变量 METER_IMPORT_DB_PATH
/// 2. 用户数据目录 /meter-import/meter_import.db
/// 3. ./meter_import.db
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./meter_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("meter-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("meter_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
