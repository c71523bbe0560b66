// ==========================================
// 计量读数导入系统 - 读数领域模型
// ==========================================
// RawRecord      → 文件解析后的原始三元组（仅在解析期间存在）
// StagedReading  → 规范化后的暂存记录（staging_reading 表）
// Device         → 参考数据（导入管道只读）
// Reading        → 永久读数（reading 表，只追加）
// ==========================================

use crate::domain::types::DeviceId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 读数唯一键：(时间, 设备)
pub type ReadingKey = (NaiveDateTime, DeviceId);

// ==========================================
// RawRecord - 导入原始记录
// ==========================================
// 由边界适配器（ColumnLayout）统一产出，内部组件不再区分行的来源形态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub row_number: usize, // 源文件行号（表头为第 1 行）
    pub date_text: String,
    pub value_text: String,
    pub device_text: String,
}

// ==========================================
// StagedReading - 暂存读数
// ==========================================
// 暂存表内 (timestamp, device_name) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedReading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub device_name: String,
}

// ==========================================
// Device - 设备（计量点）
// ==========================================
// 名称唯一；可挂父设备（树结构）与设备类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub device_type_id: Option<i64>,
    pub parent_id: Option<DeviceId>,
}

// ==========================================
// Reading - 永久读数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
    pub device_id: DeviceId,
}

impl Reading {
    pub fn key(&self) -> ReadingKey {
        (self.timestamp, self.device_id)
    }
}

// ==========================================
// ConsumptionDelta - 相邻读数消耗差值
// ==========================================
// 来源: reading_delta 视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionDelta {
    pub device_id: DeviceId,
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
    pub previous_value: Option<f64>,
    pub delta: Option<f64>,
}
