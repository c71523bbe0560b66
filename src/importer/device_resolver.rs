// ==========================================
// 计量读数导入系统 - 计量点解析
// ==========================================
// 职责: 暂存表中的计量点名称 → 设备ID
// 规则: 名称精确匹配（区分大小写、整串）；未匹配者记录并排除
// 红线: 从不隐式创建设备
// ==========================================

use crate::domain::DeviceId;
use crate::importer::error::ImportResult;
use crate::repository::UnitOfWork;
use std::collections::HashMap;

/// 解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceResolution {
    pub found: HashMap<String, DeviceId>,
    /// 未找到的名称（排序）
    pub not_found: Vec<String>,
}

impl DeviceResolution {
    pub fn device_id(&self, name: &str) -> Option<DeviceId> {
        self.found.get(name).copied()
    }

    pub fn distinct_names(&self) -> usize {
        self.found.len() + self.not_found.len()
    }

    /// 已解析设备ID（排序、去重）
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.found.values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

pub struct DeviceResolver;

impl DeviceResolver {
    pub fn resolve(uow: &UnitOfWork<'_>, names: &[String]) -> ImportResult<DeviceResolution> {
        let found = uow.devices().find_ids_by_names(names)?;

        let mut not_found: Vec<String> = names
            .iter()
            .filter(|n| !found.contains_key(n.as_str()))
            .cloned()
            .collect();
        not_found.sort();
        not_found.dedup();

        Ok(DeviceResolution { found, not_found })
    }
}
