// ==========================================
// 计量读数导入系统 - 行规范化
// ==========================================
// 职责: RawRecord → StagedReading（纯变换）
// 检查顺序: 日期 → 读数 → 计量点（第一个失败即为该行原因）
// 红线: 不抛出，不访问数据库；错误由调用方累加进报告
// ==========================================

use crate::config::{DecimalSeparator, ImportConfig};
use crate::domain::{RawRecord, StagedReading};
use crate::importer::date_resolver::DateResolver;
use crate::importer::error::RowError;

/// 解析读数文本
///
/// # 规则
/// - 配置的分隔符为小数点；出现时另一种符号视为千分位并去除
/// - 配置的分隔符未出现且另一种符号恰好出现一次时，将其视为小数点
/// - 允许前导正负号；NaN / 无穷 / 空串均无效
pub fn parse_value(text: &str, separator: DecimalSeparator) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let decimal = separator.as_char();
    let other = separator.other();
    let normalized = if text.contains(decimal) {
        text.replace(other, "").replace(decimal, ".")
    } else if text.matches(other).count() == 1 {
        text.replace(other, ".")
    } else {
        text.replace(other, "")
    };

    // 只接受数字形式，拒绝 "inf" / "NaN" 等字面量
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return None;
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ==========================================
// RowNormalizer
// ==========================================
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    date_resolver: DateResolver,
    decimal_separator: DecimalSeparator,
}

impl RowNormalizer {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            date_resolver: DateResolver::new(&config.date_formats, config.day_first),
            decimal_separator: config.decimal_separator,
        }
    }

    pub fn normalize(&self, record: &RawRecord) -> Result<StagedReading, RowError> {
        let row = record.row_number;

        if record.date_text.trim().is_empty()
            && record.value_text.trim().is_empty()
            && record.device_text.trim().is_empty()
        {
            return Err(RowError::MalformedRow {
                row,
                value: String::new(),
            });
        }

        let timestamp = self
            .date_resolver
            .resolve(&record.date_text)
            .ok_or_else(|| RowError::InvalidDate {
                row,
                value: record.date_text.clone(),
            })?;

        let value = parse_value(&record.value_text, self.decimal_separator).ok_or_else(|| {
            RowError::InvalidValue {
                row,
                value: record.value_text.clone(),
            }
        })?;

        let device_name = record.device_text.trim();
        if device_name.is_empty() {
            return Err(RowError::MissingDevice { row });
        }

        Ok(StagedReading {
            timestamp,
            value,
            device_name: device_name.to_string(),
        })
    }
}
