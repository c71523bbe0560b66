// ==========================================
// 计量读数导入系统 - 导入配置
// ==========================================
// 职责: 导入管道可调参数（小数分隔符 / 日期格式 / 分隔符 / 报告示例数）
// 来源: 默认值 < config_kv 表 < 命令行参数
// ==========================================

use crate::domain::report::DEFAULT_MAX_EXAMPLES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 日-月-年优先的默认日期格式（按优先级）
pub const DAY_FIRST_DATE_FORMATS: [&str; 3] = ["%d/%m/%Y %H:%M", "%d/%m/%Y %H", "%d/%m/%Y"];

/// 月-日-年优先的默认日期格式（按优先级）
pub const MONTH_FIRST_DATE_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M", "%m/%d/%Y %H", "%m/%d/%Y"];

// ==========================================
// DecimalSeparator - 小数分隔符约定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimalSeparator {
    #[default]
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = ",")]
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(&self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    /// 另一种符号（作为千分位或兜底小数点）
    pub fn other(&self) -> char {
        match self {
            DecimalSeparator::Dot => ',',
            DecimalSeparator::Comma => '.',
        }
    }
}

impl FromStr for DecimalSeparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "." | "dot" | "punto" => Ok(DecimalSeparator::Dot),
            "," | "comma" | "coma" => Ok(DecimalSeparator::Comma),
            other => Err(format!("无效的小数分隔符: {}（应为 '.' 或 ','）", other)),
        }
    }
}

impl fmt::Display for DecimalSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ==========================================
// ImportConfig - 导入配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// 读数列的小数分隔符
    pub decimal_separator: DecimalSeparator,
    /// 按优先级排列的日期格式（chrono strftime）
    pub date_formats: Vec<String>,
    /// 日在前（01/02/2024 = 2 月 1 日）
    pub day_first: bool,
    /// 文本文件列分隔符；None = 根据表头自动识别
    pub csv_delimiter: Option<u8>,
    /// 报告中每类错误保留的示例条数
    pub max_error_examples: usize,
    /// 提交成功后清空暂存表
    pub purge_staging_on_success: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            decimal_separator: DecimalSeparator::Dot,
            date_formats: default_date_formats(true),
            day_first: true,
            csv_delimiter: None,
            max_error_examples: DEFAULT_MAX_EXAMPLES,
            purge_staging_on_success: true,
        }
    }
}

impl ImportConfig {
    /// 切换日/月顺序；若日期格式仍为默认值则一并切换
    pub fn with_day_first(mut self, day_first: bool) -> Self {
        if self.date_formats == default_date_formats(self.day_first) {
            self.date_formats = default_date_formats(day_first);
        }
        self.day_first = day_first;
        self
    }

    pub fn with_decimal_separator(mut self, separator: DecimalSeparator) -> Self {
        self.decimal_separator = separator;
        self
    }

    pub fn with_date_formats(mut self, formats: Vec<String>) -> Self {
        if !formats.is_empty() {
            self.date_formats = formats;
        }
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: Option<u8>) -> Self {
        self.csv_delimiter = delimiter;
        self
    }

    pub fn with_max_error_examples(mut self, max: usize) -> Self {
        self.max_error_examples = max;
        self
    }

    pub fn with_purge_staging_on_success(mut self, purge: bool) -> Self {
        self.purge_staging_on_success = purge;
        self
    }
}

/// 默认日期格式列表
pub fn default_date_formats(day_first: bool) -> Vec<String> {
    let formats = if day_first {
        DAY_FIRST_DATE_FORMATS
    } else {
        MONTH_FIRST_DATE_FORMATS
    };
    formats.iter().map(|f| f.to_string()).collect()
}

/// 解析单字符分隔符（支持 "\t" / "tab" 写法）
pub fn parse_delimiter(raw: &str) -> Option<u8> {
    match raw {
        "\\t" | "tab" | "TAB" | "\t" => Some(b'\t'),
        s if s.len() == 1 && s.is_ascii() => s.bytes().next(),
        _ => None,
    }
}
