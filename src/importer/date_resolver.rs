// ==========================================
// 计量读数导入系统 - 日期解析器
// ==========================================
// 职责: 按固定优先级尝试日期格式，返回第一个完整匹配
// 顺序: 配置格式（默认 日/月/年 时:分 → 日/月/年 时 → 日/月/年）→ 通用兜底
// 约束: 严格匹配（整串消费），多余或缺失字符均视为不匹配
// ==========================================

use chrono::format::{parse, ParseErrorKind, Parsed, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// %Y 解析结果的最小年份
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

/// 含任一即视为带时间的格式（组合说明符 %R %T %X %r %c 同样计入）
const TIME_SPECIFIERS: [&str; 12] = [
    "%H", "%I", "%k", "%l", "%M", "%S", "%R", "%T", "%X", "%r", "%c", "%p",
];

/// 通用兜底：与日/月顺序无关的格式
const GENERIC_FALLBACK_DATETIMES: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const GENERIC_FALLBACK_DATES: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// 通用兜底：日在前
const DAY_FIRST_FALLBACK_DATETIMES: [&str; 6] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DAY_FIRST_FALLBACK_DATES: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y"];

/// 通用兜底：月在前
const MONTH_FIRST_FALLBACK_DATETIMES: [&str; 6] = [
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%m.%d.%Y %H:%M:%S",
    "%m.%d.%Y %H:%M",
];

const MONTH_FIRST_FALLBACK_DATES: [&str; 4] = ["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%m/%d/%y"];

// ==========================================
// DateFormat - 预分类的格式
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
enum DateFormat {
    /// 含时间说明符；缺分钟时补 0（"日/月/年 时"）
    WithTime(String),
    /// 只有日期（零点）
    DateOnly(String),
}

impl DateFormat {
    fn classify(format: &str) -> Self {
        if TIME_SPECIFIERS.iter().any(|spec| format.contains(spec)) {
            DateFormat::WithTime(format.to_string())
        } else {
            DateFormat::DateOnly(format.to_string())
        }
    }

    fn pattern(&self) -> &str {
        match self {
            DateFormat::WithTime(fmt) | DateFormat::DateOnly(fmt) => fmt,
        }
    }

    fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let parsed = self.parse_raw(text)?;
        // %Y 也接受一两位数字，"01/02/24" 不能被当作公元 24 年
        if self.pattern().contains("%Y") && parsed.year() < MIN_FOUR_DIGIT_YEAR {
            return None;
        }
        Some(parsed)
    }

    fn parse_raw(&self, text: &str) -> Option<NaiveDateTime> {
        match self {
            DateFormat::WithTime(fmt) => match NaiveDateTime::parse_from_str(text, fmt) {
                Ok(dt) => Some(dt),
                Err(e) if e.kind() == ParseErrorKind::NotEnough => parse_without_minute(text, fmt),
                Err(_) => None,
            },
            DateFormat::DateOnly(fmt) => NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// 只给出小时的格式：分钟取 0，其余字段按原格式位置解析
fn parse_without_minute(text: &str, fmt: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    parse(&mut parsed, text, StrftimeItems::new(fmt)).ok()?;
    parsed.set_minute(0).ok()?;
    parsed.to_naive_datetime_with_offset(0).ok()
}

// ==========================================
// DateResolver - 日期解析器
// ==========================================
#[derive(Debug, Clone)]
pub struct DateResolver {
    formats: Vec<DateFormat>,
    fallback: Vec<DateFormat>,
}

impl DateResolver {
    /// # 参数
    /// - formats: 按优先级排列的 strftime 格式
    /// - day_first: 通用兜底中 `/` `-` `.` 形式的日/月顺序
    pub fn new(formats: &[String], day_first: bool) -> Self {
        let (datetime_forms, date_forms) = if day_first {
            (DAY_FIRST_FALLBACK_DATETIMES, DAY_FIRST_FALLBACK_DATES)
        } else {
            (MONTH_FIRST_FALLBACK_DATETIMES, MONTH_FIRST_FALLBACK_DATES)
        };

        let fallback = GENERIC_FALLBACK_DATETIMES
            .iter()
            .chain(datetime_forms.iter())
            .chain(GENERIC_FALLBACK_DATES.iter())
            .chain(date_forms.iter())
            .map(|f| DateFormat::classify(f))
            .collect();

        Self {
            formats: formats.iter().map(|f| DateFormat::classify(f)).collect(),
            fallback,
        }
    }

    /// 解析日期文本；所有格式均失败时返回 None
    pub fn resolve(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(dt) = self.formats.iter().find_map(|f| f.parse(text)) {
            return Some(dt);
        }

        // RFC 3339 保留墙上时间，丢弃时区
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.naive_local());
        }
        self.fallback.iter().find_map(|f| f.parse(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::import_config::default_date_formats;

    fn resolver(day_first: bool) -> DateResolver {
        DateResolver::new(&default_date_formats(day_first), day_first)
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_three_default_formats_in_order() {
        let r = resolver(true);
        assert_eq!(r.resolve("01/02/2024 10:30"), Some(dt(2024, 2, 1, 10, 30, 0)));
        assert_eq!(r.resolve("01/02/2024 10"), Some(dt(2024, 2, 1, 10, 0, 0)));
        assert_eq!(r.resolve("01/02/2024"), Some(dt(2024, 2, 1, 0, 0, 0)));
    }

    #[test]
    fn test_month_first() {
        let r = resolver(false);
        assert_eq!(r.resolve("01/02/2024 10:30"), Some(dt(2024, 1, 2, 10, 30, 0)));
        assert_eq!(r.resolve("01.02.2024 08:00:00"), Some(dt(2024, 1, 2, 8, 0, 0)));
    }

    #[test]
    fn test_generic_fallback() {
        let r = resolver(true);
        assert_eq!(r.resolve(" 2024-02-01 10:30:15 "), Some(dt(2024, 2, 1, 10, 30, 15)));
        assert_eq!(r.resolve("2024-02-01T10:30"), Some(dt(2024, 2, 1, 10, 30, 0)));
        assert_eq!(r.resolve("2024-02-01T10:30:00+02:00"), Some(dt(2024, 2, 1, 10, 30, 0)));
        assert_eq!(r.resolve("2024/02/01"), Some(dt(2024, 2, 1, 0, 0, 0)));
        assert_eq!(r.resolve("01-02-2024 10:30"), Some(dt(2024, 2, 1, 10, 30, 0)));
        assert_eq!(r.resolve("01/02/24"), Some(dt(2024, 2, 1, 0, 0, 0)));
        assert_eq!(r.resolve("01/02/2024 10:30:45"), Some(dt(2024, 2, 1, 10, 30, 45)));
    }

    #[test]
    fn test_custom_format_takes_priority() {
        let r = DateResolver::new(&["%Y%m%d%H%M".to_string()], true);
        assert_eq!(r.resolve("202402011030"), Some(dt(2024, 2, 1, 10, 30, 0)));
        // 自定义格式不匹配时仍走兜底
        assert_eq!(r.resolve("2024-02-01"), Some(dt(2024, 2, 1, 0, 0, 0)));
    }

    #[test]
    fn test_combined_time_specifiers_keep_time() {
        let r = DateResolver::new(&["%d/%m/%Y %T".to_string(), "%d/%m/%Y %R".to_string()], true);
        assert_eq!(r.resolve("01/02/2024 10:30:15"), Some(dt(2024, 2, 1, 10, 30, 15)));
        assert_eq!(r.resolve("01/02/2024 10:30"), Some(dt(2024, 2, 1, 10, 30, 0)));

        // 同一天不同时刻不得折叠为同一键
        assert_ne!(r.resolve("01/02/2024 08:00:00"), r.resolve("01/02/2024 09:00:00"));
    }

    #[test]
    fn test_twelve_hour_clock_without_minutes() {
        let r = DateResolver::new(&["%d/%m/%Y %I %p".to_string()], true);
        assert_eq!(r.resolve("01/02/2024 10 PM"), Some(dt(2024, 2, 1, 22, 0, 0)));
        assert_eq!(r.resolve("01/02/2024 10 AM"), Some(dt(2024, 2, 1, 10, 0, 0)));

        let r = DateResolver::new(&["%d/%m/%Y %I:%M %p".to_string()], true);
        assert_eq!(r.resolve("01/02/2024 07:45 PM"), Some(dt(2024, 2, 1, 19, 45, 0)));
    }

    #[test]
    fn test_hour_before_date_in_format() {
        let r = DateResolver::new(&["%Hh %d/%m/%Y".to_string()], true);
        assert_eq!(r.resolve("10h 01/02/2024"), Some(dt(2024, 2, 1, 10, 0, 0)));
    }

    #[test]
    fn test_time_format_rejects_date_only_text() {
        let r = DateResolver::new(&["%d/%m/%Y %T".to_string()], true);
        // 配置格式不匹配，落到兜底的纯日期形式
        assert_eq!(r.resolve("01/02/2024"), Some(dt(2024, 2, 1, 0, 0, 0)));
        assert!(DateFormat::classify("%d/%m/%Y %T").parse("01/02/2024").is_none());
    }

    #[test]
    fn test_rejects_garbage() {
        let r = resolver(true);
        assert_eq!(r.resolve(""), None);
        assert_eq!(r.resolve("ayer"), None);
        assert_eq!(r.resolve("32/01/2024"), None);
        assert_eq!(r.resolve("01/02/2024 25:00"), None);
    }
}
