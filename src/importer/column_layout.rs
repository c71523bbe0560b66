// ==========================================
// 计量读数导入系统 - 列定位与行适配
// ==========================================
// 职责: 按列名定位必需列，把任意形态的行统一适配为 RawRecord
// 规则:
// - 列名去空白、去 BOM、大小写不敏感；多余列忽略
// - 行单元格不足且某单元格含次级分隔符时，按该分隔符重新切分
// ==========================================

use crate::config::DecimalSeparator;
use crate::domain::RawRecord;
use crate::importer::error::{ImportError, ImportResult, RowError};
use crate::importer::file_parser::TabularRow;

/// 必需列（按 日期 / 读数 / 计量点 顺序）
pub const REQUIRED_COLUMNS: [&str; 3] = ["fecha", "consumo", "medidor"];

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// 次级分隔符（小数点为 '.' 时 ',' 也可作为分隔符）
fn secondary_delimiters(decimal: DecimalSeparator) -> Vec<char> {
    let mut delimiters = vec![';', '\t', '|'];
    if decimal == DecimalSeparator::Dot {
        delimiters.push(',');
    }
    delimiters
}

/// 找到第一个含次级分隔符的单元格并切分
fn resplit(cells: &[String], delimiters: &[char]) -> Option<Vec<String>> {
    for cell in cells {
        for &d in delimiters {
            if cell.contains(d) {
                return Some(cell.split(d).map(|c| c.trim().to_string()).collect());
            }
        }
    }
    None
}

// ==========================================
// ColumnLayout - 必需列位置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub date_idx: usize,
    pub value_idx: usize,
    pub device_idx: usize,
    delimiters: Vec<char>,
}

impl ColumnLayout {
    /// 根据表头定位必需列
    ///
    /// # 返回
    /// - Err(MissingRequiredColumns): 列出全部缺失列名
    pub fn resolve(headers: &[String], decimal: DecimalSeparator) -> ImportResult<Self> {
        let delimiters = secondary_delimiters(decimal);

        let mut normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut positions = Self::locate(&normalized);

        // 整个表头挤在一个单元格里（如 "fecha;consumo;medidor"）
        let non_empty = normalized.iter().filter(|h| !h.is_empty()).count();
        if positions.iter().any(Option::is_none) && non_empty == 1 {
            if let Some(split) = resplit(&normalized, &delimiters) {
                normalized = split.iter().map(|h| normalize_header(h)).collect();
                positions = Self::locate(&normalized);
            }
        }

        match positions {
            [Some(date_idx), Some(value_idx), Some(device_idx)] => Ok(Self {
                date_idx,
                value_idx,
                device_idx,
                delimiters,
            }),
            _ => {
                let missing = REQUIRED_COLUMNS
                    .iter()
                    .zip(positions.iter())
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect();
                Err(ImportError::MissingRequiredColumns {
                    missing,
                    required: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
                })
            }
        }
    }

    fn locate(normalized: &[String]) -> [Option<usize>; 3] {
        REQUIRED_COLUMNS.map(|name| normalized.iter().position(|h| h == name))
    }

    /// 行至少需要的单元格数
    fn width(&self) -> usize {
        self.date_idx.max(self.value_idx).max(self.device_idx) + 1
    }

    /// 把一行适配为 RawRecord
    ///
    /// # 返回
    /// - Err(MalformedRow): 全空行，或重新切分后仍不足三列
    pub fn to_record(&self, row: &TabularRow) -> Result<RawRecord, RowError> {
        if row.cells.iter().all(|c| c.trim().is_empty()) {
            return Err(RowError::MalformedRow {
                row: row.row_number,
                value: String::new(),
            });
        }

        let resplit_cells;
        let cells = if row.cells.len() < self.width() {
            resplit_cells = resplit(&row.cells, &self.delimiters);
            match &resplit_cells {
                Some(split) if split.len() >= self.width() => split,
                _ => {
                    return Err(RowError::MalformedRow {
                        row: row.row_number,
                        value: row.cells.join(" | "),
                    })
                }
            }
        } else {
            &row.cells
        };

        Ok(RawRecord {
            row_number: row.row_number,
            date_text: cells[self.date_idx].trim().to_string(),
            value_text: cells[self.value_idx].trim().to_string(),
            device_text: cells[self.device_idx].trim().to_string(),
        })
    }
}
