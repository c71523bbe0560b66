// ==========================================
// 计量读数导入系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls/.ods，只读第一个工作表) / 文本 (.csv/.txt/.tsv)
// 输出: 表头 + 带行号的单元格字符串（表头为第 1 行）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reading_importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDateTime, Timelike};
use csv::ReaderBuilder;
use std::path::Path;

/// 文本文件扩展名
pub const TEXT_EXTENSIONS: [&str; 3] = ["csv", "txt", "tsv"];

/// 表格文件扩展名
pub const SPREADSHEET_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "ods"];

/// 自动识别时的候选分隔符
const SNIFF_DELIMITERS: [u8; 3] = [b';', b'\t', b','];

// ==========================================
// TabularData - 解析后的表格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRow {
    pub row_number: usize, // 行号（表头为第 1 行）
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabularData {
    pub headers: Vec<String>,
    pub rows: Vec<TabularRow>,
}

impl TabularData {
    /// 去掉末尾的全空行（表格软件常留下格式化过的空行）
    fn trim_trailing_blank_rows(&mut self) {
        while self
            .rows
            .last()
            .map(|r| r.cells.iter().all(|c| c.trim().is_empty()))
            .unwrap_or(false)
        {
            self.rows.pop();
        }
    }
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    /// None = 根据表头行自动识别
    pub delimiter: Option<u8>,
}

impl CsvParser {
    pub fn new(delimiter: Option<u8>) -> Self {
        Self { delimiter }
    }

    /// 解码文本：优先 UTF-8，失败时按 Latin-1 逐字节解码
    pub fn decode(bytes: Vec<u8>) -> String {
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        };
        match text.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }

    /// 根据表头行识别分隔符（出现次数最多者，均为 0 时取 ','）
    pub fn sniff_delimiter(text: &str) -> u8 {
        let header = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        SNIFF_DELIMITERS
            .iter()
            .map(|&d| (d, header.bytes().filter(|&b| b == d).count()))
            .filter(|&(_, count)| count > 0)
            .max_by_key(|&(_, count)| count)
            .map(|(d, _)| d)
            .unwrap_or(b',')
    }

    /// 解析内存中的文本
    pub fn parse_text(&self, text: &str) -> ImportResult<TabularData> {
        let delimiter = self.delimiter.unwrap_or_else(|| Self::sniff_delimiter(text));
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut data = TabularData::default();
        let mut header_seen = false;
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let cells: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            if !header_seen {
                data.headers = cells;
                header_seen = true;
                continue;
            }

            // 表头为第 1 行，第一条数据为第 2 行（空白行不计）
            data.rows.push(TabularRow {
                row_number: idx + 1,
                cells,
            });
        }

        data.trim_trailing_blank_rows();
        Ok(data)
    }
}

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path) -> ImportResult<TabularData> {
        let ext = file_extension(file_path);
        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFileFormat(ext));
        }
        ensure_exists(file_path)?;

        let bytes = std::fs::read(file_path)?;
        let text = Self::decode(bytes);
        // .tsv 未显式配置时固定为制表符
        if self.delimiter.is_none() && ext == "tsv" {
            return CsvParser::new(Some(b'\t')).parse_text(&text);
        }
        self.parse_text(&text)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ExcelParser;

/// 日期单元格渲染为 ISO 文本（与日/月顺序配置无关）
fn format_cell_datetime(dt: NaiveDateTime) -> String {
    if dt.second() == 0 {
        dt.format("%Y-%m-%d %H:%M").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => format_cell_datetime(dt),
            None => cell.to_string().trim().to_string(),
        },
        // ISO 文本交给日期解析器的通用格式处理
        Data::DateTimeIso(s) => s.trim().replacen('T', " ", 1),
        other => other.to_string().trim().to_string(),
    }
}

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path) -> ImportResult<TabularData> {
        let ext = file_extension(file_path);
        if !SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFileFormat(ext));
        }
        ensure_exists(file_path)?;

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let Some(sheet_name) = sheet_names.first().cloned() else {
            return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
        };
        let range = workbook.worksheet_range(&sheet_name)?;
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);

        let mut data = TabularData::default();
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(data);
        };
        data.headers = header_row.iter().map(cell_to_string).collect();

        for (idx, row) in rows.enumerate() {
            data.rows.push(TabularRow {
                // 表头位于 first_row（0 起），数据行号 = first_row + idx + 2
                row_number: first_row + idx + 2,
                cells: row.iter().map(cell_to_string).collect(),
            });
        }

        data.trim_trailing_blank_rows();
        Ok(data)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniversalFileParser {
    csv: CsvParser,
}

impl UniversalFileParser {
    pub fn new(delimiter: Option<u8>) -> Self {
        Self {
            csv: CsvParser::new(delimiter),
        }
    }
}

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path) -> ImportResult<TabularData> {
        let ext = file_extension(file_path);
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            self.csv.parse(file_path)
        } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            ExcelParser.parse(file_path)
        } else {
            Err(ImportError::UnsupportedFileFormat(if ext.is_empty() {
                file_path.display().to_string()
            } else {
                ext
            }))
        }
    }
}
