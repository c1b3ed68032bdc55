// ==========================================
// 加工安装报价系统 - 文件解析器实现
// ==========================================
// 职责: 表格字节流 → 原始行记录（阶段: Parsing）
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 识别: 优先按文件头魔数，其次按文件名扩展名
// ==========================================

use crate::domain::import::{RawRow, IMPORT_COLUMNS};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{Data, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;

const XLSX_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const XLS_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

// ==========================================
// SourceRow - 带表格行号的原始行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub row_number: usize, // 表头为第 1 行
    pub values: RawRow,
}

impl SourceRow {
    /// 读取单元格（列不存在视为空）
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

// ==========================================
// RowSource Trait
// ==========================================
// 用途: 从表格字节流产出无类型行（引擎与文件格式的唯一接口）
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait RowSource: Send + Sync {
    /// 解析字节流为原始行
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - file_name: 文件名（仅作为格式提示，可为空）
    ///
    /// # 返回
    /// - Ok(Vec<SourceRow>): 非空白数据行（可能为空列表）
    /// - Err: 格式不支持、解析失败
    fn read_rows(&self, bytes: &[u8], file_name: Option<&str>) -> ImportResult<Vec<SourceRow>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
    Csv,
}

/// 识别表格格式
pub fn detect_format(bytes: &[u8], file_name: Option<&str>) -> ImportResult<SpreadsheetFormat> {
    if bytes.starts_with(&XLSX_MAGIC) {
        return Ok(SpreadsheetFormat::Xlsx);
    }
    if bytes.starts_with(&XLS_MAGIC) {
        return Ok(SpreadsheetFormat::Xls);
    }

    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "" | "csv" | "txt" => Ok(SpreadsheetFormat::Csv),
        "xlsx" | "xls" => Err(ImportError::ExcelParseError(format!(
            "文件内容与扩展名 .{} 不符",
            ext
        ))),
        _ => Err(ImportError::UnsupportedFormat(ext)),
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl RowSource for CsvParser {
    fn read_rows(&self, bytes: &[u8], _file_name: Option<&str>) -> ImportResult<Vec<SourceRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        // 读取表头
        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let cells = record.iter().map(|v| v.trim().to_string());
            if let Some(row) = build_row(&headers, cells, idx + 2) {
                records.push(row);
            }
        }

        check_headers(&headers, &records)?;
        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    fn read_xlsx(bytes: &[u8]) -> ImportResult<Range<Data>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let sheet_name = first_sheet(workbook.sheet_names())?;
        Ok(workbook.worksheet_range(&sheet_name)?)
    }

    fn read_xls(bytes: &[u8]) -> ImportResult<Range<Data>> {
        let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes))?;
        let sheet_name = first_sheet(workbook.sheet_names())?;
        Ok(workbook.worksheet_range(&sheet_name)?)
    }
}

impl RowSource for ExcelParser {
    fn read_rows(&self, bytes: &[u8], _file_name: Option<&str>) -> ImportResult<Vec<SourceRow>> {
        let range = if bytes.starts_with(&XLS_MAGIC) {
            Self::read_xls(bytes)?
        } else {
            Self::read_xlsx(bytes)?
        };

        // 提取表头（第一行）；空工作表视为无数据
        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(row) => row,
            None => return Ok(Vec::new()),
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();

        let mut records = Vec::new();
        for (idx, data_row) in rows.enumerate() {
            let cells = data_row.iter().map(|cell| cell.to_string().trim().to_string());
            if let Some(row) = build_row(&headers, cells, idx + 2) {
                records.push(row);
            }
        }

        check_headers(&headers, &records)?;
        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（按魔数/扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 从磁盘读取并解析
    pub fn parse_path<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<SourceRow>> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path.file_name().and_then(|n| n.to_str());
        self.read_rows(&bytes, file_name)
    }
}

impl RowSource for UniversalFileParser {
    fn read_rows(&self, bytes: &[u8], file_name: Option<&str>) -> ImportResult<Vec<SourceRow>> {
        match detect_format(bytes, file_name)? {
            SpreadsheetFormat::Csv => CsvParser.read_rows(bytes, file_name),
            SpreadsheetFormat::Xlsx | SpreadsheetFormat::Xls => {
                ExcelParser.read_rows(bytes, file_name)
            }
        }
    }
}

fn first_sheet(sheet_names: Vec<String>) -> ImportResult<String> {
    sheet_names
        .into_iter()
        .next()
        .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

// 组装单行；完全空白的行返回 None
fn build_row<I>(headers: &[String], cells: I, row_number: usize) -> Option<SourceRow>
where
    I: Iterator<Item = String>,
{
    let mut values = RawRow::new();
    for (col_idx, value) in cells.enumerate() {
        if let Some(header) = headers.get(col_idx) {
            if !header.is_empty() {
                values.insert(header.clone(), value);
            }
        }
    }

    if values.values().all(|v| v.is_empty()) {
        return None;
    }

    Some(SourceRow { row_number, values })
}

// 有数据但表头完全不匹配模板列 → 视为格式错误
fn check_headers(headers: &[String], records: &[SourceRow]) -> ImportResult<()> {
    if records.is_empty() {
        return Ok(());
    }
    let known = headers
        .iter()
        .any(|h| IMPORT_COLUMNS.contains(&h.as_str()));
    if known {
        Ok(())
    } else {
        Err(ImportError::MissingHeader(IMPORT_COLUMNS.join(",")))
    }
}
