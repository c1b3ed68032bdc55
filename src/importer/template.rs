// ==========================================
// 加工安装报价系统 - 导入模板导出
// ==========================================
// 职责: 生成批量导入模板（列顺序固定 + 两行示例数据）
// 格式: CSV (csv) / XLSX (rust_xlsxwriter)
// ==========================================

use crate::domain::import::IMPORT_COLUMNS;
use crate::importer::error::{ImportError, ImportResult};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::info;

/// 示例单元格
enum SampleCell {
    Text(&'static str),
    Number(f64),
}

/// 示例数据（与 IMPORT_COLUMNS 一一对应）
fn sample_rows() -> [[SampleCell; 11]; 2] {
    use SampleCell::{Number, Text};
    [
        [
            Text("Ahmed Ali"),
            Text("+971501234567"),
            Text("ahmed@example.com"),
            Text("Living Room"),
            Text("Roller Blind"),
            Number(158.0),
            Number(158.0),
            Number(1.0),
            Number(8.0),
            Text("Install next week"),
            Text("2025-12-31"),
        ],
        [
            Text("Ahmed Ali"),
            Text("+971501234567"),
            Text(""),
            Text("Bathroom"),
            Text("Blackout Curtain"),
            Number(50.0),
            Number(50.0),
            Number(2.0),
            Number(10.0),
            Text(""),
            Text(""),
        ],
    ]
}

impl SampleCell {
    fn as_text(&self) -> String {
        match self {
            SampleCell::Text(s) => s.to_string(),
            SampleCell::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Csv,
    Xlsx,
}

impl TemplateFormat {
    /// 按扩展名选择模板格式
    pub fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "csv" => Ok(TemplateFormat::Csv),
            "xlsx" => Ok(TemplateFormat::Xlsx),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// TemplateExporter
// ==========================================
pub struct TemplateExporter;

impl TemplateExporter {
    /// CSV 模板
    pub fn csv_bytes() -> ImportResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(IMPORT_COLUMNS)?;
        for row in sample_rows() {
            writer.write_record(row.iter().map(SampleCell::as_text))?;
        }
        writer
            .into_inner()
            .map_err(|e| ImportError::TemplateExportError(e.to_string()))
    }

    /// XLSX 模板（表头加粗）
    pub fn xlsx_bytes() -> ImportResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name("quotes")?;

        for (col, header) in IMPORT_COLUMNS.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
            worksheet.set_column_width(col as u16, 18)?;
        }

        for (row_idx, row) in sample_rows().iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    SampleCell::Text(s) if s.is_empty() => {}
                    SampleCell::Text(s) => {
                        worksheet.write_string(excel_row, col as u16, *s)?;
                    }
                    SampleCell::Number(n) => {
                        worksheet.write_number(excel_row, col as u16, *n)?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// 按格式生成模板
    pub fn render(format: TemplateFormat) -> ImportResult<Vec<u8>> {
        match format {
            TemplateFormat::Csv => Self::csv_bytes(),
            TemplateFormat::Xlsx => Self::xlsx_bytes(),
        }
    }

    /// 写出模板文件（格式由扩展名决定）
    pub fn export_to<P: AsRef<Path>>(path: P) -> ImportResult<TemplateFormat> {
        let path = path.as_ref();
        let format = TemplateFormat::from_path(path)?;
        let bytes = Self::render(format)?;
        std::fs::write(path, bytes)?;

        info!(path = %path.display(), format = ?format, "导入模板已导出");
        Ok(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::{CsvParser, ExcelParser, RowSource};
    use crate::importer::row_validator::{QuoteRowValidator, RowValidator};

    #[test]
    fn test_csv_template_column_order() {
        let bytes = TemplateExporter::csv_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, IMPORT_COLUMNS.join(","));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_csv_template_rows_validate() {
        let bytes = TemplateExporter::csv_bytes().unwrap();
        let rows = CsvParser.read_rows(&bytes, None).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(QuoteRowValidator.validate(&row.values, row.row_number).is_empty());
        }
    }

    #[test]
    fn test_xlsx_template_reads_back() {
        let bytes = TemplateExporter::xlsx_bytes().unwrap();
        let rows = ExcelParser.read_rows(&bytes, Some("template.xlsx")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("customer_name"), "Ahmed Ali");
        assert_eq!(rows[1].get("qty"), "2");

        let parsed = QuoteRowValidator.parse_row(&rows[1].values, rows[1].row_number).unwrap();
        assert_eq!(parsed.qty, 2);
    }

    #[test]
    fn test_template_format_from_path() {
        assert_eq!(TemplateFormat::from_path("a.CSV").unwrap(), TemplateFormat::Csv);
        assert_eq!(TemplateFormat::from_path("a.xlsx").unwrap(), TemplateFormat::Xlsx);
        assert!(TemplateFormat::from_path("a.pdf").is_err());
    }
}
