// ==========================================
// 加工安装报价系统 - 行校验器
// ==========================================
// 职责: 单行字段级校验 + 类型化（阶段: Validating）
// 规则:
// - 必填非空: customer_name / customer_phone / location / type
// - 必填正数: height / width / unit_price；qty 为正整数
// - 每个失败字段恰好一条错误，字段之间互不短路
// - customer_email / remarks / valid_until 不做格式校验
// ==========================================

use crate::domain::import::{QuoteRow, RawRow, ValidationError};
use chrono::{Duration, NaiveDate};

/// Excel 序列日期起点（1900 日期系统，含闰年兼容偏移）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Excel 可表示的最大序列日（9999-12-31）
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

// ==========================================
// RowValidator Trait
// ==========================================
// 实现者: QuoteRowValidator
pub trait RowValidator: Send + Sync {
    /// 校验并类型化单行
    ///
    /// # 返回
    /// - Ok(QuoteRow): 全部字段通过
    /// - Err(Vec<ValidationError>): 每个失败字段一条
    fn parse_row(&self, row: &RawRow, row_number: usize) -> Result<QuoteRow, Vec<ValidationError>>;

    /// 仅返回校验错误（通过时为空）
    fn validate(&self, row: &RawRow, row_number: usize) -> Vec<ValidationError> {
        self.parse_row(row, row_number).err().unwrap_or_default()
    }
}

// ==========================================
// QuoteRowValidator - 报价导入行校验
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct QuoteRowValidator;

impl QuoteRowValidator {
    pub fn new() -> Self {
        Self
    }
}

impl RowValidator for QuoteRowValidator {
    fn parse_row(&self, row: &RawRow, row_number: usize) -> Result<QuoteRow, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let customer_name = required_text(row, "customer_name", row_number, &mut errors);
        let customer_phone = required_text(row, "customer_phone", row_number, &mut errors);
        let location = required_text(row, "location", row_number, &mut errors);
        let item_type = required_text(row, "type", row_number, &mut errors);

        let height = positive_number(row, "height", row_number, &mut errors);
        let width = positive_number(row, "width", row_number, &mut errors);
        let qty = positive_integer(row, "qty", row_number, &mut errors);
        let unit_price = positive_number(row, "unit_price", row_number, &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(QuoteRow {
            row_number,
            customer_name,
            customer_phone,
            customer_email: optional_text(row, "customer_email"),
            location,
            item_type,
            height,
            width,
            qty,
            unit_price,
            remarks: optional_text(row, "remarks"),
            valid_until: optional_text(row, "valid_until").and_then(|v| parse_valid_until(&v)),
        })
    }
}

fn cell<'a>(row: &'a RawRow, field: &str) -> &'a str {
    row.get(field).map(|v| v.trim()).unwrap_or("")
}

fn optional_text(row: &RawRow, field: &str) -> Option<String> {
    let value = cell(row, field);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn required_text(
    row: &RawRow,
    field: &str,
    row_number: usize,
    errors: &mut Vec<ValidationError>,
) -> String {
    let value = cell(row, field);
    if value.is_empty() {
        errors.push(ValidationError::new(row_number, field, "必填字段为空"));
    }
    value.to_string()
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn positive_number(
    row: &RawRow,
    field: &str,
    row_number: usize,
    errors: &mut Vec<ValidationError>,
) -> f64 {
    let raw = cell(row, field);
    if raw.is_empty() {
        errors.push(ValidationError::new(row_number, field, "必填字段为空"));
        return 0.0;
    }
    match parse_decimal(raw) {
        Some(v) if v > 0.0 => v,
        Some(v) => {
            errors.push(ValidationError::new(
                row_number,
                field,
                format!("必须大于 0，实际 {}", v),
            ));
            0.0
        }
        None => {
            errors.push(ValidationError::new(
                row_number,
                field,
                format!("不是有效数值: {}", raw),
            ));
            0.0
        }
    }
}

fn positive_integer(
    row: &RawRow,
    field: &str,
    row_number: usize,
    errors: &mut Vec<ValidationError>,
) -> u32 {
    let raw = cell(row, field);
    if raw.is_empty() {
        errors.push(ValidationError::new(row_number, field, "必填字段为空"));
        return 0;
    }
    // Excel 数值单元格可能带 .0
    match parse_decimal(raw) {
        Some(v) if v >= 1.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) => v as u32,
        _ => {
            errors.push(ValidationError::new(
                row_number,
                field,
                format!("必须为正整数，实际 {}", raw),
            ));
            0
        }
    }
}

/// 解析有效期：YYYY-MM-DD / DD/MM/YYYY / Excel 序列日；无法识别返回 None
pub fn parse_valid_until(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // 带时间部分的 ISO 值只取日期
    let date_part = value.split(['T', ' ']).next().unwrap_or(value);

    if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(date_part, "%d/%m/%Y") {
        return Some(date);
    }

    let serial = value.parse::<f64>().ok()?;
    if !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_row() -> RawRow {
        [
            ("customer_name", "Ali"),
            ("customer_phone", " 0501234567 "),
            ("customer_email", ""),
            ("location", "Kitchen"),
            ("type", "Glass"),
            ("height", "158"),
            ("width", "158"),
            ("qty", "1"),
            ("unit_price", "8"),
            ("remarks", ""),
            ("valid_until", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_valid_row_parses() {
        let row = QuoteRowValidator.parse_row(&valid_row(), 2).unwrap();
        assert_eq!(row.row_number, 2);
        assert_eq!(row.customer_phone, "0501234567");
        assert_eq!(row.qty, 1);
        assert_eq!(row.customer_email, None);
        assert!(QuoteRowValidator.validate(&valid_row(), 2).is_empty());
    }

    #[test]
    fn test_two_missing_fields_yield_two_errors() {
        let mut row = valid_row();
        row.insert("customer_name".into(), "".into());
        row.insert("width".into(), "  ".into());

        let errors = QuoteRowValidator.validate(&row, 5);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "customer_name");
        assert_eq!(errors[1].field, "width");
        assert!(errors.iter().all(|e| e.row == 5));
    }

    #[test]
    fn test_missing_column_counts_as_empty() {
        let mut row = valid_row();
        row.remove("type");
        let errors = QuoteRowValidator.validate(&row, 3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "type");
    }

    #[test]
    fn test_non_positive_and_non_numeric() {
        let mut row = valid_row();
        row.insert("height".into(), "0".into());
        row.insert("unit_price".into(), "abc".into());
        row.insert("qty".into(), "1.5".into());

        let errors = QuoteRowValidator.validate(&row, 2);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["height", "qty", "unit_price"]);
    }

    #[test]
    fn test_qty_accepts_excel_float_integer() {
        let mut row = valid_row();
        row.insert("qty".into(), "3.0".into());
        assert_eq!(QuoteRowValidator.parse_row(&row, 2).unwrap().qty, 3);
    }

    #[test]
    fn test_optional_fields_not_format_validated() {
        let mut row = valid_row();
        row.insert("customer_email".into(), "not-an-email".into());
        row.insert("valid_until".into(), "someday".into());

        let parsed = QuoteRowValidator.parse_row(&row, 2).unwrap();
        assert_eq!(parsed.customer_email.as_deref(), Some("not-an-email"));
        assert_eq!(parsed.valid_until, None);
    }

    #[test]
    fn test_parse_valid_until_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(parse_valid_until("2025-01-31"), Some(expected));
        assert_eq!(parse_valid_until("2025-01-31T00:00:00"), Some(expected));
        assert_eq!(parse_valid_until("31/01/2025"), Some(expected));
        assert_eq!(parse_valid_until("45688"), Some(expected));
        assert_eq!(parse_valid_until("-1"), None);
        assert_eq!(parse_valid_until(""), None);
    }
}
