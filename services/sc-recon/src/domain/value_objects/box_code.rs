//! 箱码解析
//!
//! 箱码格式：`DDMMYY$SKU$件数$序号`，例如 `150325$10001-001-M10W12$12$3`

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::SkuCode;
use crate::error::ScanError;

const SEPARATOR: char = '$';

/// 从箱码解析出的箱子信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxDescriptor {
    pub date: NaiveDate,
    pub sku: SkuCode,
    /// 箱内应有件数
    pub expected_units: u32,
    pub sequence: u32,
}

impl BoxDescriptor {
    /// 解析箱码
    ///
    /// 年份按 20YY 解释，日期必须是真实存在的日历日
    pub fn parse(code: &str) -> Result<Self, ScanError> {
        let code = code.trim();
        let parts: Vec<&str> = code.split(SEPARATOR).collect();
        let [date, sku, units, sequence] = parts.as_slice() else {
            return Err(ScanError::MalformedCode(format!(
                "expected 4 '{}'-separated fields, got {}",
                SEPARATOR,
                parts.len()
            )));
        };

        let date = parse_ddmmyy(date)?;

        let sku = SkuCode::new(*sku);
        if sku.is_empty() {
            return Err(ScanError::MalformedCode("SKU field is empty".into()));
        }

        let expected_units = parse_number(units, "unit count")?;
        if expected_units == 0 {
            return Err(ScanError::MalformedCode("unit count must be positive".into()));
        }
        let sequence = parse_number(sequence, "sequence")?;

        Ok(Self {
            date,
            sku,
            expected_units,
            sequence,
        })
    }

    /// `YYYY-MM-DD`
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

fn parse_ddmmyy(field: &str) -> Result<NaiveDate, ScanError> {
    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::MalformedCode(format!(
            "date field {:?} is not DDMMYY",
            field
        )));
    }
    // 已确认全为 ASCII 数字，切片与解析不会失败
    let day: u32 = field[0..2].parse().unwrap_or_default();
    let month: u32 = field[2..4].parse().unwrap_or_default();
    let year: i32 = 2000 + field[4..6].parse::<i32>().unwrap_or_default();

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ScanError::MalformedCode(format!("date {:?} is not a calendar date", field)))
}

fn parse_number(field: &str, what: &str) -> Result<u32, ScanError> {
    let field = field.trim();
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::MalformedCode(format!(
            "{} {:?} is not a non-negative integer",
            what, field
        )));
    }
    field
        .parse()
        .map_err(|_| ScanError::MalformedCode(format!("{} {:?} is out of range", what, field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_code() {
        let descriptor = BoxDescriptor::parse("150325$10001-001-M10W12$12$3").unwrap();

        assert_eq!(descriptor.iso_date(), "2025-03-15");
        assert_eq!(descriptor.sku.as_str(), "10001-001-M10W12");
        assert_eq!(descriptor.expected_units, 12);
        assert_eq!(descriptor.sequence, 3);
    }

    #[test]
    fn test_zero_padded_sequence() {
        let descriptor = BoxDescriptor::parse("120925$10001-001-M10W12$12$009").unwrap();

        assert_eq!(descriptor.iso_date(), "2025-09-12");
        assert_eq!(descriptor.sku.as_str(), "10001-001-M10W12");
        assert_eq!(descriptor.expected_units, 12);
        assert_eq!(descriptor.sequence, 9);
    }

    #[test]
    fn test_separator_inside_sku_is_rejected() {
        for code in ["120925$10001$001$12$009", "120925$10001-001$12"] {
            let err = BoxDescriptor::parse(code).unwrap_err();
            assert!(matches!(err, ScanError::MalformedCode(_)), "{code}");
        }
    }

    #[test]
    fn test_wrong_field_count() {
        for code in ["150325$SKU$12", "150325$SKU$12$3$9", "", "no-separators"] {
            let err = BoxDescriptor::parse(code).unwrap_err();
            assert!(matches!(err, ScanError::MalformedCode(_)), "{code}");
        }
    }

    #[test]
    fn test_bad_date_field() {
        assert!(BoxDescriptor::parse("15032$SKU$12$3").is_err());
        assert!(BoxDescriptor::parse("1503AB$SKU$12$3").is_err());
        // 2月30日
        assert!(BoxDescriptor::parse("300225$SKU$12$3").is_err());
        assert!(BoxDescriptor::parse("010025$SKU$12$3").is_err());
    }

    #[test]
    fn test_leap_day_accepted() {
        let descriptor = BoxDescriptor::parse("290224$SKU$1$0").unwrap();
        assert_eq!(descriptor.iso_date(), "2024-02-29");
    }

    #[test]
    fn test_non_integer_counts() {
        assert!(BoxDescriptor::parse("150325$SKU$twelve$3").is_err());
        assert!(BoxDescriptor::parse("150325$SKU$12$-1").is_err());
        assert!(BoxDescriptor::parse("150325$SKU$1.5$3").is_err());
        assert!(BoxDescriptor::parse("150325$SKU$0$3").is_err());
    }

    #[test]
    fn test_empty_sku() {
        assert!(BoxDescriptor::parse("150325$ $12$3").is_err());
    }
}
