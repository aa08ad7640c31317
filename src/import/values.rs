use chrono::{Datelike, NaiveDate};

use super::options::DateFormat;

/// Parse a date cell per the configured layout. `/`, `-`, and `.` all work as
/// the component separator. Calendar-invalid combinations (Feb 30) and
/// out-of-range components are rejected.
pub fn parse_date(raw: &str, format: DateFormat) -> Option<NaiveDate> {
    let normalized = raw.trim().replace(['-', '.'], "/");
    let parts: Vec<&str> = normalized.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let (y, m, d): (i32, u32, u32) = match format {
        DateFormat::DayMonthYear => (parts[2].parse().ok()?, parts[1].parse().ok()?, parts[0].parse().ok()?),
        DateFormat::MonthDayYear => (parts[2].parse().ok()?, parts[0].parse().ok()?, parts[1].parse().ok()?),
        DateFormat::YearMonthDay => (parts[0].parse().ok()?, parts[1].parse().ok()?, parts[2].parse().ok()?),
    };
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(y, m, d)?;
    // Round-trip guard: constructing Feb 30 either fails above or would come
    // back with different components.
    if date.year() != y || date.month() != m || date.day() != d {
        return None;
    }
    Some(date)
}

pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    match format {
        DateFormat::DayMonthYear => date.format("%d/%m/%Y").to_string(),
        DateFormat::MonthDayYear => date.format("%m/%d/%Y").to_string(),
        DateFormat::YearMonthDay => date.format("%Y/%m/%d").to_string(),
    }
}

/// Locale-aware numeric parse: strips the thousands separator, normalizes the
/// decimal separator to `.`, then parses. Returns None for anything that does
/// not survive as a finite number.
pub fn parse_amount(raw: &str, decimal_separator: char, thousands_separator: char) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|&c| c != thousands_separator && c != ' ')
        .map(|c| if c == decimal_separator { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn format_amount(val: f64, decimal_separator: char, thousands_separator: char) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(thousands_separator);
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();
    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}{decimal_separator}{dec_part}")
}

/// ISO-4217-style shape check: exactly three ASCII letters.
pub fn is_valid_currency_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Split a `;`-separated tag cell, trimming and dropping empties.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_all_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(parse_date("31/01/2025", DateFormat::DayMonthYear), Some(expected));
        assert_eq!(parse_date("01/31/2025", DateFormat::MonthDayYear), Some(expected));
        assert_eq!(parse_date("2025/01/31", DateFormat::YearMonthDay), Some(expected));
    }

    #[test]
    fn test_parse_date_alternate_separators() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
        assert_eq!(parse_date("05-12-2024", DateFormat::DayMonthYear), Some(expected));
        assert_eq!(parse_date("05.12.2024", DateFormat::DayMonthYear), Some(expected));
        assert_eq!(parse_date("2024-12-05", DateFormat::YearMonthDay), Some(expected));
    }

    #[test]
    fn test_parse_date_rejects_invalid() {
        assert_eq!(parse_date("30/02/2025", DateFormat::DayMonthYear), None); // Feb 30
        assert_eq!(parse_date("13/32/2025", DateFormat::MonthDayYear), None);
        assert_eq!(parse_date("00/15/2025", DateFormat::MonthDayYear), None);
        assert_eq!(parse_date("2025/01", DateFormat::YearMonthDay), None);
        assert_eq!(parse_date("not a date", DateFormat::DayMonthYear), None);
    }

    #[test]
    fn test_date_roundtrip_all_formats() {
        for format in [
            DateFormat::DayMonthYear,
            DateFormat::MonthDayYear,
            DateFormat::YearMonthDay,
        ] {
            for date in [
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ] {
                assert_eq!(parse_date(&format_date(date, format), format), Some(date));
            }
        }
    }

    #[test]
    fn test_parse_amount_locales() {
        assert_eq!(parse_amount("1,234.56", '.', ','), Some(1234.56));
        assert_eq!(parse_amount("1.234,56", ',', '.'), Some(1234.56));
        assert_eq!(parse_amount("-42,50", ',', '.'), Some(-42.5));
        assert_eq!(parse_amount("  100.50  ", '.', ','), Some(100.5));
        assert_eq!(parse_amount("1 234,56", ',', ' '), Some(1234.56));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount("abc", '.', ','), None);
        assert_eq!(parse_amount("", '.', ','), None);
        assert_eq!(parse_amount("12.34.56", '.', ','), None);
    }

    #[test]
    fn test_amount_roundtrip() {
        for (dec, thou) in [('.', ','), (',', '.'), (',', ' ')] {
            for val in [0.0, 1234.56, -987654.32, 42.1] {
                let formatted = format_amount(val, dec, thou);
                assert_eq!(parse_amount(&formatted, dec, thou), Some(val));
            }
        }
    }

    #[test]
    fn test_currency_code_check() {
        assert!(is_valid_currency_code("USD"));
        assert!(is_valid_currency_code(" eur "));
        assert!(!is_valid_currency_code("US"));
        assert!(!is_valid_currency_code("DOLLARS"));
        assert!(!is_valid_currency_code("U$D"));
        assert!(!is_valid_currency_code(""));
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("office; rent ;q1"), vec!["office", "rent", "q1"]);
        assert_eq!(split_tags(";;"), Vec::<String>::new());
        assert_eq!(split_tags("single"), vec!["single"]);
    }
}
