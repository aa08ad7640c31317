use serde::{Deserialize, Serialize};

use crate::models::Organization;

/// Supported statement date layouts. Serialized names match the template JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "DD_MM_YYYY")]
    DayMonthYear,
    #[serde(rename = "MM_DD_YYYY")]
    MonthDayYear,
    #[serde(rename = "YYYY_MM_DD")]
    YearMonthDay,
}

impl DateFormat {
    pub fn parse_key(key: &str) -> Option<Self> {
        match key {
            "DD_MM_YYYY" => Some(Self::DayMonthYear),
            "MM_DD_YYYY" => Some(Self::MonthDayYear),
            "YYYY_MM_DD" => Some(Self::YearMonthDay),
            _ => None,
        }
    }
}

/// How INCOME vs EXPENSE is inferred from a row: an explicit type column, or
/// the sign of the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionMode {
    TypeColumn,
    SignBased,
}

impl DirectionMode {
    pub fn parse_key(key: &str) -> Option<Self> {
        match key {
            "type_column" => Some(Self::TypeColumn),
            "sign_based" => Some(Self::SignBased),
            _ => None,
        }
    }
}

/// Configuration for one import run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvParsingOptions {
    /// Cell delimiter; may be multi-character. "\t" for tab-separated files.
    pub delimiter: String,
    pub has_headers: bool,
    /// Zero-based index of the header row within the parsed records.
    pub header_row_index: usize,
    pub date_format: DateFormat,
    pub decimal_separator: char,
    pub thousands_separator: char,
    pub direction_mode: DirectionMode,
}

impl CsvParsingOptions {
    /// Defaults drawn from the organization's configured formats.
    pub fn for_org(org: &Organization, direction_mode: DirectionMode) -> Self {
        Self {
            delimiter: ",".to_string(),
            has_headers: true,
            header_row_index: 0,
            date_format: DateFormat::parse_key(&org.date_format)
                .unwrap_or(DateFormat::YearMonthDay),
            decimal_separator: org.decimal_separator,
            thousands_separator: org.thousands_separator,
            direction_mode,
        }
    }
}

/// Logical field → raw CSV header name. Absent fields are simply not mapped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    #[serde(rename = "type")]
    pub txn_type: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub account: Option<String>,
    pub vendor: Option<String>,
    pub client: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<String>,
    pub secondary_amount: Option<String>,
    pub secondary_currency: Option<String>,
    pub document: Option<String>,
}
