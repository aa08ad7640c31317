use std::collections::HashMap;

use super::options::{ColumnMapping, DirectionMode};
use super::parser::ParsedCsv;

/// As-read string values for each mapped logical field. `None` means the
/// field was unmapped, the column was missing from the row, or the cell was
/// blank.
#[derive(Debug, Clone, Default)]
pub struct CandidateFields {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
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

#[derive(Debug, Clone)]
pub struct RawImportRow {
    /// Zero-based index within the data rows.
    pub index: usize,
    pub cells: Vec<String>,
    pub direction_mode: DirectionMode,
    pub candidate: CandidateFields,
}

/// Project raw rows into named candidate fields. Columns are looked up by
/// header name, not position; the first header with a given name wins.
pub fn apply_column_mapping(
    parsed: &ParsedCsv,
    mapping: &ColumnMapping,
    direction_mode: DirectionMode,
) -> Vec<RawImportRow> {
    let mut index_by_header: HashMap<&str, usize> = HashMap::new();
    for (i, header) in parsed.headers.iter().enumerate() {
        index_by_header.entry(header.as_str()).or_insert(i);
    }

    let column = |name: &Option<String>| -> Option<usize> {
        name.as_deref().and_then(|n| index_by_header.get(n).copied())
    };

    let columns = [
        column(&mapping.date),
        column(&mapping.amount),
        column(&mapping.currency),
        column(&mapping.txn_type),
        column(&mapping.description),
        column(&mapping.category),
        column(&mapping.account),
        column(&mapping.vendor),
        column(&mapping.client),
        column(&mapping.notes),
        column(&mapping.tags),
        column(&mapping.secondary_amount),
        column(&mapping.secondary_currency),
        column(&mapping.document),
    ];

    parsed
        .rows
        .iter()
        .enumerate()
        .map(|(index, cells)| {
            let cell = |col: Option<usize>| -> Option<String> {
                let value = cells.get(col?)?.trim();
                if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            };
            RawImportRow {
                index,
                cells: cells.clone(),
                direction_mode,
                candidate: CandidateFields {
                    date: cell(columns[0]),
                    amount: cell(columns[1]),
                    currency: cell(columns[2]),
                    txn_type: cell(columns[3]),
                    description: cell(columns[4]),
                    category: cell(columns[5]),
                    account: cell(columns[6]),
                    vendor: cell(columns[7]),
                    client: cell(columns[8]),
                    notes: cell(columns[9]),
                    tags: cell(columns[10]),
                    secondary_amount: cell(columns[11]),
                    secondary_currency: cell(columns[12]),
                    document: cell(columns[13]),
                },
            }
        })
        .collect()
}
