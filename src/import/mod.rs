//! The statement import pipeline: parse → map → normalize → detect
//! duplicates → (for archives) bind documents → summarize, then an explicit
//! commit step. Everything before commit is read-only with respect to the
//! books; a preview can be thrown away at no cost.

pub mod archive;
pub mod commit;
pub mod duplicates;
pub mod mapper;
pub mod normalize;
pub mod options;
pub mod parser;
pub mod values;

use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::Organization;

use archive::ZipDocument;
use duplicates::DuplicateConfig;
use normalize::{CatalogIndex, NormalizedImportRow, OrgSettings};
use options::{ColumnMapping, CsvParsingOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub duplicate_candidates: usize,
}

/// Counts over a processed row set. Duplicate candidates are a subset of the
/// valid rows, not a third disjoint bucket.
pub fn summarize(rows: &[NormalizedImportRow]) -> ImportSummary {
    let valid_rows = rows.iter().filter(|r| r.is_valid()).count();
    ImportSummary {
        total_rows: rows.len(),
        valid_rows,
        invalid_rows: rows.len() - valid_rows,
        duplicate_candidates: rows.iter().filter(|r| r.is_duplicate_candidate).count(),
    }
}

/// Everything a caller needs to render a preview and later commit it.
pub struct ImportPreview {
    pub headers: Vec<String>,
    pub rows: Vec<NormalizedImportRow>,
    pub summary: ImportSummary,
    /// Archive documents keyed by normalized path; empty for plain CSV.
    pub documents: HashMap<String, ZipDocument>,
    pub checksum: String,
}

/// Run the full pipeline over a CSV buffer without touching the books.
pub fn preview_csv(
    conn: &Connection,
    org: &Organization,
    buffer: &[u8],
    mapping: &ColumnMapping,
    options: &CsvParsingOptions,
    dup_cfg: &DuplicateConfig,
) -> Result<ImportPreview> {
    let parsed = parser::parse_csv_buffer(buffer, options)?;
    let raw_rows = mapper::apply_column_mapping(&parsed, mapping, options.direction_mode);
    let catalog = CatalogIndex::load(conn, org.id)?;
    let settings = OrgSettings::from(org);
    let rows = normalize::normalize_rows(&raw_rows, &catalog, &settings, options);
    let rows = duplicates::detect_duplicates(conn, org.id, rows, dup_cfg)?;
    let summary = summarize(&rows);
    Ok(ImportPreview {
        headers: parsed.headers,
        rows,
        summary,
        documents: HashMap::new(),
        checksum: commit::file_checksum(buffer),
    })
}

/// As `preview_csv`, for a ZIP archive carrying `transactions.csv` plus
/// attached documents. Document binding runs before duplicate detection so
/// demoted rows never reach the detector.
pub fn preview_zip(
    conn: &Connection,
    org: &Organization,
    buffer: &[u8],
    mapping: &ColumnMapping,
    options: &CsvParsingOptions,
    dup_cfg: &DuplicateConfig,
) -> Result<ImportPreview> {
    let contents = archive::parse_transactions_zip(buffer)?;
    let parsed = parser::parse_csv_buffer(&contents.transactions_csv, options)?;
    let raw_rows = mapper::apply_column_mapping(&parsed, mapping, options.direction_mode);
    let catalog = CatalogIndex::load(conn, org.id)?;
    let settings = OrgSettings::from(org);
    let rows = normalize::normalize_rows(&raw_rows, &catalog, &settings, options);
    let rows = archive::bind_documents(rows, &contents.documents);
    let rows = duplicates::detect_duplicates(conn, org.id, rows, dup_cfg)?;
    let summary = summarize(&rows);
    Ok(ImportPreview {
        headers: parsed.headers,
        rows,
        summary,
        documents: contents.documents,
        checksum: commit::file_checksum(buffer),
    })
}
