use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::catalog;
use crate::error::{Result, SatchelError};
use crate::import::values::format_date;

use super::archive::ZipDocument;
use super::normalize::{CounterpartyRef, NormalizedImportRow};

#[derive(Debug)]
pub struct CommitResult {
    pub import_id: i64,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub documents_written: usize,
}

pub fn file_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Import id of a prior import of the same file content, if any.
pub fn find_prior_import(conn: &Connection, org_id: i64, checksum: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM imports WHERE org_id = ?1 AND checksum = ?2",
        rusqlite::params![org_id, checksum],
        |row| row.get(0),
    )
    .map(Some)
    .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(SatchelError::Sqlite(other)),
    })
}

/// Write the valid rows of a previewed import into the books, atomically.
///
/// Staged vendors and clients are materialized here, one lookup per distinct
/// name. Referenced archive documents are copied under `documents_dir` after
/// the database transaction commits; the stored path is relative to that
/// directory so the data directory can move.
pub fn commit_import(
    conn: &mut Connection,
    org_id: i64,
    source_filename: &str,
    checksum: &str,
    rows: Vec<NormalizedImportRow>,
    documents: &HashMap<String, ZipDocument>,
    documents_dir: Option<&Path>,
    skip_duplicates: bool,
) -> Result<CommitResult> {
    if let Some(prior) = find_prior_import(conn, org_id, checksum)? {
        return Err(SatchelError::Other(format!(
            "This file was already imported (import #{prior})"
        )));
    }

    let mut skipped_duplicates = 0usize;
    let committable: Vec<&NormalizedImportRow> = rows
        .iter()
        .filter(|r| r.is_valid())
        .filter(|r| {
            if skip_duplicates && r.is_duplicate_candidate {
                skipped_duplicates += 1;
                false
            } else {
                true
            }
        })
        .collect();

    let dates: Vec<_> = committable
        .iter()
        .filter_map(|r| r.normalized.as_ref().map(|n| n.date))
        .collect();
    let range_start = dates.iter().min().map(|d| d.format("%Y-%m-%d").to_string());
    let range_end = dates.iter().max().map(|d| d.format("%Y-%m-%d").to_string());

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO imports (org_id, filename, record_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            org_id,
            source_filename,
            committable.len() as i64,
            range_start,
            range_end,
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();

    // One lookup per distinct staged name, keyed case-insensitively to match
    // the COLLATE NOCASE uniqueness on the vendors/clients tables.
    let mut vendor_ids: HashMap<String, i64> = HashMap::new();
    let mut client_ids: HashMap<String, i64> = HashMap::new();

    let mut pending_documents: Vec<(String, PathBuf)> = Vec::new();
    let mut inserted = 0usize;

    for row in &committable {
        let n = row.normalized.as_ref().ok_or_else(|| {
            SatchelError::Other("Valid row is missing its normalized payload".to_string())
        })?;

        let (vendor_id, client_id) = match &n.counterparty {
            Some(CounterpartyRef::Vendor(name)) => {
                let key = name.trim().to_lowercase();
                let id = match vendor_ids.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = catalog::find_or_create_vendor(&tx, org_id, name.trim())?.id;
                        vendor_ids.insert(key, id);
                        id
                    }
                };
                (Some(id), None)
            }
            Some(CounterpartyRef::Client(name)) => {
                let key = name.trim().to_lowercase();
                let id = match client_ids.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = catalog::find_or_create_client(&tx, org_id, name.trim())?.id;
                        client_ids.insert(key, id);
                        id
                    }
                };
                (None, Some(id))
            }
            None => (None, None),
        };

        let stored_document = match (&n.document_path, documents_dir) {
            (Some(path), Some(dir)) => {
                let relative = format!("{import_id}/{path}");
                pending_documents.push((path.clone(), dir.join(&relative)));
                Some(relative)
            }
            (Some(path), None) => Some(path.clone()),
            (None, _) => None,
        };

        let tags = if n.tags.is_empty() {
            None
        } else {
            Some(n.tags.join(";"))
        };

        tx.execute(
            "INSERT INTO transactions (org_id, account_id, category_id, txn_type, date, \
             description, amount_base, currency_base, amount_secondary, currency_secondary, \
             amount_original, currency_original, exchange_rate_to_base, vendor_id, client_id, \
             notes, tags, document_path, import_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            rusqlite::params![
                org_id,
                n.account_id,
                n.category_id,
                n.txn_type.as_str(),
                n.date.format("%Y-%m-%d").to_string(),
                n.description,
                n.amount_base,
                n.currency_base,
                n.amount_secondary,
                n.currency_secondary,
                n.amount_original,
                n.currency_original,
                n.exchange_rate_to_base,
                vendor_id,
                client_id,
                n.notes,
                tags,
                stored_document,
                import_id,
            ],
        )?;
        inserted += 1;
    }

    tx.commit()?;

    // Files land on disk only once the rows are durable.
    let mut documents_written = 0usize;
    for (archive_path, target) in pending_documents {
        let Some(document) = documents.get(&archive_path) else {
            continue;
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &document.bytes)?;
        documents_written += 1;
    }

    Ok(CommitResult {
        import_id,
        inserted,
        skipped_duplicates,
        documents_written,
    })
}

/// Human-readable date range of an import, for the summary line.
pub fn describe_date_range(
    rows: &[NormalizedImportRow],
    format: super::options::DateFormat,
) -> Option<String> {
    let dates: Vec<_> = rows
        .iter()
        .filter_map(|r| r.normalized.as_ref().map(|n| n.date))
        .collect();
    let min = dates.iter().min()?;
    let max = dates.iter().max()?;
    Some(format!(
        "{} to {}",
        format_date(*min, format),
        format_date(*max, format)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_organization, get_connection, init_db};
    use crate::import::normalize::{NormalizedTransaction, RowStatus};
    use crate::models::TransactionType;
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection, i64, i64, i64) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        let org_id = create_organization(&conn, "Acme", "USD", '.', ',', "YYYY_MM_DD").unwrap();
        let account_id = catalog::add_account(&conn, org_id, "Checking").unwrap();
        let cat_id: i64 = conn
            .query_row(
                "SELECT id FROM categories WHERE org_id = ?1 AND name = 'Rent'",
                [org_id],
                |r| r.get(0),
            )
            .unwrap();
        (dir, conn, org_id, account_id, cat_id)
    }

    fn valid_row(
        date: NaiveDate,
        amount: f64,
        description: &str,
        account_id: i64,
        category_id: i64,
        counterparty: Option<CounterpartyRef>,
    ) -> NormalizedImportRow {
        NormalizedImportRow {
            index: 0,
            status: RowStatus::Valid,
            errors: Vec::new(),
            normalized: Some(NormalizedTransaction {
                txn_type: TransactionType::Expense,
                date,
                amount_base: amount,
                currency_base: "USD".to_string(),
                amount_secondary: None,
                currency_secondary: None,
                amount_original: amount,
                currency_original: "USD".to_string(),
                exchange_rate_to_base: 1.0,
                description: description.to_string(),
                category_id,
                account_id,
                counterparty,
                notes: None,
                tags: vec!["office".to_string(), "q1".to_string()],
                document_path: None,
            }),
            is_duplicate_candidate: false,
            duplicate_matches: Vec::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_commit_inserts_rows_and_import_record() {
        let (_dir, mut conn, org_id, account_id, cat_id) = test_db();
        let rows = vec![
            valid_row(date(2025, 1, 10), 100.0, "Rent Jan", account_id, cat_id, None),
            valid_row(date(2025, 1, 20), 100.0, "Rent Feb", account_id, cat_id, None),
        ];
        let result = commit_import(
            &mut conn,
            org_id,
            "statement.csv",
            "abc123",
            rows,
            &HashMap::new(),
            None,
            false,
        )
        .unwrap();
        assert_eq!(result.inserted, 2);

        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM transactions WHERE org_id = ?1 AND import_id = ?2",
                rusqlite::params![org_id, result.import_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);

        let (records, start, end, checksum): (i64, String, String, String) = conn
            .query_row(
                "SELECT record_count, date_range_start, date_range_end, checksum \
                 FROM imports WHERE id = ?1",
                [result.import_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!(records, 2);
        assert_eq!(start, "2025-01-10");
        assert_eq!(end, "2025-01-20");
        assert_eq!(checksum, "abc123");
    }

    #[test]
    fn test_commit_rejects_already_imported_file() {
        let (_dir, mut conn, org_id, account_id, cat_id) = test_db();
        let row = valid_row(date(2025, 1, 10), 100.0, "Rent", account_id, cat_id, None);
        commit_import(
            &mut conn, org_id, "a.csv", "samehash", vec![row.clone()],
            &HashMap::new(), None, false,
        )
        .unwrap();
        let err = commit_import(
            &mut conn, org_id, "a.csv", "samehash", vec![row],
            &HashMap::new(), None, false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already imported"));
    }

    #[test]
    fn test_commit_materializes_counterparties_once() {
        let (_dir, mut conn, org_id, account_id, cat_id) = test_db();
        let rows = vec![
            valid_row(
                date(2025, 1, 10), 100.0, "Rent Jan", account_id, cat_id,
                Some(CounterpartyRef::Vendor("Main St Properties".to_string())),
            ),
            valid_row(
                date(2025, 2, 10), 100.0, "Rent Feb", account_id, cat_id,
                Some(CounterpartyRef::Vendor("MAIN ST PROPERTIES".to_string())),
            ),
        ];
        commit_import(
            &mut conn, org_id, "a.csv", "h1", rows, &HashMap::new(), None, false,
        )
        .unwrap();
        let vendors: i64 = conn
            .query_row("SELECT count(*) FROM vendors WHERE org_id = ?1", [org_id], |r| r.get(0))
            .unwrap();
        assert_eq!(vendors, 1);
        let linked: i64 = conn
            .query_row(
                "SELECT count(*) FROM transactions WHERE org_id = ?1 AND vendor_id IS NOT NULL",
                [org_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(linked, 2);
    }

    #[test]
    fn test_commit_skips_invalid_and_flagged_rows() {
        let (_dir, mut conn, org_id, account_id, cat_id) = test_db();
        let mut invalid = valid_row(date(2025, 1, 10), 50.0, "Bad", account_id, cat_id, None);
        invalid.invalidate("Invalid date: junk".to_string());
        let mut flagged = valid_row(date(2025, 1, 11), 60.0, "Dup", account_id, cat_id, None);
        flagged.is_duplicate_candidate = true;
        let clean = valid_row(date(2025, 1, 12), 70.0, "Ok", account_id, cat_id, None);

        let result = commit_import(
            &mut conn, org_id, "a.csv", "h2",
            vec![invalid, flagged, clean],
            &HashMap::new(), None, true,
        )
        .unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(result.skipped_duplicates, 1);
    }

    #[test]
    fn test_commit_writes_documents_relative_to_import() {
        let (dir, mut conn, org_id, account_id, cat_id) = test_db();
        let docs_dir = dir.path().join("documents");
        let mut row = valid_row(date(2025, 1, 10), 100.0, "Rent", account_id, cat_id, None);
        row.normalized.as_mut().unwrap().document_path = Some("receipts/rent.pdf".to_string());
        let mut documents = HashMap::new();
        documents.insert(
            "receipts/rent.pdf".to_string(),
            ZipDocument {
                bytes: b"%PDF-1.4".to_vec(),
                original_name: "rent.pdf".to_string(),
            },
        );
        let result = commit_import(
            &mut conn, org_id, "a.zip", "h3", vec![row],
            &documents, Some(&docs_dir), false,
        )
        .unwrap();
        assert_eq!(result.documents_written, 1);

        let stored: String = conn
            .query_row(
                "SELECT document_path FROM transactions WHERE org_id = ?1",
                [org_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(stored, format!("{}/receipts/rent.pdf", result.import_id));
        assert!(docs_dir.join(&stored).exists());
    }

    #[test]
    fn test_tags_joined_for_storage() {
        let (_dir, mut conn, org_id, account_id, cat_id) = test_db();
        let row = valid_row(date(2025, 1, 10), 100.0, "Rent", account_id, cat_id, None);
        commit_import(
            &mut conn, org_id, "a.csv", "h4", vec![row], &HashMap::new(), None, false,
        )
        .unwrap();
        let tags: String = conn
            .query_row("SELECT tags FROM transactions WHERE org_id = ?1", [org_id], |r| r.get(0))
            .unwrap();
        assert_eq!(tags, "office;q1");
    }
}
