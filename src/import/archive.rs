use std::collections::HashMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::{Result, SatchelError};

use super::normalize::NormalizedImportRow;

const TRANSACTIONS_MEMBER: &str = "transactions.csv";
const ALLOWED_EXTENSIONS: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("txt", "text/plain"),
];
const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ZipDocument {
    pub bytes: Vec<u8>,
    pub original_name: String,
}

#[derive(Debug)]
pub struct ZipContents {
    pub transactions_csv: Vec<u8>,
    /// Keyed by normalized archive path.
    pub documents: HashMap<String, ZipDocument>,
}

/// Unpack a transactions archive: the `transactions.csv` member (first match
/// wins) plus every other file keyed by normalized path.
pub fn parse_transactions_zip(buffer: &[u8]) -> Result<ZipContents> {
    let mut archive = ZipArchive::new(Cursor::new(buffer))
        .map_err(|e| SatchelError::Zip(format!("Could not read archive: {e}")))?;

    let mut transactions_csv: Option<Vec<u8>> = None;
    let mut documents = HashMap::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SatchelError::Zip(format!("Could not read archive entry: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let path = normalize_doc_path(entry.name());
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        let is_transactions =
            path == TRANSACTIONS_MEMBER || path.ends_with(&format!("/{TRANSACTIONS_MEMBER}"));
        if is_transactions && transactions_csv.is_none() {
            transactions_csv = Some(bytes);
        } else {
            let original_name = path.rsplit('/').next().unwrap_or(&path).to_string();
            documents.insert(path, ZipDocument { bytes, original_name });
        }
    }

    let transactions_csv = transactions_csv.ok_or_else(|| {
        SatchelError::Zip(format!("No {TRANSACTIONS_MEMBER} entry found in archive"))
    })?;
    Ok(ZipContents {
        transactions_csv,
        documents,
    })
}

/// Backslashes to forward slashes, leading `./` and `/` stripped, repeated
/// slashes collapsed.
pub fn normalize_doc_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

fn mime_for_extension(path: &str) -> Option<&'static str> {
    let extension = path.rsplit('.').next()?.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// Size/MIME gate for an attached document. Returns a message when the file
/// is rejected.
pub fn validate_document_file(mime_type: &str, size_bytes: u64) -> Option<String> {
    if !ALLOWED_EXTENSIONS.iter().any(|(_, mime)| *mime == mime_type) {
        return Some(format!("Unsupported document MIME type: {mime_type}"));
    }
    if size_bytes > MAX_DOCUMENT_BYTES {
        return Some(format!(
            "Document exceeds the {} MB size limit",
            MAX_DOCUMENT_BYTES / (1024 * 1024)
        ));
    }
    None
}

/// Resolve each still-valid row's document reference against the archive.
/// Rows without a document path are untouched; a missing or non-conforming
/// document demotes only its own row.
pub fn bind_documents(
    rows: Vec<NormalizedImportRow>,
    documents: &HashMap<String, ZipDocument>,
) -> Vec<NormalizedImportRow> {
    rows.into_iter()
        .map(|mut row| {
            let Some(path) = row
                .normalized
                .as_ref()
                .and_then(|n| n.document_path.clone())
            else {
                return row;
            };
            let normalized_path = normalize_doc_path(&path);

            let Some(document) = documents.get(&normalized_path) else {
                row.invalidate(format!("Document not found in archive: {path}"));
                return row;
            };
            let Some(mime) = mime_for_extension(&normalized_path) else {
                row.invalidate(format!("Unsupported document type: {path}"));
                return row;
            };
            if let Some(message) = validate_document_file(mime, document.bytes.len() as u64) {
                row.invalidate(message);
                return row;
            }
            if let Some(n) = row.normalized.as_mut() {
                n.document_path = Some(normalized_path);
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::normalize::{NormalizedTransaction, RowStatus};
    use crate::models::TransactionType;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options = SimpleFileOptions::default();
            for (name, bytes) in entries {
                writer.start_file(name.to_string(), options).unwrap();
                writer.write_all(bytes).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn row_with_document(path: Option<&str>) -> NormalizedImportRow {
        NormalizedImportRow {
            index: 0,
            status: RowStatus::Valid,
            errors: Vec::new(),
            normalized: Some(NormalizedTransaction {
                txn_type: TransactionType::Expense,
                date: chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                amount_base: 100.0,
                currency_base: "USD".to_string(),
                amount_secondary: None,
                currency_secondary: None,
                amount_original: 100.0,
                currency_original: "USD".to_string(),
                exchange_rate_to_base: 1.0,
                description: "Rent".to_string(),
                category_id: 1,
                account_id: 1,
                counterparty: None,
                notes: None,
                tags: Vec::new(),
                document_path: path.map(str::to_string),
            }),
            is_duplicate_candidate: false,
            duplicate_matches: Vec::new(),
        }
    }

    #[test]
    fn test_parse_zip_extracts_csv_and_documents() {
        let bytes = build_zip(&[
            ("transactions.csv", b"Date,Amount\n2025-01-01,10.00\n"),
            ("receipts/a.pdf", b"%PDF-1.4"),
            ("receipts/b.png", b"\x89PNG"),
        ]);
        let contents = parse_transactions_zip(&bytes).unwrap();
        assert!(contents.transactions_csv.starts_with(b"Date,Amount"));
        assert_eq!(contents.documents.len(), 2);
        assert_eq!(
            contents.documents.get("receipts/a.pdf").unwrap().original_name,
            "a.pdf"
        );
    }

    #[test]
    fn test_parse_zip_nested_transactions_member() {
        let bytes = build_zip(&[("export/transactions.csv", b"Date\n2025-01-01\n")]);
        let contents = parse_transactions_zip(&bytes).unwrap();
        assert!(contents.transactions_csv.starts_with(b"Date"));
    }

    #[test]
    fn test_parse_zip_missing_member_fails() {
        let bytes = build_zip(&[("receipts/a.pdf", b"%PDF-1.4")]);
        let err = parse_transactions_zip(&bytes).unwrap_err();
        assert!(matches!(err, SatchelError::Zip(_)));
    }

    #[test]
    fn test_parse_zip_first_transactions_member_wins() {
        let bytes = build_zip(&[
            ("transactions.csv", b"first"),
            ("backup/transactions.csv", b"second"),
        ]);
        let contents = parse_transactions_zip(&bytes).unwrap();
        assert_eq!(contents.transactions_csv, b"first");
        // The runner-up is still available as a document.
        assert!(contents.documents.contains_key("backup/transactions.csv"));
    }

    #[test]
    fn test_normalize_doc_path() {
        assert_eq!(normalize_doc_path("receipts\\a.pdf"), "receipts/a.pdf");
        assert_eq!(normalize_doc_path("./receipts/a.pdf"), "receipts/a.pdf");
        assert_eq!(normalize_doc_path("/receipts//a.pdf"), "receipts/a.pdf");
        assert_eq!(normalize_doc_path(".//receipts/a.pdf"), "receipts/a.pdf");
    }

    #[test]
    fn test_bind_documents_missing_entry() {
        let rows = vec![row_with_document(Some("receipts/missing.pdf"))];
        let out = bind_documents(rows, &HashMap::new());
        assert!(!out[0].is_valid());
        assert!(out[0].normalized.is_none());
        assert!(out[0].errors[0].contains("not found"));
    }

    #[test]
    fn test_bind_documents_unsupported_extension() {
        let mut documents = HashMap::new();
        documents.insert(
            "receipts/a.docx".to_string(),
            ZipDocument {
                bytes: b"doc".to_vec(),
                original_name: "a.docx".to_string(),
            },
        );
        let rows = vec![
            row_with_document(Some("receipts/a.docx")),
            row_with_document(None),
        ];
        let out = bind_documents(rows, &documents);
        assert!(!out[0].is_valid());
        assert!(out[0].errors[0].contains("Unsupported document type"));
        // Sibling row without a document is untouched.
        assert!(out[1].is_valid());
    }

    #[test]
    fn test_bind_documents_oversize() {
        let mut documents = HashMap::new();
        documents.insert(
            "big.pdf".to_string(),
            ZipDocument {
                bytes: vec![0u8; (MAX_DOCUMENT_BYTES + 1) as usize],
                original_name: "big.pdf".to_string(),
            },
        );
        let rows = vec![row_with_document(Some("big.pdf"))];
        let out = bind_documents(rows, &documents);
        assert!(!out[0].is_valid());
        assert!(out[0].errors[0].contains("size limit"));
    }

    #[test]
    fn test_bind_documents_normalizes_stored_path() {
        let mut documents = HashMap::new();
        documents.insert(
            "receipts/a.pdf".to_string(),
            ZipDocument {
                bytes: b"%PDF-1.4".to_vec(),
                original_name: "a.pdf".to_string(),
            },
        );
        let rows = vec![row_with_document(Some(".\\receipts\\a.pdf"))];
        let out = bind_documents(rows, &documents);
        assert!(out[0].is_valid(), "errors: {:?}", out[0].errors);
        assert_eq!(
            out[0].normalized.as_ref().unwrap().document_path.as_deref(),
            Some("receipts/a.pdf")
        );
    }

    #[test]
    fn test_validate_document_file() {
        assert!(validate_document_file("application/pdf", 1024).is_none());
        assert!(validate_document_file("application/zip", 1024).is_some());
        assert!(validate_document_file("image/png", MAX_DOCUMENT_BYTES + 1).is_some());
    }
}
