use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{Result, SatchelError};
use crate::fmt::money;
use crate::import::duplicates::DuplicateConfig;
use crate::import::normalize::NormalizedImportRow;
use crate::import::options::{ColumnMapping, CsvParsingOptions, DirectionMode};
use crate::import::values::format_date;
use crate::import::{self, commit, ImportPreview};
use crate::models::Organization;
use crate::settings::get_data_dir;
use crate::templates;

use super::{resolve_org, DB_FILENAME};

/// Shared flags of `import preview` and `import commit`.
pub struct ImportArgs {
    pub file: String,
    pub org: Option<String>,
    pub template: Option<String>,
    pub mapping: Option<String>,
    pub direction: String,
    pub delimiter: Option<String>,
    pub header_row: usize,
    pub no_headers: bool,
}

pub fn preview(args: &ImportArgs) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, args.org.as_deref())?;
    let (mapping, options) = resolve_import_config(&conn, &org, args)?;
    let buffer = std::fs::read(&args.file)?;
    let preview = run_pipeline(&conn, &org, &buffer, &args.file, &mapping, &options)?;
    render_preview(&preview, &options);
    println!("Nothing was written. Run `satchel import commit` to book the valid rows.");
    Ok(())
}

pub fn commit(args: &ImportArgs, skip_duplicates: bool) -> Result<()> {
    let mut conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, args.org.as_deref())?;
    let (mapping, options) = resolve_import_config(&conn, &org, args)?;
    let buffer = std::fs::read(&args.file)?;
    let preview = run_pipeline(&conn, &org, &buffer, &args.file, &mapping, &options)?;
    render_preview(&preview, &options);
    if let Some(range) = commit::describe_date_range(&preview.rows, options.date_format) {
        println!("Date range: {range}");
    }

    let filename = Path::new(&args.file)
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| args.file.clone());
    let documents_dir = get_data_dir()
        .join("documents")
        .join(org.id.to_string());
    let result = commit::commit_import(
        &mut conn,
        org.id,
        &filename,
        &preview.checksum,
        preview.rows,
        &preview.documents,
        Some(&documents_dir),
        skip_duplicates,
    )?;

    println!(
        "{}",
        format!(
            "Import #{}: {} transactions booked.",
            result.import_id, result.inserted
        )
        .green()
    );
    if result.skipped_duplicates > 0 {
        println!(
            "{}",
            format!("{} probable duplicates skipped.", result.skipped_duplicates).yellow()
        );
    }
    if result.documents_written > 0 {
        println!(
            "{} documents stored under {}",
            result.documents_written,
            documents_dir.display()
        );
    }
    Ok(())
}

/// Template wins wholesale when given; otherwise a mapping file plus the
/// command-line parsing flags over the organization's defaults.
fn resolve_import_config(
    conn: &Connection,
    org: &Organization,
    args: &ImportArgs,
) -> Result<(ColumnMapping, CsvParsingOptions)> {
    if let Some(name) = &args.template {
        let template = templates::load_template(conn, org.id, name)?;
        return Ok((template.mapping, template.options));
    }
    let Some(mapping_path) = &args.mapping else {
        return Err(SatchelError::Other(
            "Provide --template <name> or --mapping <file.json>.".to_string(),
        ));
    };
    let mapping: ColumnMapping = serde_json::from_str(&std::fs::read_to_string(mapping_path)?)?;
    let direction = DirectionMode::parse_key(&args.direction).ok_or_else(|| {
        SatchelError::Other(format!(
            "Unknown direction mode '{}'. Use type_column or sign_based.",
            args.direction
        ))
    })?;
    let mut options = CsvParsingOptions::for_org(org, direction);
    if let Some(d) = &args.delimiter {
        // Allow a literal backslash-t from the shell for tab-separated files.
        options.delimiter = if d == "\\t" { "\t".to_string() } else { d.clone() };
    }
    options.header_row_index = args.header_row;
    options.has_headers = !args.no_headers;
    Ok((mapping, options))
}

fn run_pipeline(
    conn: &Connection,
    org: &Organization,
    buffer: &[u8],
    file: &str,
    mapping: &ColumnMapping,
    options: &CsvParsingOptions,
) -> Result<ImportPreview> {
    let is_zip = Path::new(file)
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if is_zip {
        import::preview_zip(conn, org, buffer, mapping, options, &DuplicateConfig::default())
    } else {
        import::preview_csv(conn, org, buffer, mapping, options, &DuplicateConfig::default())
    }
}

/// Every row, valid or not, with its full error text. Hiding failures is how
/// bad imports get booked.
fn render_preview(preview: &ImportPreview, options: &CsvParsingOptions) {
    let mut table = Table::new();
    table.set_header(vec!["Row", "Status", "Date", "Type", "Amount", "Description", "Details"]);
    for row in &preview.rows {
        table.add_row(preview_cells(row, options));
    }
    println!("{table}");

    let s = &preview.summary;
    let mut parts = vec![format!("{} rows", s.total_rows)];
    parts.push(format!("{} valid", s.valid_rows).green().to_string());
    if s.invalid_rows > 0 {
        parts.push(format!("{} invalid", s.invalid_rows).red().to_string());
    }
    if s.duplicate_candidates > 0 {
        parts.push(
            format!("{} possible duplicates", s.duplicate_candidates)
                .yellow()
                .to_string(),
        );
    }
    println!("{}", parts.join(", "));
}

fn preview_cells(row: &NormalizedImportRow, options: &CsvParsingOptions) -> Vec<Cell> {
    let row_number = row.index + 1;
    match &row.normalized {
        Some(n) => {
            let status = if row.is_duplicate_candidate {
                Cell::new("DUP".yellow())
            } else {
                Cell::new("OK".green())
            };
            let mut amount = money(n.amount_base, &n.currency_base);
            if let (Some(sec), Some(cur)) = (n.amount_secondary, n.currency_secondary.as_deref()) {
                amount = format!("{amount} ({})", money(sec, cur));
            }
            let details = if row.is_duplicate_candidate {
                row.duplicate_matches
                    .iter()
                    .map(|m| {
                        format!(
                            "matches #{} on {} ({})",
                            m.transaction_id,
                            m.date.format("%Y-%m-%d"),
                            money(m.amount, &m.currency)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            } else {
                String::new()
            };
            vec![
                Cell::new(row_number),
                status,
                Cell::new(format_date(n.date, options.date_format)),
                Cell::new(n.txn_type.label()),
                Cell::new(amount),
                Cell::new(&n.description),
                Cell::new(details),
            ]
        }
        None => vec![
            Cell::new(row_number),
            Cell::new("ERROR".red()),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(row.errors.join("; ")),
        ],
    }
}
