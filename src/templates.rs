use rusqlite::Connection;

use crate::error::{Result, SatchelError};
use crate::import::options::{ColumnMapping, CsvParsingOptions};

/// A saved pairing of column mapping and parsing options, so a recurring bank
/// export only has to be described once.
#[derive(Debug, Clone)]
pub struct ImportTemplate {
    pub name: String,
    pub mapping: ColumnMapping,
    pub options: CsvParsingOptions,
}

#[derive(Debug, Clone)]
pub struct TemplateSummary {
    pub name: String,
    pub created_at: String,
}

/// Create or overwrite the template with this name.
pub fn save_template(
    conn: &Connection,
    org_id: i64,
    name: &str,
    mapping: &ColumnMapping,
    options: &CsvParsingOptions,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO import_templates (org_id, name, column_mapping, parsing_options) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (org_id, name) DO UPDATE SET \
             column_mapping = excluded.column_mapping, \
             parsing_options = excluded.parsing_options",
        rusqlite::params![
            org_id,
            name,
            serde_json::to_string(mapping)?,
            serde_json::to_string(options)?,
        ],
    )?;
    conn.query_row(
        "SELECT id FROM import_templates WHERE org_id = ?1 AND name = ?2",
        rusqlite::params![org_id, name],
        |row| row.get(0),
    )
    .map_err(SatchelError::from)
}

pub fn list_templates(conn: &Connection, org_id: i64) -> Result<Vec<TemplateSummary>> {
    let mut stmt = conn.prepare(
        "SELECT name, created_at FROM import_templates WHERE org_id = ?1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([org_id], |row| {
            Ok(TemplateSummary {
                name: row.get(0)?,
                created_at: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_template(conn: &Connection, org_id: i64, name: &str) -> Result<ImportTemplate> {
    let (stored_name, mapping_json, options_json): (String, String, String) = conn
        .query_row(
            "SELECT name, column_mapping, parsing_options FROM import_templates \
             WHERE org_id = ?1 AND name = ?2",
            rusqlite::params![org_id, name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                Err(SatchelError::UnknownTemplate(name.to_string()))
            }
            other => Err(SatchelError::Sqlite(other)),
        })?;
    Ok(ImportTemplate {
        name: stored_name,
        mapping: serde_json::from_str(&mapping_json)?,
        options: serde_json::from_str(&options_json)?,
    })
}

pub fn delete_template(conn: &Connection, org_id: i64, name: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM import_templates WHERE org_id = ?1 AND name = ?2",
        rusqlite::params![org_id, name],
    )?;
    if deleted == 0 {
        return Err(SatchelError::UnknownTemplate(name.to_string()));
    }
    Ok(())
}
