use std::path::PathBuf;

use colored::Colorize;

use crate::db::{create_organization, get_connection, init_db};
use crate::error::{Result, SatchelError};
use crate::import::options::DateFormat;
use crate::settings::{load_settings, save_settings};

use super::DB_FILENAME;

pub fn run(
    org: &str,
    data_dir: Option<String>,
    base_currency: &str,
    decimal_separator: char,
    thousands_separator: char,
    date_format: &str,
) -> Result<()> {
    if DateFormat::parse_key(date_format).is_none() {
        return Err(SatchelError::Other(format!(
            "Unknown date format '{date_format}'. Use DD_MM_YYYY, MM_DD_YYYY, or YYYY_MM_DD."
        )));
    }
    let base_currency = base_currency.trim().to_uppercase();
    if !crate::import::values::is_valid_currency_code(&base_currency) {
        return Err(SatchelError::Other(format!(
            "'{base_currency}' is not a three-letter currency code."
        )));
    }

    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    let data_dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let conn = get_connection(&data_dir.join(DB_FILENAME))?;
    init_db(&conn)?;
    let org_id = create_organization(
        &conn,
        org,
        &base_currency,
        decimal_separator,
        thousands_separator,
        date_format,
    )?;

    settings.current_org = org.to_string();
    save_settings(&settings)?;

    println!("{}", format!("Created organization '{org}' (#{org_id}).").green());
    println!("Data dir: {}", data_dir.display());
    println!("Base currency: {base_currency}, date format: {date_format}");
    println!("Next: `satchel accounts add <name>` and `satchel import preview <file>`.");
    Ok(())
}
