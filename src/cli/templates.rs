use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::{Result, SatchelError};
use crate::import::options::{ColumnMapping, CsvParsingOptions, DirectionMode};
use crate::settings::get_data_dir;
use crate::templates;

use super::{resolve_org, DB_FILENAME};

pub struct SaveArgs {
    pub name: String,
    pub mapping: String,
    pub org: Option<String>,
    pub direction: String,
    pub delimiter: String,
    pub header_row: usize,
    pub no_headers: bool,
}

pub fn save(args: &SaveArgs) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, args.org.as_deref())?;

    let mapping: ColumnMapping =
        serde_json::from_str(&std::fs::read_to_string(&args.mapping)?)?;
    let direction = DirectionMode::parse_key(&args.direction).ok_or_else(|| {
        SatchelError::Other(format!(
            "Unknown direction mode '{}'. Use type_column or sign_based.",
            args.direction
        ))
    })?;
    let mut options = CsvParsingOptions::for_org(&org, direction);
    options.delimiter = if args.delimiter == "\\t" {
        "\t".to_string()
    } else {
        args.delimiter.clone()
    };
    options.header_row_index = args.header_row;
    options.has_headers = !args.no_headers;

    templates::save_template(&conn, org.id, &args.name, &mapping, &options)?;
    println!("Saved template '{}' for {}.", args.name, org.name);
    Ok(())
}

pub fn list(org: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, org)?;
    let all = templates::list_templates(&conn, org.id)?;
    if all.is_empty() {
        println!("No templates saved for {}.", org.name);
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["Name", "Created"]);
    for t in all {
        table.add_row(vec![Cell::new(t.name), Cell::new(t.created_at)]);
    }
    println!("Templates for {}\n{table}", org.name);
    Ok(())
}

pub fn delete(name: &str, org: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, org)?;
    templates::delete_template(&conn, org.id, name)?;
    println!("Deleted template '{name}'.");
    Ok(())
}
