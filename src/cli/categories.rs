use comfy_table::{Cell, Table};

use crate::catalog;
use crate::db::get_connection;
use crate::error::{Result, SatchelError};
use crate::models::TransactionType;
use crate::settings::get_data_dir;

use super::{resolve_org, DB_FILENAME};

pub fn add(name: &str, category_type: &str, org: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, org)?;
    let category_type = TransactionType::from_db(&category_type.to_lowercase()).ok_or_else(|| {
        SatchelError::Other(format!(
            "Unknown category type '{category_type}'. Use income or expense."
        ))
    })?;
    catalog::add_category(&conn, org.id, name, category_type)?;
    println!(
        "Added {} category '{name}' to {}.",
        category_type.as_str(),
        org.name
    );
    Ok(())
}

pub fn list(org: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, org)?;
    let categories = catalog::list_active_categories(&conn, org.id)?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type"]);
    for c in categories {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(c.name),
            Cell::new(c.category_type.label()),
        ]);
    }
    println!("Categories for {}\n{table}", org.name);
    Ok(())
}
