use comfy_table::{Cell, Table};

use crate::catalog;
use crate::db::get_connection;
use crate::error::Result;
use crate::settings::get_data_dir;

use super::{resolve_org, DB_FILENAME};

pub fn add(name: &str, org: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, org)?;
    catalog::add_account(&conn, org.id, name)?;
    println!("Added account '{name}' to {}.", org.name);
    Ok(())
}

pub fn list(org: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join(DB_FILENAME))?;
    let org = resolve_org(&conn, org)?;
    let accounts = catalog::list_active_accounts(&conn, org.id)?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for a in accounts {
        table.add_row(vec![Cell::new(a.id), Cell::new(a.name)]);
    }
    println!("Accounts for {}\n{table}", org.name);
    Ok(())
}
