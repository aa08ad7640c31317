use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

use super::DB_FILENAME;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILENAME);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `satchel init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));
    println!(
        "Current org: {}",
        if settings.current_org.is_empty() {
            "(not set)"
        } else {
            &settings.current_org
        }
    );

    let conn = get_connection(&db_path)?;
    let mut stmt = conn.prepare(
        "SELECT o.id, o.name, o.base_currency, \
                (SELECT count(*) FROM accounts a WHERE a.org_id = o.id AND a.is_active = 1), \
                (SELECT count(*) FROM transactions t WHERE t.org_id = o.id AND t.is_deleted = 0), \
                (SELECT count(*) FROM imports i WHERE i.org_id = o.id), \
                (SELECT count(*) FROM import_templates p WHERE p.org_id = o.id) \
         FROM organizations o ORDER BY o.name",
    )?;
    let rows: Vec<(i64, String, String, i64, i64, i64, i64)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Organization", "Currency", "Accounts", "Transactions", "Imports", "Templates",
    ]);
    for (id, name, currency, accounts, transactions, imports, templates) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(currency),
            Cell::new(accounts),
            Cell::new(transactions),
            Cell::new(imports),
            Cell::new(templates),
        ]);
    }
    println!();
    println!("{table}");
    Ok(())
}
