use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS organizations (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    base_currency TEXT NOT NULL DEFAULT 'USD',
    decimal_separator TEXT NOT NULL DEFAULT '.',
    thousands_separator TEXT NOT NULL DEFAULT ',',
    date_format TEXT NOT NULL DEFAULT 'YYYY_MM_DD',
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (org_id, name),
    FOREIGN KEY (org_id) REFERENCES organizations(id)
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    category_type TEXT NOT NULL,
    is_active INTEGER DEFAULT 1,
    UNIQUE (org_id, name),
    FOREIGN KEY (org_id) REFERENCES organizations(id)
);

CREATE TABLE IF NOT EXISTS vendors (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (org_id, name),
    FOREIGN KEY (org_id) REFERENCES organizations(id)
);

CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (org_id, name),
    FOREIGN KEY (org_id) REFERENCES organizations(id)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    date_range_start TEXT,
    date_range_end TEXT,
    checksum TEXT,
    FOREIGN KEY (org_id) REFERENCES organizations(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    txn_type TEXT NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount_base REAL NOT NULL,
    currency_base TEXT NOT NULL,
    amount_secondary REAL,
    currency_secondary TEXT,
    amount_original REAL NOT NULL,
    currency_original TEXT NOT NULL,
    exchange_rate_to_base REAL NOT NULL DEFAULT 1.0,
    vendor_id INTEGER,
    client_id INTEGER,
    notes TEXT,
    tags TEXT,
    document_path TEXT,
    is_deleted INTEGER DEFAULT 0,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (org_id) REFERENCES organizations(id),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (vendor_id) REFERENCES vendors(id),
    FOREIGN KEY (client_id) REFERENCES clients(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_org_date
    ON transactions(org_id, date);

CREATE TABLE IF NOT EXISTS import_templates (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    column_mapping TEXT NOT NULL,
    parsing_options TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (org_id, name),
    FOREIGN KEY (org_id) REFERENCES organizations(id)
);
";

// (name, category_type)
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Client Services", "income"),
    ("Interest Income", "income"),
    ("Other Income", "income"),
    ("Advertising & Marketing", "expense"),
    ("Contract Labor", "expense"),
    ("Insurance", "expense"),
    ("Legal & Professional", "expense"),
    ("Office Expense", "expense"),
    ("Rent", "expense"),
    ("Software & Subscriptions", "expense"),
    ("Travel", "expense"),
    ("Meals", "expense"),
    ("Utilities", "expense"),
    ("Bank & Merchant Fees", "expense"),
    ("Equipment", "expense"),
    ("Uncategorized", "expense"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Create an organization and seed its starter category set.
pub fn create_organization(
    conn: &Connection,
    name: &str,
    base_currency: &str,
    decimal_separator: char,
    thousands_separator: char,
    date_format: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO organizations (name, base_currency, decimal_separator, thousands_separator, date_format) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            name,
            base_currency,
            decimal_separator.to_string(),
            thousands_separator.to_string(),
            date_format,
        ],
    )?;
    let org_id = conn.last_insert_rowid();
    for (cat_name, cat_type) in DEFAULT_CATEGORIES {
        conn.execute(
            "INSERT INTO categories (org_id, name, category_type) VALUES (?1, ?2, ?3)",
            rusqlite::params![org_id, cat_name, cat_type],
        )?;
    }
    Ok(org_id)
}
