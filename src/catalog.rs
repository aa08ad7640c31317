use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::{Result, SatchelError};
use crate::models::{Account, Category, Counterparty, Organization, TransactionType};

pub fn find_organization(conn: &Connection, name: &str) -> Result<Organization> {
    let mut stmt = conn.prepare(
        "SELECT id, name, base_currency, decimal_separator, thousands_separator, date_format \
         FROM organizations WHERE name = ?1",
    )?;
    stmt.query_row([name], |row| {
        Ok(Organization {
            id: row.get(0)?,
            name: row.get(1)?,
            base_currency: row.get(2)?,
            decimal_separator: first_char(&row.get::<_, String>(3)?, '.'),
            thousands_separator: first_char(&row.get::<_, String>(4)?, ','),
            date_format: row.get(5)?,
        })
    })
    .map_err(|_| SatchelError::UnknownOrganization(name.to_string()))
}

fn first_char(s: &str, fallback: char) -> char {
    s.chars().next().unwrap_or(fallback)
}

pub fn list_active_categories(conn: &Connection, org_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category_type FROM categories \
         WHERE org_id = ?1 AND is_active = 1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([org_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, name, cat_type)| {
            TransactionType::from_db(&cat_type).map(|category_type| Category {
                id,
                name,
                category_type,
                is_active: true,
            })
        })
        .collect())
}

pub fn list_active_accounts(conn: &Connection, org_id: i64) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM accounts WHERE org_id = ?1 AND is_active = 1 ORDER BY name",
    )?;
    let rows = stmt
        .query_map([org_id], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                is_active: true,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn add_account(conn: &Connection, org_id: i64, name: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (org_id, name) VALUES (?1, ?2)",
        rusqlite::params![org_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn add_category(
    conn: &Connection,
    org_id: i64,
    name: &str,
    category_type: TransactionType,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO categories (org_id, name, category_type) VALUES (?1, ?2, ?3)",
        rusqlite::params![org_id, name, category_type.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

fn find_or_create_in(
    conn: &Connection,
    table: &str,
    org_id: i64,
    name: &str,
) -> Result<Counterparty> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            &format!(
                "SELECT id, name FROM {table} WHERE org_id = ?1 AND name = ?2 COLLATE NOCASE"
            ),
            rusqlite::params![org_id, name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    if let Some((id, name)) = existing {
        return Ok(Counterparty { id, name });
    }
    conn.execute(
        &format!("INSERT INTO {table} (org_id, name) VALUES (?1, ?2)"),
        rusqlite::params![org_id, name],
    )?;
    Ok(Counterparty {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

pub fn find_or_create_vendor(conn: &Connection, org_id: i64, name: &str) -> Result<Counterparty> {
    find_or_create_in(conn, "vendors", org_id, name)
}

pub fn find_or_create_client(conn: &Connection, org_id: i64, name: &str) -> Result<Counterparty> {
    find_or_create_in(conn, "clients", org_id, name)
}

/// An already-booked transaction as seen by the duplicate detector.
#[derive(Debug, Clone)]
pub struct ExistingTransaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount_base: f64,
    pub currency_base: String,
    pub amount_secondary: Option<f64>,
    pub currency_secondary: Option<String>,
    pub counterparty: Option<String>,
}

/// Non-deleted transactions for the organization within [from, to] inclusive.
pub fn transactions_in_range(
    conn: &Connection,
    org_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ExistingTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.description, t.amount_base, t.currency_base, \
                t.amount_secondary, t.currency_secondary, COALESCE(v.name, c.name) \
         FROM transactions t \
         LEFT JOIN vendors v ON t.vendor_id = v.id \
         LEFT JOIN clients c ON t.client_id = c.id \
         WHERE t.org_id = ?1 AND t.is_deleted = 0 AND t.date >= ?2 AND t.date <= ?3",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                org_id,
                from.format("%Y-%m-%d").to_string(),
                to.format("%Y-%m-%d").to_string()
            ],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, date, description, amount_base, currency_base, sec, sec_cur, cp)| {
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
            Some(ExistingTransaction {
                id,
                date,
                description,
                amount_base,
                currency_base,
                amount_secondary: sec,
                currency_secondary: sec_cur,
                counterparty: cp,
            })
        })
        .collect())
}
